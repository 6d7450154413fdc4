//! Pure text and byte algorithms behind the shell's processing commands.
//!
//! Everything here operates on plain slices and strings with no filesystem
//! access, which is what makes the interesting command semantics testable in
//! isolation. Several functions intentionally deviate from their POSIX
//! namesakes to preserve the shell's documented behavior:
//!
//! - [`uniq_lines`] de-duplicates across the whole input in first-seen
//!   order, not just adjacent repeats.
//! - [`diff_lines`] is a positional line-aligned comparison, not a minimal
//!   edit script.

use std::collections::{HashMap, HashSet};

/// All lines of the input in stable lexicographic order.
pub fn sort_lines(text: &str) -> Vec<String> {
    let mut lines: Vec<String> = text.lines().map(str::to_string).collect();
    lines.sort();
    lines
}

/// Each distinct line exactly once, in order of first appearance.
pub fn uniq_lines(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for line in text.lines() {
        if seen.insert(line.to_string()) {
            out.push(line.to_string());
        }
    }
    out
}

/// Which input(s) a [`comm`] output line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommSide {
    OnlyFirst,
    OnlySecond,
    Both,
}

/// Merge-walk comparison of two files as sorted sets of unique lines.
///
/// Equal lines advance both cursors and land in [`CommSide::Both`].
pub fn comm(first: &str, second: &str) -> Vec<(CommSide, String)> {
    let a = sorted_unique(first);
    let b = sorted_unique(second);
    let mut out = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Less => {
                out.push((CommSide::OnlyFirst, a[i].clone()));
                i += 1;
            },
            std::cmp::Ordering::Greater => {
                out.push((CommSide::OnlySecond, b[j].clone()));
                j += 1;
            },
            std::cmp::Ordering::Equal => {
                out.push((CommSide::Both, a[i].clone()));
                i += 1;
                j += 1;
            },
        }
    }
    out.extend(a[i..].iter().cloned().map(|l| (CommSide::OnlyFirst, l)));
    out.extend(b[j..].iter().cloned().map(|l| (CommSide::OnlySecond, l)));
    out
}

fn sorted_unique(text: &str) -> Vec<String> {
    let mut lines = uniq_lines(text);
    lines.sort();
    lines
}

/// Positional line-aligned diff.
///
/// Index `i` mismatches emit a `{i}c{i}` change block; when the first file
/// is longer its trailing lines appear as `{i}a{i}` append records, and
/// when the second is longer its trailing lines appear as `{i}d{i}` delete
/// records. Empty output means the files agree line for line.
pub fn diff_lines(first: &str, second: &str) -> Vec<String> {
    let a: Vec<&str> = first.lines().collect();
    let b: Vec<&str> = second.lines().collect();
    let mut out = Vec::new();

    for (i, (la, lb)) in a.iter().zip(b.iter()).enumerate() {
        if la != lb {
            let n = i + 1;
            out.push(format!("{n}c{n}"));
            out.push(format!("< {la}"));
            out.push("---".to_string());
            out.push(format!("> {lb}"));
        }
    }
    if a.len() > b.len() {
        for (i, line) in a.iter().enumerate().skip(b.len()) {
            let n = i + 1;
            out.push(format!("{n}a{n}"));
            out.push(format!("> {line}"));
        }
    } else if b.len() > a.len() {
        for (i, line) in b.iter().enumerate().skip(a.len()) {
            let n = i + 1;
            out.push(format!("{n}d{n}"));
            out.push(format!("< {line}"));
        }
    }
    out
}

/// A cycle found during topological ordering; the payload names a node on
/// the cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleError(pub String);

/// Topological order of the graph described by whitespace pairs per line
/// (each line `u v` is an edge u -> v).
///
/// Performs a depth-first postorder over all nodes in first-seen order and
/// returns the reversed postorder. A cycle is reported as an error instead
/// of producing an arbitrary order.
pub fn tsort(text: &str) -> Result<Vec<String>, CycleError> {
    let mut order: Vec<String> = Vec::new();
    let mut adjacency: HashMap<String, Vec<String>> = HashMap::new();
    for line in text.lines() {
        let mut fields = line.split_whitespace();
        let (Some(u), Some(v)) = (fields.next(), fields.next()) else {
            continue;
        };
        for node in [u, v] {
            if !adjacency.contains_key(node) {
                adjacency.insert(node.to_string(), Vec::new());
                order.push(node.to_string());
            }
        }
        adjacency.get_mut(u).expect("inserted above").push(v.to_string());
    }

    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        InProgress,
        Done,
    }

    fn visit(
        node: &str,
        adjacency: &HashMap<String, Vec<String>>,
        marks: &mut HashMap<String, Mark>,
        post: &mut Vec<String>,
    ) -> Result<(), CycleError> {
        match marks.get(node) {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::InProgress) => return Err(CycleError(node.to_string())),
            None => {},
        }
        marks.insert(node.to_string(), Mark::InProgress);
        if let Some(next) = adjacency.get(node) {
            for n in next {
                visit(n, adjacency, marks, post)?;
            }
        }
        marks.insert(node.to_string(), Mark::Done);
        post.push(node.to_string());
        Ok(())
    }

    let mut post = Vec::new();
    let mut marks = HashMap::new();
    for node in &order {
        visit(node, &adjacency, &mut marks, &mut post)?;
    }
    post.reverse();
    Ok(post)
}

/// Additive 16-bit rolling checksum.
pub fn sum16(data: &[u8]) -> u16 {
    data.iter()
        .fold(0u16, |acc, &b| acc.wrapping_add(u16::from(b)))
}

/// CRC-32 as computed by POSIX `cksum`: generator 0x04C11DB7, the byte
/// count appended least-significant-byte first, final one's complement.
pub fn cksum_crc32(data: &[u8]) -> u32 {
    let table = cksum_table();
    let mut crc: u32 = 0;
    for &b in data {
        crc = (crc << 8) ^ table[(((crc >> 24) as u8) ^ b) as usize];
    }
    let mut len = data.len() as u64;
    while len != 0 {
        crc = (crc << 8) ^ table[(((crc >> 24) as u8) ^ (len as u8)) as usize];
        len >>= 8;
    }
    !crc
}

/// The full 256-entry CRC table for [`cksum_crc32`].
fn cksum_table() -> [u32; 256] {
    const POLY: u32 = 0x04C1_1DB7;
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = (i as u32) << 24;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 0x8000_0000 != 0 {
                (crc << 1) ^ POLY
            } else {
                crc << 1
            };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

/// Hex dump rows: 8-digit hex offset, 16 bytes per row, ASCII sidebar.
pub fn hexdump_lines(data: &[u8]) -> Vec<String> {
    data.chunks(16)
        .enumerate()
        .map(|(row, chunk)| {
            let hex = hex_cells(chunk);
            let ascii = ascii_sidebar(chunk);
            format!("{:08x}  {hex:<48}  |{ascii}|", row * 16)
        })
        .collect()
}

/// Octal dump rows: 7-digit octal offset, 16 bytes per row, ASCII sidebar.
pub fn od_lines(data: &[u8]) -> Vec<String> {
    data.chunks(16)
        .enumerate()
        .map(|(row, chunk)| {
            let hex = hex_cells(chunk);
            let ascii = ascii_sidebar(chunk);
            format!("{:07o}: {hex:<48} {ascii}", row * 16)
        })
        .collect()
}

fn hex_cells(chunk: &[u8]) -> String {
    chunk
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn ascii_sidebar(chunk: &[u8]) -> String {
    chunk
        .iter()
        .map(|&b| if is_printable(b) { b as char } else { '.' })
        .collect()
}

fn is_printable(b: u8) -> bool {
    (0x20..=0x7e).contains(&b)
}

/// Runs of printable ASCII of length >= `min_len`; any other byte resets
/// the run, and a qualifying trailing run is flushed at end of input.
pub fn extract_strings(data: &[u8], min_len: usize) -> Vec<String> {
    let mut out = Vec::new();
    let mut run = String::new();
    for &b in data {
        if is_printable(b) {
            run.push(b as char);
        } else {
            if run.len() >= min_len {
                out.push(std::mem::take(&mut run));
            }
            run.clear();
        }
    }
    if run.len() >= min_len {
        out.push(run);
    }
    out
}

/// All divisors of `n` in ascending order, by trial division up to sqrt(n).
pub fn divisors(n: u64) -> Vec<u64> {
    if n == 0 {
        return Vec::new();
    }
    let mut out = Vec::new();
    let mut i = 1;
    while i * i <= n {
        if n % i == 0 {
            out.push(i);
            if i != n / i {
                out.push(n / i);
            }
        }
        i += 1;
    }
    out.sort_unstable();
    out
}

/// Greedy word wrap of whitespace-separated words to the given width.
pub fn wrap_words(text: &str, width: usize) -> Vec<String> {
    let mut out = Vec::new();
    let mut line = String::new();
    for word in text.split_whitespace() {
        if line.is_empty() {
            line.push_str(word);
        } else if line.len() + 1 + word.len() <= width {
            line.push(' ');
            line.push_str(word);
        } else {
            out.push(std::mem::take(&mut line));
            line.push_str(word);
        }
    }
    if !line.is_empty() {
        out.push(line);
    }
    out
}

/// Pad whitespace-separated columns so each column is as wide as its widest
/// cell, single-space separated.
pub fn columnate(text: &str) -> Vec<String> {
    let rows: Vec<Vec<&str>> = text
        .lines()
        .map(|l| l.split_whitespace().collect())
        .collect();
    let cols = rows.iter().map(Vec::len).max().unwrap_or(0);
    let mut widths = vec![0usize; cols];
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.len());
        }
    }
    rows.iter()
        .map(|row| {
            row.iter()
                .enumerate()
                .map(|(i, cell)| format!("{cell:<width$}", width = widths[i]))
                .collect::<Vec<_>>()
                .join(" ")
                .trim_end()
                .to_string()
        })
        .collect()
}

/// Zip files line-wise, tab-joined, blank-padding exhausted inputs.
pub fn paste_lines(texts: &[&str]) -> Vec<String> {
    let all: Vec<Vec<&str>> = texts.iter().map(|t| t.lines().collect()).collect();
    let rows = all.iter().map(Vec::len).max().unwrap_or(0);
    (0..rows)
        .map(|i| {
            all.iter()
                .map(|lines| lines.get(i).copied().unwrap_or(""))
                .collect::<Vec<_>>()
                .join("\t")
        })
        .collect()
}
