//! Line and character processing commands: head, tail, wc, grep, sort,
//! uniq, cut, paste, tr, sed, nl, fold, expand, unexpand, fmt, pr, ul, col,
//! colrm, column, rev, tac, shuf, strings.

use rand::seq::SliceRandom;
use sandsh_types::error::{Result, ShellError};

use crate::commands::{arg, read_bytes, read_text};
use crate::registry::{Command, CommandOutput, CommandRegistry, Environment};
use crate::textutil;

/// Register text processing commands.
pub fn register_text_commands(reg: &mut CommandRegistry) {
    reg.register(Box::new(HeadCmd));
    reg.register(Box::new(TailCmd));
    reg.register(Box::new(WcCmd));
    reg.register(Box::new(GrepCmd));
    reg.register(Box::new(SortCmd));
    reg.register(Box::new(UniqCmd));
    reg.register(Box::new(CutCmd));
    reg.register(Box::new(PasteCmd));
    reg.register(Box::new(TrCmd));
    reg.register(Box::new(SedCmd));
    reg.register(Box::new(NlCmd));
    reg.register(Box::new(FoldCmd));
    reg.register(Box::new(ExpandCmd));
    reg.register(Box::new(UnexpandCmd));
    reg.register(Box::new(FmtCmd));
    reg.register(Box::new(PrCmd));
    reg.register(Box::new(UlCmd));
    reg.register(Box::new(ColCmd));
    reg.register(Box::new(ColrmCmd));
    reg.register(Box::new(ColumnCmd));
    reg.register(Box::new(RevCmd));
    reg.register(Box::new(TacCmd));
    reg.register(Box::new(ShufCmd));
    reg.register(Box::new(StringsCmd));
}

/// Lines shown by head and tail.
const HEAD_TAIL_COUNT: usize = 10;

// ---------------------------------------------------------------------------
// head / tail
// ---------------------------------------------------------------------------

struct HeadCmd;
impl Command for HeadCmd {
    fn name(&self) -> &str {
        "head"
    }
    fn description(&self) -> &str {
        "Show the first ten lines of a file"
    }
    fn usage(&self) -> &str {
        "head <file>"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        let text = read_text(env, arg(args, 0, self.usage())?)?;
        let lines: Vec<&str> = text.lines().take(HEAD_TAIL_COUNT).collect();
        Ok(CommandOutput::Text(lines.join("\n")))
    }
}

struct TailCmd;
impl Command for TailCmd {
    fn name(&self) -> &str {
        "tail"
    }
    fn description(&self) -> &str {
        "Show the last ten lines of a file"
    }
    fn usage(&self) -> &str {
        "tail <file>"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        let text = read_text(env, arg(args, 0, self.usage())?)?;
        let lines: Vec<&str> = text.lines().collect();
        let start = lines.len().saturating_sub(HEAD_TAIL_COUNT);
        Ok(CommandOutput::Text(lines[start..].join("\n")))
    }
}

// ---------------------------------------------------------------------------
// wc
// ---------------------------------------------------------------------------

struct WcCmd;
impl Command for WcCmd {
    fn name(&self) -> &str {
        "wc"
    }
    fn description(&self) -> &str {
        "Count lines, words, and characters"
    }
    fn usage(&self) -> &str {
        "wc <file>"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        let name = arg(args, 0, self.usage())?;
        let text = read_text(env, name)?;
        let lines = if text.is_empty() {
            0
        } else {
            text.matches('\n').count() + 1
        };
        let words = text.split_whitespace().count();
        let chars = text.chars().count();
        Ok(CommandOutput::Text(format!("{lines} {words} {chars} {name}")))
    }
}

// ---------------------------------------------------------------------------
// grep
// ---------------------------------------------------------------------------

struct GrepCmd;
impl Command for GrepCmd {
    fn name(&self) -> &str {
        "grep"
    }
    fn description(&self) -> &str {
        "Search files for a substring"
    }
    fn usage(&self) -> &str {
        "grep <pattern> <file...>"
    }
    fn man(&self) -> &str {
        "Prints file:line:text for every line containing the pattern as a \
         plain substring."
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        if args.len() < 2 {
            return Err(ShellError::Usage(self.usage().to_string()));
        }
        let pattern = args[0];
        let mut matches = Vec::new();
        for name in &args[1..] {
            let text = read_text(env, name)?;
            for (i, line) in text.lines().enumerate() {
                if line.contains(pattern) {
                    matches.push(format!("{name}:{}:{line}", i + 1));
                }
            }
        }
        Ok(CommandOutput::Text(matches.join("\n")))
    }
}

// ---------------------------------------------------------------------------
// sort / uniq
// ---------------------------------------------------------------------------

struct SortCmd;
impl Command for SortCmd {
    fn name(&self) -> &str {
        "sort"
    }
    fn description(&self) -> &str {
        "Sort the lines of a file"
    }
    fn usage(&self) -> &str {
        "sort <file>"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        let text = read_text(env, arg(args, 0, self.usage())?)?;
        Ok(CommandOutput::Text(textutil::sort_lines(&text).join("\n")))
    }
}

struct UniqCmd;
impl Command for UniqCmd {
    fn name(&self) -> &str {
        "uniq"
    }
    fn description(&self) -> &str {
        "Drop repeated lines, keeping first occurrences"
    }
    fn usage(&self) -> &str {
        "uniq <file>"
    }
    fn man(&self) -> &str {
        "Prints each distinct line once, in order of first appearance. \
         Repeats are dropped wherever they occur in the file, not only when \
         adjacent."
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        let text = read_text(env, arg(args, 0, self.usage())?)?;
        Ok(CommandOutput::Text(textutil::uniq_lines(&text).join("\n")))
    }
}

// ---------------------------------------------------------------------------
// cut
// ---------------------------------------------------------------------------

struct CutCmd;
impl Command for CutCmd {
    fn name(&self) -> &str {
        "cut"
    }
    fn description(&self) -> &str {
        "Print one whitespace field of each line"
    }
    fn usage(&self) -> &str {
        "cut -f <field> <file>"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        if args.len() != 3 || args[0] != "-f" {
            return Err(ShellError::Usage(self.usage().to_string()));
        }
        let field: usize = args[1]
            .parse()
            .map_err(|_| ShellError::Expression(format!("invalid field '{}'", args[1])))?;
        if field == 0 {
            return Err(ShellError::Expression("fields are numbered from 1".into()));
        }
        let text = read_text(env, args[2])?;
        let mut out = Vec::new();
        for line in text.lines() {
            if let Some(value) = line.split_whitespace().nth(field - 1) {
                out.push(value.to_string());
            }
        }
        Ok(CommandOutput::Text(out.join("\n")))
    }
}

// ---------------------------------------------------------------------------
// paste
// ---------------------------------------------------------------------------

struct PasteCmd;
impl Command for PasteCmd {
    fn name(&self) -> &str {
        "paste"
    }
    fn description(&self) -> &str {
        "Merge files line by line"
    }
    fn usage(&self) -> &str {
        "paste <file...>"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        if args.is_empty() {
            return Err(ShellError::Usage(self.usage().to_string()));
        }
        let mut texts = Vec::new();
        for name in args {
            texts.push(read_text(env, name)?);
        }
        let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
        Ok(CommandOutput::Text(textutil::paste_lines(&refs).join("\n")))
    }
}

// ---------------------------------------------------------------------------
// tr
// ---------------------------------------------------------------------------

struct TrCmd;
impl Command for TrCmd {
    fn name(&self) -> &str {
        "tr"
    }
    fn description(&self) -> &str {
        "Translate characters in a file"
    }
    fn usage(&self) -> &str {
        "tr <set1> <set2> <file>"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        if args.len() != 3 {
            return Err(ShellError::Usage(self.usage().to_string()));
        }
        let set1: Vec<char> = args[0].chars().collect();
        let set2: Vec<char> = args[1].chars().collect();
        if set1.len() != set2.len() {
            return Err(ShellError::Expression(
                "translation sets must have the same length".into(),
            ));
        }
        let text = read_text(env, args[2])?;
        let translated: String = text
            .chars()
            .map(|c| match set1.iter().position(|&s| s == c) {
                Some(i) => set2[i],
                None => c,
            })
            .collect();
        Ok(CommandOutput::Text(
            translated.trim_end_matches('\n').to_string(),
        ))
    }
}

// ---------------------------------------------------------------------------
// sed
// ---------------------------------------------------------------------------

struct SedCmd;
impl Command for SedCmd {
    fn name(&self) -> &str {
        "sed"
    }
    fn description(&self) -> &str {
        "Replace a substring throughout a file"
    }
    fn usage(&self) -> &str {
        "sed <pattern> <replacement> <file>"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        if args.len() != 3 {
            return Err(ShellError::Usage(self.usage().to_string()));
        }
        let text = read_text(env, args[2])?;
        let replaced = text.replace(args[0], args[1]);
        Ok(CommandOutput::Text(
            replaced.trim_end_matches('\n').to_string(),
        ))
    }
}

// ---------------------------------------------------------------------------
// nl
// ---------------------------------------------------------------------------

struct NlCmd;
impl Command for NlCmd {
    fn name(&self) -> &str {
        "nl"
    }
    fn description(&self) -> &str {
        "Number the lines of a file"
    }
    fn usage(&self) -> &str {
        "nl <file>"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        let text = read_text(env, arg(args, 0, self.usage())?)?;
        let out: Vec<String> = text
            .lines()
            .enumerate()
            .map(|(i, line)| format!("{}\t{line}", i + 1))
            .collect();
        Ok(CommandOutput::Text(out.join("\n")))
    }
}

// ---------------------------------------------------------------------------
// fold
// ---------------------------------------------------------------------------

struct FoldCmd;
impl Command for FoldCmd {
    fn name(&self) -> &str {
        "fold"
    }
    fn description(&self) -> &str {
        "Hard-wrap lines to a width"
    }
    fn usage(&self) -> &str {
        "fold <file> <width>"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        if args.len() != 2 {
            return Err(ShellError::Usage(self.usage().to_string()));
        }
        let width: usize = args[1]
            .parse()
            .map_err(|_| ShellError::Expression(format!("invalid width '{}'", args[1])))?;
        if width == 0 {
            return Err(ShellError::Expression("width must be positive".into()));
        }
        let text = read_text(env, args[0])?;
        let mut out = Vec::new();
        for line in text.lines() {
            let chars: Vec<char> = line.chars().collect();
            if chars.is_empty() {
                out.push(String::new());
                continue;
            }
            for chunk in chars.chunks(width) {
                out.push(chunk.iter().collect());
            }
        }
        Ok(CommandOutput::Text(out.join("\n")))
    }
}

// ---------------------------------------------------------------------------
// expand / unexpand / col
// ---------------------------------------------------------------------------

/// Tab stop width used by `expand`.
const TAB_STOP: usize = 8;

struct ExpandCmd;
impl Command for ExpandCmd {
    fn name(&self) -> &str {
        "expand"
    }
    fn description(&self) -> &str {
        "Convert tabs to spaces"
    }
    fn usage(&self) -> &str {
        "expand <file>"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        let text = read_text(env, arg(args, 0, self.usage())?)?;
        let out: Vec<String> = text.lines().map(expand_tabs).collect();
        Ok(CommandOutput::Text(out.join("\n")))
    }
}

fn expand_tabs(line: &str) -> String {
    let mut out = String::new();
    let mut col = 0;
    for c in line.chars() {
        if c == '\t' {
            let pad = TAB_STOP - (col % TAB_STOP);
            out.extend(std::iter::repeat_n(' ', pad));
            col += pad;
        } else {
            out.push(c);
            col += 1;
        }
    }
    out
}

struct UnexpandCmd;
impl Command for UnexpandCmd {
    fn name(&self) -> &str {
        "unexpand"
    }
    fn description(&self) -> &str {
        "Convert groups of four spaces to tabs"
    }
    fn usage(&self) -> &str {
        "unexpand <file>"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        let text = read_text(env, arg(args, 0, self.usage())?)?;
        let out: Vec<String> = text
            .lines()
            .map(|l| l.replace("    ", "\t"))
            .collect();
        Ok(CommandOutput::Text(out.join("\n")))
    }
}

struct ColCmd;
impl Command for ColCmd {
    fn name(&self) -> &str {
        "col"
    }
    fn description(&self) -> &str {
        "Replace tabs with spaces"
    }
    fn usage(&self) -> &str {
        "col <file>"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        let text = read_text(env, arg(args, 0, self.usage())?)?;
        let out: Vec<String> = text.lines().map(|l| l.replace('\t', "    ")).collect();
        Ok(CommandOutput::Text(out.join("\n")))
    }
}

// ---------------------------------------------------------------------------
// fmt / pr / ul
// ---------------------------------------------------------------------------

/// Re-wrap width used by `fmt`.
const FMT_WIDTH: usize = 70;

struct FmtCmd;
impl Command for FmtCmd {
    fn name(&self) -> &str {
        "fmt"
    }
    fn description(&self) -> &str {
        "Re-wrap text to seventy columns"
    }
    fn usage(&self) -> &str {
        "fmt <file>"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        let text = read_text(env, arg(args, 0, self.usage())?)?;
        Ok(CommandOutput::Text(
            textutil::wrap_words(&text, FMT_WIDTH).join("\n"),
        ))
    }
}

struct PrCmd;
impl Command for PrCmd {
    fn name(&self) -> &str {
        "pr"
    }
    fn description(&self) -> &str {
        "Print a file with a header"
    }
    fn usage(&self) -> &str {
        "pr <file>"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        let name = arg(args, 0, self.usage())?;
        let text = read_text(env, name)?;
        let rule = "-".repeat(72);
        Ok(CommandOutput::Text(format!(
            "file: {name}\n{rule}\n{}\n{rule}",
            text.trim_end_matches('\n')
        )))
    }
}

struct UlCmd;
impl Command for UlCmd {
    fn name(&self) -> &str {
        "ul"
    }
    fn description(&self) -> &str {
        "Render underscores as underlined text"
    }
    fn usage(&self) -> &str {
        "ul <file>"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        let text = read_text(env, arg(args, 0, self.usage())?)?;
        let out: Vec<String> = text
            .lines()
            .map(|l| l.replace('_', "\x1b[4m_\x1b[0m"))
            .collect();
        Ok(CommandOutput::Text(out.join("\n")))
    }
}

// ---------------------------------------------------------------------------
// colrm / column
// ---------------------------------------------------------------------------

struct ColrmCmd;
impl Command for ColrmCmd {
    fn name(&self) -> &str {
        "colrm"
    }
    fn description(&self) -> &str {
        "Remove a range of columns from each line"
    }
    fn usage(&self) -> &str {
        "colrm <file> <start> <end>"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        if args.len() != 3 {
            return Err(ShellError::Usage(self.usage().to_string()));
        }
        let start: usize = args[1]
            .parse()
            .map_err(|_| ShellError::Expression(format!("invalid column '{}'", args[1])))?;
        let end: usize = args[2]
            .parse()
            .map_err(|_| ShellError::Expression(format!("invalid column '{}'", args[2])))?;
        if start == 0 || end < start {
            return Err(ShellError::Expression(
                "columns are numbered from 1 and end must not precede start".into(),
            ));
        }
        let text = read_text(env, args[0])?;
        let out: Vec<String> = text
            .lines()
            .map(|line| {
                let chars: Vec<char> = line.chars().collect();
                let mut kept: String = chars[..(start - 1).min(chars.len())].iter().collect();
                if end < chars.len() {
                    kept.extend(&chars[end..]);
                }
                kept
            })
            .collect();
        Ok(CommandOutput::Text(out.join("\n")))
    }
}

struct ColumnCmd;
impl Command for ColumnCmd {
    fn name(&self) -> &str {
        "column"
    }
    fn description(&self) -> &str {
        "Align whitespace-separated columns"
    }
    fn usage(&self) -> &str {
        "column <file>"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        let text = read_text(env, arg(args, 0, self.usage())?)?;
        Ok(CommandOutput::Text(textutil::columnate(&text).join("\n")))
    }
}

// ---------------------------------------------------------------------------
// rev / tac / shuf
// ---------------------------------------------------------------------------

struct RevCmd;
impl Command for RevCmd {
    fn name(&self) -> &str {
        "rev"
    }
    fn description(&self) -> &str {
        "Reverse the characters of each line"
    }
    fn usage(&self) -> &str {
        "rev <file>"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        let text = read_text(env, arg(args, 0, self.usage())?)?;
        let out: Vec<String> = text.lines().map(|l| l.chars().rev().collect()).collect();
        Ok(CommandOutput::Text(out.join("\n")))
    }
}

struct TacCmd;
impl Command for TacCmd {
    fn name(&self) -> &str {
        "tac"
    }
    fn description(&self) -> &str {
        "Print a file's lines in reverse order"
    }
    fn usage(&self) -> &str {
        "tac <file>"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        let text = read_text(env, arg(args, 0, self.usage())?)?;
        let mut lines: Vec<&str> = text.lines().collect();
        lines.reverse();
        Ok(CommandOutput::Text(lines.join("\n")))
    }
}

struct ShufCmd;
impl Command for ShufCmd {
    fn name(&self) -> &str {
        "shuf"
    }
    fn description(&self) -> &str {
        "Print a file's lines in random order"
    }
    fn usage(&self) -> &str {
        "shuf <file>"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        let text = read_text(env, arg(args, 0, self.usage())?)?;
        let mut lines: Vec<&str> = text.lines().collect();
        lines.shuffle(&mut rand::thread_rng());
        Ok(CommandOutput::Text(lines.join("\n")))
    }
}

// ---------------------------------------------------------------------------
// strings
// ---------------------------------------------------------------------------

/// Minimum printable run emitted by `strings`.
const STRINGS_MIN_LEN: usize = 4;

struct StringsCmd;
impl Command for StringsCmd {
    fn name(&self) -> &str {
        "strings"
    }
    fn description(&self) -> &str {
        "Extract printable strings from a file"
    }
    fn usage(&self) -> &str {
        "strings <file>"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        let data = read_bytes(env, arg(args, 0, self.usage())?)?;
        Ok(CommandOutput::Text(
            textutil::extract_strings(&data, STRINGS_MIN_LEN).join("\n"),
        ))
    }
}
