//! File inspection and path utility commands: find, du, df, stat, file,
//! mime, mktemp, realpath, dirname, basename, pathchk, ln, link, unlink,
//! readlink, truncate, split, csplit.

use rand::Rng;
use rand::distributions::Alphanumeric;
use sandsh_types::error::{Result, ShellError};
use sandsh_vfs::{EntryKind, Vfs, file_name, join, parent, resolve};

use crate::commands::{arg, read_bytes, read_text};
use crate::registry::{Command, CommandOutput, CommandRegistry, Environment};

/// Register file inspection and path utility commands.
pub fn register_file_commands(reg: &mut CommandRegistry) {
    reg.register(Box::new(FindCmd));
    reg.register(Box::new(DuCmd));
    reg.register(Box::new(DfCmd));
    reg.register(Box::new(StatCmd));
    reg.register(Box::new(FileCmd));
    reg.register(Box::new(MimeCmd));
    reg.register(Box::new(MktempCmd));
    reg.register(Box::new(RealpathCmd));
    reg.register(Box::new(DirnameCmd));
    reg.register(Box::new(BasenameCmd));
    reg.register(Box::new(PathchkCmd));
    reg.register(Box::new(LnCmd));
    reg.register(Box::new(LinkCmd));
    reg.register(Box::new(UnlinkCmd));
    reg.register(Box::new(ReadlinkCmd));
    reg.register(Box::new(TruncateCmd));
    reg.register(Box::new(SplitCmd));
    reg.register(Box::new(CsplitCmd));
}

// ---------------------------------------------------------------------------
// find
// ---------------------------------------------------------------------------

struct FindCmd;
impl Command for FindCmd {
    fn name(&self) -> &str {
        "find"
    }
    fn description(&self) -> &str {
        "Find files by name pattern"
    }
    fn usage(&self) -> &str {
        "find [path] <pattern>"
    }
    fn man(&self) -> &str {
        "Walks the directory tree and prints every path whose final \
         component matches the pattern. '*' matches any run of characters \
         and '?' matches a single character."
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        let (start, pattern) = match args {
            [pattern] => (env.cwd.clone(), *pattern),
            [path, pattern] => (resolve(&env.cwd, path), *pattern),
            _ => return Err(ShellError::Usage(self.usage().to_string())),
        };
        let mut matches = Vec::new();
        walk(env.vfs, &start, pattern, &mut matches)?;
        Ok(CommandOutput::Text(matches.join("\n")))
    }
}

fn walk(vfs: &dyn Vfs, dir: &str, pattern: &str, out: &mut Vec<String>) -> Result<()> {
    for entry in vfs.readdir(dir)? {
        let path = join(dir, &entry.name);
        if glob_match(pattern, &entry.name) {
            out.push(path.clone());
        }
        if entry.kind == EntryKind::Directory {
            walk(vfs, &path, pattern, out)?;
        }
    }
    Ok(())
}

/// Simple glob matching: `*` matches any run, `?` matches one character.
fn glob_match(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();
    glob_match_inner(&p, &t, 0, 0)
}

fn glob_match_inner(p: &[char], t: &[char], pi: usize, ti: usize) -> bool {
    if pi == p.len() {
        return ti == t.len();
    }
    if p[pi] == '*' {
        for skip in 0..=(t.len() - ti) {
            if glob_match_inner(p, t, pi + 1, ti + skip) {
                return true;
            }
        }
        false
    } else if ti < t.len() && (p[pi] == '?' || p[pi] == t[ti]) {
        glob_match_inner(p, t, pi + 1, ti + 1)
    } else {
        false
    }
}

// ---------------------------------------------------------------------------
// du
// ---------------------------------------------------------------------------

struct DuCmd;
impl Command for DuCmd {
    fn name(&self) -> &str {
        "du"
    }
    fn description(&self) -> &str {
        "Show disk usage of a path"
    }
    fn usage(&self) -> &str {
        "du <path>"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        let name = arg(args, 0, self.usage())?;
        let path = resolve(&env.cwd, name);
        let bytes = env.vfs.disk_usage(&path)?;
        Ok(CommandOutput::Text(format!("{bytes}\t{name}")))
    }
}

// ---------------------------------------------------------------------------
// df
// ---------------------------------------------------------------------------

struct DfCmd;
impl Command for DfCmd {
    fn name(&self) -> &str {
        "df"
    }
    fn description(&self) -> &str {
        "Show sandbox space usage"
    }
    fn usage(&self) -> &str {
        "df"
    }
    fn execute(&self, _args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        let used = env.vfs.disk_usage("/")?;
        Ok(CommandOutput::Text(format!(
            "Filesystem      Used  Mounted on\nsandsh  {used:>12}  /"
        )))
    }
}

// ---------------------------------------------------------------------------
// stat
// ---------------------------------------------------------------------------

struct StatCmd;
impl Command for StatCmd {
    fn name(&self) -> &str {
        "stat"
    }
    fn description(&self) -> &str {
        "Show file status"
    }
    fn usage(&self) -> &str {
        "stat <file>"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        let name = arg(args, 0, self.usage())?;
        let path = resolve(&env.cwd, name);
        let meta = env.vfs.stat(&path)?;
        let mut out = vec![
            format!("file: {name}"),
            format!("size: {} bytes", meta.size),
            format!("kind: {}", kind_name(meta.kind)),
            format!("mode: {:o}", meta.mode),
        ];
        for (label, stamp) in [
            ("modified", meta.modified),
            ("accessed", meta.accessed),
            ("created", meta.created),
        ] {
            if let Some(t) = stamp {
                let local: chrono::DateTime<chrono::Local> = t.into();
                out.push(format!("{label}: {}", local.format("%Y-%m-%d %H:%M:%S")));
            }
        }
        out.push(format!("owner: {}", meta.uid));
        out.push(format!("group: {}", meta.gid));
        Ok(CommandOutput::Text(out.join("\n")))
    }
}

fn kind_name(kind: EntryKind) -> &'static str {
    match kind {
        EntryKind::File => "regular file",
        EntryKind::Directory => "directory",
        EntryKind::Symlink => "symbolic link",
    }
}

// ---------------------------------------------------------------------------
// file
// ---------------------------------------------------------------------------

struct FileCmd;
impl Command for FileCmd {
    fn name(&self) -> &str {
        "file"
    }
    fn description(&self) -> &str {
        "Determine file type from magic bytes"
    }
    fn usage(&self) -> &str {
        "file <file>"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        let name = arg(args, 0, self.usage())?;
        let data = read_bytes(env, name)?;
        let kind = if data.starts_with(b"\x7fELF") {
            "ELF executable"
        } else if data.starts_with(b"MZ") {
            "Windows executable"
        } else if data.starts_with(b"\x89PNG") {
            "PNG image"
        } else if data.starts_with(b"\xff\xd8\xff") {
            "JPEG image"
        } else if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
            "GIF image"
        } else if data.starts_with(b"#!") {
            "script"
        } else if data.is_empty() {
            "empty"
        } else if std::str::from_utf8(&data).is_ok() {
            "text"
        } else {
            "data"
        };
        Ok(CommandOutput::Text(format!("{name}: {kind}")))
    }
}

// ---------------------------------------------------------------------------
// mime
// ---------------------------------------------------------------------------

struct MimeCmd;
impl Command for MimeCmd {
    fn name(&self) -> &str {
        "mime"
    }
    fn description(&self) -> &str {
        "Guess a file's MIME type from its extension"
    }
    fn usage(&self) -> &str {
        "mime <file>"
    }
    fn execute(&self, args: &[&str], _env: &mut Environment<'_>) -> Result<CommandOutput> {
        let name = arg(args, 0, self.usage())?;
        let ext = name.rsplit_once('.').map(|(_, e)| e).unwrap_or("");
        let mime = match ext.to_ascii_lowercase().as_str() {
            "txt" | "log" => "text/plain",
            "md" => "text/markdown",
            "html" | "htm" => "text/html",
            "css" => "text/css",
            "csv" => "text/csv",
            "json" => "application/json",
            "xml" => "application/xml",
            "pdf" => "application/pdf",
            "zip" => "application/zip",
            "gz" => "application/gzip",
            "tar" => "application/x-tar",
            "png" => "image/png",
            "jpg" | "jpeg" => "image/jpeg",
            "gif" => "image/gif",
            "svg" => "image/svg+xml",
            "mp3" => "audio/mpeg",
            "wav" => "audio/wav",
            "mp4" => "video/mp4",
            _ => return Ok(CommandOutput::Text(format!("{name}: unknown MIME type"))),
        };
        Ok(CommandOutput::Text(format!("{name}: {mime}")))
    }
}

// ---------------------------------------------------------------------------
// mktemp
// ---------------------------------------------------------------------------

struct MktempCmd;
impl Command for MktempCmd {
    fn name(&self) -> &str {
        "mktemp"
    }
    fn description(&self) -> &str {
        "Create a uniquely named empty file"
    }
    fn usage(&self) -> &str {
        "mktemp <template>"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        let template = arg(args, 0, self.usage())?;
        // A handful of retries covers collisions in practice.
        for _ in 0..16 {
            let suffix: String = rand::thread_rng()
                .sample_iter(&Alphanumeric)
                .take(6)
                .map(char::from)
                .collect();
            let path = resolve(&env.cwd, &format!("{template}{suffix}"));
            if !env.vfs.exists(&path) {
                env.vfs.write(&path, b"")?;
                return Ok(CommandOutput::Text(format!("created temporary file {path}")));
            }
        }
        Err(ShellError::Vfs(format!(
            "could not create a unique file for template '{template}'"
        )))
    }
}

// ---------------------------------------------------------------------------
// realpath / dirname / basename / pathchk
// ---------------------------------------------------------------------------

struct RealpathCmd;
impl Command for RealpathCmd {
    fn name(&self) -> &str {
        "realpath"
    }
    fn description(&self) -> &str {
        "Print the resolved absolute path"
    }
    fn usage(&self) -> &str {
        "realpath <path>"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        let name = arg(args, 0, self.usage())?;
        Ok(CommandOutput::Text(resolve(&env.cwd, name)))
    }
}

struct DirnameCmd;
impl Command for DirnameCmd {
    fn name(&self) -> &str {
        "dirname"
    }
    fn description(&self) -> &str {
        "Print the directory part of a path"
    }
    fn usage(&self) -> &str {
        "dirname <path>"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        let name = arg(args, 0, self.usage())?;
        let full = resolve(&env.cwd, name);
        Ok(CommandOutput::Text(parent(&full).to_string()))
    }
}

struct BasenameCmd;
impl Command for BasenameCmd {
    fn name(&self) -> &str {
        "basename"
    }
    fn description(&self) -> &str {
        "Print the final component of a path"
    }
    fn usage(&self) -> &str {
        "basename <path>"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        let name = arg(args, 0, self.usage())?;
        let full = resolve(&env.cwd, name);
        Ok(CommandOutput::Text(file_name(&full).to_string()))
    }
}

struct PathchkCmd;
impl Command for PathchkCmd {
    fn name(&self) -> &str {
        "pathchk"
    }
    fn description(&self) -> &str {
        "Check whether a file name is usable"
    }
    fn usage(&self) -> &str {
        "pathchk <path>"
    }
    fn execute(&self, args: &[&str], _env: &mut Environment<'_>) -> Result<CommandOutput> {
        let name = arg(args, 0, self.usage())?;
        for component in name.split('/').filter(|c| !c.is_empty()) {
            if component.len() > 255 {
                return Ok(CommandOutput::Text(format!(
                    "path '{name}' is invalid: component longer than 255 bytes"
                )));
            }
            if component.contains('\0') {
                return Ok(CommandOutput::Text(format!(
                    "path '{name}' is invalid: embedded NUL"
                )));
            }
        }
        Ok(CommandOutput::Text(format!("path '{name}' is valid")))
    }
}

// ---------------------------------------------------------------------------
// ln / link / unlink / readlink
// ---------------------------------------------------------------------------

struct LnCmd;
impl Command for LnCmd {
    fn name(&self) -> &str {
        "ln"
    }
    fn description(&self) -> &str {
        "Create a symbolic link"
    }
    fn usage(&self) -> &str {
        "ln <target> <link>"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        if args.len() != 2 {
            return Err(ShellError::Usage(self.usage().to_string()));
        }
        let target = resolve(&env.cwd, args[0]);
        let link = resolve(&env.cwd, args[1]);
        env.vfs.symlink(&target, &link)?;
        Ok(CommandOutput::Text(format!(
            "symbolic link '{}' created pointing at '{}'",
            args[1], args[0]
        )))
    }
}

struct LinkCmd;
impl Command for LinkCmd {
    fn name(&self) -> &str {
        "link"
    }
    fn description(&self) -> &str {
        "Create a hard link"
    }
    fn usage(&self) -> &str {
        "link <source> <dest>"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        if args.len() != 2 {
            return Err(ShellError::Usage(self.usage().to_string()));
        }
        let src = resolve(&env.cwd, args[0]);
        let dst = resolve(&env.cwd, args[1]);
        env.vfs.hardlink(&src, &dst)?;
        Ok(CommandOutput::Text(format!(
            "hard link '{}' created for '{}'",
            args[1], args[0]
        )))
    }
}

struct UnlinkCmd;
impl Command for UnlinkCmd {
    fn name(&self) -> &str {
        "unlink"
    }
    fn description(&self) -> &str {
        "Remove a file"
    }
    fn usage(&self) -> &str {
        "unlink <file>"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        let name = arg(args, 0, self.usage())?;
        let path = resolve(&env.cwd, name);
        env.vfs.remove_file(&path)?;
        Ok(CommandOutput::Text(format!("file '{name}' removed")))
    }
}

struct ReadlinkCmd;
impl Command for ReadlinkCmd {
    fn name(&self) -> &str {
        "readlink"
    }
    fn description(&self) -> &str {
        "Print the target of a symbolic link"
    }
    fn usage(&self) -> &str {
        "readlink <link>"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        let name = arg(args, 0, self.usage())?;
        let path = resolve(&env.cwd, name);
        let target = env.vfs.readlink(&path)?;
        Ok(CommandOutput::Text(target))
    }
}

// ---------------------------------------------------------------------------
// truncate
// ---------------------------------------------------------------------------

struct TruncateCmd;
impl Command for TruncateCmd {
    fn name(&self) -> &str {
        "truncate"
    }
    fn description(&self) -> &str {
        "Truncate or extend a file"
    }
    fn usage(&self) -> &str {
        "truncate <file> <size>"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        if args.len() != 2 {
            return Err(ShellError::Usage(self.usage().to_string()));
        }
        let size: u64 = args[1]
            .parse()
            .map_err(|_| ShellError::Expression(format!("invalid size '{}'", args[1])))?;
        let path = resolve(&env.cwd, args[0]);
        env.vfs.truncate(&path, size)?;
        Ok(CommandOutput::Text(format!(
            "file '{}' truncated to {size} bytes",
            args[0]
        )))
    }
}

// ---------------------------------------------------------------------------
// split / csplit
// ---------------------------------------------------------------------------

/// Chunk size for `split`.
const SPLIT_CHUNK: usize = 1024;

struct SplitCmd;
impl Command for SplitCmd {
    fn name(&self) -> &str {
        "split"
    }
    fn description(&self) -> &str {
        "Split a file into fixed-size pieces"
    }
    fn usage(&self) -> &str {
        "split <file> <prefix>"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        if args.len() != 2 {
            return Err(ShellError::Usage(self.usage().to_string()));
        }
        let content = read_text(env, args[0])?;
        let bytes = content.as_bytes();
        let mut count = 0;
        for (i, chunk) in bytes.chunks(SPLIT_CHUNK).enumerate() {
            let path = resolve(&env.cwd, &format!("{}{i:03}", args[1]));
            env.vfs.write(&path, chunk)?;
            count = i + 1;
        }
        Ok(CommandOutput::Text(format!(
            "file '{}' split into {count} piece(s) named '{}NNN'",
            args[0], args[1]
        )))
    }
}

struct CsplitCmd;
impl Command for CsplitCmd {
    fn name(&self) -> &str {
        "csplit"
    }
    fn description(&self) -> &str {
        "Split a file on a pattern"
    }
    fn usage(&self) -> &str {
        "csplit <file> <pattern> <prefix>"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        if args.len() != 3 {
            return Err(ShellError::Usage(self.usage().to_string()));
        }
        let content = read_text(env, args[0])?;
        let parts: Vec<&str> = content.split(args[1]).collect();
        for (i, part) in parts.iter().enumerate() {
            let path = resolve(&env.cwd, &format!("{}{i:03}", args[2]));
            env.vfs.write(&path, part.as_bytes())?;
        }
        Ok(CommandOutput::Text(format!(
            "file '{}' split on '{}' into {} piece(s) named '{}NNN'",
            args[0],
            args[1],
            parts.len(),
            args[2]
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Shell;
    use crate::commands::register_builtins;
    use sandsh_vfs::MemoryVfs;

    fn shell() -> Shell {
        let mut reg = CommandRegistry::new();
        register_builtins(&mut reg);
        Shell::new(reg, Box::new(MemoryVfs::new()))
    }

    fn run(sh: &mut Shell, line: &str) -> String {
        match sh.execute(line).unwrap() {
            CommandOutput::Text(s) => s,
            _ => String::new(),
        }
    }

    #[test]
    fn glob_match_patterns() {
        assert!(glob_match("*.txt", "notes.txt"));
        assert!(glob_match("a?c", "abc"));
        assert!(!glob_match("a?c", "abbc"));
        assert!(glob_match("*", "anything"));
        assert!(!glob_match("*.txt", "notes.md"));
    }

    #[test]
    fn find_walks_subdirectories() {
        let mut sh = shell();
        run(&mut sh, "mkdir a/b");
        run(&mut sh, "touch a/x.txt");
        run(&mut sh, "touch a/b/y.txt");
        run(&mut sh, "touch a/b/z.log");
        let out = run(&mut sh, "find *.txt");
        assert_eq!(out, "/a/b/y.txt\n/a/x.txt");
        let out = run(&mut sh, "find a/b *.log");
        assert_eq!(out, "/a/b/z.log");
    }

    #[test]
    fn du_counts_bytes() {
        let mut sh = shell();
        run(&mut sh, "mkdir d");
        run(&mut sh, "cd d");
        run(&mut sh, "echo four");
        let out = run(&mut sh, "du /d");
        assert!(out.starts_with("4\t"));
    }

    #[test]
    fn stat_reports_size_and_mode() {
        let mut sh = shell();
        run(&mut sh, "echo hello");
        let out = run(&mut sh, "stat output.txt");
        assert!(out.contains("size: 5 bytes"));
        assert!(out.contains("kind: regular file"));
        assert!(out.contains("mode: 644"));
    }

    #[test]
    fn file_detects_magic_and_text() {
        let mut sh = shell();
        run(&mut sh, "echo plain words");
        assert_eq!(run(&mut sh, "file output.txt"), "output.txt: text");
        sh.execute("touch empty").unwrap();
        assert_eq!(run(&mut sh, "file empty"), "empty: empty");
    }

    #[test]
    fn mime_uses_extension() {
        let mut sh = shell();
        assert_eq!(run(&mut sh, "mime a.json"), "a.json: application/json");
        assert_eq!(run(&mut sh, "mime a.PNG"), "a.PNG: image/png");
        assert!(run(&mut sh, "mime a.xyz").contains("unknown"));
    }

    #[test]
    fn mktemp_creates_unique_files() {
        let mut sh = shell();
        let a = run(&mut sh, "mktemp tmp.");
        let b = run(&mut sh, "mktemp tmp.");
        assert_ne!(a, b);
        assert!(a.contains("/tmp."));
    }

    #[test]
    fn path_queries() {
        let mut sh = shell();
        run(&mut sh, "mkdir deep");
        run(&mut sh, "cd deep");
        assert_eq!(run(&mut sh, "realpath ../deep/f.txt"), "/deep/f.txt");
        assert_eq!(run(&mut sh, "dirname f.txt"), "/deep");
        assert_eq!(run(&mut sh, "basename sub/f.txt"), "f.txt");
        assert!(run(&mut sh, "pathchk ok/name").contains("valid"));
    }

    #[test]
    fn truncate_changes_length() {
        let mut sh = shell();
        run(&mut sh, "echo six ch");
        run(&mut sh, "truncate output.txt 3");
        assert_eq!(run(&mut sh, "cat output.txt"), "six");
    }

    #[test]
    fn unlink_removes() {
        let mut sh = shell();
        run(&mut sh, "touch gone");
        run(&mut sh, "unlink gone");
        assert!(sh.execute("cat gone").is_err());
    }

    #[test]
    fn symlink_unsupported_in_memory_vfs() {
        let mut sh = shell();
        run(&mut sh, "touch t");
        assert!(matches!(
            sh.execute("ln t l"),
            Err(ShellError::Unsupported(_))
        ));
    }

    #[test]
    fn hard_link_copies_in_memory_vfs() {
        let mut sh = shell();
        run(&mut sh, "echo linked");
        run(&mut sh, "link output.txt other.txt");
        assert_eq!(run(&mut sh, "cat other.txt"), "linked");
    }

    #[test]
    fn split_produces_numbered_chunks() {
        let mut sh = shell();
        let mut big = String::new();
        for _ in 0..300 {
            big.push_str("0123456789");
        }
        sh.execute(&format!("echo {big}")).unwrap();
        run(&mut sh, "split output.txt part");
        assert_eq!(run(&mut sh, "du part000"), "1024\tpart000");
        assert_eq!(run(&mut sh, "du part002"), "952\tpart002");
        assert!(sh.execute("cat part003").is_err());
    }

    #[test]
    fn csplit_splits_on_pattern() {
        let mut sh = shell();
        run(&mut sh, "echo one--two--three");
        run(&mut sh, "csplit output.txt -- piece");
        assert_eq!(run(&mut sh, "cat piece000"), "one");
        assert_eq!(run(&mut sh, "cat piece001"), "two");
        assert_eq!(run(&mut sh, "cat piece002"), "three");
    }
}
