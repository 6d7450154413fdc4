//! File comparison and ordering commands: comm, diff, cmp, patch, join,
//! tsort.

use sandsh_types::error::{Result, ShellError};
use sandsh_vfs::resolve;

use crate::commands::{arg, read_bytes, read_text};
use crate::registry::{Command, CommandOutput, CommandRegistry, Environment};
use crate::textutil::{self, CommSide};

/// Register comparison commands.
pub fn register_compare_commands(reg: &mut CommandRegistry) {
    reg.register(Box::new(CommCmd));
    reg.register(Box::new(DiffCmd));
    reg.register(Box::new(CmpCmd));
    reg.register(Box::new(PatchCmd));
    reg.register(Box::new(JoinCmd));
    reg.register(Box::new(TsortCmd));
}

// ---------------------------------------------------------------------------
// comm
// ---------------------------------------------------------------------------

struct CommCmd;
impl Command for CommCmd {
    fn name(&self) -> &str {
        "comm"
    }
    fn description(&self) -> &str {
        "Compare two files as sorted line sets"
    }
    fn usage(&self) -> &str {
        "comm <file1> <file2>"
    }
    fn man(&self) -> &str {
        "Treats each file as a sorted set of unique lines and walks both at \
         once. Lines only in the first file are prefixed '< ', lines only in \
         the second '> ', and common lines are indented."
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        if args.len() != 2 {
            return Err(ShellError::Usage(self.usage().to_string()));
        }
        let first = read_text(env, args[0])?;
        let second = read_text(env, args[1])?;
        let out: Vec<String> = textutil::comm(&first, &second)
            .into_iter()
            .map(|(side, line)| match side {
                CommSide::OnlyFirst => format!("< {line}"),
                CommSide::OnlySecond => format!("> {line}"),
                CommSide::Both => format!("  {line}"),
            })
            .collect();
        Ok(CommandOutput::Text(out.join("\n")))
    }
}

// ---------------------------------------------------------------------------
// diff
// ---------------------------------------------------------------------------

struct DiffCmd;
impl Command for DiffCmd {
    fn name(&self) -> &str {
        "diff"
    }
    fn description(&self) -> &str {
        "Compare two files line by line"
    }
    fn usage(&self) -> &str {
        "diff <file1> <file2>"
    }
    fn man(&self) -> &str {
        "Compares the files position by position: differing lines at the \
         same index produce a change block, and trailing extra lines are \
         reported as appends or deletes. This is a line-aligned comparison, \
         not a minimal edit script."
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        if args.len() != 2 {
            return Err(ShellError::Usage(self.usage().to_string()));
        }
        let first = read_text(env, args[0])?;
        let second = read_text(env, args[1])?;
        let out = textutil::diff_lines(&first, &second);
        if out.is_empty() {
            Ok(CommandOutput::Text(format!(
                "files '{}' and '{}' are identical",
                args[0], args[1]
            )))
        } else {
            Ok(CommandOutput::Text(out.join("\n")))
        }
    }
}

// ---------------------------------------------------------------------------
// cmp
// ---------------------------------------------------------------------------

struct CmpCmd;
impl Command for CmpCmd {
    fn name(&self) -> &str {
        "cmp"
    }
    fn description(&self) -> &str {
        "Compare two files byte by byte"
    }
    fn usage(&self) -> &str {
        "cmp <file1> <file2>"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        if args.len() != 2 {
            return Err(ShellError::Usage(self.usage().to_string()));
        }
        let a = read_bytes(env, args[0])?;
        let b = read_bytes(env, args[1])?;
        for (i, (x, y)) in a.iter().zip(b.iter()).enumerate() {
            if x != y {
                return Ok(CommandOutput::Text(format!(
                    "files '{}' and '{}' differ at byte {}",
                    args[0],
                    args[1],
                    i + 1
                )));
            }
        }
        if a.len() != b.len() {
            return Ok(CommandOutput::Text(format!(
                "files '{}' and '{}' differ in length",
                args[0], args[1]
            )));
        }
        Ok(CommandOutput::Text(format!(
            "files '{}' and '{}' are identical",
            args[0], args[1]
        )))
    }
}

// ---------------------------------------------------------------------------
// patch
// ---------------------------------------------------------------------------

struct PatchCmd;
impl Command for PatchCmd {
    fn name(&self) -> &str {
        "patch"
    }
    fn description(&self) -> &str {
        "Apply a +/- line patch to a file"
    }
    fn usage(&self) -> &str {
        "patch <file> <patchfile>"
    }
    fn man(&self) -> &str {
        "Reads the patch file line by line: '+line' appends the line to the \
         file, '-line' removes its first occurrence, and '@@' hunk markers \
         are ignored. The file is rewritten in place."
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        if args.len() != 2 {
            return Err(ShellError::Usage(self.usage().to_string()));
        }
        let mut content = read_text(env, args[0])?;
        let patch = read_text(env, args[1])?;
        for line in patch.lines() {
            if line.starts_with("@@") {
                continue;
            }
            if let Some(added) = line.strip_prefix('+') {
                content.push_str(added);
                content.push('\n');
            } else if let Some(removed) = line.strip_prefix('-') {
                let needle = format!("{removed}\n");
                if let Some(pos) = content.find(&needle) {
                    content.replace_range(pos..pos + needle.len(), "");
                }
            }
        }
        let path = resolve(&env.cwd, args[0]);
        env.vfs.write(&path, content.as_bytes())?;
        Ok(CommandOutput::Text(format!("patch applied to '{}'", args[0])))
    }
}

// ---------------------------------------------------------------------------
// join
// ---------------------------------------------------------------------------

struct JoinCmd;
impl Command for JoinCmd {
    fn name(&self) -> &str {
        "join"
    }
    fn description(&self) -> &str {
        "Join two files on a common field"
    }
    fn usage(&self) -> &str {
        "join <file1> <file2> <field>"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        if args.len() != 3 {
            return Err(ShellError::Usage(self.usage().to_string()));
        }
        let field: usize = args[2]
            .parse()
            .map_err(|_| ShellError::Expression(format!("invalid field '{}'", args[2])))?;
        if field == 0 {
            return Err(ShellError::Expression("fields are numbered from 1".into()));
        }
        let first = read_text(env, args[0])?;
        let second = read_text(env, args[1])?;
        let rows1: Vec<Vec<&str>> = first
            .lines()
            .map(|l| l.split_whitespace().collect())
            .collect();
        let rows2: Vec<Vec<&str>> = second
            .lines()
            .map(|l| l.split_whitespace().collect())
            .collect();
        let mut out = Vec::new();
        for r1 in &rows1 {
            let Some(key1) = r1.get(field - 1) else {
                continue;
            };
            for r2 in &rows2 {
                if r2.get(field - 1) == Some(key1) {
                    let mut joined: Vec<&str> = r1.clone();
                    joined.extend(r2.iter().skip(field));
                    out.push(joined.join(" "));
                }
            }
        }
        Ok(CommandOutput::Text(out.join("\n")))
    }
}

// ---------------------------------------------------------------------------
// tsort
// ---------------------------------------------------------------------------

struct TsortCmd;
impl Command for TsortCmd {
    fn name(&self) -> &str {
        "tsort"
    }
    fn description(&self) -> &str {
        "Topologically order a dependency list"
    }
    fn usage(&self) -> &str {
        "tsort <file>"
    }
    fn man(&self) -> &str {
        "Each input line 'u v' declares that u must come before v. Prints \
         one valid ordering of all mentioned nodes, or reports a cycle."
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        let text = read_text(env, arg(args, 0, self.usage())?)?;
        match textutil::tsort(&text) {
            Ok(order) => Ok(CommandOutput::Text(order.join(" "))),
            Err(cycle) => Err(ShellError::Expression(format!(
                "input contains a cycle involving '{}'",
                cycle.0
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Shell;
    use crate::commands::register_builtins;
    use sandsh_vfs::{MemoryVfs, Vfs};

    fn shell_with(files: &[(&str, &str)]) -> Shell {
        let mut reg = crate::CommandRegistry::new();
        register_builtins(&mut reg);
        let mut vfs = MemoryVfs::new();
        for (path, content) in files {
            vfs.write(path, content.as_bytes()).unwrap();
        }
        Shell::new(reg, Box::new(vfs))
    }

    fn run(sh: &mut Shell, line: &str) -> String {
        match sh.execute(line).unwrap() {
            CommandOutput::Text(s) => s,
            _ => String::new(),
        }
    }

    #[test]
    fn comm_prefixes_three_categories() {
        let mut sh = shell_with(&[("/a", "x\ny"), ("/b", "y\nz")]);
        assert_eq!(run(&mut sh, "comm a b"), "< x\n  y\n> z");
    }

    #[test]
    fn diff_identical_and_changed() {
        let mut sh = shell_with(&[("/a", "same\nsame2"), ("/b", "same\nsame2")]);
        assert!(run(&mut sh, "diff a b").contains("identical"));
        let mut sh = shell_with(&[("/a", "hello\nworld"), ("/b", "hello\nearth")]);
        assert_eq!(run(&mut sh, "diff a b"), "2c2\n< world\n---\n> earth");
    }

    #[test]
    fn cmp_reports_first_difference() {
        let mut sh = shell_with(&[("/a", "abcd"), ("/b", "abXd")]);
        assert!(run(&mut sh, "cmp a b").contains("byte 3"));
        let mut sh = shell_with(&[("/a", "ab"), ("/b", "abcd")]);
        assert!(run(&mut sh, "cmp a b").contains("length"));
        let mut sh = shell_with(&[("/a", "ab"), ("/b", "ab")]);
        assert!(run(&mut sh, "cmp a b").contains("identical"));
    }

    #[test]
    fn patch_adds_and_removes_lines() {
        let mut sh = shell_with(&[
            ("/f", "keep\ndrop\nend\n"),
            ("/p", "@@ hunk @@\n-drop\n+added\n"),
        ]);
        run(&mut sh, "patch f p");
        assert_eq!(run(&mut sh, "cat f"), "keep\nend\nadded");
    }

    #[test]
    fn join_on_first_field() {
        let mut sh = shell_with(&[
            ("/a", "1 alpha\n2 beta"),
            ("/b", "1 one\n3 three"),
        ]);
        assert_eq!(run(&mut sh, "join a b 1"), "1 alpha one");
    }

    #[test]
    fn tsort_orders_dependencies() {
        let mut sh = shell_with(&[("/f", "a b\nb c")]);
        assert_eq!(run(&mut sh, "tsort f"), "a b c");
    }

    #[test]
    fn tsort_rejects_cycles() {
        let mut sh = shell_with(&[("/f", "a b\nb a")]);
        match sh.execute("tsort f") {
            Err(ShellError::Expression(msg)) => assert!(msg.contains("cycle")),
            other => panic!("expected cycle error, got {other:?}"),
        }
    }
}
