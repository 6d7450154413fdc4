//! The dispatcher: session state plus the execute loop entry point.
//!
//! A [`Shell`] owns the command registry (immutable after startup), the
//! virtual filesystem, and the per-session state: current directory, alias
//! table, environment variables, and command history.
//! Builtins that need access to that state (`alias`, `history`, `watch`,
//! ...) are intercepted here instead of living in the registry.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use sandsh_types::error::{Result, ShellError};
use sandsh_vfs::Vfs;

use crate::registry::{CommandOutput, CommandRegistry, Environment};

/// Upper bound on chained alias substitutions before reporting a cycle.
const MAX_ALIAS_DEPTH: usize = 64;

/// Poll interval for blocking commands watching the interrupt flag.
const INTERRUPT_POLL: Duration = Duration::from_millis(100);

/// Builtins handled by the dispatcher itself: (name, usage, description,
/// manual text).
const INTERCEPTED: &[(&str, &str, &str, &str)] = &[
    (
        "help",
        "help [command]",
        "List commands or describe one",
        "Without arguments, lists every available command with a one-line \
         description. With a command name, prints that command's description.",
    ),
    (
        "man",
        "man <command>",
        "Show the manual entry for a command",
        "Prints the long-form description and usage for a command.",
    ),
    (
        "history",
        "history [count]",
        "Show command history",
        "Prints the numbered command history for this session; with a count, \
         only the most recent entries. History is not persisted across runs.",
    ),
    (
        "alias",
        "alias <name> <command...>",
        "Create a command alias",
        "Stores a replacement for a command name. The replacement may name \
         another alias; expansion is bounded and cycles are reported.",
    ),
    (
        "unalias",
        "unalias <name>",
        "Remove a command alias",
        "Removes an alias; removing an unknown alias is reported but is not \
         an error.",
    ),
    (
        "export",
        "export <name> <value>",
        "Set an environment variable",
        "Sets a session environment variable, silently overwriting any \
         previous value.",
    ),
    (
        "env",
        "env",
        "List environment variables",
        "Prints every session environment variable as NAME=value.",
    ),
    (
        "which",
        "which <command>",
        "Locate a command",
        "Prints the simulated binary path of a known command.",
    ),
    (
        "whereis",
        "whereis <command>",
        "Locate a command's binary, source, and manual",
        "Prints the simulated binary, source, and manual paths of a known \
         command.",
    ),
    (
        "watch",
        "watch <command...>",
        "Re-run a command every two seconds",
        "Runs the command, prints its output, waits two seconds, and repeats \
         until interrupted with Ctrl-C.",
    ),
    (
        "time",
        "time <command...>",
        "Measure a command's execution time",
        "Runs the command and reports the elapsed wall-clock time.",
    ),
];

/// Session state and dispatch.
pub struct Shell {
    registry: CommandRegistry,
    vfs: Box<dyn Vfs>,
    cwd: String,
    aliases: HashMap<String, String>,
    environment: HashMap<String, String>,
    history: Vec<String>,
    history_limit: usize,
    interrupt: Option<Arc<AtomicBool>>,
}

impl Shell {
    /// Create a shell over a populated registry and a filesystem. The
    /// registry is never mutated afterwards.
    pub fn new(registry: CommandRegistry, vfs: Box<dyn Vfs>) -> Self {
        Self {
            registry,
            vfs,
            cwd: "/".to_string(),
            aliases: HashMap::new(),
            environment: HashMap::new(),
            history: Vec::new(),
            history_limit: 0,
            interrupt: None,
        }
    }

    /// Attach the interrupt flag set by the Ctrl-C handler.
    pub fn set_interrupt_flag(&mut self, flag: Arc<AtomicBool>) {
        self.interrupt = Some(flag);
    }

    /// Cap history length (0 = unbounded, the default).
    pub fn set_history_limit(&mut self, limit: usize) {
        self.history_limit = limit;
    }

    /// Preload an alias (used for configured aliases at startup).
    pub fn define_alias(&mut self, name: &str, expansion: &str) {
        self.aliases
            .insert(name.to_ascii_lowercase(), expansion.to_string());
    }

    /// Current virtual working directory, for the prompt.
    pub fn cwd(&self) -> &str {
        &self.cwd
    }

    /// The command registry (read-only).
    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    /// Execute one raw input line.
    ///
    /// Records the line in history, then dispatches it. Any error the
    /// handler raises is logged here with the offending line and returned
    /// for the caller to print as a one-line message; nothing propagates
    /// past this boundary.
    pub fn execute(&mut self, line: &str) -> Result<CommandOutput> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(CommandOutput::None);
        }
        self.push_history(line);
        match self.dispatch(line) {
            Ok(output) => Ok(output),
            Err(e) => {
                log::error!("command '{line}' failed: {e}");
                Err(e)
            },
        }
    }

    fn push_history(&mut self, line: &str) {
        self.history.push(line.to_string());
        if self.history_limit > 0 && self.history.len() > self.history_limit {
            let excess = self.history.len() - self.history_limit;
            self.history.drain(..excess);
        }
    }

    /// Tokenize, expand aliases, and run a command line. Used both for
    /// typed lines and for the inner commands of `watch`/`time` (which do
    /// not re-enter history).
    fn dispatch(&mut self, line: &str) -> Result<CommandOutput> {
        let mut tokens: Vec<String> = line.split_whitespace().map(str::to_string).collect();
        if tokens.is_empty() {
            return Ok(CommandOutput::None);
        }

        // Alias expansion: substitute the first token, bounded by a depth
        // counter and a visited-name set so cycles terminate with an error.
        let mut visited: HashSet<String> = HashSet::new();
        let mut depth = 0;
        loop {
            let key = tokens[0].to_ascii_lowercase();
            let Some(expansion) = self.aliases.get(&key) else {
                break;
            };
            if depth >= MAX_ALIAS_DEPTH || !visited.insert(key.clone()) {
                return Err(ShellError::AliasCycle(key));
            }
            depth += 1;
            let mut expanded: Vec<String> =
                expansion.split_whitespace().map(str::to_string).collect();
            expanded.extend(tokens.drain(1..));
            tokens = expanded;
            if tokens.is_empty() {
                return Ok(CommandOutput::None);
            }
        }

        let name = tokens[0].to_ascii_lowercase();
        let arg_strings: Vec<String> = tokens[1..].to_vec();
        let args: Vec<&str> = arg_strings.iter().map(String::as_str).collect();

        // Builtins that need session or registry access.
        match name.as_str() {
            "help" => return self.execute_help(&args),
            "man" => return self.execute_man(&args),
            "history" => return self.execute_history(&args),
            "alias" => return self.execute_alias(&args),
            "unalias" => return self.execute_unalias(&args),
            "export" => return self.execute_export(&args),
            "env" => return self.execute_env(),
            "which" => return self.execute_which(&args),
            "whereis" => return self.execute_whereis(&args),
            "watch" => return self.execute_watch(&args),
            "time" => return self.execute_time(&args),
            _ => {},
        }

        let Some(cmd) = self.registry.get(&name) else {
            return Err(ShellError::NotFound(format!("command '{}'", tokens[0])));
        };
        let mut env = Environment {
            cwd: self.cwd.clone(),
            vfs: self.vfs.as_mut(),
            interrupt: self.interrupt.as_deref(),
        };
        let output = cmd.execute(&args, &mut env)?;
        // Only cd changes env.cwd, and only after validating the target.
        self.cwd = env.cwd;
        Ok(output)
    }

    fn interrupted(&self) -> bool {
        self.interrupt
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Sleep in short slices, returning early when interrupted.
    fn pause(&self, total: Duration) -> bool {
        let deadline = Instant::now() + total;
        loop {
            if self.interrupted() {
                return true;
            }
            let left = deadline.saturating_duration_since(Instant::now());
            if left.is_zero() {
                return self.interrupted();
            }
            std::thread::sleep(INTERRUPT_POLL.min(left));
        }
    }

    // -- Intercepted builtins --

    fn execute_help(&self, args: &[&str]) -> Result<CommandOutput> {
        if let Some(&name) = args.first() {
            let key = name.to_ascii_lowercase();
            if let Some((_, _, desc, _)) = INTERCEPTED.iter().find(|(n, ..)| *n == key) {
                return Ok(CommandOutput::Text(format!("{key}: {desc}")));
            }
            return match self.registry.get(&key) {
                Some(cmd) => Ok(CommandOutput::Text(format!(
                    "{}: {}",
                    cmd.name(),
                    cmd.description()
                ))),
                None => Err(ShellError::NotFound(format!("help for '{name}'"))),
            };
        }
        let mut entries: Vec<(&str, &str)> = self.registry.list();
        entries.extend(INTERCEPTED.iter().map(|(n, _, d, _)| (*n, *d)));
        entries.sort_by_key(|(n, _)| *n);
        let mut out = String::from("Available commands:\n");
        for (name, desc) in &entries {
            out.push_str(&format!("  {name:<12} {desc}\n"));
        }
        out.push_str("\nType 'man <command>' for details.");
        Ok(CommandOutput::Text(out))
    }

    fn execute_man(&self, args: &[&str]) -> Result<CommandOutput> {
        let Some(&name) = args.first() else {
            return Err(ShellError::Usage("man <command>".into()));
        };
        let key = name.to_ascii_lowercase();
        if let Some((n, usage, desc, long)) = INTERCEPTED.iter().find(|(n, ..)| *n == key) {
            return Ok(CommandOutput::Text(format!(
                "{n} - {desc}\nusage: {usage}\n\n{long}"
            )));
        }
        match self.registry.get(&key) {
            Some(cmd) => {
                let mut out = format!(
                    "{} - {}\nusage: {}",
                    cmd.name(),
                    cmd.description(),
                    cmd.usage()
                );
                if !cmd.man().is_empty() {
                    out.push_str("\n\n");
                    out.push_str(cmd.man());
                }
                Ok(CommandOutput::Text(out))
            },
            None => Err(ShellError::NotFound(format!("manual for '{name}'"))),
        }
    }

    fn execute_history(&self, args: &[&str]) -> Result<CommandOutput> {
        let count = match args.first() {
            Some(n) => n
                .parse::<usize>()
                .map_err(|_| ShellError::Usage("history [count]".into()))?,
            None => self.history.len(),
        };
        let start = self.history.len().saturating_sub(count);
        let mut out = String::new();
        for (i, entry) in self.history.iter().enumerate().skip(start) {
            out.push_str(&format!("{}: {entry}\n", i + 1));
        }
        Ok(CommandOutput::Text(out.trim_end().to_string()))
    }

    fn execute_alias(&mut self, args: &[&str]) -> Result<CommandOutput> {
        if args.len() < 2 {
            return Err(ShellError::Usage("alias <name> <command...>".into()));
        }
        let name = args[0].to_ascii_lowercase();
        let expansion = args[1..].join(" ");
        self.aliases.insert(name.clone(), expansion.clone());
        Ok(CommandOutput::Text(format!(
            "alias '{name}' set to '{expansion}'"
        )))
    }

    fn execute_unalias(&mut self, args: &[&str]) -> Result<CommandOutput> {
        let Some(&name) = args.first() else {
            return Err(ShellError::Usage("unalias <name>".into()));
        };
        let key = name.to_ascii_lowercase();
        // A missing alias is reported but intentionally not an error.
        match self.aliases.remove(&key) {
            Some(_) => Ok(CommandOutput::Text(format!("alias '{key}' removed"))),
            None => Ok(CommandOutput::Text(format!("alias '{key}' not found"))),
        }
    }

    fn execute_export(&mut self, args: &[&str]) -> Result<CommandOutput> {
        if args.len() != 2 {
            return Err(ShellError::Usage("export <name> <value>".into()));
        }
        self.environment
            .insert(args[0].to_string(), args[1].to_string());
        Ok(CommandOutput::Text(format!(
            "environment variable '{}' set to '{}'",
            args[0], args[1]
        )))
    }

    fn execute_env(&self) -> Result<CommandOutput> {
        let mut entries: Vec<(&str, &str)> = self
            .environment
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        entries.sort_by_key(|(k, _)| *k);
        let out: Vec<String> = entries
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        Ok(CommandOutput::Text(out.join("\n")))
    }

    fn known_command(&self, key: &str) -> bool {
        self.registry.contains(key) || INTERCEPTED.iter().any(|(n, ..)| *n == key)
    }

    fn execute_which(&self, args: &[&str]) -> Result<CommandOutput> {
        let Some(&name) = args.first() else {
            return Err(ShellError::Usage("which <command>".into()));
        };
        let key = name.to_ascii_lowercase();
        if self.known_command(&key) {
            Ok(CommandOutput::Text(format!("/usr/bin/{key}")))
        } else {
            Err(ShellError::NotFound(format!("command '{name}'")))
        }
    }

    fn execute_whereis(&self, args: &[&str]) -> Result<CommandOutput> {
        let Some(&name) = args.first() else {
            return Err(ShellError::Usage("whereis <command>".into()));
        };
        let key = name.to_ascii_lowercase();
        if self.known_command(&key) {
            Ok(CommandOutput::Text(format!(
                "{key}: /usr/bin/{key} /usr/src/{key} /usr/share/man/man1/{key}.1"
            )))
        } else {
            Err(ShellError::NotFound(format!("command '{name}'")))
        }
    }

    fn execute_watch(&mut self, args: &[&str]) -> Result<CommandOutput> {
        if args.is_empty() {
            return Err(ShellError::Usage("watch <command...>".into()));
        }
        let line = args.join(" ");
        loop {
            match self.dispatch(&line)? {
                CommandOutput::Text(text) => println!("{text}"),
                CommandOutput::None | CommandOutput::Clear => {},
            }
            if self.pause(Duration::from_secs(2)) {
                println!("watch: interrupted");
                return Ok(CommandOutput::None);
            }
        }
    }

    fn execute_time(&mut self, args: &[&str]) -> Result<CommandOutput> {
        if args.is_empty() {
            return Err(ShellError::Usage("time <command...>".into()));
        }
        let line = args.join(" ");
        let start = Instant::now();
        let output = self.dispatch(&line)?;
        let elapsed = start.elapsed().as_secs_f64();
        let mut out = String::new();
        if let CommandOutput::Text(text) = output {
            out.push_str(&text);
            out.push('\n');
        }
        out.push_str(&format!("elapsed: {elapsed:.2} seconds"));
        Ok(CommandOutput::Text(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::register_builtins;
    use sandsh_vfs::MemoryVfs;

    fn shell() -> Shell {
        let mut registry = CommandRegistry::new();
        register_builtins(&mut registry);
        Shell::new(registry, Box::new(MemoryVfs::new()))
    }

    fn text(out: CommandOutput) -> String {
        match out {
            CommandOutput::Text(s) => s,
            other => panic!("expected text, got {other:?}"),
        }
    }

    #[test]
    fn unknown_command_is_not_found() {
        let mut sh = shell();
        match sh.execute("frobnicate") {
            Err(ShellError::NotFound(msg)) => assert!(msg.contains("frobnicate")),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn command_names_are_case_insensitive() {
        let mut sh = shell();
        let out = text(sh.execute("PWD").unwrap());
        assert_eq!(out, "/");
    }

    #[test]
    fn mkdir_cd_pwd_roundtrip() {
        let mut sh = shell();
        sh.execute("mkdir a").unwrap();
        sh.execute("cd a").unwrap();
        assert_eq!(text(sh.execute("pwd").unwrap()), "/a");
        assert_eq!(sh.cwd(), "/a");
    }

    #[test]
    fn cd_failure_leaves_cwd_unchanged() {
        let mut sh = shell();
        assert!(sh.execute("cd missing").is_err());
        assert_eq!(sh.cwd(), "/");
    }

    #[test]
    fn cd_dotdot_clamps_at_root() {
        let mut sh = shell();
        sh.execute("cd ..").unwrap();
        sh.execute("cd ../../..").unwrap();
        assert_eq!(sh.cwd(), "/");
    }

    #[test]
    fn echo_then_cat_output_file() {
        let mut sh = shell();
        sh.execute("touch f").unwrap();
        sh.execute("echo hello").unwrap();
        assert_eq!(text(sh.execute("cat output.txt").unwrap()), "hello");
    }

    #[test]
    fn seq_and_factor_end_to_end() {
        let mut sh = shell();
        assert_eq!(text(sh.execute("seq 3").unwrap()), "1\n2\n3");
        assert_eq!(
            text(sh.execute("factor 12").unwrap()),
            "12: 1 2 3 4 6 12"
        );
    }

    #[test]
    fn alias_chain_expands() {
        let mut sh = shell();
        sh.execute("alias p pwd").unwrap();
        sh.execute("alias q p").unwrap();
        assert_eq!(text(sh.execute("q").unwrap()), "/");
    }

    #[test]
    fn alias_with_arguments_prepends_expansion() {
        let mut sh = shell();
        sh.execute("alias mk mkdir").unwrap();
        sh.execute("mk sub").unwrap();
        sh.execute("cd sub").unwrap();
        assert_eq!(sh.cwd(), "/sub");
    }

    #[test]
    fn alias_cycle_is_detected() {
        let mut sh = shell();
        sh.execute("alias a b").unwrap();
        sh.execute("alias b a").unwrap();
        match sh.execute("a") {
            Err(ShellError::AliasCycle(_)) => {},
            other => panic!("expected AliasCycle, got {other:?}"),
        }
    }

    #[test]
    fn self_alias_is_a_cycle() {
        let mut sh = shell();
        sh.execute("alias loop loop").unwrap();
        assert!(matches!(
            sh.execute("loop"),
            Err(ShellError::AliasCycle(_))
        ));
    }

    #[test]
    fn deep_alias_chain_hits_depth_bound() {
        let mut sh = shell();
        for i in 0..100 {
            sh.define_alias(&format!("a{i}"), &format!("a{}", i + 1));
        }
        assert!(matches!(
            sh.execute("a0"),
            Err(ShellError::AliasCycle(_))
        ));
    }

    #[test]
    fn alias_chain_within_bound_terminates() {
        let mut sh = shell();
        for i in 0..10 {
            sh.define_alias(&format!("b{i}"), &format!("b{}", i + 1));
        }
        sh.define_alias("b10", "pwd");
        assert_eq!(text(sh.execute("b0").unwrap()), "/");
    }

    #[test]
    fn unalias_missing_is_not_an_error() {
        let mut sh = shell();
        let out = text(sh.execute("unalias ghost").unwrap());
        assert!(out.contains("not found"));
    }

    #[test]
    fn export_and_env() {
        let mut sh = shell();
        sh.execute("export EDITOR vi").unwrap();
        sh.execute("export LANG C").unwrap();
        assert_eq!(text(sh.execute("env").unwrap()), "EDITOR=vi\nLANG=C");
    }

    #[test]
    fn history_suffix_query() {
        let mut sh = shell();
        sh.execute("pwd").unwrap();
        sh.execute("env").unwrap();
        let out = text(sh.execute("history 2").unwrap());
        assert_eq!(out, "2: env\n3: history 2");
    }

    #[test]
    fn failed_commands_still_enter_history() {
        let mut sh = shell();
        let _ = sh.execute("nonsense");
        let out = text(sh.execute("history").unwrap());
        assert!(out.contains("1: nonsense"));
    }

    #[test]
    fn which_finds_registered_and_intercepted() {
        let mut sh = shell();
        assert_eq!(text(sh.execute("which ls").unwrap()), "/usr/bin/ls");
        assert_eq!(text(sh.execute("which alias").unwrap()), "/usr/bin/alias");
        assert!(sh.execute("which nothing").is_err());
    }

    #[test]
    fn help_lists_every_command() {
        let mut sh = shell();
        let out = text(sh.execute("help").unwrap());
        for name in ["ls", "tsort", "md5sum", "alias", "watch"] {
            assert!(out.contains(name), "help output missing {name}");
        }
    }

    #[test]
    fn man_covers_registry_and_intercepted() {
        let mut sh = shell();
        let out = text(sh.execute("man sort").unwrap());
        assert!(out.contains("usage: sort"));
        let out = text(sh.execute("man watch").unwrap());
        assert!(out.contains("usage: watch"));
        assert!(sh.execute("man nothing").is_err());
    }

    #[test]
    fn every_registered_command_has_help_and_man_entries() {
        let sh = shell();
        for cmd in sh.registry().iter() {
            assert!(!cmd.name().is_empty());
            assert!(
                !cmd.description().is_empty(),
                "{} lacks a description",
                cmd.name()
            );
            assert!(!cmd.usage().is_empty(), "{} lacks usage", cmd.name());
        }
        for (name, usage, desc, long) in INTERCEPTED {
            assert!(!name.is_empty() && !usage.is_empty());
            assert!(!desc.is_empty() && !long.is_empty());
        }
    }

    #[test]
    fn full_command_surface_is_registered() {
        let sh = shell();
        let expected = [
            "about", "awk", "basename", "bc", "cal", "cat", "cd", "chmod", "chown", "cksum",
            "clear", "cmp", "col", "colrm", "column", "comm", "cp", "csplit", "cut", "date",
            "df", "diff", "dirname", "du", "echo", "expand", "expr", "factor", "file", "find",
            "fmt", "fold", "grep", "head", "hexdump", "join", "kill", "link", "ln", "ls",
            "md5sum", "mime", "mkdir", "mktemp", "mv", "nl", "numfmt", "od", "paste", "patch",
            "pathchk", "pr", "printf", "ps", "pwd", "readlink", "realpath", "rev", "rm",
            "rmdir", "sed", "seq", "sha1sum", "sha256sum", "shuf", "sleep", "sort", "split",
            "stat", "strings", "sum", "tac", "tail", "test", "top", "touch", "tr", "truncate",
            "tsort", "ul", "uname", "unexpand", "uniq", "unlink", "uptime", "wc", "whoami",
            "yes",
        ];
        for name in expected {
            assert!(sh.registry().contains(name), "missing command: {name}");
        }
        assert_eq!(sh.registry().len(), expected.len());
    }

    #[test]
    fn interrupt_unwinds_sleep_without_corrupting_state() {
        let mut sh = shell();
        sh.execute("alias keep pwd").unwrap();
        let flag = Arc::new(AtomicBool::new(true));
        sh.set_interrupt_flag(Arc::clone(&flag));
        match sh.execute("sleep 30") {
            Err(ShellError::Interrupted) => {},
            other => panic!("expected Interrupted, got {other:?}"),
        }
        // State survives the unwound command.
        flag.store(false, Ordering::SeqCst);
        assert_eq!(text(sh.execute("keep").unwrap()), "/");
        let out = text(sh.execute("history").unwrap());
        assert!(out.contains("sleep 30"));
    }

    #[test]
    fn time_reports_elapsed() {
        let mut sh = shell();
        let out = text(sh.execute("time pwd").unwrap());
        assert!(out.starts_with("/\n"));
        assert!(out.contains("elapsed:"));
    }

    #[test]
    fn history_limit_caps_entries() {
        let mut sh = shell();
        sh.set_history_limit(2);
        sh.execute("pwd").unwrap();
        sh.execute("env").unwrap();
        sh.execute("pwd").unwrap();
        let out = text(sh.execute("history").unwrap());
        assert!(!out.contains("1: pwd\n2: env"));
        assert!(out.contains("history"));
    }
}
