//! Command trait and registry.

use std::collections::HashMap;
use std::sync::atomic::AtomicBool;

use sandsh_types::error::Result;
use sandsh_vfs::Vfs;

/// Output produced by a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutput {
    /// Plain text lines for the terminal.
    Text(String),
    /// Command produced no visible output (streaming commands print
    /// directly and return this).
    None,
    /// Signal to the front end to clear the screen.
    Clear,
}

/// Mutable environment passed to every command invocation.
pub struct Environment<'a> {
    /// Current working directory (virtual path). `cd` mutates this; the
    /// shell copies it back after a successful invocation.
    pub cwd: String,
    /// The virtual file system.
    pub vfs: &'a mut dyn Vfs,
    /// Interrupt flag set by the Ctrl-C handler; blocking commands poll it.
    pub interrupt: Option<&'a AtomicBool>,
}

/// A single executable command.
pub trait Command {
    /// The command name (what the user types).
    fn name(&self) -> &str;

    /// One-line description for `help`.
    fn description(&self) -> &str;

    /// Usage string (e.g. "cp <source> <dest>").
    fn usage(&self) -> &str;

    /// Extended manual text for `man`; empty means the manual entry is
    /// assembled from the description and usage alone.
    fn man(&self) -> &str {
        ""
    }

    /// Execute the command with the given arguments and environment.
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput>;
}

/// Registry of available commands, keyed by lowercase name.
///
/// Built once at startup and read-only afterwards; session state (aliases,
/// environment variables, history) lives on [`crate::Shell`] instead.
#[derive(Default)]
pub struct CommandRegistry {
    commands: HashMap<String, Box<dyn Command>>,
}

impl CommandRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            commands: HashMap::new(),
        }
    }

    /// Register a command. Replaces any existing command with the same name.
    pub fn register(&mut self, cmd: Box<dyn Command>) {
        self.commands.insert(cmd.name().to_string(), cmd);
    }

    /// Look up a command by (case-insensitive) name.
    pub fn get(&self, name: &str) -> Option<&dyn Command> {
        self.commands
            .get(&name.to_ascii_lowercase())
            .map(|c| c.as_ref())
    }

    /// Whether a command with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(&name.to_ascii_lowercase())
    }

    /// Number of registered commands.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Sorted list of (name, description) pairs.
    pub fn list(&self) -> Vec<(&str, &str)> {
        let mut cmds: Vec<(&str, &str)> = self
            .commands
            .values()
            .map(|c| (c.name(), c.description()))
            .collect();
        cmds.sort_by_key(|(name, _)| *name);
        cmds
    }

    /// All commands, for invariant checks.
    pub fn iter(&self) -> impl Iterator<Item = &dyn Command> {
        self.commands.values().map(|c| c.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sandsh_vfs::MemoryVfs;

    struct NoopCmd;
    impl Command for NoopCmd {
        fn name(&self) -> &str {
            "noop"
        }
        fn description(&self) -> &str {
            "Do nothing"
        }
        fn usage(&self) -> &str {
            "noop"
        }
        fn execute(&self, _args: &[&str], _env: &mut Environment<'_>) -> Result<CommandOutput> {
            Ok(CommandOutput::None)
        }
    }

    #[test]
    fn register_and_lookup_case_insensitive() {
        let mut reg = CommandRegistry::new();
        reg.register(Box::new(NoopCmd));
        assert!(reg.get("noop").is_some());
        assert!(reg.get("NOOP").is_some());
        assert!(reg.get("nope").is_none());
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn list_is_sorted() {
        struct Named(&'static str);
        impl Command for Named {
            fn name(&self) -> &str {
                self.0
            }
            fn description(&self) -> &str {
                "x"
            }
            fn usage(&self) -> &str {
                self.0
            }
            fn execute(
                &self,
                _args: &[&str],
                _env: &mut Environment<'_>,
            ) -> Result<CommandOutput> {
                Ok(CommandOutput::None)
            }
        }
        let mut reg = CommandRegistry::new();
        reg.register(Box::new(Named("zeta")));
        reg.register(Box::new(Named("alpha")));
        let names: Vec<&str> = reg.list().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, ["alpha", "zeta"]);
    }

    #[test]
    fn execute_through_registry() {
        let mut reg = CommandRegistry::new();
        reg.register(Box::new(NoopCmd));
        let mut vfs = MemoryVfs::new();
        let mut env = Environment {
            cwd: "/".to_string(),
            vfs: &mut vfs,
            interrupt: None,
        };
        let out = reg.get("noop").unwrap().execute(&[], &mut env).unwrap();
        assert_eq!(out, CommandOutput::None);
    }
}
