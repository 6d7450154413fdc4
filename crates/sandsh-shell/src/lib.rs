//! Command interpreter for sandsh.
//!
//! The shell is a registry-based dispatch system. Commands implement the
//! [`Command`] trait and are registered by name once at startup. The
//! [`Shell`] parses each input line, expands aliases (with cycle
//! protection), resolves the command name case-insensitively, and runs the
//! handler inside a failure boundary so no command error ever takes down
//! the read-eval loop.

mod calc_commands;
mod commands;
mod compare_commands;
mod digest_commands;
pub mod expr;
mod file_commands;
mod registry;
mod shell;
mod system_commands;
mod text_commands;
pub mod textutil;

/// Register every built-in command into a registry.
pub use commands::register_builtins;
/// A single executable command trait.
pub use registry::Command;
/// Output produced by a command (text, clear signal, or nothing).
pub use registry::CommandOutput;
/// Registry of available commands.
pub use registry::CommandRegistry;
/// Mutable per-invocation environment passed to every command.
pub use registry::Environment;
/// The dispatcher: session state plus the execute loop entry point.
pub use shell::Shell;
