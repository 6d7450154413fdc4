//! Error types for sandsh.

use std::io;

/// Errors produced while dispatching and executing shell commands.
///
/// Every variant is recoverable: the dispatcher reports it as a one-line
/// message and the read-eval loop continues. Startup failures (unusable
/// root directory, unwritable log file) do not use this type.
#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    /// Wrong argument count or shape. The payload is the usage string.
    #[error("usage: {0}")]
    Usage(String),

    /// A file, directory, alias, or command that does not exist.
    #[error("{0}: not found")]
    NotFound(String),

    /// Alias expansion revisited a name or exceeded the depth bound.
    #[error("alias cycle detected while expanding '{0}'")]
    AliasCycle(String),

    /// Malformed arithmetic, comparison, or format input.
    #[error("expression error: {0}")]
    Expression(String),

    /// A blocking command was unwound by the user interrupt.
    #[error("interrupted")]
    Interrupted,

    /// Virtual filesystem violation (not a directory, root removal, ...).
    #[error("{0}")]
    Vfs(String),

    /// Operation the active filesystem backend cannot perform.
    #[error("operation not supported: {0}")]
    Unsupported(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, ShellError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_error_display() {
        let e = ShellError::Usage("cd <directory>".into());
        assert_eq!(format!("{e}"), "usage: cd <directory>");
    }

    #[test]
    fn not_found_display() {
        let e = ShellError::NotFound("/tmp/ghost".into());
        assert_eq!(format!("{e}"), "/tmp/ghost: not found");
    }

    #[test]
    fn alias_cycle_display() {
        let e = ShellError::AliasCycle("ll".into());
        assert_eq!(format!("{e}"), "alias cycle detected while expanding 'll'");
    }

    #[test]
    fn expression_error_display() {
        let e = ShellError::Expression("unexpected token ')'".into());
        assert_eq!(format!("{e}"), "expression error: unexpected token ')'");
    }

    #[test]
    fn io_error_from_conversion() {
        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "locked");
        let e: ShellError = io_err.into();
        let msg = format!("{e}");
        assert!(msg.contains("I/O error"));
        assert!(msg.contains("locked"));
    }

    #[test]
    fn interrupted_display() {
        assert_eq!(format!("{}", ShellError::Interrupted), "interrupted");
    }

    #[test]
    fn result_alias_roundtrip() {
        let ok: Result<u8> = Ok(7);
        assert_eq!(ok.unwrap(), 7);
        let err: Result<u8> = Err(ShellError::Vfs("cannot remove root".into()));
        assert!(err.is_err());
    }
}
