//! Foundation types for sandsh.
//!
//! This crate contains the error taxonomy shared by all sandsh crates. Every
//! command handler and filesystem operation reports failures through
//! [`error::ShellError`]; fatal startup errors are the binary's concern and
//! use `anyhow` there instead.

pub mod error;
