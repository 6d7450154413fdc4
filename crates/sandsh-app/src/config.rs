//! Startup configuration.
//!
//! Read from `sandsh.toml` in the launch directory when present; every
//! field has a default so the file is optional.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Root of the sandbox tree; the launch directory when unset.
    pub root: Option<PathBuf>,
    /// Append-only log file, created at startup if absent.
    pub log_file: PathBuf,
    /// Maximum history entries kept in memory; 0 means unbounded.
    pub history_limit: usize,
    /// Aliases defined before the first prompt.
    pub aliases: HashMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root: None,
            log_file: PathBuf::from("sandsh.log"),
            history_limit: 0,
            aliases: HashMap::new(),
        }
    }
}

impl Config {
    /// Load from the given file, or defaults when it does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("parsing {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let config = Config::load(Path::new("/no/such/sandsh.toml")).unwrap();
        assert_eq!(config.log_file, PathBuf::from("sandsh.log"));
        assert_eq!(config.history_limit, 0);
        assert!(config.root.is_none());
        assert!(config.aliases.is_empty());
    }

    #[test]
    fn full_file_parses() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sandsh.toml");
        std::fs::write(
            &path,
            "root = \"/srv/box\"\nlog_file = \"box.log\"\nhistory_limit = 500\n\n[aliases]\nll = \"ls\"\n",
        )
        .unwrap();
        let config = Config::load(&path).unwrap();
        assert_eq!(config.root, Some(PathBuf::from("/srv/box")));
        assert_eq!(config.log_file, PathBuf::from("box.log"));
        assert_eq!(config.history_limit, 500);
        assert_eq!(config.aliases["ll"], "ls");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sandsh.toml");
        std::fs::write(&path, "no_such_key = 1\n").unwrap();
        assert!(Config::load(&path).is_err());
    }
}
