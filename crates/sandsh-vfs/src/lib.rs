//! Virtual file system abstraction for sandsh.
//!
//! All shell commands see a tree of `/`-rooted virtual paths. The only
//! component that touches real storage is [`HostVfs`], which maps every
//! virtual path to a descendant of a fixed root directory chosen at startup.
//! [`MemoryVfs`] implements the same trait over an in-memory tree and backs
//! most of the unit tests.
//!
//! Virtual paths are plain strings. [`resolve`] is the single place where
//! `.`/`..` handling happens; its output never escapes `/`, so containment
//! under the root holds by construction and the host process working
//! directory is never consulted or changed.

use std::time::SystemTime;

use sandsh_types::error::{Result, ShellError};

mod host;
mod memory;

pub use host::HostVfs;
pub use memory::MemoryVfs;

/// What kind of node a directory entry or metadata record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
    Symlink,
}

/// One entry returned by [`Vfs::readdir`].
#[derive(Debug, Clone)]
pub struct VfsEntry {
    pub name: String,
    pub kind: EntryKind,
    pub size: u64,
}

/// Metadata returned by [`Vfs::stat`].
#[derive(Debug, Clone)]
pub struct VfsMetadata {
    pub kind: EntryKind,
    pub size: u64,
    /// Unix permission bits; backends without a mode concept report 0o644
    /// for files and 0o755 for directories.
    pub mode: u32,
    pub modified: Option<SystemTime>,
    pub accessed: Option<SystemTime>,
    pub created: Option<SystemTime>,
    pub uid: u32,
    pub gid: u32,
}

/// Capability interface for file and directory access.
///
/// Every method takes virtual absolute paths (output of [`resolve`]).
/// Handles never outlive a call: each operation opens, uses, and releases
/// whatever it needs before returning.
pub trait Vfs {
    /// List the entries of a directory, sorted by name.
    fn readdir(&self, path: &str) -> Result<Vec<VfsEntry>>;

    /// Read the full contents of a file.
    fn read(&self, path: &str) -> Result<Vec<u8>>;

    /// Create or overwrite a file with the given bytes.
    fn write(&mut self, path: &str, data: &[u8]) -> Result<()>;

    /// Query metadata without following symlinks.
    fn stat(&self, path: &str) -> Result<VfsMetadata>;

    /// Create a directory, including missing parents. Existing is not an
    /// error.
    fn mkdir(&mut self, path: &str) -> Result<()>;

    /// Remove a file (not a directory).
    fn remove_file(&mut self, path: &str) -> Result<()>;

    /// Remove a directory and everything under it. Root cannot be removed.
    fn remove_dir(&mut self, path: &str) -> Result<()>;

    /// Copy a file's bytes to a new path.
    fn copy(&mut self, src: &str, dst: &str) -> Result<()>;

    /// Move or rename a file or directory.
    fn rename(&mut self, src: &str, dst: &str) -> Result<()>;

    /// Truncate or extend a file to exactly `size` bytes.
    fn truncate(&mut self, path: &str, size: u64) -> Result<()>;

    /// Whether a node exists at the path.
    fn exists(&self, path: &str) -> bool;

    /// Change permission bits. Backends without modes treat this as a no-op.
    fn set_mode(&mut self, _path: &str, _mode: u32) -> Result<()> {
        Ok(())
    }

    /// Create a symbolic link at `link` pointing to `target`.
    fn symlink(&mut self, _target: &str, link: &str) -> Result<()> {
        Err(ShellError::Unsupported(format!("symlink {link}")))
    }

    /// Create a hard link at `dst` referring to `src`.
    fn hardlink(&mut self, _src: &str, dst: &str) -> Result<()> {
        Err(ShellError::Unsupported(format!("hard link {dst}")))
    }

    /// Read the target of a symbolic link.
    fn readlink(&self, path: &str) -> Result<String> {
        Err(ShellError::Unsupported(format!("readlink {path}")))
    }

    /// Total bytes of the file, or of every file under the directory.
    fn disk_usage(&self, path: &str) -> Result<u64> {
        let meta = self.stat(path)?;
        if meta.kind != EntryKind::Directory {
            return Ok(meta.size);
        }
        let mut total = 0;
        for entry in self.readdir(path)? {
            total += self.disk_usage(&join(path, &entry.name))?;
        }
        Ok(total)
    }
}

/// Resolve a user-supplied path against the current virtual directory.
///
/// Absolute inputs replace `cwd`; relative inputs join onto it. `.` and
/// empty segments are dropped, `..` pops one segment and is a no-op at the
/// root, so the result is always a `/`-rooted path that stays inside the
/// tree no matter how many `..` segments the input carries.
pub fn resolve(cwd: &str, input: &str) -> String {
    let raw = if input.starts_with('/') {
        input.to_string()
    } else if cwd == "/" {
        format!("/{input}")
    } else {
        format!("{cwd}/{input}")
    };

    let mut parts: Vec<&str> = Vec::new();
    for component in raw.split('/') {
        match component {
            "" | "." => {},
            ".." => {
                parts.pop();
            },
            other => parts.push(other),
        }
    }

    if parts.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", parts.join("/"))
    }
}

/// Join a child name onto a virtual directory path.
pub fn join(dir: &str, name: &str) -> String {
    if dir == "/" {
        format!("/{name}")
    } else {
        format!("{dir}/{name}")
    }
}

/// Parent directory of a virtual path (`/` is its own parent).
pub fn parent(path: &str) -> &str {
    if path == "/" {
        return "/";
    }
    match path.rfind('/') {
        Some(0) => "/",
        Some(i) => &path[..i],
        None => "/",
    }
}

/// Final component of a virtual path (empty for `/`).
pub fn file_name(path: &str) -> &str {
    match path.rfind('/') {
        Some(i) => &path[i + 1..],
        None => path,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_relative_onto_cwd() {
        assert_eq!(resolve("/home", "notes.txt"), "/home/notes.txt");
        assert_eq!(resolve("/", "notes.txt"), "/notes.txt");
    }

    #[test]
    fn resolve_absolute_replaces_cwd() {
        assert_eq!(resolve("/home/user", "/etc/motd"), "/etc/motd");
    }

    #[test]
    fn resolve_drops_dot_and_empty_segments() {
        assert_eq!(resolve("/a", "./b//c/."), "/a/b/c");
    }

    #[test]
    fn resolve_pops_dotdot() {
        assert_eq!(resolve("/a/b", ".."), "/a");
        assert_eq!(resolve("/a/b", "../c"), "/a/c");
    }

    #[test]
    fn resolve_clamps_at_root() {
        assert_eq!(resolve("/", ".."), "/");
        assert_eq!(resolve("/a", "../../../.."), "/");
        assert_eq!(resolve("/", "../../etc"), "/etc");
    }

    #[test]
    fn join_and_parent_are_inverse() {
        let p = join("/a/b", "c");
        assert_eq!(p, "/a/b/c");
        assert_eq!(parent(&p), "/a/b");
        assert_eq!(parent("/c"), "/");
        assert_eq!(parent("/"), "/");
    }

    #[test]
    fn file_name_of_paths() {
        assert_eq!(file_name("/a/b/c.txt"), "c.txt");
        assert_eq!(file_name("/top"), "top");
        assert_eq!(file_name("/"), "");
    }

    mod prop {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn resolve_never_escapes_root(
                cwd_segs in proptest::collection::vec("[a-z]{1,6}", 0..4),
                input in "[a-z./]{0,40}",
            ) {
                let cwd = if cwd_segs.is_empty() {
                    "/".to_string()
                } else {
                    format!("/{}", cwd_segs.join("/"))
                };
                let resolved = resolve(&cwd, &input);
                prop_assert!(resolved.starts_with('/'));
                prop_assert!(!resolved.contains("/../") && !resolved.ends_with("/.."));
                prop_assert!(!resolved.contains("//"));
            }

            #[test]
            fn resolve_is_idempotent(
                input in "[a-z./]{0,40}",
            ) {
                let once = resolve("/", &input);
                let twice = resolve("/", &once);
                prop_assert_eq!(once, twice);
            }
        }
    }
}
