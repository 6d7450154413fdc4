//! Host-directory VFS implementation.
//!
//! Maps every virtual path to a descendant of a fixed root directory on the
//! real filesystem. The root is canonicalized once at construction and never
//! changes; the mapping re-normalizes every incoming path, so no sequence of
//! `..` segments can address anything outside the root. The process working
//! directory is never touched.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use sandsh_types::error::{Result, ShellError};

use crate::{EntryKind, Vfs, VfsEntry, VfsMetadata, resolve};

/// A virtual file system backed by one real directory tree.
#[derive(Debug)]
pub struct HostVfs {
    root: PathBuf,
}

impl HostVfs {
    /// Open a host directory as the root of the virtual tree.
    ///
    /// Fails when the path does not exist or is not a directory; callers
    /// treat that as fatal at startup.
    pub fn new(root: &Path) -> Result<Self> {
        let root = root.canonicalize()?;
        if !root.is_dir() {
            return Err(ShellError::Vfs(format!(
                "root is not a directory: {}",
                root.display()
            )));
        }
        Ok(Self { root })
    }

    /// The real directory backing the virtual root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a virtual path to the real path under the root.
    fn real(&self, vpath: &str) -> PathBuf {
        // Re-normalizing here makes containment hold even for callers that
        // bypass resolve().
        let clean = resolve("/", vpath);
        let mut real = self.root.clone();
        for seg in clean.split('/').filter(|s| !s.is_empty()) {
            real.push(seg);
        }
        real
    }

    fn kind_of(ft: fs::FileType) -> EntryKind {
        if ft.is_dir() {
            EntryKind::Directory
        } else if ft.is_symlink() {
            EntryKind::Symlink
        } else {
            EntryKind::File
        }
    }
}

impl Vfs for HostVfs {
    fn readdir(&self, path: &str) -> Result<Vec<VfsEntry>> {
        let real = self.real(path);
        if !real.is_dir() {
            return Err(ShellError::NotFound(path.to_string()));
        }
        let mut entries = Vec::new();
        for entry in fs::read_dir(&real)? {
            let entry = entry?;
            let meta = entry.metadata()?;
            entries.push(VfsEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                kind: Self::kind_of(meta.file_type()),
                size: meta.len(),
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    fn read(&self, path: &str) -> Result<Vec<u8>> {
        let real = self.real(path);
        if !real.exists() {
            return Err(ShellError::NotFound(path.to_string()));
        }
        Ok(fs::read(&real)?)
    }

    fn write(&mut self, path: &str, data: &[u8]) -> Result<()> {
        Ok(fs::write(self.real(path), data)?)
    }

    fn stat(&self, path: &str) -> Result<VfsMetadata> {
        let real = self.real(path);
        let meta = fs::symlink_metadata(&real)
            .map_err(|_| ShellError::NotFound(path.to_string()))?;
        #[cfg(unix)]
        let (mode, uid, gid) = {
            use std::os::unix::fs::MetadataExt;
            (meta.mode() & 0o7777, meta.uid(), meta.gid())
        };
        #[cfg(not(unix))]
        let (mode, uid, gid) = (
            if meta.is_dir() { 0o755 } else { 0o644 },
            0,
            0,
        );
        Ok(VfsMetadata {
            kind: Self::kind_of(meta.file_type()),
            size: meta.len(),
            mode,
            modified: meta.modified().ok(),
            accessed: meta.accessed().ok(),
            created: meta.created().ok(),
            uid,
            gid,
        })
    }

    fn mkdir(&mut self, path: &str) -> Result<()> {
        Ok(fs::create_dir_all(self.real(path))?)
    }

    fn remove_file(&mut self, path: &str) -> Result<()> {
        let real = self.real(path);
        if !real.exists() {
            return Err(ShellError::NotFound(path.to_string()));
        }
        Ok(fs::remove_file(real)?)
    }

    fn remove_dir(&mut self, path: &str) -> Result<()> {
        if resolve("/", path) == "/" {
            return Err(ShellError::Vfs("cannot remove root".to_string()));
        }
        let real = self.real(path);
        if !real.is_dir() {
            return Err(ShellError::NotFound(path.to_string()));
        }
        Ok(fs::remove_dir_all(real)?)
    }

    fn copy(&mut self, src: &str, dst: &str) -> Result<()> {
        let from = self.real(src);
        if !from.exists() {
            return Err(ShellError::NotFound(src.to_string()));
        }
        fs::copy(from, self.real(dst))?;
        Ok(())
    }

    fn rename(&mut self, src: &str, dst: &str) -> Result<()> {
        let from = self.real(src);
        if !from.exists() {
            return Err(ShellError::NotFound(src.to_string()));
        }
        Ok(fs::rename(from, self.real(dst))?)
    }

    fn truncate(&mut self, path: &str, size: u64) -> Result<()> {
        let real = self.real(path);
        if !real.exists() {
            return Err(ShellError::NotFound(path.to_string()));
        }
        let file = OpenOptions::new().write(true).open(real)?;
        file.set_len(size)?;
        Ok(())
    }

    fn exists(&self, path: &str) -> bool {
        self.real(path).exists()
    }

    fn set_mode(&mut self, path: &str, mode: u32) -> Result<()> {
        let real = self.real(path);
        if !real.exists() {
            return Err(ShellError::NotFound(path.to_string()));
        }
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(real, fs::Permissions::from_mode(mode))?;
            Ok(())
        }
        #[cfg(not(unix))]
        {
            let _ = mode;
            Ok(())
        }
    }

    fn symlink(&mut self, target: &str, link: &str) -> Result<()> {
        #[cfg(unix)]
        {
            Ok(std::os::unix::fs::symlink(
                self.real(target),
                self.real(link),
            )?)
        }
        #[cfg(not(unix))]
        {
            let _ = target;
            Err(ShellError::Unsupported(format!("symlink {link}")))
        }
    }

    fn hardlink(&mut self, src: &str, dst: &str) -> Result<()> {
        let from = self.real(src);
        if !from.exists() {
            return Err(ShellError::NotFound(src.to_string()));
        }
        Ok(fs::hard_link(from, self.real(dst))?)
    }

    fn readlink(&self, path: &str) -> Result<String> {
        let target = fs::read_link(self.real(path))
            .map_err(|_| ShellError::NotFound(path.to_string()))?;
        Ok(target.to_string_lossy().into_owned())
    }
}
