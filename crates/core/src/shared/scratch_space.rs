use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use thiserror::Error;

use crate::shared::constants::SCRATCH_PREFIX;

#[derive(Error, Debug)]
pub enum ScratchError {
    #[error("failed to create scratch directory under {root}: {source}")]
    Create {
        root: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to move {from} to {to}: {source}")]
    Persist {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A private working directory for one pipeline run.
///
/// Every run gets its own uniquely named directory, so concurrent runs never
/// collide on intermediate paths. Dropping the value removes the directory
/// and anything still inside it.
#[derive(Debug)]
pub struct ScratchSpace {
    dir: TempDir,
}

impl ScratchSpace {
    /// Creates a fresh directory under `root`, or the system temp dir.
    pub fn create(root: Option<&Path>) -> Result<Self, ScratchError> {
        let root = root
            .map(Path::to_path_buf)
            .unwrap_or_else(std::env::temp_dir);
        fs::create_dir_all(&root).map_err(|e| ScratchError::Create {
            root: root.clone(),
            source: e,
        })?;
        let dir = tempfile::Builder::new()
            .prefix(SCRATCH_PREFIX)
            .tempdir_in(&root)
            .map_err(|e| ScratchError::Create { root, source: e })?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn file(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Moves a finished artifact out of scratch to its final location.
    ///
    /// Falls back to copy + remove when a plain rename crosses filesystems.
    pub fn persist(&self, from: &Path, to: &Path) -> Result<(), ScratchError> {
        let wrap = |e: io::Error| ScratchError::Persist {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
            source: e,
        };
        if let Some(parent) = to.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(wrap)?;
            }
        }
        if fs::rename(from, to).is_ok() {
            return Ok(());
        }
        // Copy to a sibling first so a failed copy never leaves a
        // truncated file at the destination.
        let staging = to.with_extension("part");
        if let Err(e) = fs::copy(from, &staging) {
            let _ = fs::remove_file(&staging);
            return Err(wrap(e));
        }
        fs::rename(&staging, to).map_err(|e| {
            let _ = fs::remove_file(&staging);
            wrap(e)
        })?;
        let _ = fs::remove_file(from);
        Ok(())
    }

    /// Removes the directory now, reporting failures instead of ignoring them.
    pub fn close(self) -> io::Result<()> {
        self.dir.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_makes_unique_directories() {
        let root = TempDir::new().unwrap();
        let a = ScratchSpace::create(Some(root.path())).unwrap();
        let b = ScratchSpace::create(Some(root.path())).unwrap();
        assert!(a.path().is_dir());
        assert!(b.path().is_dir());
        assert_ne!(a.path(), b.path());
        assert!(a
            .path()
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("subburn-"));
    }

    #[test]
    fn test_drop_removes_directory_and_contents() {
        let root = TempDir::new().unwrap();
        let scratch = ScratchSpace::create(Some(root.path())).unwrap();
        let path = scratch.path().to_path_buf();
        fs::write(scratch.file("partial.mp4"), b"half written").unwrap();
        drop(scratch);
        assert!(!path.exists());
    }

    #[test]
    fn test_create_builds_missing_root() {
        let root = TempDir::new().unwrap();
        let nested = root.path().join("a").join("b");
        let scratch = ScratchSpace::create(Some(&nested)).unwrap();
        assert!(scratch.path().starts_with(&nested));
    }

    #[test]
    fn test_persist_moves_file() {
        let root = TempDir::new().unwrap();
        let scratch = ScratchSpace::create(Some(root.path())).unwrap();
        let from = scratch.file("out.mp4");
        fs::write(&from, b"video").unwrap();
        let to = root.path().join("final").join("subtitled_out.mp4");

        scratch.persist(&from, &to).unwrap();

        assert!(!from.exists());
        assert_eq!(fs::read(&to).unwrap(), b"video");
    }

    #[test]
    fn test_persist_missing_source_is_error() {
        let root = TempDir::new().unwrap();
        let scratch = ScratchSpace::create(Some(root.path())).unwrap();
        let to = root.path().join("subtitled_out.mp4");
        let result = scratch.persist(&scratch.file("missing.mp4"), &to);
        assert!(matches!(result, Err(ScratchError::Persist { .. })));
        assert!(!to.exists());
    }

    #[test]
    fn test_close_removes_directory() {
        let root = TempDir::new().unwrap();
        let scratch = ScratchSpace::create(Some(root.path())).unwrap();
        let path = scratch.path().to_path_buf();
        scratch.close().unwrap();
        assert!(!path.exists());
    }
}
