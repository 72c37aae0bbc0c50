use super::{ScratchSession, ScratchStore};
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use ulid::Ulid;

/// Stages files on disk, one fresh `<root>/<ULID>/` directory per request
pub struct DirScratch {
    root: PathBuf,
    keep: bool,
}

impl DirScratch {
    pub fn new<P: AsRef<Path>>(root: P, keep: bool) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create scratch root {}", root.display()))?;

        Ok(Self { root, keep })
    }
}

impl ScratchStore for DirScratch {
    fn open_session(&self) -> Result<Box<dyn ScratchSession>> {
        let id = Ulid::new().to_string();
        let dir = self.root.join(&id);
        fs::create_dir(&dir)
            .with_context(|| format!("Failed to create scratch directory {}", dir.display()))?;

        tracing::debug!("Opened scratch session {}", dir.display());

        Ok(Box::new(DirSession {
            id,
            dir,
            keep: self.keep,
        }))
    }
}

struct DirSession {
    id: String,
    dir: PathBuf,
    keep: bool,
}

impl DirSession {
    fn path(&self, name: &str) -> Result<PathBuf> {
        let file = Path::new(name);
        if file.components().count() != 1 || file.file_name().is_none() {
            anyhow::bail!("scratch file name {:?} must be a bare file name", name);
        }
        Ok(self.dir.join(file))
    }
}

impl ScratchSession for DirSession {
    fn id(&self) -> &str {
        &self.id
    }

    fn write(&mut self, name: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path(name)?;
        fs::write(&path, bytes).with_context(|| format!("Failed to write {}", path.display()))
    }

    fn read(&self, name: &str) -> Result<Vec<u8>> {
        let path = self.path(name)?;
        fs::read(&path).with_context(|| format!("Failed to read {}", path.display()))
    }
}

impl Drop for DirSession {
    fn drop(&mut self) {
        if self.keep {
            return;
        }
        if let Err(e) = fs::remove_dir_all(&self.dir) {
            tracing::warn!("Failed to remove scratch directory {}: {}", self.dir.display(), e);
        }
    }
}
