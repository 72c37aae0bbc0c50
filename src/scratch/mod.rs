mod dir;
mod memory;

pub use dir::DirScratch;
pub use memory::MemoryScratch;

use anyhow::Result;
use std::path::PathBuf;

/// Trait for places where a request stages its intermediate images
pub trait ScratchStore: Send + Sync {
    /// Start a session private to one request
    fn open_session(&self) -> Result<Box<dyn ScratchSession>>;
}

/// Files written during one request
///
/// Names are flat (`square.png`, `first.jpg`, ...). Sessions never see each
/// other's files.
pub trait ScratchSession {
    /// Unique identifier of this session, used in logs
    fn id(&self) -> &str;

    fn write(&mut self, name: &str, bytes: &[u8]) -> Result<()>;

    fn read(&self, name: &str) -> Result<Vec<u8>>;
}

/// Build the store selected on the command line
pub fn create_store(dir: Option<PathBuf>, keep: bool) -> Result<Box<dyn ScratchStore>> {
    match dir {
        Some(root) => {
            tracing::info!("Staging intermediates under {}", root.display());
            Ok(Box::new(DirScratch::new(root, keep)?))
        }
        None => {
            tracing::info!("Staging intermediates in memory");
            Ok(Box::new(MemoryScratch))
        }
    }
}
