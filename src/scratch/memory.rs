use super::{ScratchSession, ScratchStore};
use anyhow::{Context, Result};
use std::collections::HashMap;
use ulid::Ulid;

/// Keeps every staged file in the session's own buffers
pub struct MemoryScratch;

impl ScratchStore for MemoryScratch {
    fn open_session(&self) -> Result<Box<dyn ScratchSession>> {
        Ok(Box::new(MemorySession {
            id: Ulid::new().to_string(),
            files: HashMap::new(),
        }))
    }
}

struct MemorySession {
    id: String,
    files: HashMap<String, Vec<u8>>,
}

impl ScratchSession for MemorySession {
    fn id(&self) -> &str {
        &self.id
    }

    fn write(&mut self, name: &str, bytes: &[u8]) -> Result<()> {
        self.files.insert(name.to_string(), bytes.to_vec());
        Ok(())
    }

    fn read(&self, name: &str) -> Result<Vec<u8>> {
        self.files
            .get(name)
            .cloned()
            .with_context(|| format!("{} was never staged in session {}", name, self.id))
    }
}
