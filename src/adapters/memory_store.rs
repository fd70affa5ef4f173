//! JSON file store for continuation memory.

use crate::domain::error::MarketsimError;
use crate::domain::memory::ContinuationMemory;
use crate::ports::memory_port::MemoryPort;
use std::fs;
use std::path::PathBuf;

pub struct FileMemoryStore {
    path: PathBuf,
}

impl FileMemoryStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl MemoryPort for FileMemoryStore {
    fn load(&self) -> Result<ContinuationMemory, MarketsimError> {
        if !self.path.exists() {
            return Ok(ContinuationMemory::new());
        }
        let content = fs::read_to_string(&self.path).map_err(|e| MarketsimError::Data {
            reason: format!("failed to read {}: {}", self.path.display(), e),
        })?;
        serde_json::from_str(&content).map_err(|e| MarketsimError::Data {
            reason: format!("{}: invalid memory file: {}", self.path.display(), e),
        })
    }

    fn save(&self, memory: &ContinuationMemory) -> Result<(), MarketsimError> {
        let json = serde_json::to_string_pretty(memory).map_err(|e| MarketsimError::Data {
            reason: format!("failed to encode memory: {}", e),
        })?;
        fs::write(&self.path, json)?;
        Ok(())
    }
}
