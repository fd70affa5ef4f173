//! Continuation memory persistence port trait.

use crate::domain::error::MarketsimError;
use crate::domain::memory::ContinuationMemory;

pub trait MemoryPort {
    /// Load the memory from the backing store; a store with no memory yet
    /// yields a fresh uninitialized one.
    fn load(&self) -> Result<ContinuationMemory, MarketsimError>;

    fn save(&self, memory: &ContinuationMemory) -> Result<(), MarketsimError>;
}
