//! Generation stores
//!
//! A store persists each generation's shapes separately from the record of
//! which generations are complete. A generation becomes visible to readers
//! only once [`GenerationStore::mark_complete`] has run after a successful
//! [`GenerationStore::put_generation`].

pub mod file;
pub mod memory;

use crate::error::Result;
use crate::grid::Grid;

pub use file::FileStore;
pub use memory::MemoryStore;

/// Backend trait for persisting generations.
pub trait GenerationStore {
    /// Highest generation marked complete, or 0 for an empty store.
    fn max_complete_generation(&self) -> Result<usize>;

    /// All complete generations in ascending order.
    fn complete_generations(&self) -> Result<Vec<usize>>;

    /// Shapes of a complete generation. Fails for incomplete generations.
    fn get_generation(&self, n: usize) -> Result<Vec<Grid>>;

    /// Write the shapes of generation `n`, replacing any earlier write.
    ///
    /// Clears the completion flag of `n` first.
    fn put_generation(&mut self, n: usize, shapes: &[Grid]) -> Result<()>;

    /// Flag generation `n` complete. Its data must already be written.
    fn mark_complete(&mut self, n: usize) -> Result<()>;

    /// Number of shapes in a complete generation.
    fn count_generation(&self, n: usize) -> Result<usize> {
        Ok(self.get_generation(n)?.len())
    }

    /// Drop the data and completion flag of generation `n`.
    fn discard_generation(&mut self, n: usize) -> Result<()>;
}
