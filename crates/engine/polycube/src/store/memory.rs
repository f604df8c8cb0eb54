use super::GenerationStore;
use crate::error::{PolycubeError, Result};
use crate::grid::Grid;
use std::collections::{BTreeMap, BTreeSet};

/// In-memory store for tests and dry runs.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    data: BTreeMap<usize, Vec<Grid>>,
    complete: BTreeSet<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl GenerationStore for MemoryStore {
    fn max_complete_generation(&self) -> Result<usize> {
        Ok(self.complete.last().copied().unwrap_or(0))
    }

    fn complete_generations(&self) -> Result<Vec<usize>> {
        Ok(self.complete.iter().copied().collect())
    }

    fn get_generation(&self, n: usize) -> Result<Vec<Grid>> {
        if !self.complete.contains(&n) {
            return Err(PolycubeError::GenerationNotComplete(n));
        }
        self.data
            .get(&n)
            .cloned()
            .ok_or(PolycubeError::MissingGeneration(n))
    }

    fn put_generation(&mut self, n: usize, shapes: &[Grid]) -> Result<()> {
        self.complete.remove(&n);
        self.data.insert(n, shapes.to_vec());
        Ok(())
    }

    fn mark_complete(&mut self, n: usize) -> Result<()> {
        if !self.data.contains_key(&n) {
            return Err(PolycubeError::MissingGeneration(n));
        }
        self.complete.insert(n);
        Ok(())
    }

    fn count_generation(&self, n: usize) -> Result<usize> {
        if !self.complete.contains(&n) {
            return Err(PolycubeError::GenerationNotComplete(n));
        }
        Ok(self.data.get(&n).map_or(0, Vec::len))
    }

    fn discard_generation(&mut self, n: usize) -> Result<()> {
        self.complete.remove(&n);
        self.data.remove(&n);
        Ok(())
    }
}
