//! Long-term memory collaborator
//!
//! An external store the bridge can delegate to instead of keeping
//! assemblies itself.

use kbridge_core::Assembly;
use std::fmt;

use crate::vector;

/// Long-term memory interface consumed by [`crate::MemoryBridge`]
pub trait LongTermMemory: fmt::Debug + Send {
    /// Store an assembly with a retention weight.
    fn store(&mut self, assembly: &Assembly, weight: f32);

    /// The `k` stored assemblies most similar to `assembly`, best first.
    fn retrieve_similar(&self, assembly: &Assembly, k: usize) -> Vec<(Assembly, f32)>;
}

/// In-process long-term memory backed by a vector and linear scan
#[derive(Debug, Default)]
pub struct VecLongTermMemory {
    entries: Vec<(Assembly, f32)>,
}

impl VecLongTermMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Stored weights in insertion order
    pub fn weights(&self) -> Vec<f32> {
        self.entries.iter().map(|(_, w)| *w).collect()
    }
}

impl LongTermMemory for VecLongTermMemory {
    fn store(&mut self, assembly: &Assembly, weight: f32) {
        self.entries.push((assembly.clone(), weight));
    }

    fn retrieve_similar(&self, assembly: &Assembly, k: usize) -> Vec<(Assembly, f32)> {
        vector::scan(assembly, self.entries.iter().map(|(a, _)| a), k)
            .into_iter()
            .map(|(a, score)| (a.clone(), score))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kbridge_core::{AssemblyMetadata, SparseCode};

    fn asm(positions: &[u32]) -> Assembly {
        Assembly::new(
            SparseCode::binary(32, positions.iter().copied()).unwrap(),
            AssemblyMetadata::default(),
        )
    }

    #[test]
    fn test_store_and_retrieve() {
        let mut ltm = VecLongTermMemory::new();
        ltm.store(&asm(&[1, 2, 3]), 0.9);
        ltm.store(&asm(&[20, 21]), 0.4);
        assert_eq!(ltm.len(), 2);
        assert_eq!(ltm.weights(), vec![0.9, 0.4]);

        let found = ltm.retrieve_similar(&asm(&[1, 2]), 1);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].0.positions(), &[1, 2, 3]);
    }
}
