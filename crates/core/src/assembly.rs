//! Assemblies: bound sparse codes plus descriptive metadata

use serde::{Deserialize, Serialize};

use crate::{SparseCode, Triple};

/// What an assembly represents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssemblyKind {
    /// Produced by binding a triple's components
    KnowledgeTriple,
    /// Built outside the encoder, no structure known
    #[default]
    Opaque,
}

/// Active-position sets of each bound component, kept for future unbinding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentCodes {
    pub subject: Vec<u32>,
    pub predicate: Vec<u32>,
    pub object: Vec<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssemblyMetadata {
    pub kind: AssemblyKind,

    /// Originating fact
    pub triple: Option<Triple>,

    /// Confidence used for binding strength, if one was supplied
    pub confidence: Option<f32>,

    /// Provenance tag set by the store that accepted the assembly
    pub source: Option<String>,

    pub components: Option<ComponentCodes>,
}

/// A bound code and its metadata, held as one immutable unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assembly {
    code: SparseCode,
    metadata: AssemblyMetadata,
}

impl Assembly {
    pub fn new(code: SparseCode, metadata: AssemblyMetadata) -> Self {
        Self { code, metadata }
    }

    /// Return a copy of this assembly tagged with `source`.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.metadata.source = Some(source.into());
        self
    }

    pub fn code(&self) -> &SparseCode {
        &self.code
    }

    pub fn positions(&self) -> &[u32] {
        self.code.positions()
    }

    pub fn weights(&self) -> &[f32] {
        self.code.weights()
    }

    pub fn metadata(&self) -> &AssemblyMetadata {
        &self.metadata
    }

    /// Originating triple, when the metadata carries one.
    pub fn triple(&self) -> Option<&Triple> {
        self.metadata.triple.as_ref()
    }

    /// Number of active positions.
    pub fn size(&self) -> usize {
        self.code.active_count()
    }

    pub fn mean_weight(&self) -> f32 {
        self.code.mean_weight()
    }

    /// Cosine similarity of the two bound codes.
    pub fn cosine(&self, other: &Assembly) -> f32 {
        self.code.cosine(&other.code)
    }

    /// Digest of the active-position set.
    pub fn position_hash(&self) -> String {
        self.code.position_hash()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Assembly {
        let code = SparseCode::binary(16, [2, 5, 11]).unwrap().scaled(0.5);
        Assembly::new(
            code,
            AssemblyMetadata {
                kind: AssemblyKind::KnowledgeTriple,
                triple: Some(Triple::new("a", "b", "c")),
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_cosine_matches_code() {
        let asm = sample();
        let other = Assembly::new(SparseCode::binary(16, [2, 5]).unwrap(), AssemblyMetadata::default());
        assert!((asm.cosine(&other) - asm.code().cosine(other.code())).abs() < 1e-7);
        assert!((asm.cosine(&asm) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_with_source_keeps_everything_else() {
        let asm = sample();
        let tagged = asm.clone().with_source("explicit_knowledge");
        assert_eq!(tagged.metadata().source.as_deref(), Some("explicit_knowledge"));
        assert_eq!(tagged.positions(), asm.positions());
        assert_eq!(tagged.triple(), asm.triple());
    }

    #[test]
    fn test_size_and_mean_weight() {
        let asm = sample();
        assert_eq!(asm.size(), 3);
        assert!((asm.mean_weight() - 0.5).abs() < 1e-7);
    }
}
