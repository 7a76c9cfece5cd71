//! Encoder - symbolic triples to sparse assemblies
//!
//! Responsibilities:
//! - Entity / relation vocabularies with seeded, lazily generated codes
//! - Binding: superposition followed by top-k re-sparsification
//! - Cosine similarity and linear-scan retrieval
//! - Vocabulary persistence
//!
//! Binding keeps the k highest superposed positions. When several positions
//! share the threshold value, the lowest indices win.

use kbridge_core::{
    Assembly, AssemblyKind, AssemblyMetadata, ComponentCodes, Confidence, EncoderConfig,
    EncodingError, SparseCode, Triple, Unsupported,
};
use kbridge_persistence::{PersistenceError, SnapshotFile, SnapshotKind};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::vector;
use crate::vocabulary::{Vocabulary, VocabularySnapshot};

/// Encoding counters. Monotonic; not synchronized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncoderStats {
    pub entities_encoded: u64,
    pub relations_encoded: u64,
    pub triples_encoded: u64,
    pub encoding_errors: u64,
}

/// Everything `save` writes: both vocabularies and the counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncoderState {
    pub width: usize,
    pub entities: VocabularySnapshot,
    pub relations: VocabularySnapshot,
    pub stats: EncoderStats,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Namespace {
    Entity,
    Relation,
}

#[derive(Debug)]
pub struct Encoder {
    config: EncoderConfig,

    /// Active positions per fresh code
    k: usize,

    rng: ChaCha8Rng,
    entities: Vocabulary,
    relations: Vocabulary,
    stats: EncoderStats,
}

impl Encoder {
    pub fn new(config: EncoderConfig) -> Result<Self, EncodingError> {
        config.validate()?;
        let k = config.active_count();
        debug!(
            "Encoder width={} sparsity={} k={} seed={}",
            config.width, config.sparsity, k, config.seed
        );
        Ok(Self {
            k,
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            entities: Vocabulary::with_capacity(config.vocab_capacity),
            relations: Vocabulary::with_capacity(config.vocab_capacity),
            stats: EncoderStats::default(),
            config,
        })
    }

    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    pub fn width(&self) -> usize {
        self.config.width
    }

    /// Active positions in a fresh code.
    pub fn k(&self) -> usize {
        self.k
    }

    pub fn stats(&self) -> EncoderStats {
        self.stats
    }

    pub fn entities(&self) -> &Vocabulary {
        &self.entities
    }

    pub fn relations(&self) -> &Vocabulary {
        &self.relations
    }

    /// (entity count, relation count)
    pub fn vocabulary_sizes(&self) -> (usize, usize) {
        (self.entities.len(), self.relations.len())
    }

    pub fn encode_entity(&mut self, name: &str) -> Result<SparseCode, EncodingError> {
        self.encode_in(Namespace::Entity, name)
    }

    /// Same algorithm as entities, separate namespace.
    pub fn encode_relation(&mut self, name: &str) -> Result<SparseCode, EncodingError> {
        self.encode_in(Namespace::Relation, name)
    }

    fn encode_in(&mut self, namespace: Namespace, name: &str) -> Result<SparseCode, EncodingError> {
        let vocab = match namespace {
            Namespace::Entity => &self.entities,
            Namespace::Relation => &self.relations,
        };
        if let Some(code) = vocab.get(name) {
            return Ok(code.clone());
        }

        let positions = rand::seq::index::sample(&mut self.rng, self.config.width, self.k);
        let code = SparseCode::binary(
            self.config.width,
            positions.into_iter().map(|p| p as u32),
        )?;
        if code.active_count() != self.k {
            return Err(EncodingError::MalformedCode(format!(
                "drew {} positions, expected {}",
                code.active_count(),
                self.k
            )));
        }

        match namespace {
            Namespace::Entity => {
                self.entities.insert(name, code.clone());
                self.stats.entities_encoded += 1;
            }
            Namespace::Relation => {
                self.relations.insert(name, code.clone());
                self.stats.relations_encoded += 1;
            }
        }
        debug!("New {:?} code for {:?}", namespace, name);

        Ok(code)
    }

    /// Exact name for an entity code, if this encoder generated it.
    pub fn decode_entity_code(&self, code: &SparseCode) -> Option<&str> {
        self.entities.decode(code)
    }

    pub fn decode_relation_code(&self, code: &SparseCode) -> Option<&str> {
        self.relations.decode(code)
    }

    /// Bind codes into one: superpose, keep the top k positions (lowest
    /// index first on ties), binarize, scale by `strength`.
    ///
    /// Only positive superposed values count as active. With k or fewer
    /// active positions all of them are kept. No inputs gives the zero code.
    pub fn bind_codes(
        &self,
        codes: &[&SparseCode],
        strength: f32,
    ) -> Result<SparseCode, EncodingError> {
        if !(0.0..=1.0).contains(&strength) {
            return Err(EncodingError::InvalidStrength(strength));
        }
        let width = self.config.width;

        let mut superposed = vec![0.0f32; width];
        for code in codes {
            if code.width() != width {
                return Err(EncodingError::WidthMismatch {
                    expected: width,
                    found: code.width(),
                });
            }
            for (&p, &w) in code.positions().iter().zip(code.weights()) {
                superposed[p as usize] += w;
            }
        }

        // Ascending index order here is what makes the stable sort below
        // break threshold ties toward the lowest index.
        let mut active: Vec<(u32, f32)> = superposed
            .iter()
            .enumerate()
            .filter(|&(_, &v)| v > 0.0)
            .map(|(i, &v)| (i as u32, v))
            .collect();

        if active.len() > self.k {
            active.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
            active.truncate(self.k);
        }

        let bound = SparseCode::binary(width, active.into_iter().map(|(p, _)| p))?;
        Ok(bound.scaled(strength))
    }

    /// Encode a triple into an assembly.
    ///
    /// Binding strength is the explicit confidence, else the triple's own
    /// confidence, else the configured default. Counts one success or one
    /// error per call.
    pub fn encode_triple(
        &mut self,
        triple: &Triple,
        confidence: Option<&Confidence>,
    ) -> Result<Assembly, EncodingError> {
        match self.try_encode_triple(triple, confidence) {
            Ok(assembly) => {
                self.stats.triples_encoded += 1;
                Ok(assembly)
            }
            Err(e) => {
                self.stats.encoding_errors += 1;
                warn!("Failed to encode triple {}: {}", triple, e);
                Err(e)
            }
        }
    }

    fn try_encode_triple(
        &mut self,
        triple: &Triple,
        confidence: Option<&Confidence>,
    ) -> Result<Assembly, EncodingError> {
        // Checked before any vocabulary entry is created
        let confidence = confidence.map(|c| c.p).or(triple.confidence);
        if let Some(p) = confidence {
            if !(0.0..=1.0).contains(&p) {
                return Err(EncodingError::InvalidConfidence(p));
            }
        }
        let strength = confidence.unwrap_or(self.config.default_strength);

        let subject = self.encode_entity(&triple.subject)?;
        let predicate = self.encode_relation(&triple.predicate)?;
        let object = self.encode_entity(&triple.object)?;

        let bound = self.bind_codes(&[&subject, &predicate, &object], strength)?;

        let metadata = AssemblyMetadata {
            kind: AssemblyKind::KnowledgeTriple,
            triple: Some(triple.clone()),
            confidence,
            source: None,
            components: Some(ComponentCodes {
                subject: subject.positions().to_vec(),
                predicate: predicate.positions().to_vec(),
                object: object.positions().to_vec(),
            }),
        };

        Ok(Assembly::new(bound, metadata))
    }

    /// Read the originating triple from metadata.
    ///
    /// Returns `None` when the metadata carries no triple; see
    /// [`Encoder::decode_by_pattern`] for the unbinding path.
    pub fn decode_assembly(&self, assembly: &Assembly) -> Option<Triple> {
        assembly.triple().cloned()
    }

    /// Recover a triple from the bound code alone, without metadata.
    ///
    /// Unbinding is not available; this always returns [`Unsupported`].
    pub fn decode_by_pattern(&self, _assembly: &Assembly) -> Result<Triple, Unsupported> {
        Err(Unsupported("pattern-based assembly decoding"))
    }

    /// Cosine similarity of two codes; 0 when either is a zero vector.
    pub fn similarity(&self, a: &SparseCode, b: &SparseCode) -> f32 {
        a.cosine(b)
    }

    pub fn assembly_similarity(&self, a: &Assembly, b: &Assembly) -> f32 {
        a.cosine(b)
    }

    /// Encode `query` and rank `candidates` by similarity to it.
    ///
    /// Full linear scan; equal scores keep candidate order.
    pub fn retrieve_similar<'a>(
        &mut self,
        query: &Triple,
        candidates: &'a [Assembly],
        top_k: usize,
    ) -> Result<Vec<(&'a Assembly, f32)>, EncodingError> {
        let query = self.encode_triple(query, None)?;
        Ok(vector::scan(&query, candidates, top_k))
    }

    pub fn snapshot(&self) -> EncoderState {
        EncoderState {
            width: self.config.width,
            entities: self.entities.snapshot(),
            relations: self.relations.snapshot(),
            stats: self.stats,
        }
    }

    /// Replace vocabularies and counters with `state`.
    ///
    /// Nothing changes unless the whole state is valid for this encoder:
    /// same width, and every code has exactly k active positions.
    /// The random source is not rewound; names first seen after a restore
    /// get fresh draws.
    pub fn restore(&mut self, state: EncoderState) -> Result<(), PersistenceError> {
        if state.width != self.config.width {
            return Err(PersistenceError::Incompatible(format!(
                "snapshot width {} differs from encoder width {}",
                state.width, self.config.width
            )));
        }
        if let Some((name, code)) = state
            .entities
            .codes
            .iter()
            .chain(&state.relations.codes)
            .find(|(_, code)| code.active_count() != self.k)
        {
            return Err(PersistenceError::Incompatible(format!(
                "code for {:?} has {} active positions, encoder uses {}",
                name,
                code.active_count(),
                self.k
            )));
        }
        let width = self.config.width;
        let entities = Vocabulary::from_snapshot(state.entities, width)
            .map_err(|e| PersistenceError::Incompatible(format!("entity vocabulary: {e}")))?;
        let relations = Vocabulary::from_snapshot(state.relations, width)
            .map_err(|e| PersistenceError::Incompatible(format!("relation vocabulary: {e}")))?;

        self.entities = entities;
        self.relations = relations;
        self.stats = state.stats;
        Ok(())
    }

    /// Save vocabularies and counters as one snapshot.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), PersistenceError> {
        SnapshotFile::new(path.as_ref()).write(SnapshotKind::Encoder, &self.snapshot())?;
        Ok(())
    }

    /// Load a snapshot, fully replacing the current state.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<(), PersistenceError> {
        let state: EncoderState = SnapshotFile::new(path.as_ref()).read(SnapshotKind::Encoder)?;
        self.restore(state)?;
        info!(
            "Restored {} entities and {} relations",
            self.entities.len(),
            self.relations.len()
        );
        Ok(())
    }
}
