//! Episode consolidation - episodic records to semantic triples
//!
//! The bridge has no built-in extraction; a consolidator must be attached
//! for [`crate::MemoryBridge::consolidate_episode`] to do anything.

use kbridge_core::Triple;
use serde_json::Value;
use std::fmt;

/// Extracts facts from one raw episode record
pub trait EpisodeConsolidator: fmt::Debug + Send {
    fn extract(&self, episode: &Value) -> Vec<Triple>;
}

/// Extracts "entity seen at location" facts.
///
/// Accepts `{"observation": {"entity": E, "location": L}}` or a list of such
/// observations under `"observations"`, producing `(E, locatedAt, L)`.
#[derive(Debug, Clone)]
pub struct ObservationConsolidator {
    pub predicate: String,
    pub confidence: f32,
}

impl Default for ObservationConsolidator {
    fn default() -> Self {
        Self {
            predicate: "locatedAt".to_string(),
            confidence: 0.9,
        }
    }
}

impl ObservationConsolidator {
    fn observation_triple(&self, observation: &Value) -> Option<Triple> {
        let entity = observation.get("entity")?.as_str()?;
        let location = observation.get("location")?.as_str()?;
        Some(Triple::new(entity, self.predicate.as_str(), location).with_confidence(self.confidence))
    }
}

impl EpisodeConsolidator for ObservationConsolidator {
    fn extract(&self, episode: &Value) -> Vec<Triple> {
        let mut triples = Vec::new();
        if let Some(observation) = episode.get("observation") {
            triples.extend(self.observation_triple(observation));
        }
        if let Some(list) = episode.get("observations").and_then(Value::as_array) {
            triples.extend(list.iter().filter_map(|o| self.observation_triple(o)));
        }
        triples
    }
}
