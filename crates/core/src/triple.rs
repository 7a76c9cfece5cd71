//! Symbolic facts: triples, confidence and partial cues

use serde::{Deserialize, Serialize};
use std::fmt;

/// A subject-predicate-object fact, optionally weighted by confidence.
///
/// Fields may hold any Unicode content, including the empty string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Triple {
    pub subject: String,
    pub predicate: String,
    pub object: String,

    /// Confidence in [0, 1], if the source supplied one
    #[serde(default)]
    pub confidence: Option<f32>,
}

impl Triple {
    pub fn new(
        subject: impl Into<String>,
        predicate: impl Into<String>,
        object: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
            confidence: None,
        }
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = Some(confidence);
        self
    }

    /// True when both triples name the same fact, ignoring confidence.
    pub fn same_fact(&self, other: &Triple) -> bool {
        self.subject == other.subject
            && self.predicate == other.predicate
            && self.object == other.object
    }
}

impl fmt::Display for Triple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.subject, self.predicate, self.object)
    }
}

/// Confidence record attached to a fact by the knowledge source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Confidence {
    /// Probability the fact holds, in [0, 1]
    pub p: f32,

    /// How well-calibrated `p` has been historically
    pub calibration: f32,

    /// Unix timestamp (seconds) of the last verification
    pub last_verified: i64,
}

impl Confidence {
    pub fn new(p: f32) -> Self {
        Self {
            p,
            calibration: 1.0,
            last_verified: 0,
        }
    }
}

/// A partially specified triple used as a similarity query.
///
/// `None` means "unknown", which is distinct from `Some("")`. Once the cue is
/// encoded both collapse to the empty string, so retrieval cannot tell them
/// apart.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cue {
    pub subject: Option<String>,
    pub predicate: Option<String>,
    pub object: Option<String>,
}

impl Cue {
    /// A cue with every field unknown.
    pub fn any() -> Self {
        Self::default()
    }

    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn predicate(mut self, predicate: impl Into<String>) -> Self {
        self.predicate = Some(predicate.into());
        self
    }

    pub fn object(mut self, object: impl Into<String>) -> Self {
        self.object = Some(object.into());
        self
    }

    /// Number of fields that are known.
    pub fn known_fields(&self) -> usize {
        [&self.subject, &self.predicate, &self.object]
            .iter()
            .filter(|f| f.is_some())
            .count()
    }

    /// Fill unknown fields with the empty string.
    pub fn fill(&self) -> Triple {
        Triple::new(
            self.subject.clone().unwrap_or_default(),
            self.predicate.clone().unwrap_or_default(),
            self.object.clone().unwrap_or_default(),
        )
    }
}

impl From<Triple> for Cue {
    fn from(triple: Triple) -> Self {
        Self {
            subject: Some(triple.subject),
            predicate: Some(triple.predicate),
            object: Some(triple.object),
        }
    }
}

impl From<&Triple> for Cue {
    fn from(triple: &Triple) -> Self {
        Self::from(triple.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_triple_display() {
        let t = Triple::new("Paris", "capitalOf", "France");
        assert_eq!(t.to_string(), "(Paris, capitalOf, France)");
    }

    #[test]
    fn test_same_fact_ignores_confidence() {
        let a = Triple::new("a", "b", "c").with_confidence(0.3);
        let b = Triple::new("a", "b", "c");
        assert!(a.same_fact(&b));
        assert_ne!(a, b);
    }

    #[test]
    fn test_cue_unknown_vs_empty() {
        let unknown = Cue::any().predicate("capitalOf");
        let empty = Cue::any().subject("").predicate("capitalOf");
        assert_ne!(unknown, empty);
        assert_eq!(unknown.known_fields(), 1);
        assert_eq!(empty.known_fields(), 2);
        // Both collapse to the same filled triple
        assert_eq!(unknown.fill(), empty.fill());
    }

    #[test]
    fn test_cue_from_triple() {
        let cue = Cue::from(Triple::new("x", "y", "z"));
        assert_eq!(cue.known_fields(), 3);
        assert_eq!(cue.fill(), Triple::new("x", "y", "z"));
    }

    #[test]
    fn test_triple_confidence_defaults_on_deserialize() {
        let t: Triple =
            serde_json::from_str(r#"{"subject":"a","predicate":"b","object":"c"}"#).unwrap();
        assert_eq!(t.confidence, None);
    }
}
