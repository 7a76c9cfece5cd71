//! Vocabulary - one namespace of name → code entries
//!
//! Entries are created on first encounter and never evicted or mutated.
//! A reverse map from active-position set to name serves exact decoding.

use kbridge_core::{EncodingError, SparseCode};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Default)]
pub struct Vocabulary {
    codes: HashMap<String, SparseCode>,

    /// Active positions → most recently registered name
    reverse: HashMap<Vec<u32>, String>,
}

/// Serializable form of a vocabulary
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VocabularySnapshot {
    pub codes: BTreeMap<String, SparseCode>,
    pub reverse: Vec<ReverseEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReverseEntry {
    pub positions: Vec<u32>,
    pub name: String,
}

impl Vocabulary {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            codes: HashMap::with_capacity(capacity),
            reverse: HashMap::with_capacity(capacity),
        }
    }

    pub fn get(&self, name: &str) -> Option<&SparseCode> {
        self.codes.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.codes.contains_key(name)
    }

    /// Exact reverse lookup by active-position set.
    pub fn decode(&self, code: &SparseCode) -> Option<&str> {
        self.reverse.get(code.positions()).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Names in lexicographic order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.codes.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Register a new entry. Callers check `contains` first; existing
    /// entries are never replaced.
    pub(crate) fn insert(&mut self, name: &str, code: SparseCode) {
        if self.codes.contains_key(name) {
            return;
        }
        self.reverse
            .insert(code.positions().to_vec(), name.to_string());
        self.codes.insert(name.to_string(), code);
    }

    pub fn snapshot(&self) -> VocabularySnapshot {
        let mut reverse: Vec<ReverseEntry> = self
            .reverse
            .iter()
            .map(|(positions, name)| ReverseEntry {
                positions: positions.clone(),
                name: name.clone(),
            })
            .collect();
        reverse.sort_by(|a, b| a.positions.cmp(&b.positions));

        VocabularySnapshot {
            codes: self
                .codes
                .iter()
                .map(|(name, code)| (name.clone(), code.clone()))
                .collect(),
            reverse,
        }
    }

    /// Rebuild from a snapshot, checking every code against `width`.
    pub fn from_snapshot(
        snapshot: VocabularySnapshot,
        width: usize,
    ) -> Result<Self, EncodingError> {
        for code in snapshot.codes.values() {
            code.check(width)?;
        }
        let mut reverse = HashMap::with_capacity(snapshot.reverse.len());
        for entry in snapshot.reverse {
            if !snapshot.codes.contains_key(&entry.name) {
                return Err(EncodingError::MalformedCode(format!(
                    "reverse entry for unknown name {:?}",
                    entry.name
                )));
            }
            reverse.insert(entry.positions, entry.name);
        }
        Ok(Self {
            codes: snapshot.codes.into_iter().collect(),
            reverse,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(positions: &[u32]) -> SparseCode {
        SparseCode::binary(32, positions.iter().copied()).unwrap()
    }

    #[test]
    fn test_insert_and_decode() {
        let mut vocab = Vocabulary::with_capacity(4);
        vocab.insert("Paris", code(&[1, 5, 9]));
        assert!(vocab.contains("Paris"));
        assert_eq!(vocab.decode(&code(&[1, 5, 9])), Some("Paris"));
        assert_eq!(vocab.decode(&code(&[1, 5])), None);
    }

    #[test]
    fn test_existing_entry_not_replaced() {
        let mut vocab = Vocabulary::default();
        vocab.insert("a", code(&[1]));
        vocab.insert("a", code(&[2]));
        assert_eq!(vocab.get("a"), Some(&code(&[1])));
        assert_eq!(vocab.len(), 1);
        assert_eq!(vocab.decode(&code(&[2])), None);
    }

    #[test]
    fn test_snapshot_round_trip() {
        let mut vocab = Vocabulary::default();
        vocab.insert("b", code(&[3, 4]));
        vocab.insert("a", code(&[0, 31]));
        let restored = Vocabulary::from_snapshot(vocab.snapshot(), 32).unwrap();
        assert_eq!(restored.names(), vec!["a", "b"]);
        assert_eq!(restored.get("b"), vocab.get("b"));
        assert_eq!(restored.decode(&code(&[0, 31])), Some("a"));
    }

    #[test]
    fn test_snapshot_wrong_width_rejected() {
        let mut vocab = Vocabulary::default();
        vocab.insert("a", code(&[1]));
        assert!(matches!(
            Vocabulary::from_snapshot(vocab.snapshot(), 64),
            Err(EncodingError::WidthMismatch { .. })
        ));
    }

    #[test]
    fn test_snapshot_dangling_reverse_rejected() {
        let snapshot = VocabularySnapshot {
            codes: BTreeMap::new(),
            reverse: vec![ReverseEntry {
                positions: vec![1],
                name: "ghost".to_string(),
            }],
        };
        assert!(Vocabulary::from_snapshot(snapshot, 32).is_err());
    }
}
