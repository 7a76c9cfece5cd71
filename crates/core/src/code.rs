//! Weighted sparse codes of fixed width.
//!
//! A code stores only its active positions (sorted ascending, unique) and one
//! weight per position. The dense expansion is a `width`-long vector holding
//! each weight at its position and zero elsewhere.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::EncodingError;

/// Guard added to the norm product so zero vectors compare as 0.
pub const SIMILARITY_EPSILON: f64 = 1e-8;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SparseCode {
    width: usize,
    positions: Vec<u32>,
    weights: Vec<f32>,
}

impl SparseCode {
    /// The all-zero code.
    pub fn zeros(width: usize) -> Self {
        Self {
            width,
            positions: Vec::new(),
            weights: Vec::new(),
        }
    }

    /// A binary code with weight 1.0 at each given position.
    ///
    /// Positions are sorted and deduplicated; out-of-range positions are an error.
    pub fn binary(
        width: usize,
        positions: impl IntoIterator<Item = u32>,
    ) -> Result<Self, EncodingError> {
        let mut positions: Vec<u32> = positions.into_iter().collect();
        positions.sort_unstable();
        positions.dedup();
        if let Some(&last) = positions.last() {
            if last as usize >= width {
                return Err(EncodingError::MalformedCode(format!(
                    "position {last} out of range for width {width}"
                )));
            }
        }
        let weights = vec![1.0; positions.len()];
        Ok(Self {
            width,
            positions,
            weights,
        })
    }

    /// Rebuild a code from stored parts, checking its invariants.
    pub fn from_parts(
        width: usize,
        positions: Vec<u32>,
        weights: Vec<f32>,
    ) -> Result<Self, EncodingError> {
        if positions.len() != weights.len() {
            return Err(EncodingError::MalformedCode(format!(
                "{} positions but {} weights",
                positions.len(),
                weights.len()
            )));
        }
        if positions.windows(2).any(|w| w[0] >= w[1]) {
            return Err(EncodingError::MalformedCode(
                "positions must be strictly ascending".to_string(),
            ));
        }
        if let Some(&last) = positions.last() {
            if last as usize >= width {
                return Err(EncodingError::MalformedCode(format!(
                    "position {last} out of range for width {width}"
                )));
            }
        }
        Ok(Self {
            width,
            positions,
            weights,
        })
    }

    /// Re-check invariants of a code read from outside (e.g. a snapshot)
    /// and that it has the expected width.
    pub fn check(&self, width: usize) -> Result<(), EncodingError> {
        if self.width != width {
            return Err(EncodingError::WidthMismatch {
                expected: width,
                found: self.width,
            });
        }
        Self::from_parts(self.width, self.positions.clone(), self.weights.clone()).map(|_| ())
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn positions(&self) -> &[u32] {
        &self.positions
    }

    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    /// Number of stored (active) positions.
    pub fn active_count(&self) -> usize {
        self.positions.len()
    }

    /// True when no position carries a nonzero weight.
    pub fn is_zero(&self) -> bool {
        self.weights.iter().all(|&w| w == 0.0)
    }

    /// Mean weight over active positions, 0 for an empty code.
    pub fn mean_weight(&self) -> f32 {
        if self.weights.is_empty() {
            return 0.0;
        }
        self.weights.iter().sum::<f32>() / self.weights.len() as f32
    }

    /// Multiply every weight by `factor`. Positions are unchanged.
    pub fn scaled(&self, factor: f32) -> Self {
        Self {
            width: self.width,
            positions: self.positions.clone(),
            weights: self.weights.iter().map(|w| w * factor).collect(),
        }
    }

    pub fn to_dense(&self) -> Vec<f32> {
        let mut dense = vec![0.0; self.width];
        for (&p, &w) in self.positions.iter().zip(&self.weights) {
            dense[p as usize] = w;
        }
        dense
    }

    pub fn norm(&self) -> f64 {
        self.weights
            .iter()
            .map(|&w| (w as f64) * (w as f64))
            .sum::<f64>()
            .sqrt()
    }

    /// Dot product of the dense expansions, computed by merging positions.
    pub fn dot(&self, other: &SparseCode) -> f64 {
        let (mut i, mut j) = (0, 0);
        let mut sum = 0.0;
        while i < self.positions.len() && j < other.positions.len() {
            match self.positions[i].cmp(&other.positions[j]) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    sum += self.weights[i] as f64 * other.weights[j] as f64;
                    i += 1;
                    j += 1;
                }
            }
        }
        sum
    }

    /// Cosine similarity with an epsilon guard: `dot / (|a|·|b| + eps)`.
    ///
    /// Symmetric. Returns 0 when either side is a zero vector.
    pub fn cosine(&self, other: &SparseCode) -> f32 {
        let denom = self.norm() * other.norm() + SIMILARITY_EPSILON;
        (self.dot(other) / denom) as f32
    }

    /// Stable hex digest of the active-position set (weights ignored).
    pub fn position_hash(&self) -> String {
        position_hash(&self.positions)
    }
}

/// Hex digest (128 bits of SHA-256) of a sorted position list.
pub fn position_hash(positions: &[u32]) -> String {
    let mut hasher = Sha256::new();
    for p in positions {
        hasher.update(p.to_le_bytes());
    }
    let digest = hasher.finalize();
    digest[..16].iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binary_sorts_and_dedups() {
        let code = SparseCode::binary(16, [9, 3, 3, 7]).unwrap();
        assert_eq!(code.positions(), &[3, 7, 9]);
        assert_eq!(code.weights(), &[1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_binary_rejects_out_of_range() {
        assert!(matches!(
            SparseCode::binary(8, [8]),
            Err(EncodingError::MalformedCode(_))
        ));
    }

    #[test]
    fn test_from_parts_validates() {
        assert!(SparseCode::from_parts(8, vec![1, 2], vec![1.0]).is_err());
        assert!(SparseCode::from_parts(8, vec![2, 1], vec![1.0, 1.0]).is_err());
        assert!(SparseCode::from_parts(8, vec![1, 2], vec![0.5, 0.5]).is_ok());
    }

    #[test]
    fn test_check_width_and_order() {
        let code = SparseCode::binary(16, [1, 2]).unwrap();
        assert!(code.check(16).is_ok());
        assert_eq!(
            code.check(32),
            Err(EncodingError::WidthMismatch {
                expected: 32,
                found: 16
            })
        );
        let bad: SparseCode =
            serde_json::from_str(r#"{"width":16,"positions":[4,1],"weights":[1.0,1.0]}"#).unwrap();
        assert!(bad.check(16).is_err());
    }

    #[test]
    fn test_dense_expansion() {
        let code = SparseCode::from_parts(5, vec![1, 4], vec![0.5, 2.0]).unwrap();
        assert_eq!(code.to_dense(), vec![0.0, 0.5, 0.0, 0.0, 2.0]);
    }

    #[test]
    fn test_cosine_self_is_one() {
        let code = SparseCode::binary(64, [1, 5, 9, 33]).unwrap().scaled(0.8);
        assert!((code.cosine(&code) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_cosine_zero_vector() {
        let code = SparseCode::binary(64, [1, 5]).unwrap();
        let zero = SparseCode::zeros(64);
        assert_eq!(code.cosine(&zero), 0.0);
        assert_eq!(zero.cosine(&zero), 0.0);
    }

    #[test]
    fn test_cosine_symmetric_and_partial() {
        let a = SparseCode::binary(64, [1, 2, 3, 4]).unwrap();
        let b = SparseCode::binary(64, [3, 4, 5, 6]).unwrap();
        let ab = a.cosine(&b);
        assert!((ab - b.cosine(&a)).abs() < 1e-7);
        assert!((ab - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_scaled_keeps_positions() {
        let code = SparseCode::binary(32, [0, 31]).unwrap();
        let scaled = code.scaled(0.25);
        assert_eq!(scaled.positions(), code.positions());
        assert_eq!(scaled.mean_weight(), 0.25);
    }

    #[test]
    fn test_position_hash_ignores_weights() {
        let a = SparseCode::binary(32, [1, 2, 3]).unwrap();
        let b = a.scaled(0.3);
        let c = SparseCode::binary(32, [1, 2, 4]).unwrap();
        assert_eq!(a.position_hash(), b.position_hash());
        assert_ne!(a.position_hash(), c.position_hash());
        assert_eq!(a.position_hash().len(), 32);
    }
}
