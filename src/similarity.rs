//! Similarity functions for dense vectors.
//!
//! The oracle ranks by *similarity* (higher is better), matching what ANN
//! services report as `score`. Dot product on L2-normalized inputs is
//! equivalent to cosine similarity and skips the norm computations.

use serde::{Deserialize, Serialize};

/// Norms at or below this are treated as zero.
pub const NORM_EPSILON: f32 = 1e-10;

/// Similarity metric used by the ground-truth oracle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SimilarityMetric {
    /// Inner product. Equals cosine when inputs are pre-normalized.
    DotProduct,
    /// Explicit cosine similarity, computing norms per pair.
    Cosine,
}

impl SimilarityMetric {
    /// Score two vectors; higher means more similar.
    #[inline]
    #[must_use]
    pub fn score(self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            SimilarityMetric::DotProduct => dot(a, b),
            SimilarityMetric::Cosine => cosine(a, b),
        }
    }
}

/// Dot product of two vectors.
#[inline]
#[must_use]
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// L2 norm of a vector.
#[inline]
#[must_use]
pub fn norm(v: &[f32]) -> f32 {
    dot(v, v).sqrt()
}

/// Cosine similarity in `[-1, 1]`; 0 when either side has zero norm.
#[inline]
#[must_use]
pub fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let na = norm(a);
    let nb = norm(b);
    if na > NORM_EPSILON && nb > NORM_EPSILON {
        (dot(a, b) / (na * nb)).clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

/// Normalize a vector to unit L2 norm.
///
/// Returns `None` for a (numerically) zero vector instead of inventing a direction.
#[must_use]
pub fn normalize(v: &[f32]) -> Option<Vec<f32>> {
    let n = norm(v);
    if n <= NORM_EPSILON {
        return None;
    }
    Some(v.iter().map(|x| x / n).collect())
}
