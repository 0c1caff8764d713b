//! Synthetic dataset generation for service benchmarking.

use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{HarnessError, Result};
use crate::similarity::normalize;

/// How many times a zero-norm sample is redrawn before giving up.
pub const MAX_RESAMPLE_ATTEMPTS: usize = 8;

/// A vector with a caller-assigned identity.
#[derive(Debug, Clone, PartialEq)]
pub struct Vector {
    pub id: u64,
    pub values: Vec<f32>,
}

impl Vector {
    pub fn new(id: u64, values: Vec<f32>) -> Self {
        Self { id, values }
    }

    pub fn dimension(&self) -> usize {
        self.values.len()
    }
}

/// An immutable, ordered collection of vectors sharing one dimension.
///
/// Order is insertion order; generated datasets assign ids `0..count` in that order.
#[derive(Debug, Clone)]
pub struct Dataset {
    vectors: Vec<Vector>,
    dimension: usize,
}

impl Dataset {
    /// Build a dataset from hand-assembled vectors.
    ///
    /// Fails if dimensions disagree or an id repeats.
    pub fn from_vectors(vectors: Vec<Vector>) -> Result<Self> {
        let dimension = vectors.first().map_or(0, Vector::dimension);
        let mut seen = HashSet::with_capacity(vectors.len());
        for v in &vectors {
            if v.dimension() != dimension {
                return Err(HarnessError::DimensionMismatch {
                    expected: dimension,
                    actual: v.dimension(),
                });
            }
            if !seen.insert(v.id) {
                return Err(HarnessError::InvalidParameter(format!(
                    "duplicate vector id {}",
                    v.id
                )));
            }
        }
        Ok(Self { vectors, dimension })
    }

    pub fn vectors(&self) -> &[Vector] {
        &self.vectors
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Total memory footprint of raw components in bytes.
    pub fn memory_bytes(&self) -> usize {
        self.vectors.len() * self.dimension * std::mem::size_of::<f32>()
    }
}

fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

fn sample(rng: &mut StdRng, dimension: usize) -> Vec<f32> {
    (0..dimension).map(|_| rng.random::<f32>()).collect()
}

/// Draw one vector, normalizing if requested.
fn sample_vector(rng: &mut StdRng, id: u64, dimension: usize, normalized: bool) -> Result<Vec<f32>> {
    if !normalized {
        return Ok(sample(rng, dimension));
    }
    normalized_draw(id, || sample(rng, dimension))
}

/// Normalize the first draw with a non-zero norm, retrying up to the attempt limit.
fn normalized_draw(id: u64, mut draw: impl FnMut() -> Vec<f32>) -> Result<Vec<f32>> {
    for _ in 0..MAX_RESAMPLE_ATTEMPTS {
        if let Some(v) = normalize(&draw()) {
            return Ok(v);
        }
    }
    Err(HarnessError::DegenerateVector { id })
}

/// Generate `count` vectors with components i.i.d. in `[0, 1)`.
///
/// # Arguments
///
/// * `count` - Number of vectors; ids are `0..count`
/// * `dimension` - Vector dimensionality (must be > 0)
/// * `seed` - `Some` for a reproducible dataset, `None` for OS entropy
/// * `normalized` - Divide each vector by its L2 norm
pub fn generate(count: usize, dimension: usize, seed: Option<u64>, normalized: bool) -> Result<Dataset> {
    if dimension == 0 {
        return Err(HarnessError::InvalidParameter(
            "dimension must be greater than zero".into(),
        ));
    }
    let mut rng = seeded_rng(seed);

    let vectors = (0..count as u64)
        .map(|id| sample_vector(&mut rng, id, dimension, normalized).map(|v| Vector::new(id, v)))
        .collect::<Result<Vec<_>>>()?;

    Ok(Dataset { vectors, dimension })
}

/// Generate standalone query vectors drawn from the same distribution as [`generate`].
///
/// These are not members of any dataset; the probe phase uses them so the
/// service cannot answer from an exact-match shortcut.
pub fn random_queries(
    count: usize,
    dimension: usize,
    seed: Option<u64>,
    normalized: bool,
) -> Result<Vec<Vec<f32>>> {
    if dimension == 0 {
        return Err(HarnessError::InvalidParameter(
            "dimension must be greater than zero".into(),
        ));
    }
    let mut rng = seeded_rng(seed);
    (0..count as u64)
        .map(|i| sample_vector(&mut rng, i, dimension, normalized))
        .collect()
}
