//! Brute-force ground truth.
//!
//! The oracle is the "slow but correct" reference: a full linear scan over
//! every vector in the dataset, O(n·D) per query. It never consults an index.

use std::cmp::Ordering;
use std::time::Instant;

use crate::benchmark::datasets::Dataset;
use crate::benchmark::metrics::LatencySample;
use crate::error::{HarnessError, Result};
use crate::similarity::SimilarityMetric;

/// Find the id of the vector most similar to `query`.
///
/// Ties resolve to the lowest id. NaN scores never win.
///
/// # Errors
///
/// - [`HarnessError::EmptyDataset`] if the dataset has no vectors
/// - [`HarnessError::DimensionMismatch`] if `query` has the wrong dimension
pub fn nearest_neighbor(query: &[f32], dataset: &Dataset, metric: SimilarityMetric) -> Result<u64> {
    if dataset.is_empty() {
        return Err(HarnessError::EmptyDataset);
    }
    if query.len() != dataset.dimension() {
        return Err(HarnessError::DimensionMismatch {
            expected: dataset.dimension(),
            actual: query.len(),
        });
    }

    let mut best: Option<(u64, f32)> = None;
    for v in dataset.vectors() {
        let score = metric.score(query, &v.values);
        if score.is_nan() {
            continue;
        }
        best = match best {
            None => Some((v.id, score)),
            Some((best_id, best_score)) => match score.partial_cmp(&best_score) {
                Some(Ordering::Greater) => Some((v.id, score)),
                Some(Ordering::Equal) if v.id < best_id => Some((v.id, score)),
                _ => Some((best_id, best_score)),
            },
        };
    }

    // Every score was NaN: fall back to scan order so the answer stays deterministic.
    Ok(best.map_or(dataset.vectors()[0].id, |(id, _)| id))
}

/// Ground truth for a query set, with the time spent on each scan.
#[derive(Debug, Clone)]
pub struct TruthRun {
    /// `truth[i]` is the nearest neighbor id of query `i`.
    pub truth: Vec<u64>,
    /// One sample per query; used as the baseline for the speedup factor.
    pub latencies: Vec<LatencySample>,
}

/// Compute the nearest neighbor for every query, timing each scan.
pub fn ground_truth<Q: AsRef<[f32]>>(
    queries: &[Q],
    dataset: &Dataset,
    metric: SimilarityMetric,
) -> Result<TruthRun> {
    let mut truth = Vec::with_capacity(queries.len());
    let mut latencies = Vec::with_capacity(queries.len());

    for (index, query) in queries.iter().enumerate() {
        let start = Instant::now();
        let id = nearest_neighbor(query.as_ref(), dataset, metric)?;
        latencies.push(LatencySample::new(index, start.elapsed()));
        truth.push(id);
    }

    tracing::debug!(queries = queries.len(), n = dataset.len(), "computed ground truth");
    Ok(TruthRun { truth, latencies })
}
