//! Run-level metrics: recall@1, latency statistics, speedup over brute force.
//!
//! Everything here is a pure function of its inputs. Failed and empty
//! queries always stay in the recall denominator; they count as misses.
//!
//! # Percentiles
//!
//! Percentiles interpolate linearly between the two nearest ranks using the
//! `(n + 1)·p` plotting position (Hyndman & Fan type 6):
//!
//! ```text
//! h = clamp((n + 1)·p, 1, n)          // 1-indexed rank
//! P = x[⌊h⌋] + (h − ⌊h⌋)·(x[⌈h⌉] − x[⌊h⌋])
//! ```
//!
//! For fewer than 100 samples, p99 is the maximum and p1 the minimum, so a
//! single outlier is never averaged away in small runs.

use std::time::Duration;

use serde::{Serialize, Serializer};

use crate::config::Thresholds;
use crate::driver::QueryOutcome;
use crate::error::{HarnessError, Result};

/// One elapsed-time measurement for the request at `index`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatencySample {
    pub index: usize,
    pub elapsed: Duration,
}

impl LatencySample {
    pub fn new(index: usize, elapsed: Duration) -> Self {
        Self { index, elapsed }
    }
}

fn as_millis<S: Serializer>(d: &Duration, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64() * 1_000.0)
}

fn as_opt_millis<S: Serializer>(d: &Option<Duration>, s: S) -> std::result::Result<S::Ok, S::Error> {
    match d {
        Some(d) => s.serialize_some(&(d.as_secs_f64() * 1_000.0)),
        None => s.serialize_none(),
    }
}

/// Aggregated metrics for one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunMetrics {
    pub n_queries: usize,
    /// Queries whose request failed (status, transport, or parse).
    pub n_failed: usize,
    /// Queries that succeeded with zero matches.
    pub n_empty: usize,
    /// Queries whose top match equals the oracle's answer.
    pub hits: usize,

    /// `hits / n_queries`, in `[0, 1]`; 0 for an empty run.
    pub recall_at_1: f64,

    #[serde(rename = "mean_latency_ms", serialize_with = "as_millis")]
    pub mean_latency: Duration,
    #[serde(rename = "p50_latency_ms", serialize_with = "as_millis")]
    pub p50_latency: Duration,
    #[serde(rename = "p99_latency_ms", serialize_with = "as_millis")]
    pub p99_latency: Duration,
    #[serde(rename = "max_latency_ms", serialize_with = "as_millis")]
    pub max_latency: Duration,

    #[serde(rename = "oracle_mean_latency_ms", serialize_with = "as_opt_millis")]
    pub oracle_mean_latency: Option<Duration>,
    /// Oracle mean / service mean. Infinite or NaN when the service mean is zero.
    pub speedup: Option<f64>,

    /// The run was cancelled before every query was issued.
    pub aborted: bool,
}

impl RunMetrics {
    /// Check the run against configured pass/fail thresholds.
    ///
    /// Unset thresholds always pass, but an aborted run or one that issued
    /// no queries never does.
    pub fn meets(&self, thresholds: &Thresholds) -> bool {
        if self.aborted || self.n_queries == 0 {
            return false;
        }
        let recall_ok = thresholds
            .min_recall
            .is_none_or(|min| self.recall_at_1 >= min);
        let p99_ok = thresholds
            .max_p99_ms
            .is_none_or(|max| self.p99_latency.as_secs_f64() * 1_000.0 <= max);
        recall_ok && p99_ok
    }
}

/// Recall@1 as `(hits, recall)`.
///
/// A query is a hit when it completed, returned at least one match, and the
/// top match's id equals `truth[i]`.
pub fn recall_at_1(outcomes: &[QueryOutcome], truth: &[u64]) -> Result<(usize, f64)> {
    if outcomes.len() != truth.len() {
        return Err(HarnessError::InvalidParameter(format!(
            "{} outcomes but {} ground-truth entries",
            outcomes.len(),
            truth.len()
        )));
    }
    if outcomes.is_empty() {
        return Ok((0, 0.0));
    }
    let hits = outcomes
        .iter()
        .zip(truth)
        .filter(|(outcome, expected)| outcome.top_id() == Some(**expected))
        .count();
    Ok((hits, hits as f64 / outcomes.len() as f64))
}

/// Arithmetic mean of the sample durations; zero for no samples.
pub fn mean_latency(samples: &[LatencySample]) -> Duration {
    if samples.is_empty() {
        return Duration::ZERO;
    }
    let total: Duration = samples.iter().map(|s| s.elapsed).sum();
    match u32::try_from(samples.len()) {
        Ok(n) => total / n,
        Err(_) => total.div_f64(samples.len() as f64),
    }
}

/// Interpolated percentile, `p` in `[0, 1]`.
///
/// Zero for no samples or a NaN `p`; out-of-range `p` is clamped.
pub fn percentile(samples: &[LatencySample], p: f64) -> Duration {
    let mut sorted: Vec<f64> = samples.iter().map(|s| s.elapsed.as_secs_f64()).collect();
    if sorted.is_empty() || p.is_nan() {
        return Duration::ZERO;
    }
    sorted.sort_by(|a, b| a.total_cmp(b));

    let n = sorted.len();
    let h = ((n + 1) as f64 * p.clamp(0.0, 1.0)).clamp(1.0, n as f64);
    let lo = h.floor() as usize;
    let hi = h.ceil() as usize;
    let frac = h - lo as f64;

    let value = sorted[lo - 1] + frac * (sorted[hi - 1] - sorted[lo - 1]);
    Duration::from_secs_f64(value.max(0.0))
}

/// Oracle mean over service mean.
///
/// Division follows IEEE semantics: a zero service mean yields `inf` (or NaN
/// when both are zero) rather than panicking.
pub fn speedup(oracle_mean: Duration, service_mean: Duration) -> f64 {
    oracle_mean.as_secs_f64() / service_mean.as_secs_f64()
}

/// Aggregate one run.
///
/// `outcomes`, `truth` and `latencies` are index-aligned: entry `i` of each
/// belongs to query `i`. `oracle_latencies`, when present, enables the
/// speedup factor.
pub fn summarize(
    outcomes: &[QueryOutcome],
    truth: &[u64],
    latencies: &[LatencySample],
    oracle_latencies: Option<&[LatencySample]>,
) -> Result<RunMetrics> {
    if latencies.len() != outcomes.len() {
        return Err(HarnessError::InvalidParameter(format!(
            "{} outcomes but {} latency samples",
            outcomes.len(),
            latencies.len()
        )));
    }
    let (hits, recall) = recall_at_1(outcomes, truth)?;

    let n_failed = outcomes.iter().filter(|o| o.is_failed()).count();
    let n_empty = outcomes
        .iter()
        .filter(|o| o.result().is_some_and(|r| r.matches.is_empty()))
        .count();

    let mean = mean_latency(latencies);
    let oracle_mean = oracle_latencies.map(mean_latency);

    Ok(RunMetrics {
        n_queries: outcomes.len(),
        n_failed,
        n_empty,
        hits,
        recall_at_1: recall,
        mean_latency: mean,
        p50_latency: percentile(latencies, 0.50),
        p99_latency: percentile(latencies, 0.99),
        max_latency: latencies.iter().map(|s| s.elapsed).max().unwrap_or_default(),
        oracle_mean_latency: oracle_mean,
        speedup: oracle_mean.map(|o| speedup(o, mean)),
        aborted: false,
    })
}
