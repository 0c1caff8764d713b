//! Measurement side of the harness.
//!
//! - **Data**: seeded synthetic vectors ([`datasets`])
//! - **Truth**: exact nearest neighbors by linear scan ([`oracle`])
//! - **Scores**: recall@1, latency percentiles, speedup ([`metrics`])
//!
//! Nothing here talks to the service.

pub mod datasets;
pub mod metrics;
pub mod oracle;

pub use datasets::{generate, random_queries, Dataset, Vector};
pub use metrics::{percentile, recall_at_1, summarize, LatencySample, RunMetrics};
pub use oracle::{ground_truth, nearest_neighbor, TruthRun};
