//! annharness: benchmark and correctness harness for ANN vector search services.
//!
//! The harness treats the service as a black box reached over HTTP. It
//! generates a synthetic dataset, inserts it, queries it back, and checks
//! every answer against an exact brute-force oracle:
//!
//! - `benchmark/`: dataset generation, the oracle, recall and latency metrics
//! - `client/`: the [`ServiceClient`] seam, wire schemas, the HTTP client
//! - `driver/`: insert, sequential query, and pooled throughput drivers
//! - [`harness`]: phases wired together from a [`HarnessConfig`]
//!
//! # Critical Nuances
//!
//! ## Recall counts failures
//!
//! A failed or empty search is a miss, never dropped from the denominator.
//! 47 successes out of 50 queries is recall 0.94, not 1.0.
//!
//! ## Latency and throughput are separate runs
//!
//! Sequential runs keep one request in flight, so samples are pure round
//! trips. The pooled driver measures throughput; its latencies include
//! queueing at the service and should not be read as per-request cost.
//!
//! ## Percentiles on small runs
//!
//! Percentiles use the `(n + 1)·p` plotting position. With fewer than 100
//! samples p99 is the maximum, so one slow request shows up.
//!
//! # Example
//!
//! ```no_run
//! use annharness::{Harness, HarnessConfig};
//!
//! let mut config = HarnessConfig::default();
//! config.dataset.seed = Some(42);
//!
//! let mut harness = Harness::from_config(config)?;
//! let report = harness.run()?;
//! println!("recall@1 = {}", report.recall.recall_at_1);
//! # Ok::<(), annharness::HarnessError>(())
//! ```

pub mod benchmark;
pub mod client;
pub mod config;
pub mod driver;
pub mod error;
pub mod harness;
pub mod similarity;

pub use benchmark::{Dataset, RunMetrics, Vector};
pub use client::{HttpServiceClient, Match, QueryResult, SchemaVersion, ServiceClient};
pub use config::HarnessConfig;
pub use error::{HarnessError, Result};
pub use harness::{Harness, HarnessReport};
pub use similarity::SimilarityMetric;
