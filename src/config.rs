//! Run configuration.
//!
//! A [`HarnessConfig`] is threaded explicitly through the harness; nothing
//! reads module-level globals, so two runs against two services can coexist
//! in one process.
//!
//! Every field has a default, so a TOML file only needs the overrides:
//!
//! ```toml
//! base_url = "http://127.0.0.1:8080"
//! schema = "query-matches"
//! metric = "cosine"
//!
//! [dataset]
//! size = 1000
//! dimension = 128
//! seed = 42
//!
//! [queries]
//! n_test = 100
//! k = 1
//!
//! [mode]
//! kind = "pooled"
//! workers = 8
//!
//! [thresholds]
//! min_recall = 0.9
//! max_p99_ms = 25.0
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::client::SchemaVersion;
use crate::error::{HarnessError, Result};
use crate::similarity::SimilarityMetric;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";

/// Upper bound on pooled workers.
pub const MAX_WORKERS: usize = 256;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HarnessConfig {
    /// Scheme, host and port of the service, without a trailing path.
    pub base_url: String,
    pub schema: SchemaVersion,
    pub request_timeout_ms: u64,
    /// Metric the oracle uses; should match the service's.
    pub metric: SimilarityMetric,
    pub dataset: DatasetConfig,
    pub queries: QueryConfig,
    pub mode: RunMode,
    pub thresholds: Thresholds,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            schema: SchemaVersion::default(),
            request_timeout_ms: 30_000,
            metric: SimilarityMetric::Cosine,
            dataset: DatasetConfig::default(),
            queries: QueryConfig::default(),
            mode: RunMode::default(),
            thresholds: Thresholds::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatasetConfig {
    /// Number of vectors inserted into the service.
    pub size: usize,
    pub dimension: usize,
    /// Unit-normalize every generated vector.
    pub normalize: bool,
    /// Fixed seed for reproducible runs; OS entropy when absent.
    pub seed: Option<u64>,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            size: 200,
            dimension: 128,
            normalize: false,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QueryConfig {
    /// Dataset members re-queried in the recall phase.
    pub n_test: usize,
    /// Fresh random queries issued in the latency probe.
    pub n_probe: usize,
    /// Neighbors requested per search.
    pub k: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            n_test: 50,
            n_probe: 100,
            k: 1,
        }
    }
}

/// How probe queries are scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum RunMode {
    /// One request in flight; latency samples are pure round trips.
    #[default]
    Sequential,
    /// Bounded worker pool for throughput measurement.
    Pooled { workers: usize },
}

/// Pass/fail criteria; unset fields always pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Thresholds {
    pub min_recall: Option<f64>,
    pub max_p99_ms: Option<f64>,
}

impl HarnessConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
            .map_err(|e| HarnessError::Config(format!("{}: {e}", path.display())))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Check cross-field constraints that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        let fail = |msg: String| Err(HarnessError::Config(msg));

        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return fail(format!("base_url must be http(s): {:?}", self.base_url));
        }
        if self.request_timeout_ms == 0 {
            return fail("request_timeout_ms must be positive".into());
        }
        if self.dataset.size == 0 {
            return fail("dataset.size must be positive".into());
        }
        if self.dataset.dimension == 0 {
            return fail("dataset.dimension must be positive".into());
        }
        if self.metric == SimilarityMetric::DotProduct && !self.dataset.normalize {
            return fail("metric dot-product requires dataset.normalize = true".into());
        }
        if self.queries.k == 0 {
            return fail("queries.k must be at least 1".into());
        }
        if self.queries.n_test > self.dataset.size {
            return fail(format!(
                "queries.n_test ({}) exceeds dataset.size ({})",
                self.queries.n_test, self.dataset.size
            ));
        }
        if let RunMode::Pooled { workers } = self.mode {
            if workers == 0 || workers > MAX_WORKERS {
                return fail(format!("mode.workers must be in 1..={MAX_WORKERS}, got {workers}"));
            }
        }
        if let Some(r) = self.thresholds.min_recall {
            if !(0.0..=1.0).contains(&r) {
                return fail(format!("thresholds.min_recall must be in [0, 1], got {r}"));
            }
        }
        Ok(())
    }
}
