//! End-to-end runs against one service.
//!
//! A [`Harness`] owns its configuration and client. The recall phase
//! generates and inserts the dataset, and later phases query the populated
//! service against the same dataset.

use std::time::Duration;

use serde::Serialize;

use crate::benchmark::datasets::{self, Dataset};
use crate::benchmark::metrics::{summarize, RunMetrics};
use crate::benchmark::oracle::ground_truth;
use crate::client::{HttpServiceClient, ServiceClient};
use crate::config::{HarnessConfig, RunMode, Thresholds};
use crate::driver::{self, AbortSignal, QueryRun};
use crate::error::{HarnessError, Result};

/// Pooled-run figures reported alongside the probe metrics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThroughputStats {
    pub workers: usize,
    #[serde(rename = "wall_time_ms", serialize_with = "duration_ms")]
    pub wall_time: Duration,
    pub throughput_qps: f64,
}

fn duration_ms<S: serde::Serializer>(d: &Duration, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64() * 1_000.0)
}

/// Everything one `annharness run` produces.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HarnessReport {
    pub recall: RunMetrics,
    pub probe: RunMetrics,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub throughput: Option<ThroughputStats>,
    /// Recall phase meets `min_recall`, probe phase meets `max_p99_ms`, and
    /// neither phase was aborted or empty.
    pub passed: bool,
}

pub struct Harness<C> {
    config: HarnessConfig,
    client: C,
    dataset: Option<Dataset>,
    abort: AbortSignal,
}

impl Harness<HttpServiceClient> {
    /// Build a harness talking HTTP to `config.base_url`.
    pub fn from_config(config: HarnessConfig) -> Result<Self> {
        let client = HttpServiceClient::from_config(&config)?;
        Self::new(config, client)
    }
}

impl<C: ServiceClient> Harness<C> {
    pub fn new(config: HarnessConfig, client: C) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            client,
            dataset: None,
            abort: AbortSignal::new(),
        })
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Dataset inserted by the last recall phase.
    pub fn dataset(&self) -> Option<&Dataset> {
        self.dataset.as_ref()
    }

    /// Handle for stopping the run from another thread.
    ///
    /// Population and query phases stop issuing requests once it is raised.
    pub fn abort_signal(&self) -> AbortSignal {
        self.abort.clone()
    }

    /// Generate, insert, then re-query the first `n_test` dataset members.
    ///
    /// # Errors
    ///
    /// [`HarnessError::InsertFailed`] when population stops early,
    /// [`HarnessError::Aborted`] when it is cancelled; connection and
    /// generation errors as they occur.
    pub fn run_recall(&mut self) -> Result<RunMetrics> {
        let cfg = &self.config.dataset;
        let dataset = datasets::generate(cfg.size, cfg.dimension, cfg.seed, cfg.normalize)?;
        tracing::info!(
            size = dataset.len(),
            dimension = dataset.dimension(),
            memory_bytes = dataset.memory_bytes(),
            "generated dataset"
        );

        driver::populate(&dataset, &self.client, &self.abort)?.into_result()?;

        let n_test = self.config.queries.n_test.min(dataset.len());
        let queries: Vec<&[f32]> = dataset.vectors()[..n_test]
            .iter()
            .map(|v| v.values.as_slice())
            .collect();

        let run = driver::run(&queries, &self.client, self.config.queries.k, &self.abort)?;
        let metrics = self.score(&queries, &run, &dataset)?;
        tracing::info!(
            queries = metrics.n_queries,
            failed = metrics.n_failed,
            recall = metrics.recall_at_1,
            "recall phase finished"
        );

        self.dataset = Some(dataset);
        Ok(metrics)
    }

    /// Issue `n_probe` fresh random queries against the populated service.
    ///
    /// Recall is still reported: the oracle answers the same random queries
    /// against the inserted dataset.
    pub fn run_latency_probe(&self) -> Result<RunMetrics> {
        let dataset = self.populated()?;
        let queries = self.probe_queries(dataset)?;

        let run = driver::run(&queries, &self.client, self.config.queries.k, &self.abort)?;
        let metrics = self.score(&queries, &run, dataset)?;
        tracing::info!(
            queries = metrics.n_queries,
            p50_ms = metrics.p50_latency.as_secs_f64() * 1_000.0,
            p99_ms = metrics.p99_latency.as_secs_f64() * 1_000.0,
            "latency probe finished"
        );
        Ok(metrics)
    }

    /// The probe workload through the bounded worker pool.
    ///
    /// # Errors
    ///
    /// [`HarnessError::InvalidParameter`] unless the configured mode is pooled.
    pub fn run_throughput(&self) -> Result<(RunMetrics, ThroughputStats)> {
        let RunMode::Pooled { workers } = self.config.mode else {
            return Err(HarnessError::InvalidParameter(
                "throughput phase requires mode = pooled".into(),
            ));
        };
        let dataset = self.populated()?;
        let queries = self.probe_queries(dataset)?;

        let pooled = driver::run_pooled(&queries, &self.client, self.config.queries.k, workers, &self.abort)?;
        let metrics = self.score(&queries, &pooled.run, dataset)?;
        let stats = ThroughputStats {
            workers: pooled.workers,
            wall_time: pooled.wall_time,
            throughput_qps: pooled.throughput_qps(),
        };
        tracing::info!(workers = stats.workers, qps = stats.throughput_qps, "throughput phase finished");
        Ok((metrics, stats))
    }

    /// Recall phase, then the probe (or the pooled phase when configured).
    pub fn run(&mut self) -> Result<HarnessReport> {
        let recall = self.run_recall()?;
        let (probe, throughput) = match self.config.mode {
            RunMode::Sequential => (self.run_latency_probe()?, None),
            RunMode::Pooled { .. } => {
                let (metrics, stats) = self.run_throughput()?;
                (metrics, Some(stats))
            }
        };

        let t = &self.config.thresholds;
        let passed = recall.meets(&Thresholds {
            min_recall: t.min_recall,
            max_p99_ms: None,
        }) && probe.meets(&Thresholds {
            min_recall: None,
            max_p99_ms: t.max_p99_ms,
        });
        if !passed {
            tracing::warn!(
                recall_aborted = recall.aborted,
                probe_aborted = probe.aborted,
                recall = recall.recall_at_1,
                p99_ms = probe.p99_latency.as_secs_f64() * 1_000.0,
                "run did not meet configured thresholds"
            );
        }

        Ok(HarnessReport {
            recall,
            probe,
            throughput,
            passed,
        })
    }

    fn populated(&self) -> Result<&Dataset> {
        self.dataset.as_ref().ok_or_else(|| {
            HarnessError::InvalidParameter("service not populated; run the recall phase first".into())
        })
    }

    fn probe_queries(&self, dataset: &Dataset) -> Result<Vec<Vec<f32>>> {
        // Offset the seed so probes never replay dataset members.
        let seed = self.config.dataset.seed.map(|s| s.wrapping_add(1));
        datasets::random_queries(
            self.config.queries.n_probe,
            dataset.dimension(),
            seed,
            self.config.dataset.normalize,
        )
    }

    /// Oracle truth for the queries actually issued, then aggregate.
    fn score<Q: AsRef<[f32]>>(&self, queries: &[Q], run: &QueryRun, dataset: &Dataset) -> Result<RunMetrics> {
        let issued = &queries[..run.len()];
        let truth = ground_truth(issued, dataset, self.config.metric)?;
        let mut metrics = summarize(&run.outcomes, &truth.truth, &run.latencies, Some(&truth.latencies))?;
        metrics.aborted = run.aborted;
        Ok(metrics)
    }
}
