//! Bounded worker pool for throughput runs.
//!
//! Workers pull query indices from a shared cursor, so at most `workers`
//! requests are in flight and no query is issued twice. Results land in the
//! slot of their query index regardless of completion order.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use crate::benchmark::metrics::LatencySample;
use crate::client::ServiceClient;
use crate::config::MAX_WORKERS;
use crate::driver::query::QueryRun;
use crate::driver::{record, AbortSignal, QueryOutcome};
use crate::error::{HarnessError, Result};

/// A pooled run plus its wall-clock time.
#[derive(Debug, Clone)]
pub struct PooledRun {
    pub run: QueryRun,
    pub wall_time: Duration,
    /// Worker threads actually spawned.
    pub workers: usize,
}

impl PooledRun {
    /// Issued queries per second of wall time; 0 for an empty run.
    pub fn throughput_qps(&self) -> f64 {
        let secs = self.wall_time.as_secs_f64();
        if self.run.is_empty() || secs == 0.0 {
            return 0.0;
        }
        self.run.len() as f64 / secs
    }
}

type Slot = (QueryOutcome, LatencySample);

/// Issue every query through `workers` concurrent threads.
///
/// Latency samples taken here include contention between workers; use
/// [`crate::driver::run`] for clean per-request latency.
///
/// # Errors
///
/// - [`HarnessError::InvalidParameter`] when `workers` is 0 or above
///   [`MAX_WORKERS`].
/// - Any error that ends the run (e.g. connection refused). Remaining
///   workers stop picking up new queries once one has failed this way.
pub fn run_pooled<C, Q>(
    queries: &[Q],
    client: &C,
    k: usize,
    workers: usize,
    abort: &AbortSignal,
) -> Result<PooledRun>
where
    C: ServiceClient + ?Sized,
    Q: AsRef<[f32]> + Sync,
{
    if workers == 0 || workers > MAX_WORKERS {
        return Err(HarnessError::InvalidParameter(format!(
            "workers must be in 1..={MAX_WORKERS}, got {workers}"
        )));
    }

    let threads = workers.min(queries.len()).max(1);
    let cursor = AtomicUsize::new(0);
    let stop = AbortSignal::new();

    tracing::info!(queries = queries.len(), workers = threads, k, "starting pooled query run");
    let start = Instant::now();

    let (cursor, stop) = (&cursor, &stop);
    let per_worker: Vec<Result<Vec<(usize, Slot)>>> = std::thread::scope(|s| {
        let mut handles = Vec::with_capacity(threads);
        for _ in 0..threads {
            handles.push(s.spawn(move || {
                let mut local = Vec::new();
                loop {
                    if abort.is_aborted() || stop.is_aborted() {
                        break;
                    }
                    let index = cursor.fetch_add(1, Ordering::SeqCst);
                    let Some(query) = queries.get(index) else {
                        break;
                    };

                    let sent = Instant::now();
                    let result = client.search(query.as_ref(), k);
                    let sample = LatencySample::new(index, sent.elapsed());

                    match record(index, result) {
                        Ok(outcome) => local.push((index, (outcome, sample))),
                        Err(e) => {
                            stop.abort();
                            return Err(e);
                        }
                    }
                }
                Ok(local)
            }));
        }

        handles
            .into_iter()
            .map(|h| h.join().unwrap_or_else(|e| std::panic::resume_unwind(e)))
            .collect()
    });
    let wall_time = start.elapsed();

    let mut slots: Vec<Option<Slot>> = vec![None; queries.len()];
    for worker in per_worker {
        for (index, slot) in worker? {
            slots[index] = Some(slot);
        }
    }

    // Indices are handed out in order and every issued request completes,
    // so the filled slots form a prefix.
    let (outcomes, latencies): (Vec<_>, Vec<_>) = slots.into_iter().map_while(|s| s).unzip();
    let aborted = outcomes.len() < queries.len();

    let run = QueryRun {
        outcomes,
        latencies,
        aborted,
    };
    tracing::info!(
        issued = run.len(),
        failed = run.n_failed(),
        wall_ms = wall_time.as_millis() as u64,
        "pooled query run finished"
    );

    Ok(PooledRun {
        run,
        wall_time,
        workers: threads,
    })
}
