//! Sequential query driver.

use std::time::Instant;

use crate::benchmark::metrics::LatencySample;
use crate::client::ServiceClient;
use crate::driver::{record, AbortSignal, QueryOutcome};
use crate::error::Result;

/// Outcomes and latencies of a query run, index-aligned with the queries issued.
#[derive(Debug, Clone, Default)]
pub struct QueryRun {
    pub outcomes: Vec<QueryOutcome>,
    pub latencies: Vec<LatencySample>,
    /// Set when an abort stopped the run early; only issued queries are present.
    pub aborted: bool,
}

impl QueryRun {
    /// Number of queries issued.
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn n_failed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_failed()).count()
    }
}

/// Issue one search per query, strictly one at a time.
///
/// The clock starts immediately before `search` and stops as soon as it
/// returns, success or failure, so every issued query yields exactly one
/// [`LatencySample`].
///
/// # Errors
///
/// Errors that are not scoped to a single request (e.g. the service is
/// unreachable) end the run; no partial results are returned.
pub fn run<C, Q>(queries: &[Q], client: &C, k: usize, abort: &AbortSignal) -> Result<QueryRun>
where
    C: ServiceClient + ?Sized,
    Q: AsRef<[f32]>,
{
    let mut outcomes = Vec::with_capacity(queries.len());
    let mut latencies = Vec::with_capacity(queries.len());
    let mut aborted = false;

    tracing::info!(queries = queries.len(), k, "starting sequential query run");

    for (index, query) in queries.iter().enumerate() {
        if abort.is_aborted() {
            tracing::info!(issued = index, "query run aborted");
            aborted = true;
            break;
        }

        let start = Instant::now();
        let result = client.search(query.as_ref(), k);
        let elapsed = start.elapsed();

        latencies.push(LatencySample::new(index, elapsed));
        outcomes.push(record(index, result)?);
    }

    let run = QueryRun {
        outcomes,
        latencies,
        aborted,
    };
    tracing::info!(issued = run.len(), failed = run.n_failed(), "query run finished");
    Ok(run)
}
