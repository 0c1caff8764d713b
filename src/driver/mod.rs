//! Traffic drivers.
//!
//! - [`insert::populate`]: stream a dataset into the service, fail-fast.
//! - [`query::run`]: sequential searches, one request in flight. Use this
//!   for latency and recall; samples are uncontaminated round trips.
//! - [`pool::run_pooled`]: bounded worker pool for throughput runs. Kept
//!   separate so concurrency never leaks into latency numbers.
//!
//! Per-request failures are caught here and recorded as
//! [`QueryOutcome::Failed`]; connection failures end the run.

pub mod insert;
pub mod pool;
pub mod query;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::client::QueryResult;
use crate::error::HarnessError;

pub use insert::{populate, InsertFailure, InsertReport};
pub use pool::{run_pooled, PooledRun};
pub use query::{run, QueryRun};

/// Why a single request failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    /// Non-success HTTP status.
    Status { status: u16, body: String },
    /// Body did not match the configured schema.
    MalformedResponse { detail: String },
    /// Timeout or connection reset after connect.
    Transport { detail: String },
}

impl FailureKind {
    /// Convert a per-request error; anything else is handed back unchanged.
    pub fn from_error(error: HarnessError) -> Result<Self, HarnessError> {
        match error {
            HarnessError::Service { status, body } => Ok(FailureKind::Status { status, body }),
            HarnessError::MalformedResponse { detail } => Ok(FailureKind::MalformedResponse { detail }),
            HarnessError::Transport(detail) => Ok(FailureKind::Transport { detail }),
            other => Err(other),
        }
    }
}

/// Result slot for one query. Failures are explicit, never an empty result.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    Completed(QueryResult),
    Failed(FailureKind),
}

impl QueryOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, QueryOutcome::Failed(_))
    }

    pub fn result(&self) -> Option<&QueryResult> {
        match self {
            QueryOutcome::Completed(r) => Some(r),
            QueryOutcome::Failed(_) => None,
        }
    }

    /// Top match id of a completed query.
    pub fn top_id(&self) -> Option<u64> {
        self.result().and_then(QueryResult::top_id)
    }
}

/// Turn a search result into an outcome, logging failures.
///
/// Returns `Err` for errors that must end the run.
pub(crate) fn record(
    index: usize,
    result: crate::error::Result<QueryResult>,
) -> crate::error::Result<QueryOutcome> {
    match result {
        Ok(r) => Ok(QueryOutcome::Completed(r)),
        Err(e) => {
            let kind = FailureKind::from_error(e)?;
            match &kind {
                FailureKind::MalformedResponse { detail } => {
                    tracing::error!(index, %detail, "search response does not match configured schema");
                }
                FailureKind::Status { status, body } => {
                    tracing::warn!(index, status, %body, "search failed");
                }
                FailureKind::Transport { detail } => {
                    tracing::warn!(index, %detail, "search transport error");
                }
            }
            Ok(QueryOutcome::Failed(kind))
        }
    }
}

/// Cooperative cancellation shared between the caller and a running driver.
///
/// Once set, drivers stop issuing new requests. Requests already in flight
/// complete (bounded by the client's timeout) and are recorded.
#[derive(Debug, Clone, Default)]
pub struct AbortSignal(Arc<AtomicBool>);

impl AbortSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn abort(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
