//! Dataset population.

use crate::benchmark::datasets::Dataset;
use crate::client::ServiceClient;
use crate::driver::AbortSignal;
use crate::error::{HarnessError, Result};

/// The insert that stopped population.
#[derive(Debug)]
pub struct InsertFailure {
    pub id: u64,
    pub error: HarnessError,
}

/// Outcome of [`populate`].
#[derive(Debug)]
pub struct InsertReport {
    /// Vectors acknowledged before the first failure (or all of them).
    pub inserted: usize,
    pub failure: Option<InsertFailure>,
    /// Set when an abort stopped population before the dataset was sent.
    pub aborted: bool,
}

impl InsertReport {
    pub fn is_complete(&self) -> bool {
        self.failure.is_none() && !self.aborted
    }

    /// Convert an incomplete report into [`HarnessError::InsertFailed`], or
    /// [`HarnessError::Aborted`] when population was cancelled.
    pub fn into_result(self) -> Result<usize> {
        match self.failure {
            None if self.aborted => Err(HarnessError::Aborted {
                phase: "population",
                completed: self.inserted,
            }),
            None => Ok(self.inserted),
            Some(InsertFailure { id, error }) => Err(HarnessError::InsertFailed {
                inserted: self.inserted,
                id,
                source: Box::new(error),
            }),
        }
    }
}

/// Insert every vector of `dataset`, in order, one request at a time.
///
/// Stops at the first per-request failure and reports it in the
/// [`InsertReport`]. Success means the service acknowledged the request;
/// persistence on the server side is not verified. `abort` is checked before
/// every insert.
///
/// # Errors
///
/// Returns `Err` only for failures that end the whole run, such as
/// [`HarnessError::Connection`].
pub fn populate<C: ServiceClient + ?Sized>(
    dataset: &Dataset,
    client: &C,
    abort: &AbortSignal,
) -> Result<InsertReport> {
    tracing::info!(vectors = dataset.len(), dimension = dataset.dimension(), "populating service");

    for (inserted, vector) in dataset.vectors().iter().enumerate() {
        if abort.is_aborted() {
            tracing::info!(inserted, "population aborted");
            return Ok(InsertReport {
                inserted,
                failure: None,
                aborted: true,
            });
        }
        if let Err(error) = client.insert(vector) {
            if !error.is_per_request() {
                return Err(error);
            }
            tracing::warn!(id = vector.id, inserted, %error, "insert failed, stopping population");
            return Ok(InsertReport {
                inserted,
                failure: Some(InsertFailure {
                    id: vector.id,
                    error,
                }),
                aborted: false,
            });
        }
    }

    tracing::info!(inserted = dataset.len(), "population complete");
    Ok(InsertReport {
        inserted: dataset.len(),
        failure: None,
        aborted: false,
    })
}
