//! Error types for annharness.

use thiserror::Error;

/// Errors raised while generating data, talking to the service, or aggregating results.
///
/// Variants fall into three groups:
///
/// - **Per-request**: [`Service`](Self::Service), [`MalformedResponse`](Self::MalformedResponse),
///   [`Transport`](Self::Transport). Drivers turn these into recorded failures.
/// - **Fatal to the run**: [`Connection`](Self::Connection), [`InsertFailed`](Self::InsertFailed),
///   [`Aborted`](Self::Aborted).
/// - **Harness misconfiguration**: everything else.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// The service could not be reached at all.
    #[error("cannot connect to {url}: {detail}")]
    Connection { url: String, detail: String },

    /// The service answered with a non-success status.
    #[error("service returned {status}: {body}")]
    Service { status: u16, body: String },

    /// The response body did not match the configured wire schema.
    #[error("malformed response: {detail}")]
    MalformedResponse { detail: String },

    /// Request failed after the connection was established (timeout, reset, ...).
    #[error("transport error: {0}")]
    Transport(String),

    /// A sampled vector kept a numerically zero norm after resampling.
    #[error("vector {id} has zero norm and cannot be normalized")]
    DegenerateVector { id: u64 },

    /// Ground truth was requested over an empty dataset.
    #[error("dataset is empty")]
    EmptyDataset,

    /// Vector dimension does not match the dataset dimension.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Invalid parameter value.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Population stopped before the whole dataset reached the service.
    #[error("insert of vector {id} failed after {inserted} successful inserts: {source}")]
    InsertFailed {
        inserted: usize,
        id: u64,
        #[source]
        source: Box<HarnessError>,
    },

    /// The run was cancelled before `phase` finished.
    #[error("aborted during {phase} after {completed} requests")]
    Aborted { phase: &'static str, completed: usize },

    /// Configuration could not be parsed or failed validation.
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl HarnessError {
    /// Whether this error is scoped to a single request.
    ///
    /// Per-request errors are recorded as failed samples and the run continues.
    pub fn is_per_request(&self) -> bool {
        matches!(
            self,
            HarnessError::Service { .. }
                | HarnessError::MalformedResponse { .. }
                | HarnessError::Transport(_)
        )
    }
}

impl From<toml::de::Error> for HarnessError {
    fn from(e: toml::de::Error) -> Self {
        Self::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, HarnessError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_request_classification() {
        assert!(HarnessError::Service {
            status: 500,
            body: String::new()
        }
        .is_per_request());
        assert!(HarnessError::MalformedResponse {
            detail: "x".into()
        }
        .is_per_request());
        assert!(HarnessError::Transport("timeout".into()).is_per_request());

        assert!(!HarnessError::Connection {
            url: "http://127.0.0.1:1".into(),
            detail: "refused".into()
        }
        .is_per_request());
        assert!(!HarnessError::EmptyDataset.is_per_request());
        assert!(!HarnessError::Aborted {
            phase: "population",
            completed: 4
        }
        .is_per_request());
    }

    #[test]
    fn insert_failed_keeps_source() {
        use std::error::Error as _;

        let err = HarnessError::InsertFailed {
            inserted: 3,
            id: 3,
            source: Box::new(HarnessError::Service {
                status: 503,
                body: "busy".into(),
            }),
        };
        assert!(err.to_string().contains("vector 3"));
        assert!(err.source().is_some());
    }
}
