//! Access to the ANN service under test.
//!
//! [`ServiceClient`] is the narrow contract the drivers use: one insert, one
//! search. [`HttpServiceClient`] speaks HTTP with a configured
//! [`SchemaVersion`]; tests and in-process baselines implement the trait
//! directly.
//!
//! Clients never retry. A retried request would fold two round trips into a
//! single latency sample.

pub mod http;
pub mod schema;

use serde::{Deserialize, Serialize};

use crate::benchmark::datasets::Vector;
use crate::error::Result;

pub use http::HttpServiceClient;
pub use schema::SchemaVersion;

/// A single search hit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub id: u64,
    pub score: f32,
}

/// Matches ranked best-first. May be empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    pub matches: Vec<Match>,
}

impl QueryResult {
    /// Id of the top-ranked match, if any.
    pub fn top_id(&self) -> Option<u64> {
        self.matches.first().map(|m| m.id)
    }
}

/// Insert/search operations against an ANN service.
///
/// Implementations must be `Sync` so the pooled driver can share one client
/// across worker threads.
pub trait ServiceClient: Sync {
    /// Insert one vector under its caller-assigned id.
    fn insert(&self, vector: &Vector) -> Result<()>;

    /// Search for the `k` nearest neighbors of `query`.
    ///
    /// `k` is always explicit; implementations must not substitute a default.
    fn search(&self, query: &[f32], k: usize) -> Result<QueryResult>;
}

impl<C: ServiceClient + ?Sized> ServiceClient for &C {
    fn insert(&self, vector: &Vector) -> Result<()> {
        (**self).insert(vector)
    }

    fn search(&self, query: &[f32], k: usize) -> Result<QueryResult> {
        (**self).search(query, k)
    }
}

impl<C: ServiceClient + ?Sized> ServiceClient for Box<C> {
    fn insert(&self, vector: &Vector) -> Result<()> {
        (**self).insert(vector)
    }

    fn search(&self, query: &[f32], k: usize) -> Result<QueryResult> {
        (**self).search(query, k)
    }
}
