//! Wire schemas for the service's insert and search endpoints.
//!
//! Services in the wild disagree on the search contract:
//!
//! | Version | Request | Response |
//! |---------|---------|----------|
//! | `flattened-id` | `{"vector": [..]}` | `{"id": n, "score": s, ..}` (single best match) |
//! | `query-matches` | `{"query": [..]}` | `{"matches": [{"id": n, "score": s}, ..]}` |
//! | `ranked` | `{"query": [..], "k": k}` | `{"matches": [{"id": n, "score": s}, ..]}` |
//!
//! The version is always configured explicitly. Auto-detection would let a
//! `query`/`vector` key mismatch pass silently as empty results.
//!
//! Insert bodies are `{"id": n, "vector": [..]}` in every version.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::benchmark::datasets::Vector;
use crate::client::{Match, QueryResult};
use crate::error::{HarnessError, Result};

/// Selects the request/response shape of the search endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SchemaVersion {
    /// `{"vector"}` in, one flattened `{"id"}` out.
    FlattenedId,
    /// `{"query"}` in, ranked `{"matches"}` out; `k` is not sent.
    QueryMatches,
    /// `{"query", "k"}` in, ranked `{"matches"}` out.
    #[default]
    Ranked,
}

impl SchemaVersion {
    pub const ALL: [SchemaVersion; 3] = [
        SchemaVersion::FlattenedId,
        SchemaVersion::QueryMatches,
        SchemaVersion::Ranked,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SchemaVersion::FlattenedId => "flattened-id",
            SchemaVersion::QueryMatches => "query-matches",
            SchemaVersion::Ranked => "ranked",
        }
    }

    /// Whether the requested neighbor count travels on the wire.
    pub fn sends_k(self) -> bool {
        matches!(self, SchemaVersion::Ranked)
    }

    /// Build the search request body.
    pub fn search_request(self, query: &[f32], k: usize) -> SearchRequest<'_> {
        match self {
            SchemaVersion::FlattenedId => SearchRequest::ByVector { vector: query },
            SchemaVersion::QueryMatches => SearchRequest::ByQuery { query, k: None },
            SchemaVersion::Ranked => SearchRequest::ByQuery { query, k: Some(k) },
        }
    }

    /// Parse a search response body, truncated to at most `k` matches.
    ///
    /// # Errors
    ///
    /// [`HarnessError::MalformedResponse`] when the body does not have this
    /// version's shape. A ranked list is never accepted as a flattened match
    /// (or vice versa).
    pub fn parse_search(self, body: &str, k: usize) -> Result<QueryResult> {
        let mut matches = match self {
            SchemaVersion::FlattenedId => {
                let flat: FlattenedResponse = decode(self, body)?;
                vec![Match {
                    id: flat.id,
                    score: flat.score,
                }]
            }
            SchemaVersion::QueryMatches | SchemaVersion::Ranked => {
                let ranked: RankedResponse = decode(self, body)?;
                ranked.matches
            }
        };
        matches.truncate(k);
        Ok(QueryResult { matches })
    }
}

fn decode<'de, T: Deserialize<'de>>(schema: SchemaVersion, body: &'de str) -> Result<T> {
    serde_json::from_str(body).map_err(|e| HarnessError::MalformedResponse {
        detail: format!("{} response: {e}; body: {}", schema.as_str(), truncate(body, 200)),
    })
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SchemaVersion {
    type Err = HarnessError;

    fn from_str(s: &str) -> Result<Self> {
        SchemaVersion::ALL
            .into_iter()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| {
                HarnessError::Config(format!(
                    "unknown schema version {s:?} (expected one of: flattened-id, query-matches, ranked)"
                ))
            })
    }
}

/// Body of `POST /insert`.
#[derive(Debug, Serialize)]
pub struct InsertRequest<'a> {
    pub id: u64,
    pub vector: &'a [f32],
}

impl<'a> From<&'a Vector> for InsertRequest<'a> {
    fn from(v: &'a Vector) -> Self {
        Self {
            id: v.id,
            vector: &v.values,
        }
    }
}

/// Body of `POST /search`.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum SearchRequest<'a> {
    ByVector {
        vector: &'a [f32],
    },
    ByQuery {
        query: &'a [f32],
        #[serde(skip_serializing_if = "Option::is_none")]
        k: Option<usize>,
    },
}

#[derive(Debug, Deserialize)]
struct RankedResponse {
    matches: Vec<Match>,
}

/// Extra fields are tolerated; `id` is required.
#[derive(Debug, Deserialize)]
struct FlattenedResponse {
    id: u64,
    #[serde(default)]
    score: f32,
}
