//! Blocking HTTP client for the service under test.

use std::time::Duration;

use reqwest::blocking::{Client, Response};
use serde::Serialize;

use crate::benchmark::datasets::Vector;
use crate::client::schema::{InsertRequest, SchemaVersion};
use crate::client::{QueryResult, ServiceClient};
use crate::config::HarnessConfig;
use crate::error::{HarnessError, Result};

/// [`ServiceClient`] over `POST {base_url}/insert` and `POST {base_url}/search`.
///
/// Each call blocks until the response is fully read, so a caller timing
/// the call measures a full round trip.
#[derive(Debug, Clone)]
pub struct HttpServiceClient {
    http: Client,
    base_url: String,
    schema: SchemaVersion,
}

impl HttpServiceClient {
    /// Create a client for `base_url` (e.g. `http://127.0.0.1:8000`).
    pub fn new(base_url: impl Into<String>, schema: SchemaVersion, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| HarnessError::Config(format!("failed to build HTTP client: {e}")))?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self {
            http,
            base_url,
            schema,
        })
    }

    pub fn from_config(config: &HarnessConfig) -> Result<Self> {
        Self::new(&config.base_url, config.schema, config.request_timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn schema(&self) -> SchemaVersion {
        self.schema
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// POST a JSON body and return the success response.
    fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Response> {
        let url = self.endpoint(path);
        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .map_err(|e| classify(&url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(HarnessError::Service {
                status: status.as_u16(),
                body: error_body(response.text()),
            });
        }
        Ok(response)
    }
}

/// Body of an error response, or why it could not be read.
fn error_body<E: std::fmt::Display>(text: std::result::Result<String, E>) -> String {
    text.unwrap_or_else(|e| format!("<unreadable body: {e}>"))
}

/// Map a reqwest failure onto the harness taxonomy.
///
/// Only connect failures are fatal; everything after the connection is up
/// is scoped to the one request.
fn classify(url: &str, e: reqwest::Error) -> HarnessError {
    if e.is_connect() {
        HarnessError::Connection {
            url: url.to_string(),
            detail: e.to_string(),
        }
    } else if e.is_timeout() {
        HarnessError::Transport(format!("request to {url} timed out"))
    } else {
        HarnessError::Transport(e.to_string())
    }
}

impl ServiceClient for HttpServiceClient {
    fn insert(&self, vector: &Vector) -> Result<()> {
        let response = self.post("insert", &InsertRequest::from(vector))?;
        // Drain the ack so the connection can be reused.
        response
            .bytes()
            .map_err(|e| HarnessError::Transport(e.to_string()))?;
        Ok(())
    }

    fn search(&self, query: &[f32], k: usize) -> Result<QueryResult> {
        if k == 0 {
            return Err(HarnessError::InvalidParameter("k must be at least 1".into()));
        }
        let response = self.post("search", &self.schema.search_request(query, k))?;
        let body = response
            .text()
            .map_err(|e| HarnessError::Transport(e.to_string()))?;
        self.schema.parse_search(&body, k)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash() {
        let client =
            HttpServiceClient::new("http://127.0.0.1:8080/", SchemaVersion::Ranked, Duration::from_secs(1))
                .unwrap();
        assert_eq!(client.base_url(), "http://127.0.0.1:8080");
        assert_eq!(client.endpoint("search"), "http://127.0.0.1:8080/search");
    }

    #[test]
    fn test_from_config() {
        let config = HarnessConfig {
            base_url: "http://10.0.0.5:9000".into(),
            schema: SchemaVersion::FlattenedId,
            ..HarnessConfig::default()
        };
        let client = HttpServiceClient::from_config(&config).unwrap();
        assert_eq!(client.base_url(), "http://10.0.0.5:9000");
        assert_eq!(client.schema(), SchemaVersion::FlattenedId);
    }

    #[test]
    fn test_zero_k_rejected_without_request() {
        // Port 9 (discard) is never contacted: validation happens first.
        let client =
            HttpServiceClient::new("http://127.0.0.1:9", SchemaVersion::Ranked, Duration::from_millis(50))
                .unwrap();
        assert!(matches!(
            client.search(&[1.0], 0),
            Err(HarnessError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_unreadable_error_body_is_recorded() {
        assert_eq!(error_body::<String>(Ok("index full".into())), "index full");
        assert_eq!(
            error_body(Err("connection reset")),
            "<unreadable body: connection reset>"
        );
    }
}
