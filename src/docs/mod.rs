//! Docs REST transport.
//!
//! The engine talks to the document through the narrow `DocsApi` trait:
//! named-range lookup, end-of-document index, and the atomic batch
//! update. `DocsClient` is the reqwest implementation; tests script a
//! [`mock::MockDocs`] instead.

pub mod auth;
pub mod mock;
pub mod types;

pub use auth::{CachedToken, FileTokenSource, TokenSource};
pub use types::{Range, Reply, Request};

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::error::{Result, StickydocError};

use types::{BatchUpdateRequest, BatchUpdateResponse, BodyDoc, ErrorEnvelope, NamedRangesDoc};

/// Request timeout for all document calls.
const HTTP_TIMEOUT_SECS: u64 = 30;

#[async_trait]
pub trait DocsApi: Send + Sync {
    /// Current named ranges: range name → live spans, first entry per name.
    async fn named_ranges(&self, token: &str, doc_id: &str)
        -> Result<HashMap<String, Vec<Range>>>;

    /// The `endIndex` of the document's trailing structural element.
    /// Insertion at the very end of the body happens at this value minus
    /// one (the final newline cannot be written past).
    async fn end_index(&self, token: &str, doc_id: &str) -> Result<u32>;

    /// Submit one atomic batch; the reply list is positionally aligned
    /// with `requests`.
    async fn batch_update(
        &self,
        token: &str,
        doc_id: &str,
        requests: Vec<Request>,
    ) -> Result<Vec<Reply>>;
}

pub struct DocsClient {
    http: Client,
    base_url: String,
}

impl DocsClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()
            .expect("failed to build HTTP client");
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    fn document_url(&self, doc_id: &str) -> String {
        format!("{}/documents/{}", self.base_url.trim_end_matches('/'), doc_id)
    }

    /// Map a non-2xx response to an API rejection carrying Google's
    /// error message when one is present.
    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = match response.json::<ErrorEnvelope>().await {
            Ok(envelope) => envelope.error.message,
            Err(_) => status
                .canonical_reason()
                .unwrap_or("unknown error")
                .to_string(),
        };
        Err(StickydocError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl DocsApi for DocsClient {
    async fn named_ranges(
        &self,
        token: &str,
        doc_id: &str,
    ) -> Result<HashMap<String, Vec<Range>>> {
        let response = self
            .http
            .get(self.document_url(doc_id))
            .query(&[("fields", "namedRanges")])
            .bearer_auth(token)
            .send()
            .await?;
        let doc: NamedRangesDoc = Self::check(response).await?.json().await?;

        let ranges = doc
            .named_ranges
            .into_iter()
            .filter_map(|(name, list)| {
                list.named_ranges
                    .into_iter()
                    .next()
                    .map(|nr| (name, nr.ranges))
            })
            .collect();
        Ok(ranges)
    }

    async fn end_index(&self, token: &str, doc_id: &str) -> Result<u32> {
        let response = self
            .http
            .get(self.document_url(doc_id))
            .query(&[("fields", "body.content")])
            .bearer_auth(token)
            .send()
            .await?;
        let doc: BodyDoc = Self::check(response).await?.json().await?;

        // An empty body still ends with the implicit trailing newline at
        // index 2.
        Ok(doc
            .body
            .content
            .last()
            .map(|element| element.end_index)
            .unwrap_or(2))
    }

    async fn batch_update(
        &self,
        token: &str,
        doc_id: &str,
        requests: Vec<Request>,
    ) -> Result<Vec<Reply>> {
        debug!(count = requests.len(), "submitting batch update");
        let response = self
            .http
            .post(format!("{}:batchUpdate", self.document_url(doc_id)))
            .bearer_auth(token)
            .json(&BatchUpdateRequest { requests })
            .send()
            .await?;
        let parsed: BatchUpdateResponse = Self::check(response).await?.json().await?;
        Ok(parsed.replies)
    }
}
