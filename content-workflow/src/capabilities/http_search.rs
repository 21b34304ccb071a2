//! Vector search over HTTP.
//!
//! Sends `POST {endpoint}` with a JSON [`SearchQuery`] body and expects
//! `{"results": [SearchHit, ...]}`. Every request carries its own timeout;
//! a timed-out request surfaces as [`CapabilityError::Timeout`] and the
//! retrieval loop treats it like any other failed query.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::{SearchCapability, SearchHit, SearchQuery};
use crate::error::CapabilityError;

/// Endpoint environment variable read by [`HttpSearchCapability::from_env`]
pub const SEARCH_URL_ENV: &str = "CONTENT_WORKFLOW_SEARCH_URL";
/// Optional bearer token environment variable
pub const SEARCH_TOKEN_ENV: &str = "CONTENT_WORKFLOW_SEARCH_TOKEN";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, Deserialize)]
struct SearchResponse {
    results: Vec<SearchHit>,
}

pub struct HttpSearchCapability {
    client: reqwest::Client,
    endpoint: String,
    token: Option<String>,
    timeout: Duration,
}

impl HttpSearchCapability {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, CapabilityError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            token: None,
            timeout,
        })
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Build from `CONTENT_WORKFLOW_SEARCH_URL` / `CONTENT_WORKFLOW_SEARCH_TOKEN`
    pub fn from_env() -> Result<Self, CapabilityError> {
        let endpoint = std::env::var(SEARCH_URL_ENV)
            .map_err(|_| CapabilityError::Unavailable(format!("{} is not set", SEARCH_URL_ENV)))?;
        let capability = Self::new(endpoint, DEFAULT_TIMEOUT)?;
        Ok(match std::env::var(SEARCH_TOKEN_ENV) {
            Ok(token) if !token.is_empty() => capability.with_token(token),
            _ => capability,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl SearchCapability for HttpSearchCapability {
    async fn query(&self, query: SearchQuery) -> Result<Vec<SearchHit>, CapabilityError> {
        let mut request = self.client.post(&self.endpoint).json(&query);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                CapabilityError::Timeout(self.timeout)
            } else {
                CapabilityError::from(e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(CapabilityError::Transport(format!(
                "search endpoint returned {}",
                status
            )));
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| CapabilityError::Malformed(e.to_string()))?;
        Ok(body.results)
    }
}
