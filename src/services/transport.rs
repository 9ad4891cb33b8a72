//! HTTP transport used by adapters
//!
//! Adapters never touch reqwest directly; they hand a JSON body to a
//! [`ChatTransport`] and get back either the raw response body or a
//! [`ChatError`] describing what went wrong on the wire.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::error::{ChatError, ErrorCode, Result};

/// Performs a JSON POST and classifies failures
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// POST `body` to `url` as `application/json`
    ///
    /// Returns the response body of a 2xx reply.
    async fn post_json(&self, url: &str, body: &Value) -> std::result::Result<String, ChatError>;
}

/// reqwest-backed transport
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Transport without a request timeout
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built
    pub fn new() -> Result<Self> {
        Ok(Self {
            client: Client::builder().build()?,
        })
    }

    /// Transport that gives up on requests after `timeout`
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
        })
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn post_json(&self, url: &str, body: &Value) -> std::result::Result<String, ChatError> {
        tracing::debug!(url, "POST chat request");

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| ChatError::from(&e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ChatError::new(ErrorCode::Network, e.to_string()))?;

        if !status.is_success() {
            return Err(ChatError::new(
                ErrorCode::Http,
                format!("HTTP {status}: {text}"),
            ));
        }

        Ok(text)
    }
}
