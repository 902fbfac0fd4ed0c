//! HTTP client for the ingestion endpoint.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};
use serde_json::Value;

use super::generator::EventPayload;

/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Debug, Clone)]
pub struct IngestClient {
    client: Client,
    url: String,
}

/// What the server said about one submission.
#[derive(Debug, Clone)]
pub struct SubmitOutcome {
    pub status: StatusCode,
    pub body: Value,
}

impl SubmitOutcome {
    pub fn is_success(&self) -> bool {
        self.status.is_success() && self.body["success"] == Value::Bool(true)
    }

    /// Server-provided message, if any.
    pub fn message(&self) -> &str {
        self.body["message"].as_str().unwrap_or("")
    }
}

impl IngestClient {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// `POST <url>` with `payload` as JSON. Transport errors are `Err`; any
    /// HTTP response, including 4xx/5xx, is an `Ok` outcome.
    pub async fn submit(&self, payload: &EventPayload) -> Result<SubmitOutcome> {
        let resp = self
            .client
            .post(&self.url)
            .json(payload)
            .send()
            .await
            .with_context(|| format!("POST {} failed", self.url))?;

        let status = resp.status();
        let body = resp.json::<Value>().await.unwrap_or(Value::Null);
        Ok(SubmitOutcome { status, body })
    }
}
