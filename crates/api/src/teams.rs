//! Microsoft Teams incoming webhooks.

use anyhow::{Context, Result};
use reqwest::Client;
use reqwest::header::HeaderMap;
use serde_json::Value;

use crate::{build_http_client, validate_base_url};

#[derive(Debug, Clone)]
pub struct TeamsWebhookClient {
    http: Client,
}

/// Status and body returned by a webhook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookResponse {
    pub status: u16,
    pub body: String,
}

impl WebhookResponse {
    /// Teams acknowledges accepted messages with exactly 200.
    pub fn is_accepted(&self) -> bool {
        self.status == 200
    }
}

impl TeamsWebhookClient {
    pub fn new() -> Result<Self> {
        Ok(Self {
            http: build_http_client(HeaderMap::new())?,
        })
    }

    /// POST `payload` to `webhook_url`. Non-success statuses are returned, not
    /// raised, so callers can decide how to report them.
    pub async fn post(&self, webhook_url: &str, payload: &Value) -> Result<WebhookResponse> {
        let webhook_url = validate_base_url(webhook_url)?;
        let response = self
            .http
            .post(&webhook_url)
            .json(payload)
            .send()
            .await
            .context("send Microsoft Teams webhook request")?;
        let status = response.status().as_u16();
        let body = response.text().await.context("read Microsoft Teams webhook response")?;
        Ok(WebhookResponse { status, body })
    }
}
