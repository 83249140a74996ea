//! HTTP clients for the services Parrot talks to.
//!
//! This crate provides thin, typed wrappers around `reqwest` for:
//!
//! - Xray Cloud: client-credential authentication and the GraphQL test plan query
//! - Xray Server/DC: the test plan REST endpoint
//! - Jira: JQL issue search on REST API v2 or v3
//! - Microsoft Teams: incoming webhooks
//!
//! Every client is built through [`build_http_client`] so they share the same
//! defaults (timeout, User-Agent, compression), and every configured base URL
//! passes through [`validate_base_url`] first.
//!
//! Retries and backoff are left to the caller.

pub mod jira;
pub mod teams;
pub mod xray;

use std::env;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use reqwest::{Client, Url, header};

pub use jira::{JiraApiVersion, JiraClient, JiraCredentials, JiraIssue, JiraSearchPage};
pub use teams::{TeamsWebhookClient, WebhookResponse};
pub use xray::{
    XrayCloudClient, XrayCloudTest, XrayServerClient, XrayServerCredentials, XrayServerTest, XrayTestPlanPage, XrayTestRun,
};

/// Hostnames allowed to use plain HTTP.
const LOCALHOST_DOMAINS: &[&str] = &["localhost", "127.0.0.1"];

/// Default request timeout for all clients.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// User-Agent sent with every request.
pub fn user_agent() -> String {
    format!("parrot/{}; {}", env!("CARGO_PKG_VERSION"), env::consts::OS)
}

/// Build a `reqwest::Client` with Parrot's defaults and the given headers.
pub fn build_http_client(default_headers: header::HeaderMap) -> Result<Client> {
    Client::builder()
        .default_headers(default_headers)
        .user_agent(user_agent())
        .timeout(REQUEST_TIMEOUT)
        .build()
        .context("build http client")
}

/// Validate that a base URL is acceptable for use by a client and normalise it
/// to have no trailing slash.
///
/// Rules:
/// - `localhost` or `127.0.0.1`: `http` or `https`
/// - otherwise: scheme must be HTTPS
pub fn validate_base_url(base: &str) -> Result<String> {
    let trimmed = base.trim();
    let parsed_base_url = Url::parse(trimmed).map_err(|error| anyhow!("Invalid base URL '{trimmed}': {error}"))?;

    let host_name = parsed_base_url
        .host_str()
        .ok_or_else(|| anyhow!("base URL '{trimmed}' must include a host"))?;

    let is_local = LOCALHOST_DOMAINS
        .iter()
        .any(|&allowed| host_name.eq_ignore_ascii_case(allowed));
    match parsed_base_url.scheme() {
        "https" => {}
        "http" if is_local => {}
        scheme => {
            return Err(anyhow!("base URL '{trimmed}' must use https for non-localhost hosts; got '{scheme}://'"));
        }
    }

    Ok(trimmed.trim_end_matches('/').to_string())
}

/// Reads the body of `response`, failing with the body attached when the
/// status is not a success.
pub(crate) async fn success_body(response: reqwest::Response, operation: &str) -> Result<String> {
    let status = response.status();
    let body = response.text().await.with_context(|| format!("read response of {operation}"))?;
    if !status.is_success() {
        return Err(anyhow!("{operation} failed with status {status}: {body}"));
    }
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn https_urls_are_accepted_and_normalised() {
        assert_eq!(
            validate_base_url("https://example.atlassian.net/").unwrap(),
            "https://example.atlassian.net"
        );
        assert_eq!(
            validate_base_url(" https://xray.cloud.getxray.app/ ").unwrap(),
            "https://xray.cloud.getxray.app"
        );
        assert_eq!(
            validate_base_url("https://jira.example.com/context").unwrap(),
            "https://jira.example.com/context"
        );
    }

    #[test]
    fn plain_http_is_only_allowed_locally() {
        assert!(validate_base_url("http://localhost:8080").is_ok());
        assert!(validate_base_url("http://127.0.0.1:2990/jira").is_ok());

        let error = validate_base_url("http://jira.example.com").unwrap_err();
        assert!(error.to_string().contains("must use https"), "{error}");
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(validate_base_url("not a url").is_err());
        assert!(validate_base_url("ftp://localhost").is_err());
        assert!(validate_base_url("").is_err());
    }
}
