//! Jira issue search.

use std::fmt;
use std::str::FromStr;

use anyhow::{Context, Result, anyhow};
use reqwest::header::HeaderMap;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::{build_http_client, success_body, validate_base_url};

/// Jira REST API generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JiraApiVersion {
    V2,
    V3,
}

impl JiraApiVersion {
    pub const ALL: [JiraApiVersion; 2] = [JiraApiVersion::V2, JiraApiVersion::V3];

    pub fn as_str(self) -> &'static str {
        match self {
            JiraApiVersion::V2 => "v2",
            JiraApiVersion::V3 => "v3",
        }
    }

    fn path_segment(self) -> &'static str {
        match self {
            JiraApiVersion::V2 => "2",
            JiraApiVersion::V3 => "3",
        }
    }
}

impl fmt::Display for JiraApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JiraApiVersion {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|version| version.as_str().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| anyhow!("unknown Jira API version '{value}'"))
    }
}

/// How requests to Jira are authenticated.
#[derive(Debug, Clone)]
pub enum JiraCredentials {
    Basic { username: String, password: String },
    OAuth2 { access_token: String },
    PersonalAccessToken { token: String },
}

impl JiraCredentials {
    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self {
            JiraCredentials::Basic { username, password } => request.basic_auth(username, Some(password)),
            JiraCredentials::OAuth2 { access_token } => request.bearer_auth(access_token),
            JiraCredentials::PersonalAccessToken { token } => request.bearer_auth(token),
        }
    }
}

#[derive(Debug, Clone)]
pub struct JiraClient {
    base_url: String,
    version: JiraApiVersion,
    credentials: JiraCredentials,
    http: Client,
}

/// One page of a JQL search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JiraSearchPage {
    #[serde(default)]
    pub start_at: u32,
    #[serde(default)]
    pub total: u32,
    #[serde(default)]
    pub issues: Vec<JiraIssue>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct JiraIssue {
    #[serde(default)]
    pub id: String,
    pub key: String,
    #[serde(default)]
    pub fields: JiraIssueFields,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct JiraIssueFields {
    #[serde(default)]
    pub summary: String,
}

impl JiraClient {
    pub fn new(base_url: &str, version: JiraApiVersion, credentials: JiraCredentials) -> Result<Self> {
        Ok(Self {
            base_url: validate_base_url(base_url)?,
            version,
            credentials,
            http: build_http_client(HeaderMap::new())?,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn version(&self) -> JiraApiVersion {
        self.version
    }

    /// Run `jql`, returning the page starting at `start_at`.
    pub async fn search(&self, jql: &str, fields: &[&str], start_at: u32) -> Result<JiraSearchPage> {
        let url = format!("{}/rest/api/{}/search", self.base_url, self.version.path_segment());
        debug!(%url, %jql, start_at, "searching Jira issues");
        let request = self
            .http
            .post(&url)
            .json(&json!({ "jql": jql, "fields": fields, "startAt": start_at }));
        let response = self
            .credentials
            .authorize(request)
            .send()
            .await
            .context("send Jira search request")?;
        let body = success_body(response, "Jira issue search").await?;
        serde_json::from_str(&body).context("parse Jira search response")
    }

    /// Browser URL of an issue.
    pub fn browse_url(&self, issue_key: &str) -> String {
        format!("{}/browse/{issue_key}", self.base_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn versions_parse_from_prompt_answers() {
        assert_eq!("v2".parse::<JiraApiVersion>().unwrap(), JiraApiVersion::V2);
        assert_eq!(" V3 ".parse::<JiraApiVersion>().unwrap(), JiraApiVersion::V3);
        assert!("v4".parse::<JiraApiVersion>().is_err());
        assert_eq!(serde_json::to_value(JiraApiVersion::V3).unwrap(), serde_json::json!("v3"));
    }

    #[test]
    fn search_pages_tolerate_missing_fields() {
        let page: JiraSearchPage = serde_json::from_str(
            r#"{"startAt": 0, "total": 2, "issues": [
                {"id": "1", "key": "PRJ-1", "fields": {"summary": "first"}},
                {"key": "PRJ-2"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.issues[0].fields.summary, "first");
        assert_eq!(page.issues[1].fields.summary, "");
    }

    #[test]
    fn browse_urls_use_the_normalised_base() {
        let client = JiraClient::new(
            "https://jira.example.com/",
            JiraApiVersion::V2,
            JiraCredentials::PersonalAccessToken { token: "t".to_string() },
        )
        .unwrap();
        assert_eq!(client.browse_url("PRJ-7"), "https://jira.example.com/browse/PRJ-7");
    }
}
