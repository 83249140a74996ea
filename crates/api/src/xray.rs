//! Xray clients.
//!
//! Xray Cloud is queried through its GraphQL API after exchanging client
//! credentials for a bearer token. Xray Server/DC exposes test plans through
//! the Raven REST API of the Jira instance it is installed in.

use anyhow::{Context, Result, anyhow};
use reqwest::header::HeaderMap;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::{build_http_client, success_body, validate_base_url};

/// Regional Xray Cloud endpoints, global first.
pub const XRAY_CLOUD_URLS: &[&str] = &[
    "https://xray.cloud.getxray.app",
    "https://us.xray.cloud.getxray.app",
    "https://eu.xray.cloud.getxray.app",
    "https://au.xray.cloud.getxray.app",
];

/// Number of tests requested per GraphQL page.
pub const TESTS_PAGE_SIZE: u32 = 100;

const TEST_PLAN_QUERY: &str = r#"query($jql: String, $start: Int, $limit: Int) {
  getTestPlans(jql: $jql, limit: 1) {
    results {
      jira(fields: ["summary", "project"])
      tests(limit: $limit, start: $start) {
        results {
          jira(fields: ["key", "summary"])
          testRuns(limit: 1) {
            results {
              status { name }
              testExecution { jira(fields: ["key"]) }
            }
          }
        }
      }
    }
  }
}"#;

/// Authenticated Xray Cloud client.
#[derive(Debug, Clone)]
pub struct XrayCloudClient {
    base_url: String,
    token: String,
    http: Client,
}

/// One page of tests of an Xray Cloud test plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XrayTestPlanPage {
    pub summary: Option<String>,
    pub project_key: String,
    /// Number of tests the server returned, including entries dropped from
    /// `tests` for lacking an issue or key. Paging advances by this count.
    pub fetched: usize,
    pub tests: Vec<XrayCloudTest>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XrayCloudTest {
    pub key: String,
    pub summary: String,
    pub latest_run: Option<XrayTestRun>,
}

/// The most recent run of a test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XrayTestRun {
    pub status: Option<String>,
    pub execution_key: Option<String>,
}

impl XrayCloudClient {
    /// Exchange client credentials for a token at `{base_url}/api/v2/authenticate`.
    pub async fn authenticate(base_url: &str, client_id: &str, client_secret: &str) -> Result<Self> {
        let base_url = validate_base_url(base_url)?;
        let http = build_http_client(HeaderMap::new())?;
        let url = format!("{base_url}/api/v2/authenticate");
        debug!(%url, "authenticating to Xray Cloud");

        let response = http
            .post(&url)
            .json(&json!({ "client_id": client_id, "client_secret": client_secret }))
            .send()
            .await
            .context("send Xray Cloud authentication request")?;
        let body = success_body(response, "Xray Cloud authentication").await?;
        let token = parse_token(&body)?;
        Ok(Self { base_url, token, http })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch tests `start..start + TESTS_PAGE_SIZE` of `test_plan_key`.
    pub async fn test_plan_page(&self, test_plan_key: &str, start: u32) -> Result<XrayTestPlanPage> {
        let variables = json!({
            "jql": format!("issue in ({test_plan_key})"),
            "start": start,
            "limit": TESTS_PAGE_SIZE,
        });
        let response = self
            .authorized(self.http.post(format!("{}/api/v2/graphql", self.base_url)))
            .json(&json!({ "query": TEST_PLAN_QUERY, "variables": variables }))
            .send()
            .await
            .context("send Xray Cloud GraphQL request")?;
        let body = success_body(response, "Xray Cloud test plan query").await?;
        parse_test_plan_page(test_plan_key, &body)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.bearer_auth(&self.token)
    }
}

/// The authenticate endpoint answers with a JSON string; some proxies strip
/// the quotes.
fn parse_token(body: &str) -> Result<String> {
    let token = serde_json::from_str::<String>(body).unwrap_or_else(|_| body.trim().to_string());
    if token.is_empty() {
        return Err(anyhow!("Xray Cloud authentication returned an empty token"));
    }
    Ok(token)
}

#[derive(Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GetTestPlansData {
    get_test_plans: Option<ResultList<RawTestPlan>>,
}

#[derive(Deserialize)]
struct ResultList<T> {
    #[serde(default = "Vec::new")]
    results: Vec<T>,
}

#[derive(Deserialize)]
struct RawTestPlan {
    jira: Option<RawTestPlanIssue>,
    tests: Option<ResultList<RawTest>>,
}

#[derive(Deserialize)]
struct RawTestPlanIssue {
    summary: Option<String>,
    project: Option<RawProject>,
}

#[derive(Deserialize)]
struct RawProject {
    key: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTest {
    jira: Option<RawIssue>,
    test_runs: Option<ResultList<RawTestRun>>,
}

#[derive(Deserialize)]
struct RawIssue {
    key: Option<String>,
    summary: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTestRun {
    status: Option<RawStatus>,
    test_execution: Option<RawTestExecution>,
}

#[derive(Deserialize)]
struct RawStatus {
    name: Option<String>,
}

#[derive(Deserialize)]
struct RawTestExecution {
    jira: Option<RawIssue>,
}

/// Parse a `getTestPlans` GraphQL response body.
pub fn parse_test_plan_page(test_plan_key: &str, body: &str) -> Result<XrayTestPlanPage> {
    let response: GraphQlResponse<GetTestPlansData> =
        serde_json::from_str(body).with_context(|| format!("parse Xray Cloud response for test plan {test_plan_key}"))?;
    if !response.errors.is_empty() {
        let messages: Vec<String> = response.errors.into_iter().map(|error| error.message).collect();
        return Err(anyhow!("Xray Cloud rejected the test plan query: {}", messages.join("; ")));
    }

    let plan = response
        .data
        .and_then(|data| data.get_test_plans)
        .and_then(|plans| plans.results.into_iter().next())
        .ok_or_else(|| anyhow!("failed to find test plan {test_plan_key}"))?;
    let issue = plan.jira;
    let project_key = issue
        .as_ref()
        .and_then(|issue| issue.project.as_ref())
        .and_then(|project| project.key.clone())
        .ok_or_else(|| anyhow!("failed to retrieve project of test plan {test_plan_key}"))?;

    let raw_tests = plan.tests.map(|tests| tests.results).unwrap_or_default();
    let fetched = raw_tests.len();
    let tests = raw_tests
        .into_iter()
        .filter_map(|test| {
            let issue = test.jira?;
            let latest_run = test
                .test_runs
                .and_then(|runs| runs.results.into_iter().next())
                .map(|run| XrayTestRun {
                    status: run.status.and_then(|status| status.name),
                    execution_key: run.test_execution.and_then(|execution| execution.jira).and_then(|jira| jira.key),
                });
            Some(XrayCloudTest {
                key: issue.key?,
                summary: issue.summary.unwrap_or_default(),
                latest_run,
            })
        })
        .collect();

    Ok(XrayTestPlanPage {
        summary: issue.and_then(|issue| issue.summary),
        project_key,
        fetched,
        tests,
    })
}

/// Credentials accepted by Xray Server/DC.
#[derive(Debug, Clone)]
pub enum XrayServerCredentials {
    Basic { username: String, password: String },
    PersonalAccessToken { token: String },
}

/// Xray Server/DC client.
#[derive(Debug, Clone)]
pub struct XrayServerClient {
    base_url: String,
    credentials: XrayServerCredentials,
    http: Client,
}

/// A test of a test plan as reported by Xray Server.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct XrayServerTest {
    pub id: u64,
    pub key: String,
    pub latest_status: String,
}

impl XrayServerClient {
    pub fn new(base_url: &str, credentials: XrayServerCredentials) -> Result<Self> {
        Ok(Self {
            base_url: validate_base_url(base_url)?,
            credentials,
            http: build_http_client(HeaderMap::new())?,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// All tests of `test_plan_key` with their latest status.
    pub async fn test_plan_tests(&self, test_plan_key: &str) -> Result<Vec<XrayServerTest>> {
        let url = format!("{}/rest/raven/1.0/api/testplan/{test_plan_key}/test", self.base_url);
        debug!(%url, "fetching Xray Server test plan");
        let response = self
            .authorized(self.http.get(&url))
            .send()
            .await
            .context("send Xray Server test plan request")?;
        let body = success_body(response, "Xray Server test plan request").await?;
        serde_json::from_str(&body).with_context(|| format!("parse Xray Server tests of {test_plan_key}"))
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.credentials {
            XrayServerCredentials::Basic { username, password } => request.basic_auth(username, Some(password)),
            XrayServerCredentials::PersonalAccessToken { token } => request.bearer_auth(token),
        }
    }
}
