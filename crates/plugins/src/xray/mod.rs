//! Xray test plan source.
//!
//! Reads the latest result of every test in an Xray test plan. Two
//! deployments are supported and chosen while building the source:
//!
//! - Xray Cloud, queried through GraphQL with client credentials
//!   ([`cloud`]), and
//! - Xray Server/DC, whose test list is joined with a Jira issue search to
//!   obtain test names ([`server`]).

pub mod cloud;
pub mod handler;
pub mod server;

use std::fmt;

use async_trait::async_trait;
use parrot_registry::{HandlerError, Source};
use parrot_types::{TestResult, TestStatus};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

pub use cloud::XrayCloudTestPlanSource;
pub use handler::{SerializedXraySource, XrayTestPlanSourceHandler};
pub use server::XrayServerTestPlanSource;

/// Raised for statuses Parrot cannot map.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown Xray status: {0}")]
pub struct UnknownXrayStatus(pub String);

/// Maps an Xray test run status to a [`TestStatus`].
pub fn convert_status(xray_status: &str) -> Result<TestStatus, UnknownXrayStatus> {
    match xray_status {
        "PASSED" | "PASS" => Ok(TestStatus::Pass),
        "FAILED" | "FAIL" => Ok(TestStatus::Fail),
        "TO DO" | "TODO" => Ok(TestStatus::Pending),
        "SKIPPED" => Ok(TestStatus::Skipped),
        other => Err(UnknownXrayStatus(other.to_string())),
    }
}

/// How Parrot authenticates to Jira.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JiraAuthentication {
    Basic,
    #[serde(rename = "oauth2")]
    OAuth2,
    Pat,
}

impl JiraAuthentication {
    pub const ALL: [JiraAuthentication; 3] = [JiraAuthentication::Basic, JiraAuthentication::OAuth2, JiraAuthentication::Pat];

    pub fn as_str(self) -> &'static str {
        match self {
            JiraAuthentication::Basic => "basic",
            JiraAuthentication::OAuth2 => "oauth2",
            JiraAuthentication::Pat => "pat",
        }
    }
}

impl fmt::Display for JiraAuthentication {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How Parrot authenticates to Xray.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum XrayAuthentication {
    Basic,
    ClientCredentials,
    Pat,
}

/// Parameters of one retrieval: the test plan to read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct XrayTestPlanInlet {
    /// Issue key of the test plan, e.g. `ABC-123`.
    pub test_plan_key: String,
}

/// A configured Xray instance.
#[derive(Debug)]
pub enum XrayTestPlanSource {
    Cloud(XrayCloudTestPlanSource),
    Server(XrayServerTestPlanSource),
}

#[async_trait]
impl Source for XrayTestPlanSource {
    type Inlet = XrayTestPlanInlet;

    async fn get_test_results(&self, inlet: &XrayTestPlanInlet) -> Result<Vec<TestResult>, HandlerError> {
        info!(test_plan = %inlet.test_plan_key, "Fetching test results from {} ...", inlet.test_plan_key);
        match self {
            XrayTestPlanSource::Cloud(source) => source.test_results(&inlet.test_plan_key).await,
            XrayTestPlanSource::Server(source) => source.test_results(&inlet.test_plan_key).await,
        }
    }
}

/// Wraps a failure while reading `test_plan_key`.
pub(crate) fn retrieval_error(test_plan_key: &str, error: impl Into<anyhow::Error>) -> HandlerError {
    HandlerError::collaborator(format!("reading test plan {test_plan_key}"), error)
}
