use std::fmt;

use indexmap::IndexMap;
use parrot_api::{JiraClient, JiraIssue, XrayServerClient, XrayServerTest};
use parrot_registry::HandlerError;
use parrot_types::{TestExecutionMetadata, TestResult};
use tracing::debug;

use super::{JiraAuthentication, XrayAuthentication, convert_status, retrieval_error};

const SEARCH_FIELDS: &[&str] = &["summary", "key", "id"];

/// Xray Server/DC test plans.
///
/// Xray only knows test keys and statuses; names come from a Jira search over
/// those keys.
pub struct XrayServerTestPlanSource {
    jira_authentication: JiraAuthentication,
    xray_authentication: XrayAuthentication,
    jira: JiraClient,
    xray: XrayServerClient,
}

impl fmt::Debug for XrayServerTestPlanSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("XrayServerTestPlanSource")
            .field("jira_url", &self.jira.base_url())
            .field("jira_version", &self.jira.version())
            .field("jira_authentication", &self.jira_authentication)
            .field("xray_url", &self.xray.base_url())
            .field("xray_authentication", &self.xray_authentication)
            .finish()
    }
}

impl XrayServerTestPlanSource {
    pub fn new(
        jira_authentication: JiraAuthentication,
        xray_authentication: XrayAuthentication,
        jira: JiraClient,
        xray: XrayServerClient,
    ) -> Self {
        Self {
            jira_authentication,
            xray_authentication,
            jira,
            xray,
        }
    }

    pub fn jira(&self) -> &JiraClient {
        &self.jira
    }

    pub fn xray(&self) -> &XrayServerClient {
        &self.xray
    }

    pub fn jira_authentication(&self) -> JiraAuthentication {
        self.jira_authentication
    }

    pub fn xray_authentication(&self) -> XrayAuthentication {
        self.xray_authentication
    }

    pub(crate) async fn test_results(&self, test_plan_key: &str) -> Result<Vec<TestResult>, HandlerError> {
        let tests = self
            .xray
            .test_plan_tests(test_plan_key)
            .await
            .map_err(|error| retrieval_error(test_plan_key, error))?;
        if tests.is_empty() {
            return Ok(Vec::new());
        }
        let tests_by_key: IndexMap<String, XrayServerTest> = tests.into_iter().map(|test| (test.key.clone(), test)).collect();
        let keys: Vec<&str> = tests_by_key.keys().map(String::as_str).collect();
        let jql = format!("issue in ({})", keys.join(","));

        let mut results = Vec::with_capacity(tests_by_key.len());
        let mut start_at = 0;
        loop {
            let page = self
                .jira
                .search(&jql, SEARCH_FIELDS, start_at)
                .await
                .map_err(|error| retrieval_error(test_plan_key, error))?;
            if page.issues.is_empty() {
                break;
            }
            debug!(test_plan = %test_plan_key, start_at, count = page.issues.len(), "received Jira search page");
            start_at += page.issues.len() as u32;
            results.extend(issue_results(self.jira.base_url(), test_plan_key, &tests_by_key, &page.issues)?);
        }
        Ok(results)
    }
}

/// Joins Jira issues with the Xray tests they belong to.
pub fn issue_results(
    jira_url: &str,
    test_plan_key: &str,
    tests_by_key: &IndexMap<String, XrayServerTest>,
    issues: &[JiraIssue],
) -> Result<Vec<TestResult>, HandlerError> {
    issues
        .iter()
        .map(|issue| {
            let test = tests_by_key.get(&issue.key).ok_or_else(|| {
                retrieval_error(
                    test_plan_key,
                    anyhow::anyhow!("Unexpected error occurred: {} was not returned by Xray", issue.key),
                )
            })?;
            let status = convert_status(&test.latest_status).map_err(|error| retrieval_error(test_plan_key, error))?;
            Ok(TestResult {
                id: issue.key.clone(),
                name: issue.fields.summary.clone(),
                url: format!("{jira_url}/browse/{}", issue.key),
                status,
                execution_metadata: TestExecutionMetadata {
                    url: format!("{jira_url}/browse/{test_plan_key}"),
                },
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use parrot_api::jira::JiraIssueFields;
    use parrot_types::TestStatus;

    use super::*;

    fn tests_by_key() -> IndexMap<String, XrayServerTest> {
        [("PRJ-2", "PASS"), ("PRJ-3", "TODO")]
            .into_iter()
            .enumerate()
            .map(|(index, (key, status))| {
                (
                    key.to_string(),
                    XrayServerTest {
                        id: index as u64,
                        key: key.to_string(),
                        latest_status: status.to_string(),
                    },
                )
            })
            .collect()
    }

    fn issue(key: &str, summary: &str) -> JiraIssue {
        JiraIssue {
            id: "10000".to_string(),
            key: key.to_string(),
            fields: JiraIssueFields {
                summary: summary.to_string(),
            },
        }
    }

    #[test]
    fn issues_are_joined_with_xray_statuses() {
        let results = issue_results(
            "https://jira.example.com",
            "PRJ-1",
            &tests_by_key(),
            &[issue("PRJ-3", "logs in"), issue("PRJ-2", "logs out")],
        )
        .unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, "PRJ-3");
        assert_eq!(results[0].name, "logs in");
        assert_eq!(results[0].status, TestStatus::Pending);
        assert_eq!(results[1].status, TestStatus::Pass);
        assert_eq!(results[1].url, "https://jira.example.com/browse/PRJ-2");
        assert_eq!(results[1].execution_metadata.url, "https://jira.example.com/browse/PRJ-1");
    }

    #[test]
    fn issues_unknown_to_xray_are_an_error() {
        let error = issue_results("https://jira.example.com", "PRJ-1", &tests_by_key(), &[issue("PRJ-4", "stray")]).unwrap_err();
        assert!(error.to_string().contains("PRJ-4 was not returned by Xray"), "{error}");
    }
}
