use std::fmt;

use parrot_api::xray::{XrayCloudClient, XrayCloudTest, XrayTestPlanPage};
use parrot_api::validate_base_url;
use parrot_registry::{EntityKind, HandlerError};
use parrot_types::{TestExecutionMetadata, TestResult, TestStatus};
use tracing::debug;

use super::{UnknownXrayStatus, convert_status, retrieval_error};

/// Xray Cloud test plans.
///
/// Client credentials are exchanged for a token on every retrieval, so
/// building or restoring the source never talks to the network.
pub struct XrayCloudTestPlanSource {
    jira_url: String,
    xray_url: String,
    client_id: String,
    client_secret: String,
}

impl fmt::Debug for XrayCloudTestPlanSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("XrayCloudTestPlanSource")
            .field("jira_url", &self.jira_url)
            .field("xray_url", &self.xray_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

impl XrayCloudTestPlanSource {
    pub fn new(jira_url: &str, xray_url: &str, client_id: String, client_secret: String) -> Result<Self, HandlerError> {
        let invalid = |error: anyhow::Error| HandlerError::construction(EntityKind::Source, error.to_string());
        Ok(Self {
            jira_url: validate_base_url(jira_url).map_err(invalid)?,
            xray_url: validate_base_url(xray_url).map_err(invalid)?,
            client_id,
            client_secret,
        })
    }

    pub fn jira_url(&self) -> &str {
        &self.jira_url
    }

    pub fn xray_url(&self) -> &str {
        &self.xray_url
    }

    pub(crate) async fn test_results(&self, test_plan_key: &str) -> Result<Vec<TestResult>, HandlerError> {
        let client = XrayCloudClient::authenticate(&self.xray_url, &self.client_id, &self.client_secret)
            .await
            .map_err(|error| HandlerError::collaborator("authenticating to Xray Cloud", error))?;

        let mut results = Vec::new();
        let mut start = 0;
        loop {
            let page = client
                .test_plan_page(test_plan_key, start)
                .await
                .map_err(|error| retrieval_error(test_plan_key, error))?;
            let Some(next) = next_page_start(start, &page) else {
                break;
            };
            debug!(test_plan = %test_plan_key, start, fetched = page.fetched, kept = page.tests.len(), "received Xray Cloud page");
            start = next;
            results.extend(page_results(&self.jira_url, test_plan_key, &page).map_err(|error| retrieval_error(test_plan_key, error))?);
        }
        Ok(results)
    }
}

/// Offset of the page after `page`, or `None` once the server returns no tests.
fn next_page_start(start: u32, page: &XrayTestPlanPage) -> Option<u32> {
    if page.fetched == 0 {
        return None;
    }
    Some(start.saturating_add(u32::try_from(page.fetched).unwrap_or(u32::MAX)))
}

/// Converts one page of a test plan into test results.
///
/// Tests without a run are pending and link to the test plan. Runs without a
/// status are pending and link to their execution. Everything else links to
/// the execution's testing board.
pub fn page_results(jira_url: &str, test_plan_key: &str, page: &XrayTestPlanPage) -> Result<Vec<TestResult>, UnknownXrayStatus> {
    page.tests
        .iter()
        .map(|test| test_result(jira_url, test_plan_key, &page.project_key, test))
        .collect()
}

fn test_result(jira_url: &str, test_plan_key: &str, project_key: &str, test: &XrayCloudTest) -> Result<TestResult, UnknownXrayStatus> {
    let run = test.latest_run.as_ref();
    let execution_key = run.and_then(|run| run.execution_key.as_deref());
    let status = run.and_then(|run| run.status.as_deref());

    let (status, execution_url) = match (execution_key, status) {
        (None, _) => (TestStatus::Pending, format!("{jira_url}/browse/{test_plan_key}")),
        (Some(execution_key), None) => (TestStatus::Pending, format!("{jira_url}/browse/{execution_key}")),
        (Some(execution_key), Some(status)) => (
            convert_status(status)?,
            format!(
                "{jira_url}/projects/{project_key}?selectedItem=com.atlassian.plugins.atlassian-connect-plugin%3Acom.xpandit.plugins.xray__testing-board&ac.testExecutionKey={execution_key}&ac.testKey={}",
                test.key
            ),
        ),
    };

    Ok(TestResult {
        id: test.key.clone(),
        name: test.summary.clone(),
        url: format!("{jira_url}/browse/{}", test.key),
        status,
        execution_metadata: TestExecutionMetadata { url: execution_url },
    })
}

#[cfg(test)]
mod tests {
    use parrot_api::xray::XrayTestRun;

    use super::*;

    const JIRA: &str = "https://example.atlassian.net";

    fn test(key: &str, run: Option<(Option<&str>, Option<&str>)>) -> XrayCloudTest {
        XrayCloudTest {
            key: key.to_string(),
            summary: format!("summary of {key}"),
            latest_run: run.map(|(status, execution_key)| XrayTestRun {
                status: status.map(str::to_string),
                execution_key: execution_key.map(str::to_string),
            }),
        }
    }

    fn page(tests: Vec<XrayCloudTest>) -> XrayTestPlanPage {
        XrayTestPlanPage {
            summary: Some("Regression".to_string()),
            project_key: "PRJ".to_string(),
            fetched: tests.len(),
            tests,
        }
    }

    #[test]
    fn paging_advances_by_the_tests_the_server_returned() {
        let mut filtered = page(vec![test("PRJ-2", None)]);
        filtered.fetched = 3;
        assert_eq!(next_page_start(100, &filtered), Some(103));

        let mut unlinked_only = page(Vec::new());
        unlinked_only.fetched = 2;
        assert_eq!(next_page_start(0, &unlinked_only), Some(2));

        assert_eq!(next_page_start(200, &page(Vec::new())), None);
    }

    #[test]
    fn tests_without_runs_are_pending_and_link_to_the_plan() {
        let results = page_results(JIRA, "PRJ-1", &page(vec![test("PRJ-2", None)])).unwrap();
        assert_eq!(results[0].status, TestStatus::Pending);
        assert_eq!(results[0].url, "https://example.atlassian.net/browse/PRJ-2");
        assert_eq!(results[0].execution_metadata.url, "https://example.atlassian.net/browse/PRJ-1");
        assert_eq!(results[0].name, "summary of PRJ-2");
    }

    #[test]
    fn runs_without_status_are_pending_and_link_to_the_execution() {
        let results = page_results(JIRA, "PRJ-1", &page(vec![test("PRJ-2", Some((None, Some("PRJ-9"))))])).unwrap();
        assert_eq!(results[0].status, TestStatus::Pending);
        assert_eq!(results[0].execution_metadata.url, "https://example.atlassian.net/browse/PRJ-9");
    }

    #[test]
    fn finished_runs_link_to_the_testing_board() {
        let results = page_results(
            JIRA,
            "PRJ-1",
            &page(vec![test("PRJ-2", Some((Some("PASSED"), Some("PRJ-9")))), test("PRJ-3", Some((Some("FAILED"), Some("PRJ-9"))))]),
        )
        .unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].status, TestStatus::Pass);
        assert_eq!(results[1].status, TestStatus::Fail);
        assert_eq!(
            results[0].execution_metadata.url,
            "https://example.atlassian.net/projects/PRJ?selectedItem=com.atlassian.plugins.atlassian-connect-plugin%3Acom.xpandit.plugins.xray__testing-board&ac.testExecutionKey=PRJ-9&ac.testKey=PRJ-2"
        );
    }

    #[test]
    fn unknown_statuses_fail_the_page() {
        let error = page_results(JIRA, "PRJ-1", &page(vec![test("PRJ-2", Some((Some("ABORTED"), Some("PRJ-9"))))])).unwrap_err();
        assert_eq!(error.0, "ABORTED");
    }

    #[test]
    fn debug_output_hides_the_secret() {
        let source = XrayCloudTestPlanSource::new(JIRA, "https://xray.cloud.getxray.app/", "id".into(), "s3cr3t".into()).unwrap();
        let rendered = format!("{source:?}");
        assert!(!rendered.contains("s3cr3t"));
        assert_eq!(source.xray_url(), "https://xray.cloud.getxray.app");
    }
}
