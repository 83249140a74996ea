//! Standard output drain.
//!
//! Prints a plain-text summary: a header with the number of tests and the
//! passing percentage, followed by one section per status listing every test
//! with the link to its execution.

use std::fmt::Display;

use async_trait::async_trait;
use crossterm::style::{StyledContent, Stylize};
use parrot_registry::{Drain, DrainHandler, HandlerError};
use parrot_types::{TestResult, TestStatus, passing_percentage};
use parrot_util::Prompter;
use serde::{Deserialize, Serialize};

use crate::NoConfiguration;

const INDENT: &str = "  ";

/// Parameters of one write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StdoutOutlet {
    /// Emit ANSI colors.
    pub use_color: bool,
    /// Use Unicode status markers instead of dashes.
    pub use_unicode: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutDrain;

#[async_trait]
impl Drain for StdoutDrain {
    type Outlet = StdoutOutlet;
    type Output = String;

    async fn write_test_results(&self, results: &[TestResult], outlet: &StdoutOutlet) -> Result<String, HandlerError> {
        let report = render_report(results, outlet);
        println!("{report}");
        Ok(report)
    }
}

/// Renders the report printed by [`StdoutDrain`].
pub fn render_report(results: &[TestResult], outlet: &StdoutOutlet) -> String {
    let mut sections = vec![String::new(), header(results, outlet)];
    sections.extend([TestStatus::Pass, TestStatus::Pending, TestStatus::Skipped, TestStatus::Fail].map(|status| section(results, status, outlet)));
    sections.join("\n\n")
}

fn header(results: &[TestResult], outlet: &StdoutOutlet) -> String {
    let total = results.len().to_string();
    let percentage = format!("{:.2}", passing_percentage(results));
    if !outlet.use_color {
        return format!("A total of {total} tests were run with a passing percentage of {percentage} %");
    }
    [
        chatter("A total of "),
        highlight(total),
        chatter(" tests were run with a passing percentage of "),
        highlight(percentage),
        chatter(" %"),
    ]
    .concat()
}

fn section(results: &[TestResult], status: TestStatus, outlet: &StdoutOutlet) -> String {
    let matching: Vec<&TestResult> = results.iter().filter(|result| result.status == status).collect();
    let heading = format!("{} tests ({}):", heading(status), matching.len());
    let mut lines = vec![if outlet.use_color { chatter(heading) } else { heading }];

    let marker = if outlet.use_unicode { unicode_marker(status) } else { "-" };
    for result in matching {
        let line = format!("{INDENT}{marker} {} ({})", result.name, result.execution_metadata.url);
        lines.push(if outlet.use_color { colorize(line, status).to_string() } else { line });
    }
    lines.join("\n")
}

fn heading(status: TestStatus) -> &'static str {
    match status {
        TestStatus::Pass => "Passing",
        TestStatus::Pending => "Pending",
        TestStatus::Skipped => "Skipped",
        TestStatus::Fail => "Failed",
    }
}

fn unicode_marker(status: TestStatus) -> &'static str {
    match status {
        TestStatus::Pass => "✔",
        TestStatus::Pending => "▸",
        TestStatus::Skipped => "/",
        TestStatus::Fail => "✖",
    }
}

fn colorize(line: String, status: TestStatus) -> StyledContent<String> {
    match status {
        TestStatus::Pass => line.green(),
        TestStatus::Pending => line.dark_grey(),
        TestStatus::Skipped => line.yellow(),
        TestStatus::Fail => line.red(),
    }
}

/// General information surrounding the tests.
fn chatter(text: impl Display) -> String {
    text.to_string().bold().white().to_string()
}

/// Values highlighted inside chatter.
fn highlight(text: impl Display) -> String {
    text.to_string().bold().cyan().to_string()
}

/// Handler of the `stdout` drain.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutDrainHandler;

#[async_trait]
impl DrainHandler for StdoutDrainHandler {
    type Drain = StdoutDrain;
    type SerializedDrain = NoConfiguration;
    type SerializedOutlet = StdoutOutlet;

    async fn build_drain(&self, _prompter: &dyn Prompter) -> Result<StdoutDrain, HandlerError> {
        Ok(StdoutDrain)
    }

    fn serialize_drain(&self, _drain: &StdoutDrain) -> Result<NoConfiguration, HandlerError> {
        Ok(NoConfiguration::default())
    }

    async fn deserialize_drain(&self, _serialized: NoConfiguration, _prompter: &dyn Prompter) -> Result<StdoutDrain, HandlerError> {
        Ok(StdoutDrain)
    }

    async fn build_outlet(&self, prompter: &dyn Prompter) -> Result<StdoutOutlet, HandlerError> {
        let use_color = prompter.confirm("Enable colored output?", true).await?;
        let use_unicode = prompter.confirm("Include Unicode characters in output?", true).await?;
        Ok(StdoutOutlet { use_color, use_unicode })
    }

    fn serialize_outlet(&self, outlet: &StdoutOutlet) -> Result<StdoutOutlet, HandlerError> {
        Ok(*outlet)
    }

    async fn deserialize_outlet(&self, serialized: StdoutOutlet, _prompter: &dyn Prompter) -> Result<StdoutOutlet, HandlerError> {
        Ok(serialized)
    }
}
