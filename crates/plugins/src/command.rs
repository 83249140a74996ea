//! Handlers backed by external programs.
//!
//! Plugin manifests can point a table entry at any executable:
//!
//! - a command source is run with its configured arguments followed by the
//!   inlet's arguments and must print a JSON array of test results to stdout;
//! - a command drain is run the same way with the outlet's arguments and
//!   receives the JSON array of test results on stdin.
//!
//! A non-zero exit status fails the operation with the program's stderr.

use std::process::{Output, Stdio};

use anyhow::{Context, anyhow};
use async_trait::async_trait;
use parrot_registry::{Drain, DrainHandler, EntityKind, HandlerError, Source, SourceHandler};
use parrot_types::TestResult;
use parrot_util::{Prompter, split_arguments};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::NoConfiguration;

/// Extra arguments of one invocation, used as inlet and outlet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandArguments {
    #[serde(default)]
    pub args: Vec<String>,
}

/// What a command drain reports back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandOutput {
    pub exit_code: Option<i32>,
    pub stdout: String,
}

/// Program and leading arguments shared by every invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    program: String,
    args: Vec<String>,
}

impl CommandLine {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    fn command(&self, extra: &CommandArguments) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args).args(&extra.args).kill_on_drop(true);
        command
    }

    fn describe(&self) -> String {
        format!("running {}", self.program)
    }

    fn check(&self, output: &Output) -> Result<(), HandlerError> {
        if output.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(HandlerError::collaborator(
            self.describe(),
            anyhow!("exited with {}: {}", output.status, stderr.trim()),
        ))
    }

    async fn prompt_arguments(&self, prompter: &dyn Prompter, kind: EntityKind) -> Result<CommandArguments, HandlerError> {
        let line = prompter
            .input(&format!("Additional arguments for {} (leave empty for none):", self.program), Some(""))
            .await?;
        let args = split_arguments(&line).map_err(|error| HandlerError::construction(kind, error.to_string()))?;
        Ok(CommandArguments { args })
    }
}

pub struct CommandSource {
    command_line: CommandLine,
}

#[async_trait]
impl Source for CommandSource {
    type Inlet = CommandArguments;

    async fn get_test_results(&self, inlet: &CommandArguments) -> Result<Vec<TestResult>, HandlerError> {
        debug!(program = %self.command_line.program, args = ?inlet.args, "running command source");
        let output = self
            .command_line
            .command(inlet)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|error| HandlerError::collaborator(self.command_line.describe(), error))?;
        self.command_line.check(&output)?;
        serde_json::from_slice(&output.stdout)
            .context("stdout is not a JSON array of test results")
            .map_err(|error| HandlerError::collaborator(self.command_line.describe(), error))
    }
}

pub struct CommandDrain {
    command_line: CommandLine,
}

#[async_trait]
impl Drain for CommandDrain {
    type Outlet = CommandArguments;
    type Output = CommandOutput;

    async fn write_test_results(&self, results: &[TestResult], outlet: &CommandArguments) -> Result<CommandOutput, HandlerError> {
        debug!(program = %self.command_line.program, args = ?outlet.args, "running command drain");
        let fail = |error: anyhow::Error| HandlerError::collaborator(self.command_line.describe(), error);
        let payload = serde_json::to_vec(results).context("encode test results").map_err(fail)?;

        let mut child = self
            .command_line
            .command(outlet)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .context("spawn process")
            .map_err(fail)?;
        let stdin = child.stdin.take();
        // stdin must be written while stdout and stderr are drained.
        let feed = async move {
            match stdin {
                Some(mut stdin) => stdin.write_all(&payload).await,
                None => Ok(()),
            }
        };
        let (written, output) = tokio::join!(feed, child.wait_with_output());
        let output = output.context("wait for process").map_err(fail)?;
        self.command_line.check(&output)?;
        written.context("write test results to stdin").map_err(fail)?;
        Ok(CommandOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        })
    }
}

/// Source handler running an external program.
#[derive(Debug, Clone)]
pub struct CommandSourceHandler {
    command_line: CommandLine,
}

impl CommandSourceHandler {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command_line: CommandLine::new(program, args),
        }
    }
}

#[async_trait]
impl SourceHandler for CommandSourceHandler {
    type Source = CommandSource;
    type SerializedSource = NoConfiguration;
    type SerializedInlet = CommandArguments;

    async fn build_source(&self, _prompter: &dyn Prompter) -> Result<CommandSource, HandlerError> {
        Ok(CommandSource {
            command_line: self.command_line.clone(),
        })
    }

    fn serialize_source(&self, _source: &CommandSource) -> Result<NoConfiguration, HandlerError> {
        Ok(NoConfiguration::default())
    }

    async fn deserialize_source(&self, _serialized: NoConfiguration, prompter: &dyn Prompter) -> Result<CommandSource, HandlerError> {
        self.build_source(prompter).await
    }

    async fn build_inlet(&self, prompter: &dyn Prompter) -> Result<CommandArguments, HandlerError> {
        self.command_line.prompt_arguments(prompter, EntityKind::Inlet).await
    }

    fn serialize_inlet(&self, inlet: &CommandArguments) -> Result<CommandArguments, HandlerError> {
        Ok(inlet.clone())
    }

    async fn deserialize_inlet(&self, serialized: CommandArguments, _prompter: &dyn Prompter) -> Result<CommandArguments, HandlerError> {
        Ok(serialized)
    }
}

/// Drain handler running an external program.
#[derive(Debug, Clone)]
pub struct CommandDrainHandler {
    command_line: CommandLine,
}

impl CommandDrainHandler {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command_line: CommandLine::new(program, args),
        }
    }
}

#[async_trait]
impl DrainHandler for CommandDrainHandler {
    type Drain = CommandDrain;
    type SerializedDrain = NoConfiguration;
    type SerializedOutlet = CommandArguments;

    async fn build_drain(&self, _prompter: &dyn Prompter) -> Result<CommandDrain, HandlerError> {
        Ok(CommandDrain {
            command_line: self.command_line.clone(),
        })
    }

    fn serialize_drain(&self, _drain: &CommandDrain) -> Result<NoConfiguration, HandlerError> {
        Ok(NoConfiguration::default())
    }

    async fn deserialize_drain(&self, _serialized: NoConfiguration, prompter: &dyn Prompter) -> Result<CommandDrain, HandlerError> {
        self.build_drain(prompter).await
    }

    async fn build_outlet(&self, prompter: &dyn Prompter) -> Result<CommandArguments, HandlerError> {
        self.command_line.prompt_arguments(prompter, EntityKind::Outlet).await
    }

    fn serialize_outlet(&self, outlet: &CommandArguments) -> Result<CommandArguments, HandlerError> {
        Ok(outlet.clone())
    }

    async fn deserialize_outlet(&self, serialized: CommandArguments, _prompter: &dyn Prompter) -> Result<CommandArguments, HandlerError> {
        Ok(serialized)
    }
}
