//! Interactive input for handlers and the session orchestrator.
//!
//! Everything that asks the user a question goes through the [`Prompter`]
//! trait, so the same handler code runs against a real terminal
//! ([`TerminalPrompter`]) or against a queue of prepared answers
//! ([`ScriptedPrompter`], used by tests and unattended runs).

use std::collections::VecDeque;
use std::io::{IsTerminal, Write};
use std::sync::Mutex;

use async_trait::async_trait;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader, Stdin};
use tokio::sync::Mutex as TokioMutex;
use tracing::debug;

use crate::env::{EnvVariable, get_env_optional};

/// Errors raised while asking the user for input.
#[derive(Debug, Error)]
pub enum PromptError {
    #[error("prompt I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("input closed while waiting for an answer to: {message}")]
    Closed { message: String },

    #[error("no choices available for: {message}")]
    NoChoices { message: String },

    #[error("'{answer}' is not a valid answer to: {message}")]
    InvalidAnswer { message: String, answer: String },

    #[error("no scripted answer left for: {message}")]
    Exhausted { message: String },
}

/// Asks the user questions.
///
/// Implementations must be usable from any task; answers are requested
/// strictly one at a time by the callers.
#[async_trait]
pub trait Prompter: Send + Sync {
    /// Ask the user to pick one of `choices`. `default` indexes into `choices`.
    async fn select(&self, message: &str, choices: &[String], default: Option<usize>) -> Result<String, PromptError>;

    /// Ask for free-form text; an empty answer yields `default` when given.
    async fn input(&self, message: &str, default: Option<&str>) -> Result<String, PromptError>;

    /// Ask for a secret. Terminal implementations do not echo the answer.
    async fn password(&self, message: &str) -> Result<String, PromptError>;

    /// Ask a yes/no question.
    async fn confirm(&self, message: &str, default: bool) -> Result<bool, PromptError>;
}

/// Returns the value of `variable`, or asks for it when it is not set.
pub async fn env_or_input(prompter: &dyn Prompter, variable: EnvVariable, message: &str) -> Result<String, PromptError> {
    match get_env_optional(variable) {
        Some(value) => {
            debug!(variable = %variable, "using value from environment");
            Ok(value)
        }
        None => prompter.input(message, None).await,
    }
}

/// Returns the value of `variable`, or asks for it as a secret when it is not set.
pub async fn env_or_password(prompter: &dyn Prompter, variable: EnvVariable, message: &str) -> Result<String, PromptError> {
    match get_env_optional(variable) {
        Some(value) => {
            debug!(variable = %variable, "using secret from environment");
            Ok(value)
        }
        None => prompter.password(message).await,
    }
}

fn parse_confirmation(answer: &str) -> Option<bool> {
    match answer.trim().to_lowercase().as_str() {
        "y" | "yes" | "true" => Some(true),
        "n" | "no" | "false" => Some(false),
        _ => None,
    }
}

/// Prompts on stderr and reads answers line by line from stdin.
pub struct TerminalPrompter {
    reader: TokioMutex<BufReader<Stdin>>,
}

impl TerminalPrompter {
    pub fn new() -> Self {
        Self {
            reader: TokioMutex::new(BufReader::new(tokio::io::stdin())),
        }
    }

    async fn ask(&self, message: &str, prompt: &str) -> Result<String, PromptError> {
        eprint!("{prompt}");
        std::io::stderr().flush()?;
        let mut line = String::new();
        let read = self.reader.lock().await.read_line(&mut line).await?;
        if read == 0 {
            return Err(PromptError::Closed {
                message: message.to_string(),
            });
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }
}

impl Default for TerminalPrompter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Prompter for TerminalPrompter {
    async fn select(&self, message: &str, choices: &[String], default: Option<usize>) -> Result<String, PromptError> {
        if choices.is_empty() {
            return Err(PromptError::NoChoices {
                message: message.to_string(),
            });
        }
        eprintln!("? {message}");
        for (index, choice) in choices.iter().enumerate() {
            let marker = if Some(index) == default { "*" } else { " " };
            eprintln!(" {marker} {}) {choice}", index + 1);
        }
        loop {
            let answer = self.ask(message, "  Enter a number: ").await?;
            let answer = answer.trim();
            if answer.is_empty()
                && let Some(choice) = default.and_then(|index| choices.get(index))
            {
                return Ok(choice.clone());
            }
            if let Ok(number) = answer.parse::<usize>()
                && let Some(choice) = number.checked_sub(1).and_then(|index| choices.get(index))
            {
                return Ok(choice.clone());
            }
            if let Some(choice) = choices.iter().find(|choice| choice.as_str() == answer) {
                return Ok(choice.clone());
            }
            eprintln!("  Please pick one of 1-{}.", choices.len());
        }
    }

    async fn input(&self, message: &str, default: Option<&str>) -> Result<String, PromptError> {
        let prompt = match default {
            Some(default) => format!("? {message} ({default}) "),
            None => format!("? {message} "),
        };
        let answer = self.ask(message, &prompt).await?;
        match default {
            Some(default) if answer.trim().is_empty() => Ok(default.to_string()),
            _ => Ok(answer),
        }
    }

    async fn password(&self, message: &str) -> Result<String, PromptError> {
        if !std::io::stdin().is_terminal() {
            return self.ask(message, &format!("? {message} ")).await;
        }
        eprint!("? {message} ");
        std::io::stderr().flush()?;
        let message = message.to_string();
        tokio::task::spawn_blocking(move || read_hidden_line(&message))
            .await
            .map_err(|error| PromptError::Io(std::io::Error::other(error)))?
    }

    async fn confirm(&self, message: &str, default: bool) -> Result<bool, PromptError> {
        let hint = if default { "[Y/n]" } else { "[y/N]" };
        loop {
            let answer = self.ask(message, &format!("? {message} {hint} ")).await?;
            if answer.trim().is_empty() {
                return Ok(default);
            }
            if let Some(confirmed) = parse_confirmation(&answer) {
                return Ok(confirmed);
            }
            eprintln!("  Please answer 'y' or 'n'.");
        }
    }
}

/// Reads a line from the terminal in raw mode without echoing it.
fn read_hidden_line(message: &str) -> Result<String, PromptError> {
    terminal::enable_raw_mode()?;
    let result = collect_hidden_keys(message);
    terminal::disable_raw_mode()?;
    eprintln!();
    result
}

fn collect_hidden_keys(message: &str) -> Result<String, PromptError> {
    let mut secret = String::new();
    loop {
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        match key.code {
            KeyCode::Enter => return Ok(secret),
            KeyCode::Backspace => {
                secret.pop();
            }
            KeyCode::Char('c') | KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                return Err(PromptError::Closed {
                    message: message.to_string(),
                });
            }
            KeyCode::Char(character) => secret.push(character),
            _ => {}
        }
    }
}

/// Answers prompts from a prepared queue, recording every message it was asked.
///
/// Confirmations accept `y`/`yes`/`true` and `n`/`no`/`false`; selections must
/// name one of the offered choices exactly; an empty answer takes the default
/// where one exists.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: Mutex<VecDeque<String>>,
    asked: Mutex<Vec<String>>,
}

impl ScriptedPrompter {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: Mutex::new(answers.into_iter().map(Into::into).collect()),
            asked: Mutex::new(Vec::new()),
        }
    }

    /// Messages of all prompts issued so far, in order.
    pub fn asked(&self) -> Vec<String> {
        self.asked.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).clone()
    }

    /// Number of answers not consumed yet.
    pub fn remaining(&self) -> usize {
        self.answers.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).len()
    }

    fn next_answer(&self, message: &str) -> Result<String, PromptError> {
        self.asked
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(message.to_string());
        self.answers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pop_front()
            .ok_or_else(|| PromptError::Exhausted {
                message: message.to_string(),
            })
    }
}

#[async_trait]
impl Prompter for ScriptedPrompter {
    async fn select(&self, message: &str, choices: &[String], default: Option<usize>) -> Result<String, PromptError> {
        if choices.is_empty() {
            return Err(PromptError::NoChoices {
                message: message.to_string(),
            });
        }
        let answer = self.next_answer(message)?;
        if answer.is_empty()
            && let Some(choice) = default.and_then(|index| choices.get(index))
        {
            return Ok(choice.clone());
        }
        choices
            .iter()
            .find(|choice| **choice == answer)
            .cloned()
            .ok_or(PromptError::InvalidAnswer {
                message: message.to_string(),
                answer,
            })
    }

    async fn input(&self, message: &str, default: Option<&str>) -> Result<String, PromptError> {
        let answer = self.next_answer(message)?;
        match default {
            Some(default) if answer.is_empty() => Ok(default.to_string()),
            _ => Ok(answer),
        }
    }

    async fn password(&self, message: &str) -> Result<String, PromptError> {
        self.next_answer(message)
    }

    async fn confirm(&self, message: &str, default: bool) -> Result<bool, PromptError> {
        let answer = self.next_answer(message)?;
        if answer.is_empty() {
            return Ok(default);
        }
        parse_confirmation(&answer).ok_or(PromptError::InvalidAnswer {
            message: message.to_string(),
            answer,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn choices(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[tokio::test]
    async fn scripted_answers_are_consumed_in_order() {
        let prompter = ScriptedPrompter::new(["cloud", "ABC-1", "yes", ""]);
        let kind = prompter.select("Cloud or server?", &choices(&["server", "cloud"]), None).await.unwrap();
        let key = prompter.input("Test plan key:", None).await.unwrap();
        let again = prompter.confirm("Add another?", false).await.unwrap();
        let fallback = prompter.confirm("Save?", true).await.unwrap();

        assert_eq!(kind, "cloud");
        assert_eq!(key, "ABC-1");
        assert!(again);
        assert!(fallback);
        assert_eq!(prompter.asked(), vec!["Cloud or server?", "Test plan key:", "Add another?", "Save?"]);
        assert_eq!(prompter.remaining(), 0);
    }

    #[tokio::test]
    async fn scripted_select_rejects_unknown_choices() {
        let prompter = ScriptedPrompter::new(["nope"]);
        let error = prompter.select("Pick:", &choices(&["a", "b"]), None).await.unwrap_err();
        assert!(matches!(error, PromptError::InvalidAnswer { answer, .. } if answer == "nope"));
    }

    #[tokio::test]
    async fn scripted_select_uses_default_for_empty_answer() {
        let prompter = ScriptedPrompter::new([""]);
        let picked = prompter.select("Pick:", &choices(&["a", "b"]), Some(1)).await.unwrap();
        assert_eq!(picked, "b");
    }

    #[tokio::test]
    async fn exhausted_script_is_an_error() {
        let prompter = ScriptedPrompter::default();
        let error = prompter.input("Name:", Some("config.json")).await.unwrap_err();
        assert!(matches!(error, PromptError::Exhausted { .. }));
    }

    #[tokio::test]
    async fn environment_values_skip_the_prompt() {
        let prompter = ScriptedPrompter::default();
        let value = temp_env::async_with_vars([("XRAY_CLIENT_ID", Some("client-123"))], async {
            env_or_input(&prompter, EnvVariable::XrayClientId, "Client ID:").await
        })
        .await
        .unwrap();
        assert_eq!(value, "client-123");
        assert!(prompter.asked().is_empty());
    }

    #[tokio::test]
    async fn missing_environment_values_are_prompted() {
        let prompter = ScriptedPrompter::new(["hunter2"]);
        let value = temp_env::async_with_vars([("JIRA_PASSWORD", None::<&str>)], async {
            env_or_password(&prompter, EnvVariable::JiraPassword, "Jira password:").await
        })
        .await
        .unwrap();
        assert_eq!(value, "hunter2");
        assert_eq!(prompter.asked(), vec!["Jira password:"]);
    }

    #[test]
    fn confirmation_parsing() {
        assert_eq!(parse_confirmation(" Yes "), Some(true));
        assert_eq!(parse_confirmation("n"), Some(false));
        assert_eq!(parse_confirmation("maybe"), None);
    }
}
