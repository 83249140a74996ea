//! Environment variables consulted by the built-in sources and drains.
//!
//! Collaborators read credentials and endpoints from a fixed catalogue of
//! variables before falling back to interactive prompts. Values can be
//! provided by the process environment or by `.env` files passed with
//! `--env-file`, which are loaded with [`load_env_files`].

use std::env;
use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

/// The environment variables Parrot knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnvVariable {
    JiraEmail,
    JiraPassword,
    JiraToken,
    JiraUrl,
    JiraUsername,
    MicrosoftTeamsWebhookUrl,
    XrayClientId,
    XrayClientSecret,
    XrayUrl,
}

impl EnvVariable {
    /// The variable name as it appears in the environment.
    pub fn name(&self) -> &'static str {
        match self {
            EnvVariable::JiraEmail => "JIRA_EMAIL",
            EnvVariable::JiraPassword => "JIRA_PASSWORD",
            EnvVariable::JiraToken => "JIRA_TOKEN",
            EnvVariable::JiraUrl => "JIRA_URL",
            EnvVariable::JiraUsername => "JIRA_USERNAME",
            EnvVariable::MicrosoftTeamsWebhookUrl => "MICROSOFT_TEAMS_WEBHOOK_URL",
            EnvVariable::XrayClientId => "XRAY_CLIENT_ID",
            EnvVariable::XrayClientSecret => "XRAY_CLIENT_SECRET",
            EnvVariable::XrayUrl => "XRAY_URL",
        }
    }
}

impl fmt::Display for EnvVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors surfaced while reading environment configuration.
#[derive(Debug, Error)]
pub enum EnvError {
    #[error(
        "Environment variable is undefined: {name}\n\n\
         Please perform one of the following steps to configure the testing project:\n\
         - add environment variable {name} to your system's environment variables\n\
         - create a .env file, append {name}=<value> to it and pass it to Parrot using --env-file"
    )]
    Undefined { name: &'static str },

    #[error("failed to load environment file {}: {source}", path.display())]
    File {
        path: PathBuf,
        #[source]
        source: dotenvy::Error,
    },
}

/// Returns the value of `variable`, failing when it is unset or empty.
pub fn get_env(variable: EnvVariable) -> Result<String, EnvError> {
    get_env_optional(variable).ok_or(EnvError::Undefined { name: variable.name() })
}

/// Returns the value of `variable`, treating empty values as unset.
pub fn get_env_optional(variable: EnvVariable) -> Option<String> {
    env::var(variable.name()).ok().filter(|value| !value.is_empty())
}

/// Loads `.env` files in order. Variables already present in the environment
/// are never overridden, so earlier files win over later ones.
pub fn load_env_files<P: AsRef<Path>>(paths: &[P]) -> Result<(), EnvError> {
    for path in paths {
        let path = path.as_ref();
        dotenvy::from_path(path).map_err(|source| EnvError::File {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "loaded environment file");
    }
    Ok(())
}
