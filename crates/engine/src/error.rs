use std::fmt;

use parrot_registry::{EntityKind, HandlerError, SelectionError, Side};
use parrot_util::PromptError;
use thiserror::Error;

use crate::config_file::ConfigFileError;

/// The handler operation that was running when a session step failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Build,
    Serialize,
    Deserialize,
    Run,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Stage::Build => "build",
            Stage::Serialize => "serialize",
            Stage::Deserialize => "deserialize",
            Stage::Run => "run",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("could not resolve a {side} handler: {source}")]
    Selection {
        side: Side,
        #[source]
        source: SelectionError,
    },

    #[error("failed to {stage} {kind} '{name}': {source}")]
    Handler {
        stage: Stage,
        kind: EntityKind,
        name: String,
        #[source]
        source: HandlerError,
    },

    #[error(transparent)]
    Prompt(#[from] PromptError),

    #[error(transparent)]
    ConfigFile(#[from] ConfigFileError),
}

impl SessionError {
    pub(crate) fn selection(side: Side, source: SelectionError) -> Self {
        Self::Selection { side, source }
    }

    pub(crate) fn handler(stage: Stage, kind: EntityKind, name: impl Into<String>, source: HandlerError) -> Self {
        Self::Handler {
            stage,
            kind,
            name: name.into(),
            source,
        }
    }
}
