//! Session orchestration for Parrot.
//!
//! A run either builds a new session interactively ([`build_session`]) or
//! restores one from a saved configuration file ([`restore_session`]), and
//! then executes it ([`execute`]): all sources are queried first, then every
//! drain receives the complete list of results.

mod config_file;
mod error;
mod executor;
mod fresh;
mod model;
mod persist;
mod replay;

use std::path::PathBuf;

use parrot_registry::HandlerRegistry;
use parrot_util::Prompter;
use tracing::info;

pub use config_file::{ConfigFileError, read_configuration, write_configuration};
pub use error::{SessionError, Stage};
pub use executor::execute;
pub use fresh::{
    ANOTHER_DRAIN_MESSAGE, ANOTHER_INLET_MESSAGE, ANOTHER_OUTLET_MESSAGE, ANOTHER_SOURCE_MESSAGE, DRAIN_NAME_MESSAGE, INLET_NAME_MESSAGE,
    OUTLET_NAME_MESSAGE, SELECT_DRAIN_MESSAGE, SELECT_SOURCE_MESSAGE, SOURCE_NAME_MESSAGE, build_session,
};
pub use model::{DrainFailure, DrainFailurePolicy, DrainOutput, NamedEntity, RunReport, Session, SessionDrain, SessionSource};
pub use persist::{CONFIGURATION_PATH_MESSAGE, DEFAULT_CONFIGURATION_PATH, SAVE_CONFIGURATION_MESSAGE, offer_to_save};
pub use replay::restore_session;

/// How a run is set up.
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    /// Replay this saved configuration instead of asking for a new one.
    pub config_file: Option<PathBuf>,
    pub drain_failure_policy: DrainFailurePolicy,
}

/// Resolves a session (replayed or fresh) and executes it.
///
/// A fresh session is offered for saving before it runs.
pub async fn run(registry: &HandlerRegistry, prompter: &dyn Prompter, options: &SessionOptions) -> Result<RunReport, SessionError> {
    let session = match &options.config_file {
        Some(path) => {
            info!(path = %path.display(), "replaying saved configuration");
            let configuration = read_configuration(path)?;
            restore_session(registry, configuration, prompter).await?
        }
        None => {
            let session = build_session(registry, prompter).await?;
            offer_to_save(&session, prompter).await?;
            session
        }
    };
    execute(&session, options.drain_failure_policy).await
}
