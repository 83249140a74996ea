use std::path::PathBuf;

use parrot_registry::EntityKind;
use parrot_types::{NamedConfiguration, PersistedConfiguration, SerializedDrain, SerializedSource};
use parrot_util::{Prompter, expand_tilde};
use tracing::info;

use crate::config_file::write_configuration;
use crate::error::{SessionError, Stage};
use crate::model::Session;

pub const SAVE_CONFIGURATION_MESSAGE: &str = "Would you like to save your configuration?";
pub const CONFIGURATION_PATH_MESSAGE: &str = "Please specify the file to write the configuration to:";
pub const DEFAULT_CONFIGURATION_PATH: &str = "config.json";

impl Session {
    /// Stored form of the session: selection paths plus each handler's
    /// serialized entities, in session order.
    pub fn serialize(&self) -> Result<PersistedConfiguration, SessionError> {
        let mut configuration = PersistedConfiguration::default();
        for source in &self.sources {
            let mut inlets = Vec::with_capacity(source.inlets.len());
            for inlet in &source.inlets {
                let serialized = source
                    .handler
                    .serialize_parameter_set(&inlet.entity)
                    .map_err(|error| SessionError::handler(Stage::Serialize, EntityKind::Inlet, &inlet.name, error))?;
                inlets.push(NamedConfiguration::new(&inlet.name, serialized));
            }
            configuration.sources.push(SerializedSource {
                name: source.name.clone(),
                selections: source.selections.clone(),
                configuration: source
                    .handler
                    .serialize_entity(&source.source)
                    .map_err(|error| SessionError::handler(Stage::Serialize, EntityKind::Source, &source.name, error))?,
                inlets,
            });
        }
        for drain in &self.drains {
            let mut outlets = Vec::with_capacity(drain.outlets.len());
            for outlet in &drain.outlets {
                let serialized = drain
                    .handler
                    .serialize_parameter_set(&outlet.entity)
                    .map_err(|error| SessionError::handler(Stage::Serialize, EntityKind::Outlet, &outlet.name, error))?;
                outlets.push(NamedConfiguration::new(&outlet.name, serialized));
            }
            configuration.drains.push(SerializedDrain {
                name: drain.name.clone(),
                selections: drain.selections.clone(),
                configuration: drain
                    .handler
                    .serialize_entity(&drain.drain)
                    .map_err(|error| SessionError::handler(Stage::Serialize, EntityKind::Drain, &drain.name, error))?,
                outlets,
            });
        }
        Ok(configuration)
    }
}

/// Asks whether to save `session` and where, then writes it. Returns the path
/// written to, if any.
pub async fn offer_to_save(session: &Session, prompter: &dyn Prompter) -> Result<Option<PathBuf>, SessionError> {
    if !prompter.confirm(SAVE_CONFIGURATION_MESSAGE, true).await? {
        return Ok(None);
    }
    let answer = prompter.input(CONFIGURATION_PATH_MESSAGE, Some(DEFAULT_CONFIGURATION_PATH)).await?;
    let path = if answer.trim().is_empty() {
        PathBuf::from(DEFAULT_CONFIGURATION_PATH)
    } else {
        expand_tilde(&answer)
    };
    write_configuration(&path, &session.serialize()?)?;
    info!(path = %path.display(), "saved configuration");
    Ok(Some(path))
}
