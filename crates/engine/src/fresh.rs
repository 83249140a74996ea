//! Interactive construction of a new session.

use parrot_registry::{EntityKind, HandlerRegistry, Side, descend};
use parrot_util::Prompter;
use tracing::debug;

use crate::error::{SessionError, Stage};
use crate::model::{NamedEntity, Session, SessionDrain, SessionSource};

pub const SELECT_SOURCE_MESSAGE: &str = "Please select a source:";
pub const SELECT_DRAIN_MESSAGE: &str = "Please select a drain:";
pub const SOURCE_NAME_MESSAGE: &str = "Enter a name for the source (e.g. 'my source'):";
pub const INLET_NAME_MESSAGE: &str = "Enter a name for the inlet (e.g. 'my inlet'):";
pub const DRAIN_NAME_MESSAGE: &str = "Enter a name for the drain (e.g. 'my drain'):";
pub const OUTLET_NAME_MESSAGE: &str = "Enter a name for the outlet (e.g. 'my outlet'):";
pub const ANOTHER_SOURCE_MESSAGE: &str = "Would you like to add another source?";
pub const ANOTHER_INLET_MESSAGE: &str = "Would you like to add another inlet?";
pub const ANOTHER_DRAIN_MESSAGE: &str = "Would you like to add another drain?";
pub const ANOTHER_OUTLET_MESSAGE: &str = "Would you like to add another outlet?";

/// Builds a session by asking the user for at least one source with one
/// inlet and at least one drain with one outlet.
pub async fn build_session(registry: &HandlerRegistry, prompter: &dyn Prompter) -> Result<Session, SessionError> {
    let mut session = Session::default();
    loop {
        session.sources.push(build_source(registry, prompter).await?);
        if !prompter.confirm(ANOTHER_SOURCE_MESSAGE, false).await? {
            break;
        }
    }
    loop {
        session.drains.push(build_drain(registry, prompter).await?);
        if !prompter.confirm(ANOTHER_DRAIN_MESSAGE, false).await? {
            break;
        }
    }
    Ok(session)
}

async fn build_source(registry: &HandlerRegistry, prompter: &dyn Prompter) -> Result<SessionSource, SessionError> {
    let selection = descend(registry.sources(), prompter, SELECT_SOURCE_MESSAGE)
        .await
        .map_err(|error| SessionError::selection(Side::Source, error))?;
    let handler = selection.handler;
    let default_name = selection.selections.join(" / ");
    let source = handler
        .build_entity(prompter)
        .await
        .map_err(|error| SessionError::handler(Stage::Build, EntityKind::Source, &default_name, error))?;
    let name = ask_name(prompter, SOURCE_NAME_MESSAGE, &default_name).await?;

    let mut inlets = Vec::new();
    loop {
        let default_inlet_name = format!("inlet {}", inlets.len() + 1);
        let inlet = handler
            .build_parameter_set(prompter)
            .await
            .map_err(|error| SessionError::handler(Stage::Build, EntityKind::Inlet, &default_inlet_name, error))?;
        let inlet_name = ask_name(prompter, INLET_NAME_MESSAGE, &default_inlet_name).await?;
        inlets.push(NamedEntity::new(inlet_name, inlet));
        if !prompter.confirm(ANOTHER_INLET_MESSAGE, false).await? {
            break;
        }
    }

    debug!(name = %name, handler = handler.handler_name(), inlets = inlets.len(), "built source");
    Ok(SessionSource {
        name,
        selections: selection.selections,
        handler,
        source,
        inlets,
    })
}

async fn build_drain(registry: &HandlerRegistry, prompter: &dyn Prompter) -> Result<SessionDrain, SessionError> {
    let selection = descend(registry.drains(), prompter, SELECT_DRAIN_MESSAGE)
        .await
        .map_err(|error| SessionError::selection(Side::Drain, error))?;
    let handler = selection.handler;
    let default_name = selection.selections.join(" / ");
    let drain = handler
        .build_entity(prompter)
        .await
        .map_err(|error| SessionError::handler(Stage::Build, EntityKind::Drain, &default_name, error))?;
    let name = ask_name(prompter, DRAIN_NAME_MESSAGE, &default_name).await?;

    let mut outlets = Vec::new();
    loop {
        let default_outlet_name = format!("outlet {}", outlets.len() + 1);
        let outlet = handler
            .build_parameter_set(prompter)
            .await
            .map_err(|error| SessionError::handler(Stage::Build, EntityKind::Outlet, &default_outlet_name, error))?;
        let outlet_name = ask_name(prompter, OUTLET_NAME_MESSAGE, &default_outlet_name).await?;
        outlets.push(NamedEntity::new(outlet_name, outlet));
        if !prompter.confirm(ANOTHER_OUTLET_MESSAGE, false).await? {
            break;
        }
    }

    debug!(name = %name, handler = handler.handler_name(), outlets = outlets.len(), "built drain");
    Ok(SessionDrain {
        name,
        selections: selection.selections,
        handler,
        drain,
        outlets,
    })
}

async fn ask_name(prompter: &dyn Prompter, message: &str, default: &str) -> Result<String, SessionError> {
    let name = prompter.input(message, Some(default)).await?;
    let name = name.trim();
    Ok(if name.is_empty() { default.to_string() } else { name.to_string() })
}
