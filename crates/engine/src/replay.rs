//! Restoring a session from a saved configuration.
//!
//! Handlers are located by their stored selection path and never by
//! prompting; only secrets left out of the stored form are asked for again.

use parrot_registry::{EntityKind, HandlerRegistry, Side, retrieve};
use parrot_types::{PersistedConfiguration, SerializedDrain, SerializedSource};
use parrot_util::Prompter;
use tracing::info;

use crate::error::{SessionError, Stage};
use crate::model::{NamedEntity, Session, SessionDrain, SessionSource};

/// Restores every source and drain of `configuration`, in stored order.
pub async fn restore_session(
    registry: &HandlerRegistry,
    configuration: PersistedConfiguration,
    prompter: &dyn Prompter,
) -> Result<Session, SessionError> {
    let mut session = Session::default();
    for source in configuration.sources {
        session.sources.push(restore_source(registry, source, prompter).await?);
    }
    for drain in configuration.drains {
        session.drains.push(restore_drain(registry, drain, prompter).await?);
    }
    Ok(session)
}

async fn restore_source(registry: &HandlerRegistry, stored: SerializedSource, prompter: &dyn Prompter) -> Result<SessionSource, SessionError> {
    let handler = retrieve(registry.sources(), &stored.selections)
        .map_err(|error| SessionError::selection(Side::Source, error))?
        .clone();
    info!("Deserializing source: {}", stored.name);
    let source = handler
        .deserialize_entity(stored.configuration, prompter)
        .await
        .map_err(|error| SessionError::handler(Stage::Deserialize, EntityKind::Source, &stored.name, error))?;

    let mut inlets = Vec::with_capacity(stored.inlets.len());
    for inlet in stored.inlets {
        info!("  Deserializing inlet: {}", inlet.name);
        let entity = handler
            .deserialize_parameter_set(inlet.configuration, prompter)
            .await
            .map_err(|error| SessionError::handler(Stage::Deserialize, EntityKind::Inlet, &inlet.name, error))?;
        inlets.push(NamedEntity::new(inlet.name, entity));
    }

    Ok(SessionSource {
        name: stored.name,
        selections: stored.selections,
        handler,
        source,
        inlets,
    })
}

async fn restore_drain(registry: &HandlerRegistry, stored: SerializedDrain, prompter: &dyn Prompter) -> Result<SessionDrain, SessionError> {
    let handler = retrieve(registry.drains(), &stored.selections)
        .map_err(|error| SessionError::selection(Side::Drain, error))?
        .clone();
    info!("Deserializing drain: {}", stored.name);
    let drain = handler
        .deserialize_entity(stored.configuration, prompter)
        .await
        .map_err(|error| SessionError::handler(Stage::Deserialize, EntityKind::Drain, &stored.name, error))?;

    let mut outlets = Vec::with_capacity(stored.outlets.len());
    for outlet in stored.outlets {
        info!("  Deserializing outlet: {}", outlet.name);
        let entity = handler
            .deserialize_parameter_set(outlet.configuration, prompter)
            .await
            .map_err(|error| SessionError::handler(Stage::Deserialize, EntityKind::Outlet, &outlet.name, error))?;
        outlets.push(NamedEntity::new(outlet.name, entity));
    }

    Ok(SessionDrain {
        name: stored.name,
        selections: stored.selections,
        handler,
        drain,
        outlets,
    })
}
