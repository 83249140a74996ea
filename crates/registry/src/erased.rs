//! Type-erased views over [`SourceHandler`] and [`DrainHandler`].
//!
//! Lookup tables store handlers of many different concrete types, so the
//! orchestrator talks to them through [`AnySourceHandler`] and
//! [`AnyDrainHandler`]. Entities travel as [`ErasedEntity`] boxes and stored
//! forms as [`serde_json::Value`]. Every typed handler gets an erased view for
//! free through the blanket implementations below; handing an erased handler
//! an entity built by a different handler yields
//! [`HandlerError::EntityMismatch`] instead of undefined behaviour.

use std::any::{Any, type_name};
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use parrot_types::TestResult;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::handler::{Drain, DrainHandler, EntityKind, HandlerError, Prompter, Source, SourceHandler};

/// A source, inlet, drain or outlet whose concrete type is only known to the
/// handler that built it.
pub struct ErasedEntity {
    value: Box<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl ErasedEntity {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            value: Box::new(value),
            type_name: type_name::<T>(),
        }
    }

    /// Rust type name of the wrapped value.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }
}

impl fmt::Debug for ErasedEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErasedEntity").field("type_name", &self.type_name).finish()
    }
}

/// Object-safe view of a [`SourceHandler`].
#[async_trait]
pub trait AnySourceHandler: Send + Sync {
    /// Name of the concrete handler type, used in logs and errors.
    fn handler_name(&self) -> &'static str;

    async fn build_entity(&self, prompter: &dyn Prompter) -> Result<ErasedEntity, HandlerError>;
    fn serialize_entity(&self, source: &ErasedEntity) -> Result<Value, HandlerError>;
    async fn deserialize_entity(&self, serialized: Value, prompter: &dyn Prompter) -> Result<ErasedEntity, HandlerError>;

    async fn build_parameter_set(&self, prompter: &dyn Prompter) -> Result<ErasedEntity, HandlerError>;
    fn serialize_parameter_set(&self, inlet: &ErasedEntity) -> Result<Value, HandlerError>;
    async fn deserialize_parameter_set(&self, serialized: Value, prompter: &dyn Prompter) -> Result<ErasedEntity, HandlerError>;

    /// Runs `source` against `inlet`.
    async fn get_test_results(&self, source: &ErasedEntity, inlet: &ErasedEntity) -> Result<Vec<TestResult>, HandlerError>;
}

/// Object-safe view of a [`DrainHandler`].
#[async_trait]
pub trait AnyDrainHandler: Send + Sync {
    /// Name of the concrete handler type, used in logs and errors.
    fn handler_name(&self) -> &'static str;

    async fn build_entity(&self, prompter: &dyn Prompter) -> Result<ErasedEntity, HandlerError>;
    fn serialize_entity(&self, drain: &ErasedEntity) -> Result<Value, HandlerError>;
    async fn deserialize_entity(&self, serialized: Value, prompter: &dyn Prompter) -> Result<ErasedEntity, HandlerError>;

    async fn build_parameter_set(&self, prompter: &dyn Prompter) -> Result<ErasedEntity, HandlerError>;
    fn serialize_parameter_set(&self, outlet: &ErasedEntity) -> Result<Value, HandlerError>;
    async fn deserialize_parameter_set(&self, serialized: Value, prompter: &dyn Prompter) -> Result<ErasedEntity, HandlerError>;

    /// Writes `results` through `drain` to `outlet`, returning the drain's
    /// output as JSON.
    async fn write_test_results(&self, drain: &ErasedEntity, results: &[TestResult], outlet: &ErasedEntity) -> Result<Value, HandlerError>;
}

/// Shared handle to an erased source handler.
pub type SourceHandlerRef = Arc<dyn AnySourceHandler>;
/// Shared handle to an erased drain handler.
pub type DrainHandlerRef = Arc<dyn AnyDrainHandler>;

impl fmt::Debug for dyn AnySourceHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SourceHandler({})", self.handler_name())
    }
}

impl fmt::Debug for dyn AnyDrainHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DrainHandler({})", self.handler_name())
    }
}

fn downcast<'a, T: Any>(entity: &'a ErasedEntity, handler: &'static str, kind: EntityKind) -> Result<&'a T, HandlerError> {
    entity.downcast_ref::<T>().ok_or(HandlerError::EntityMismatch {
        handler,
        kind,
        found: entity.type_name(),
    })
}

fn to_json<S: Serialize>(serialized: S, kind: EntityKind) -> Result<Value, HandlerError> {
    serde_json::to_value(serialized).map_err(|source| HandlerError::Serialization { kind, source })
}

fn from_json<S: DeserializeOwned>(serialized: Value, kind: EntityKind) -> Result<S, HandlerError> {
    serde_json::from_value(serialized).map_err(|source| HandlerError::InvalidSerialized { kind, source })
}

#[async_trait]
impl<H> AnySourceHandler for H
where
    H: SourceHandler,
{
    fn handler_name(&self) -> &'static str {
        type_name::<H>()
    }

    async fn build_entity(&self, prompter: &dyn Prompter) -> Result<ErasedEntity, HandlerError> {
        let source = self.build_source(prompter).await?;
        Ok(ErasedEntity::new(source))
    }

    fn serialize_entity(&self, source: &ErasedEntity) -> Result<Value, HandlerError> {
        let source = downcast::<H::Source>(source, type_name::<H>(), EntityKind::Source)?;
        to_json(self.serialize_source(source)?, EntityKind::Source)
    }

    async fn deserialize_entity(&self, serialized: Value, prompter: &dyn Prompter) -> Result<ErasedEntity, HandlerError> {
        let typed: H::SerializedSource = from_json(serialized, EntityKind::Source)?;
        let source = self.deserialize_source(typed, prompter).await?;
        Ok(ErasedEntity::new(source))
    }

    async fn build_parameter_set(&self, prompter: &dyn Prompter) -> Result<ErasedEntity, HandlerError> {
        let inlet = self.build_inlet(prompter).await?;
        Ok(ErasedEntity::new(inlet))
    }

    fn serialize_parameter_set(&self, inlet: &ErasedEntity) -> Result<Value, HandlerError> {
        let inlet = downcast::<<H::Source as Source>::Inlet>(inlet, type_name::<H>(), EntityKind::Inlet)?;
        to_json(self.serialize_inlet(inlet)?, EntityKind::Inlet)
    }

    async fn deserialize_parameter_set(&self, serialized: Value, prompter: &dyn Prompter) -> Result<ErasedEntity, HandlerError> {
        let typed: H::SerializedInlet = from_json(serialized, EntityKind::Inlet)?;
        let inlet = self.deserialize_inlet(typed, prompter).await?;
        Ok(ErasedEntity::new(inlet))
    }

    async fn get_test_results(&self, source: &ErasedEntity, inlet: &ErasedEntity) -> Result<Vec<TestResult>, HandlerError> {
        let source = downcast::<H::Source>(source, type_name::<H>(), EntityKind::Source)?;
        let inlet = downcast::<<H::Source as Source>::Inlet>(inlet, type_name::<H>(), EntityKind::Inlet)?;
        source.get_test_results(inlet).await
    }
}

#[async_trait]
impl<H> AnyDrainHandler for H
where
    H: DrainHandler,
{
    fn handler_name(&self) -> &'static str {
        type_name::<H>()
    }

    async fn build_entity(&self, prompter: &dyn Prompter) -> Result<ErasedEntity, HandlerError> {
        let drain = self.build_drain(prompter).await?;
        Ok(ErasedEntity::new(drain))
    }

    fn serialize_entity(&self, drain: &ErasedEntity) -> Result<Value, HandlerError> {
        let drain = downcast::<H::Drain>(drain, type_name::<H>(), EntityKind::Drain)?;
        to_json(self.serialize_drain(drain)?, EntityKind::Drain)
    }

    async fn deserialize_entity(&self, serialized: Value, prompter: &dyn Prompter) -> Result<ErasedEntity, HandlerError> {
        let typed: H::SerializedDrain = from_json(serialized, EntityKind::Drain)?;
        let drain = self.deserialize_drain(typed, prompter).await?;
        Ok(ErasedEntity::new(drain))
    }

    async fn build_parameter_set(&self, prompter: &dyn Prompter) -> Result<ErasedEntity, HandlerError> {
        let outlet = self.build_outlet(prompter).await?;
        Ok(ErasedEntity::new(outlet))
    }

    fn serialize_parameter_set(&self, outlet: &ErasedEntity) -> Result<Value, HandlerError> {
        let outlet = downcast::<<H::Drain as Drain>::Outlet>(outlet, type_name::<H>(), EntityKind::Outlet)?;
        to_json(self.serialize_outlet(outlet)?, EntityKind::Outlet)
    }

    async fn deserialize_parameter_set(&self, serialized: Value, prompter: &dyn Prompter) -> Result<ErasedEntity, HandlerError> {
        let typed: H::SerializedOutlet = from_json(serialized, EntityKind::Outlet)?;
        let outlet = self.deserialize_outlet(typed, prompter).await?;
        Ok(ErasedEntity::new(outlet))
    }

    async fn write_test_results(&self, drain: &ErasedEntity, results: &[TestResult], outlet: &ErasedEntity) -> Result<Value, HandlerError> {
        let drain = downcast::<H::Drain>(drain, type_name::<H>(), EntityKind::Drain)?;
        let outlet = downcast::<<H::Drain as Drain>::Outlet>(outlet, type_name::<H>(), EntityKind::Outlet)?;
        let output = drain.write_test_results(results, outlet).await?;
        to_json(output, EntityKind::Drain)
    }
}
