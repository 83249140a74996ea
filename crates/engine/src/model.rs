//! Sessions: the sources and drains resolved for one run.

use parrot_registry::{DrainHandlerRef, ErasedEntity, HandlerError, SourceHandlerRef};
use parrot_types::TestResult;
use serde_json::Value;

/// An inlet or outlet together with the name the user gave it.
#[derive(Debug)]
pub struct NamedEntity {
    pub name: String,
    pub entity: ErasedEntity,
}

impl NamedEntity {
    pub fn new(name: impl Into<String>, entity: ErasedEntity) -> Self {
        Self {
            name: name.into(),
            entity,
        }
    }
}

/// A ready source, the handler that created it and its inlets.
#[derive(Debug)]
pub struct SessionSource {
    pub name: String,
    /// Keys leading to `handler` in the source table.
    pub selections: Vec<String>,
    pub handler: SourceHandlerRef,
    pub source: ErasedEntity,
    pub inlets: Vec<NamedEntity>,
}

/// A ready drain, the handler that created it and its outlets.
#[derive(Debug)]
pub struct SessionDrain {
    pub name: String,
    /// Keys leading to `handler` in the drain table.
    pub selections: Vec<String>,
    pub handler: DrainHandlerRef,
    pub drain: ErasedEntity,
    pub outlets: Vec<NamedEntity>,
}

/// Everything a run needs. Sources and drains keep the order they were built
/// or stored in.
#[derive(Debug, Default)]
pub struct Session {
    pub sources: Vec<SessionSource>,
    pub drains: Vec<SessionDrain>,
}

/// What happens to the remaining outlets when writing to one of them fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DrainFailurePolicy {
    /// Stop the run with the first error.
    #[default]
    Abort,
    /// Log the error, record it in the report and continue with the next outlet.
    Isolate,
}

/// Output of one successful outlet write.
#[derive(Debug, Clone, PartialEq)]
pub struct DrainOutput {
    pub drain: String,
    pub outlet: String,
    pub output: Value,
}

/// An outlet write that failed under [`DrainFailurePolicy::Isolate`].
#[derive(Debug)]
pub struct DrainFailure {
    pub drain: String,
    pub outlet: String,
    pub error: HandlerError,
}

/// Result of executing a session.
#[derive(Debug, Default)]
pub struct RunReport {
    /// All results in source, then inlet order.
    pub results: Vec<TestResult>,
    pub outputs: Vec<DrainOutput>,
    pub failures: Vec<DrainFailure>,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}
