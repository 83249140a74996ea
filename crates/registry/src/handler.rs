//! Source and drain contracts.
//!
//! A *source* pulls test results from an external system, a *drain* pushes
//! them somewhere. Neither is constructed directly by Parrot: every source or
//! drain class comes with a *handler*, a stateless factory/codec that knows how
//! to
//!
//! - build a ready-to-use entity from scratch (environment variables and
//!   interactive prompts),
//! - serialize an entity into a JSON-compatible value without secrets, and
//! - restore an entity from such a value, asking again for whatever secret was
//!   left out,
//!
//! and that offers the same three operations for the per-invocation parameter
//! sets: *inlets* for sources, *outlets* for drains.
//!
//! For every handler `h` and entity `e`, `h.deserialize_source(h.serialize_source(e))`
//! must behave like `e` for all non-secret fields. The same holds for inlets,
//! drains and outlets.

use std::fmt;

use async_trait::async_trait;
use parrot_types::TestResult;
use parrot_util::{EnvError, PromptError};
pub use parrot_util::Prompter;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Which of the two lookup tables a handler lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Source,
    Drain,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Source => f.write_str("source"),
            Side::Drain => f.write_str("drain"),
        }
    }
}

/// The four kinds of values a handler builds, serializes and restores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Source,
    Inlet,
    Drain,
    Outlet,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EntityKind::Source => "source",
            EntityKind::Inlet => "inlet",
            EntityKind::Drain => "drain",
            EntityKind::Outlet => "outlet",
        };
        f.write_str(label)
    }
}

/// Errors raised by handlers and by the sources and drains they create.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error(transparent)]
    Prompt(#[from] PromptError),

    #[error(transparent)]
    Env(#[from] EnvError),

    #[error("failed to construct {kind}: {reason}")]
    Construction { kind: EntityKind, reason: String },

    #[error("failed to serialize {kind}: {source}")]
    Serialization {
        kind: EntityKind,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid serialized {kind}: {source}")]
    InvalidSerialized {
        kind: EntityKind,
        #[source]
        source: serde_json::Error,
    },

    #[error("handler {handler} was given a {kind} of type {found} it did not create")]
    EntityMismatch {
        handler: &'static str,
        kind: EntityKind,
        found: &'static str,
    },

    #[error("{operation} failed: {source:#}")]
    Collaborator {
        operation: String,
        #[source]
        source: anyhow::Error,
    },
}

impl HandlerError {
    /// Create a construction error.
    pub fn construction(kind: EntityKind, reason: impl Into<String>) -> Self {
        Self::Construction {
            kind,
            reason: reason.into(),
        }
    }

    /// Wrap a failure of an external system (network, process, API).
    pub fn collaborator(operation: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        Self::Collaborator {
            operation: operation.into(),
            source: source.into(),
        }
    }
}

/// A configured connection to a system test results can be pulled from.
#[async_trait]
pub trait Source: Send + Sync + 'static {
    /// Parameters of a single retrieval, e.g. the test plan to read.
    type Inlet: Send + Sync + 'static;

    /// Retrieves the test results described by `inlet`.
    async fn get_test_results(&self, inlet: &Self::Inlet) -> Result<Vec<TestResult>, HandlerError>;
}

/// A configured connection to a system test results can be pushed to.
#[async_trait]
pub trait Drain: Send + Sync + 'static {
    /// Parameters of a single write, e.g. the webhook to post to.
    type Outlet: Send + Sync + 'static;
    /// What a write produces (rendered text, the posted message, ...).
    type Output: Serialize + Send + 'static;

    /// Writes `results` to the destination described by `outlet`.
    async fn write_test_results(&self, results: &[TestResult], outlet: &Self::Outlet) -> Result<Self::Output, HandlerError>;
}

/// Builds, serializes and restores one kind of [`Source`] and its inlets.
#[async_trait]
pub trait SourceHandler: Send + Sync + 'static {
    type Source: Source;
    /// Stored form of the source. Must not contain secrets in cleartext.
    type SerializedSource: Serialize + DeserializeOwned + Send + 'static;
    /// Stored form of an inlet. Must not contain secrets in cleartext.
    type SerializedInlet: Serialize + DeserializeOwned + Send + 'static;

    /// Creates a fully initialised source from the environment and/or prompts.
    async fn build_source(&self, prompter: &dyn Prompter) -> Result<Self::Source, HandlerError>;

    /// Converts `source` into its stored form.
    fn serialize_source(&self, source: &Self::Source) -> Result<Self::SerializedSource, HandlerError>;

    /// Restores a source from its stored form, asking for omitted secrets.
    async fn deserialize_source(&self, serialized: Self::SerializedSource, prompter: &dyn Prompter) -> Result<Self::Source, HandlerError>;

    /// Creates the parameters of one retrieval.
    async fn build_inlet(&self, prompter: &dyn Prompter) -> Result<<Self::Source as Source>::Inlet, HandlerError>;

    /// Converts `inlet` into its stored form.
    fn serialize_inlet(&self, inlet: &<Self::Source as Source>::Inlet) -> Result<Self::SerializedInlet, HandlerError>;

    /// Restores an inlet from its stored form, asking for omitted secrets.
    async fn deserialize_inlet(
        &self,
        serialized: Self::SerializedInlet,
        prompter: &dyn Prompter,
    ) -> Result<<Self::Source as Source>::Inlet, HandlerError>;
}

/// Builds, serializes and restores one kind of [`Drain`] and its outlets.
#[async_trait]
pub trait DrainHandler: Send + Sync + 'static {
    type Drain: Drain;
    /// Stored form of the drain. Must not contain secrets in cleartext.
    type SerializedDrain: Serialize + DeserializeOwned + Send + 'static;
    /// Stored form of an outlet. Must not contain secrets in cleartext.
    type SerializedOutlet: Serialize + DeserializeOwned + Send + 'static;

    /// Creates a fully initialised drain from the environment and/or prompts.
    async fn build_drain(&self, prompter: &dyn Prompter) -> Result<Self::Drain, HandlerError>;

    /// Converts `drain` into its stored form.
    fn serialize_drain(&self, drain: &Self::Drain) -> Result<Self::SerializedDrain, HandlerError>;

    /// Restores a drain from its stored form, asking for omitted secrets.
    async fn deserialize_drain(&self, serialized: Self::SerializedDrain, prompter: &dyn Prompter) -> Result<Self::Drain, HandlerError>;

    /// Creates the parameters of one write.
    async fn build_outlet(&self, prompter: &dyn Prompter) -> Result<<Self::Drain as Drain>::Outlet, HandlerError>;

    /// Converts `outlet` into its stored form.
    fn serialize_outlet(&self, outlet: &<Self::Drain as Drain>::Outlet) -> Result<Self::SerializedOutlet, HandlerError>;

    /// Restores an outlet from its stored form, asking for omitted secrets.
    async fn deserialize_outlet(
        &self,
        serialized: Self::SerializedOutlet,
        prompter: &dyn Prompter,
    ) -> Result<<Self::Drain as Drain>::Outlet, HandlerError>;
}
