//! Registry crate for Parrot's pluggable sources and drains.
//!
//! This crate provides the handler contracts every integration implements,
//! the nested lookup tables handlers are registered in, the resolution
//! algorithms that pick a handler interactively or from a stored selection
//! path, and the plugin machinery that fills the registry at startup.

pub mod erased;
pub mod handler;
pub mod manifest;
pub mod models;
pub mod plugin;
pub mod resolve;
pub mod table;

pub use erased::{AnyDrainHandler, AnySourceHandler, DrainHandlerRef, ErasedEntity, SourceHandlerRef};
pub use handler::{Drain, DrainHandler, EntityKind, HandlerError, Side, Source, SourceHandler};
pub use manifest::{HandlerFactory, HandlerSpec, ManifestPlugin, PluginFileFormat, PluginManifest};
pub use models::{DrainTable, HandlerRegistry, PartialConfiguration, SourceTable};
pub use plugin::{Plugin, PluginLoadError, PluginLoader, apply_plugin};
pub use resolve::{REFINE_SELECTION_MESSAGE, Selection, SelectionError, descend, retrieve};
pub use table::{LookupNode, LookupTable};
