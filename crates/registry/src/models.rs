use crate::erased::{DrainHandlerRef, SourceHandlerRef};
use crate::table::LookupTable;

/// Lookup table of source handlers.
pub type SourceTable = LookupTable<SourceHandlerRef>;
/// Lookup table of drain handlers.
pub type DrainTable = LookupTable<DrainHandlerRef>;

/// The handlers available to a session.
///
/// A registry starts empty and is filled by plugins through [`update`]. It is
/// only mutated while plugins load; sessions borrow it immutably afterwards,
/// so no locking is involved.
///
/// [`update`]: HandlerRegistry::update
#[derive(Debug, Clone, Default)]
pub struct HandlerRegistry {
    sources: SourceTable,
    drains: DrainTable,
}

/// Entries contributed by one plugin.
#[derive(Debug, Clone, Default)]
pub struct PartialConfiguration {
    pub sources: SourceTable,
    pub drains: DrainTable,
}

impl PartialConfiguration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sources(mut self, sources: SourceTable) -> Self {
        self.sources = sources;
        self
    }

    pub fn with_drains(mut self, drains: DrainTable) -> Self {
        self.drains = drains;
        self
    }
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sources(&self) -> &SourceTable {
        &self.sources
    }

    pub fn drains(&self) -> &DrainTable {
        &self.drains
    }

    /// Applies `mutator` to the current state and merges the partial
    /// configuration it returns.
    ///
    /// Both tables are merged key by key at the top level only: a later
    /// contribution for an existing key replaces the earlier subtree entirely
    /// and unrelated keys are preserved. Nothing is validated here; a
    /// malformed tree only shows up when a handler is resolved.
    pub fn update<F, E>(&mut self, mutator: F) -> Result<(), E>
    where
        F: FnOnce(&HandlerRegistry) -> Result<PartialConfiguration, E>,
    {
        let partial = mutator(self)?;
        self.merge(partial);
        Ok(())
    }

    /// Merges `partial` into the registry without consulting the current state.
    pub fn merge(&mut self, partial: PartialConfiguration) {
        self.sources.merge_top_level(partial.sources);
        self.drains.merge_top_level(partial.drains);
    }
}
