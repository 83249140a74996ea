//! Plugin manifest files.
//!
//! A manifest contributes entries to the source and drain tables. Nested
//! mappings become nested tables; a mapping with a string `handler` key is a
//! leaf describing which handler to instantiate:
//!
//! ```yaml
//! sources:
//!   acme:
//!     nightly:
//!       handler: command
//!       program: ./fetch-results.sh
//!       args: ["--format", "json"]
//! drains:
//!   console:
//!     handler: builtin
//!     name: stdout
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::warn;

use crate::erased::{DrainHandlerRef, SourceHandlerRef};
use crate::handler::Side;
use crate::models::{DrainTable, HandlerRegistry, PartialConfiguration, SourceTable};
use crate::plugin::{Plugin, PluginLoadError};
use crate::table::{LookupNode, LookupTable};

/// Key that marks a mapping as a handler leaf.
pub const HANDLER_KEY: &str = "handler";

/// Supported manifest serialization formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginFileFormat {
    Json,
    Yaml,
}

impl PluginFileFormat {
    /// Infer the format from a path extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|extension| extension.to_str()) {
            Some("json") => Some(Self::Json),
            Some("yaml") | Some("yml") => Some(Self::Yaml),
            _ => None,
        }
    }

    pub fn parse(self, content: &str) -> Result<Value, String> {
        match self {
            Self::Json => serde_json::from_str(content).map_err(|error| error.to_string()),
            Self::Yaml => serde_yaml::from_str(content).map_err(|error| error.to_string()),
        }
    }
}

/// Description of the handler behind a manifest leaf.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "handler", rename_all = "lowercase")]
pub enum HandlerSpec {
    /// A handler compiled into Parrot, looked up by name.
    Builtin { name: String },
    /// An external program speaking JSON over stdin/stdout.
    Command {
        program: String,
        #[serde(default)]
        args: Vec<String>,
    },
}

/// Turns manifest leaves into handler instances.
pub trait HandlerFactory: Send + Sync {
    fn source_handler(&self, spec: &HandlerSpec) -> Result<SourceHandlerRef, PluginLoadError>;
    fn drain_handler(&self, spec: &HandlerSpec) -> Result<DrainHandlerRef, PluginLoadError>;
}

/// Parsed, not yet instantiated, manifest tree.
pub type ManifestTable = LookupTable<HandlerSpec>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PluginManifest {
    pub sources: ManifestTable,
    pub drains: ManifestTable,
}

impl PluginManifest {
    /// Parses manifest `content` in `format`. `origin` is only used in errors.
    pub fn parse(content: &str, format: PluginFileFormat, origin: &Path) -> Result<Self, PluginLoadError> {
        let invalid = |reason: String| PluginLoadError::InvalidManifest {
            path: origin.to_path_buf(),
            reason,
        };

        let document = format.parse(content).map_err(invalid)?;
        let Value::Object(mut root) = document else {
            return Err(invalid("expected a mapping with 'sources' and/or 'drains'".to_string()));
        };

        let sources = match root.remove("sources") {
            Some(Value::Null) | None => ManifestTable::new(),
            Some(value) => parse_table(value, &mut vec!["sources".to_string()]).map_err(invalid)?,
        };
        let drains = match root.remove("drains") {
            Some(Value::Null) | None => ManifestTable::new(),
            Some(value) => parse_table(value, &mut vec!["drains".to_string()]).map_err(invalid)?,
        };
        for key in root.keys() {
            warn!(path = %origin.display(), key = %key, "ignoring unknown top-level key in plugin file");
        }

        Ok(Self { sources, drains })
    }
}

fn parse_table(value: Value, path: &mut Vec<String>) -> Result<ManifestTable, String> {
    let Value::Object(entries) = value else {
        return Err(format!("'{}' must be a mapping", path.join(".")));
    };

    let mut table = ManifestTable::new();
    for (key, value) in entries {
        path.push(key.clone());
        let node = parse_node(value, path)?;
        path.pop();
        table.insert(key, node);
    }
    Ok(table)
}

fn parse_node(value: Value, path: &mut Vec<String>) -> Result<LookupNode<HandlerSpec>, String> {
    match value {
        Value::Object(entries) if is_leaf(&entries) => serde_json::from_value(Value::Object(entries))
            .map(LookupNode::Leaf)
            .map_err(|error| format!("invalid handler at '{}': {error}", path.join("."))),
        other => parse_table(other, path).map(LookupNode::Branch),
    }
}

fn is_leaf(entries: &Map<String, Value>) -> bool {
    entries.get(HANDLER_KEY).is_some_and(Value::is_string)
}

/// A plugin backed by a manifest file.
pub struct ManifestPlugin {
    path: PathBuf,
    manifest: PluginManifest,
    factory: Arc<dyn HandlerFactory>,
}

impl ManifestPlugin {
    pub fn new(path: PathBuf, manifest: PluginManifest, factory: Arc<dyn HandlerFactory>) -> Self {
        Self { path, manifest, factory }
    }

    pub fn manifest(&self) -> &PluginManifest {
        &self.manifest
    }

    fn instantiate<T, F>(&self, table: &ManifestTable, side: Side, create: &F) -> Result<LookupTable<T>, PluginLoadError>
    where
        F: Fn(&HandlerSpec) -> Result<T, PluginLoadError>,
    {
        let mut instantiated = LookupTable::new();
        for (key, node) in table {
            let node = match node {
                LookupNode::Leaf(spec) => LookupNode::Leaf(create(spec).map_err(|error| PluginLoadError::Registration {
                    plugin: self.path.display().to_string(),
                    reason: format!("{side} '{key}': {error}"),
                })?),
                LookupNode::Branch(nested) => LookupNode::Branch(self.instantiate(nested, side, create)?),
            };
            instantiated.insert(key.clone(), node);
        }
        Ok(instantiated)
    }
}

impl Plugin for ManifestPlugin {
    fn name(&self) -> String {
        self.path.display().to_string()
    }

    fn register(&self, _current: &HandlerRegistry) -> Result<PartialConfiguration, PluginLoadError> {
        let sources: SourceTable = self.instantiate(&self.manifest.sources, Side::Source, &|spec: &HandlerSpec| self.factory.source_handler(spec))?;
        let drains: DrainTable = self.instantiate(&self.manifest.drains, Side::Drain, &|spec: &HandlerSpec| self.factory.drain_handler(spec))?;
        Ok(PartialConfiguration { sources, drains })
    }
}
