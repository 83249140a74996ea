//! Plugin registration.
//!
//! Plugins contribute handlers to a [`HandlerRegistry`]. Built-in plugins are
//! Rust values; user plugins are manifest files read by [`PluginLoader`]. All
//! plugins are applied strictly in order, built-ins first, so a later plugin
//! replaces the top-level entries of an earlier one.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use crate::manifest::{HandlerFactory, ManifestPlugin, PluginFileFormat, PluginManifest};
use crate::models::{HandlerRegistry, PartialConfiguration};

#[derive(Debug, Error)]
pub enum PluginLoadError {
    #[error("plugin file does not exist: {}", path.display())]
    FileNotFound { path: PathBuf },

    #[error("Unsupported plugin file extension: {} (expected .json, .yaml or .yml)", path.display())]
    UnsupportedFile { path: PathBuf },

    #[error("failed to read plugin file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid plugin file {}: {reason}", path.display())]
    InvalidManifest { path: PathBuf, reason: String },

    #[error("unknown built-in {side} handler '{name}'")]
    UnknownBuiltin { side: crate::handler::Side, name: String },

    #[error("plugin {plugin} failed to register: {reason}")]
    Registration { plugin: String, reason: String },
}

/// Something that contributes handlers to the registry.
pub trait Plugin: Send + Sync {
    /// Human readable name used in logs.
    fn name(&self) -> String;

    /// Returns the entries this plugin adds given the registry's current state.
    fn register(&self, current: &HandlerRegistry) -> Result<PartialConfiguration, PluginLoadError>;
}

/// Applies a single plugin to `registry`.
pub fn apply_plugin(registry: &mut HandlerRegistry, plugin: &dyn Plugin) -> Result<(), PluginLoadError> {
    registry.update(|current| plugin.register(current))?;
    info!(
        plugin = %plugin.name(),
        sources = registry.sources().len(),
        drains = registry.drains().len(),
        "registered plugin"
    );
    Ok(())
}

/// Reads plugin manifest files and turns them into plugins.
#[derive(Clone)]
pub struct PluginLoader {
    factory: Arc<dyn HandlerFactory>,
}

impl PluginLoader {
    pub fn new(factory: Arc<dyn HandlerFactory>) -> Self {
        Self { factory }
    }

    /// Loads one manifest file. The loader strategy is chosen by extension.
    pub fn load_file(&self, path: &Path) -> Result<ManifestPlugin, PluginLoadError> {
        if !path.exists() {
            return Err(PluginLoadError::FileNotFound { path: path.to_path_buf() });
        }
        let format = PluginFileFormat::from_path(path).ok_or_else(|| PluginLoadError::UnsupportedFile { path: path.to_path_buf() })?;
        let content = fs::read_to_string(path).map_err(|source| PluginLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let manifest = PluginManifest::parse(&content, format, path)?;
        debug!(
            path = %path.display(),
            sources = ?manifest.sources.keys().collect::<Vec<_>>(),
            drains = ?manifest.drains.keys().collect::<Vec<_>>(),
            "parsed plugin file"
        );
        Ok(ManifestPlugin::new(path.to_path_buf(), manifest, Arc::clone(&self.factory)))
    }

    /// Applies `builtins` in order, then every file in `files` in order.
    ///
    /// The first failure aborts loading; plugins applied before it stay
    /// registered.
    pub fn load_all(&self, registry: &mut HandlerRegistry, builtins: &[Box<dyn Plugin>], files: &[PathBuf]) -> Result<(), PluginLoadError> {
        for plugin in builtins {
            apply_plugin(registry, plugin.as_ref())?;
        }
        for path in files {
            let plugin = self.load_file(path)?;
            apply_plugin(registry, &plugin)?;
        }
        Ok(())
    }
}
