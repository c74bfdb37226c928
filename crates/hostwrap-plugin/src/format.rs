//! Plugin formats and the format registry.
//!
//! A `PluginFormat` turns a `PluginDescription` into a live instance. Native
//! loaders (VST2, VST3, CLAP, AU) are registered by the embedding application;
//! this crate ships only the `builtin` format.

use crate::builtin::BuiltinFormat;
use crate::description::PluginDescription;
use crate::error::{PluginError, Result};
use crate::instance::PluginInstance;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// A loader for one plugin format.
pub trait PluginFormat: Send + Sync {
    /// Format identifier matched against `PluginDescription::format`.
    fn name(&self) -> &str;

    /// Construct an instance. The returned instance is not yet prepared.
    fn create_instance(
        &self,
        description: &PluginDescription,
        sample_rate: f64,
        block_size: usize,
    ) -> Result<Box<dyn PluginInstance>>;
}

/// Format id → loader lookup table.
///
/// # Example
/// ```
/// use hostwrap_plugin::{FormatRegistry, PluginDescription};
///
/// let registry = FormatRegistry::with_builtin();
/// let desc = PluginDescription::new("builtin", "builtin.gain", "");
/// let instance = registry.instantiate(&desc, 48_000.0, 256).unwrap();
/// assert_eq!(instance.description().unique_id, "builtin.gain");
/// ```
#[derive(Default)]
pub struct FormatRegistry {
    formats: RwLock<HashMap<String, Arc<dyn PluginFormat>>>,
}

impl FormatRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the built-in format.
    pub fn with_builtin() -> Self {
        let registry = Self::new();
        registry.register(BuiltinFormat::new());
        registry
    }

    /// Register a format, replacing any previous loader with the same name.
    pub fn register<F: PluginFormat + 'static>(&self, format: F) {
        self.register_arc(Arc::new(format));
    }

    pub fn register_arc(&self, format: Arc<dyn PluginFormat>) {
        let name = format.name().to_string();
        tracing::debug!("Registered plugin format '{}'", name);
        self.formats.write().insert(name, format);
    }

    pub fn unregister(&self, name: &str) -> bool {
        self.formats.write().remove(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn PluginFormat>> {
        self.formats.read().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.formats.read().contains_key(name)
    }

    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<_> = self.formats.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Resolve the description's format and construct an instance.
    pub fn instantiate(
        &self,
        description: &PluginDescription,
        sample_rate: f64,
        block_size: usize,
    ) -> Result<Box<dyn PluginInstance>> {
        let format = self
            .get(&description.format)
            .ok_or_else(|| PluginError::UnknownFormat(description.format.clone()))?;

        format.create_instance(description, sample_rate, block_size)
    }
}
