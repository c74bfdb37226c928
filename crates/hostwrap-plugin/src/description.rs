//! Plugin descriptions
//!
//! A `PluginDescription` identifies an installable plugin type. It is produced by
//! an external scanner or catalog and consumed wherever an instance must be created.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;

/// Identifies a plugin type: which format loads it, its unique id, and where it lives.
///
/// Two descriptions are equal when format and unique id match. The path is not
/// part of the identity, so a plugin that moved on disk is still the same plugin.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginDescription {
    /// Format identifier resolved by the `FormatRegistry` (e.g. "builtin", "VST3")
    pub format: String,
    /// Format-specific unique identifier
    pub unique_id: String,
    /// File or bundle path
    pub path: PathBuf,
    /// Cached display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Cached version string
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl PluginDescription {
    pub fn new(
        format: impl Into<String>,
        unique_id: impl Into<String>,
        path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            format: format.into(),
            unique_id: unique_id.into(),
            path: path.into(),
            name: None,
            version: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Display name, falling back to the unique id.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.unique_id)
    }
}

impl PartialEq for PluginDescription {
    fn eq(&self, other: &Self) -> bool {
        self.format == other.format && self.unique_id == other.unique_id
    }
}

impl Eq for PluginDescription {}

impl Hash for PluginDescription {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.format.hash(state);
        self.unique_id.hash(state);
    }
}

impl fmt::Display for PluginDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.display_name(), self.format)
    }
}
