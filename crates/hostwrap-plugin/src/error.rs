//! Error types for wrapped plugin hosting

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PluginError {
    #[error("No plugin format registered for '{0}'")]
    UnknownFormat(String),

    #[error("Couldn't create {plugin} ({format}): {reason}")]
    Instantiation {
        format: String,
        plugin: String,
        reason: String,
    },

    #[error("Plugin state error: {0}")]
    State(String),

    #[error("Preset rejected: {0}")]
    Preset(String),

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PluginError {
    /// Whether this error belongs to the instantiation family (unknown format or
    /// constructor failure). These are reported to the user and never fatal.
    pub fn is_instantiation(&self) -> bool {
        matches!(
            self,
            PluginError::UnknownFormat(_) | PluginError::Instantiation { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, PluginError>;
