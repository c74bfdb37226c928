//! Centralized error type for the hostwrap umbrella crate.
//!
//! Wraps the plugin and control-plane errors so `?` propagates naturally
//! across crate boundaries.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Plugin: {0}")]
    Plugin(#[from] hostwrap_plugin::PluginError),

    #[error("Control: {0}")]
    Control(#[from] hostwrap_control::ControlError),

    /// Persisted state could not be decoded
    #[error("State: {0}")]
    State(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Unknown format or a failed plugin constructor.
    pub fn is_instantiation(&self) -> bool {
        matches!(self, Error::Plugin(e) if e.is_instantiation())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::State(format!("invalid state document: {}", e))
    }
}

impl From<base64::DecodeError> for Error {
    fn from(e: base64::DecodeError) -> Self {
        Error::State(format!("invalid instance state encoding: {}", e))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
