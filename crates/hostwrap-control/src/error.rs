//! Error types for the control plane

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ControlError {
    #[error("Couldn't bind control port {port}: {source}")]
    Bind {
        port: u16,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed control message at {address}: {reason}")]
    Malformed { address: String, reason: String },

    #[error("Preset file not found: {}", .0.display())]
    MissingPreset(PathBuf),

    #[error("OSC encode failed: {0}")]
    Encode(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ControlError {
    pub(crate) fn malformed(address: &str, reason: impl Into<String>) -> Self {
        ControlError::Malformed {
            address: address.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ControlError>;
