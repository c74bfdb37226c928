//! Control plane configuration.

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

pub const DEFAULT_RELAY_PORT: u16 = 9001;
pub const DEFAULT_FEEDBACK_PORT: u16 = 9002;

/// Which unclaimed messages get relayed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "mode", content = "prefix")]
pub enum RelayPolicy {
    /// Relay every message not addressed to this instance
    #[default]
    All,
    /// Relay only addresses starting with the prefix
    Subtree(String),
    Disabled,
}

impl RelayPolicy {
    pub fn allows(&self, address: &str) -> bool {
        match self {
            RelayPolicy::All => true,
            RelayPolicy::Subtree(prefix) => address.starts_with(prefix.as_str()),
            RelayPolicy::Disabled => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ControlConfig {
    /// Interface the receiver binds to
    pub bind_address: IpAddr,
    pub relay_destinations: Vec<SocketAddr>,
    /// Where preset-load confirmations go
    pub feedback_destination: Option<SocketAddr>,
    pub preset_folder: PathBuf,
    pub relay_policy: RelayPolicy,
    /// Relay incoming MIDI controller changes as OSC
    pub cc_relay: bool,
}

impl Default for ControlConfig {
    fn default() -> Self {
        let localhost = IpAddr::V4(Ipv4Addr::LOCALHOST);
        Self {
            bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            relay_destinations: vec![SocketAddr::new(localhost, DEFAULT_RELAY_PORT)],
            feedback_destination: Some(SocketAddr::new(localhost, DEFAULT_FEEDBACK_PORT)),
            preset_folder: PathBuf::from("presets"),
            relay_policy: RelayPolicy::All,
            cc_relay: false,
        }
    }
}

impl ControlConfig {
    pub fn with_preset_folder(mut self, folder: impl Into<PathBuf>) -> Self {
        self.preset_folder = folder.into();
        self
    }

    pub fn with_relay_destinations(mut self, destinations: Vec<SocketAddr>) -> Self {
        self.relay_destinations = destinations;
        self
    }

    pub fn with_feedback_destination(mut self, destination: Option<SocketAddr>) -> Self {
        self.feedback_destination = destination;
        self
    }

    pub fn with_relay_policy(mut self, policy: RelayPolicy) -> Self {
        self.relay_policy = policy;
        self
    }

    pub fn with_cc_relay(mut self, enabled: bool) -> Self {
        self.cc_relay = enabled;
        self
    }

    pub fn with_bind_address(mut self, address: IpAddr) -> Self {
        self.bind_address = address;
        self
    }
}
