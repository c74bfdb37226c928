//! OSC control plane for hostwrap
//!
//! Remote parameter writes, preset loads and message relay over UDP.
//!
//! ## Architecture
//!
//! ```text
//! UDP ─▶ ControlServer (tokio task) ─▶ channel ─▶ ControlRouter (message thread)
//!                                                    ├─▶ ControlTarget (wrapped instance)
//!                                                    └─▶ RelaySink (other destinations)
//! ```
//!
//! The router is synchronous and owns no sockets, so it can be driven
//! directly in tests with any `ControlTarget` and `RelaySink`.

pub mod error;
pub use error::{ControlError, Result};

mod address;
pub use address::{ControlAddresses, RouteAction};

mod config;
pub use config::{ControlConfig, RelayPolicy, DEFAULT_FEEDBACK_PORT, DEFAULT_RELAY_PORT};

mod preset;
pub use preset::{PresetLibrary, PRESET_EXTENSION};

mod relay;
pub use relay::{encode, NullRelay, RelaySink, UdpRelay};

mod router;
pub use router::{ControlRouter, ControlTarget, RouteOutcome};

mod server;
pub use server::{ControlServer, PacketSink};

pub use rosc;
