//! # Hostwrap - Plugin Host Wrapper
//!
//! Wraps exactly one third-party plugin instance, forwards audio and MIDI
//! through it, and exposes it to a network control plane.
//!
//! ## Architecture
//!
//! Hostwrap is an umbrella crate that coordinates:
//! - **hostwrap-plugin** - Plugin abstraction, format registry, background
//!   instantiation, hot-swap and the real-time dispatcher
//! - **hostwrap-control** - OSC receiver, address routing, relay and presets
//!
//! This crate adds the `HostProcessor` that ties them together plus the
//! persisted state document.
//!
//! ## Threads
//!
//! - **Message thread**: every `HostProcessor` method. Applies instantiation
//!   results and routed control packets in `dispatch_pending()`.
//! - **Audio thread**: `AudioDispatcher::process_f32`/`process_f64`. Never
//!   allocates, never blocks; buffers pass through untouched while no
//!   instance is ready.
//! - **Workers**: plugin construction and the UDP receiver run on a tokio
//!   runtime.
//!
//! ## Quick Start
//!
//! ```ignore
//! use hostwrap::prelude::*;
//!
//! let mut host = HostProcessor::builder().osc_port(9000).build()?;
//! host.prepare_to_play(48000.0, 256);
//!
//! host.create_plugin(GainPlugin::description_template());
//! host.dispatch_pending_timeout(std::time::Duration::from_secs(1));
//!
//! // Audio callback
//! let dispatcher = host.audio_dispatcher();
//! dispatcher.process_f32(&mut buffer, &mut midi, &transport);
//!
//! let saved = host.save_state()?;
//! ```

/// Re-export of hostwrap-plugin for direct access
pub use hostwrap_plugin as plugin;

/// Re-export of hostwrap-control for direct access
pub use hostwrap_control as control;

pub mod error;
pub use error::{Error, Result};

pub mod settings;
pub use settings::{HostSettings, DEFAULT_OSC_PORT, MIN_UI_HEIGHT, MIN_UI_WIDTH};

pub mod state;
pub use state::{HostStateDocument, RestoredInstance, StateCodec, WrappedInstanceRecord};

mod builder;
mod host;

pub use builder::HostBuilder;
pub use host::{HostMessage, HostNotification, HostProcessor};

/// Convenience prelude for common imports
pub mod prelude {
    // Host
    pub use crate::{HostBuilder, HostNotification, HostProcessor, HostSettings};

    // Plugin abstraction
    pub use crate::plugin::{
        AudioBuffer, AudioConfig, AudioDispatcher, BusDirection, ChannelLayout, ChannelSet,
        FormatRegistry, GainPlugin, MidiEvent, MidiEventVec, PluginDescription, PluginFormat,
        PluginInstance, TransportInfo,
    };

    // Control plane
    pub use crate::control::{ControlConfig, RelayPolicy};
}
