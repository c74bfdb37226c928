//! Wrapped plugin hosting for hostwrap
//!
//! This crate owns everything between a plugin description and the audio
//! callback: format lookup, off-thread instantiation, the single live instance,
//! bus layout negotiation, and the real-time dispatcher.
//!
//! ## Threads
//!
//! - **Message thread**: `WrappedInstanceManager`, `reconcile`, state and presets
//! - **Worker**: `Instantiator::create_async` constructs instances on tokio's blocking pool
//! - **Audio thread**: `AudioDispatcher` only (never blocks, never allocates)
//!
//! ## Usage
//!
//! ```
//! use hostwrap_plugin::{
//!     AudioConfig, AudioDispatcher, FormatRegistry, GainPlugin, PreparedInstance,
//!     WrappedInstanceManager,
//! };
//!
//! let registry = FormatRegistry::with_builtin();
//! let instance = registry
//!     .instantiate(&GainPlugin::description_template(), 48_000.0, 256)
//!     .unwrap();
//!
//! let config = AudioConfig::new(48_000.0, 256);
//! let mut manager = WrappedInstanceManager::new();
//! let dispatcher = AudioDispatcher::new(manager.published());
//! manager.replace(PreparedInstance::prepare(instance, config), None, config);
//!
//! assert!(dispatcher.is_active());
//! ```

pub mod error;
pub use error::{PluginError, Result};

mod description;
pub use description::PluginDescription;

pub mod channels;
pub use channels::{BusDirection, ChannelLayout, ChannelRole, ChannelSet};

pub mod protocol;
pub use protocol::{
    AudioBuffer, AudioBuffer64, AudioConfig, ControllerEvent, MidiEvent,
    MidiEventVec, ParameterInfo, TransportInfo,
};

mod instance;
pub use instance::{PluginEditor, PluginInstance};

mod format;
pub use format::{FormatRegistry, PluginFormat};

mod builtin;
pub use builtin::{BuiltinFormat, GainPlugin, BUILTIN_FORMAT, GAIN_PLUGIN_ID};

mod instantiator;
pub use instantiator::{InstantiationOutcome, Instantiator, PreparedInstance};

mod manager;
pub use manager::{InstanceSlot, WrappedInstanceManager};

pub mod reconcile;
pub use reconcile::{DirectionReport, ReconcileReport};

mod dispatcher;
pub use dispatcher::AudioDispatcher;
