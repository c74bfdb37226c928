//! Wrapped plugin instance and editor traits.
//!
//! Every loadable format (built-in or native) hands the host a boxed
//! `PluginInstance`. The host never sees format-specific types.

use crate::channels::{BusDirection, ChannelSet};
use crate::description::PluginDescription;
use crate::protocol::{AudioBuffer, AudioBuffer64, MidiEventVec, ParameterInfo, TransportInfo};
use crate::Result;

/// Opaque editor component owned alongside its instance.
pub trait PluginEditor: Send {
    /// Preferred size in pixels.
    fn size(&self) -> (u32, u32);
}

/// Unified interface for a loaded plugin instance of any format.
pub trait PluginInstance: Send {
    fn description(&self) -> &PluginDescription;

    fn prepare(&mut self, sample_rate: f64, block_size: usize);

    fn release(&mut self);

    fn reset(&mut self) {}

    fn set_transport(&mut self, _transport: &TransportInfo) {}

    /// Process a block in place. MIDI output replaces the contents of `midi`.
    fn process_f32(&mut self, buffer: &mut AudioBuffer<'_>, midi: &mut MidiEventVec);

    fn supports_f64(&self) -> bool {
        false
    }

    /// Returns false if the block was left untouched.
    fn process_f64(&mut self, _buffer: &mut AudioBuffer64<'_>, _midi: &mut MidiEventVec) -> bool {
        false
    }

    fn get_state(&mut self) -> Result<Vec<u8>>;

    fn set_state(&mut self, data: &[u8]) -> Result<()>;

    /// Load a preset file's raw bytes. Formats whose presets are plain state
    /// chunks can rely on the default.
    fn load_preset(&mut self, data: &[u8]) -> Result<()> {
        self.set_state(data)
    }

    fn parameters(&self) -> Vec<ParameterInfo>;

    /// Normalized 0..1.
    fn get_parameter(&self, index: usize) -> Option<f32>;

    /// Normalized 0..1.
    fn set_parameter(&mut self, index: usize, value: f32);

    /// Set the first parameter whose name matches exactly (case-sensitive).
    /// Returns false when no parameter carries that name.
    fn set_parameter_by_name(&mut self, name: &str, value: f32) -> bool {
        match self.parameters().iter().find(|p| p.name == name) {
            Some(info) => {
                self.set_parameter(info.index, value);
                true
            }
            None => false,
        }
    }

    fn bus_count(&self, direction: BusDirection) -> usize;

    fn channel_set(&self, direction: BusDirection, index: usize) -> Option<ChannelSet>;

    fn set_channel_set(&mut self, direction: BusDirection, index: usize, set: &ChannelSet)
        -> bool;

    fn add_bus(&mut self, _direction: BusDirection) -> bool {
        false
    }

    fn remove_bus(&mut self, _direction: BusDirection) -> bool {
        false
    }

    fn enable_all_buses(&mut self) {}

    fn create_editor(&mut self) -> Option<Box<dyn PluginEditor>> {
        None
    }
}
