//! In-process `builtin` format.
//!
//! Ships a single utility plugin, `builtin.gain`, so the host is usable
//! without any native loader registered.

use crate::channels::{BusDirection, ChannelSet};
use crate::description::PluginDescription;
use crate::error::{PluginError, Result};
use crate::format::PluginFormat;
use crate::instance::{PluginEditor, PluginInstance};
use crate::protocol::{AudioBuffer, AudioBuffer64, MidiEventVec, ParameterInfo};

pub const BUILTIN_FORMAT: &str = "builtin";
pub const GAIN_PLUGIN_ID: &str = "builtin.gain";

const MAX_BUSES: usize = 8;
const MAX_CHANNELS_PER_BUS: usize = 8;

const PARAM_GAIN: usize = 0;
const PARAM_PAN: usize = 1;
const STATE_LEN: usize = 8;

#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinFormat;

impl BuiltinFormat {
    pub fn new() -> Self {
        Self
    }
}

impl PluginFormat for BuiltinFormat {
    fn name(&self) -> &str {
        BUILTIN_FORMAT
    }

    fn create_instance(
        &self,
        description: &PluginDescription,
        _sample_rate: f64,
        _block_size: usize,
    ) -> Result<Box<dyn PluginInstance>> {
        match description.unique_id.as_str() {
            GAIN_PLUGIN_ID => Ok(Box::new(GainPlugin::new(description.clone()))),
            other => Err(PluginError::Instantiation {
                format: BUILTIN_FORMAT.to_string(),
                plugin: other.to_string(),
                reason: "no built-in plugin with this id".into(),
            }),
        }
    }
}

/// Gain and stereo balance. Parameters are normalized: gain 0.5 is
/// unity, pan 0.5 is centre.
pub struct GainPlugin {
    description: PluginDescription,
    gain: f32,
    pan: f32,
    inputs: Vec<ChannelSet>,
    outputs: Vec<ChannelSet>,
    sample_rate: f64,
    block_size: usize,
    prepared: bool,
}

impl GainPlugin {
    pub fn new(description: PluginDescription) -> Self {
        Self {
            description,
            gain: 0.5,
            pan: 0.5,
            inputs: vec![ChannelSet::stereo()],
            outputs: vec![ChannelSet::stereo()],
            sample_rate: 0.0,
            block_size: 0,
            prepared: false,
        }
    }

    pub fn description_template() -> PluginDescription {
        PluginDescription::new(BUILTIN_FORMAT, GAIN_PLUGIN_ID, "")
            .with_name("Gain")
            .with_version(env!("CARGO_PKG_VERSION"))
    }

    pub fn is_prepared(&self) -> bool {
        self.prepared
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Per-channel multipliers for a block with `num_channels` channels.
    fn channel_gain(&self, channel: usize, num_channels: usize) -> f32 {
        let amp = self.gain * 2.0;
        if num_channels != 2 {
            return amp;
        }
        let weight = if channel == 0 {
            (2.0 * (1.0 - self.pan)).min(1.0)
        } else {
            (2.0 * self.pan).min(1.0)
        };
        amp * weight
    }

    fn buses_mut(&mut self, direction: BusDirection) -> &mut Vec<ChannelSet> {
        match direction {
            BusDirection::Input => &mut self.inputs,
            BusDirection::Output => &mut self.outputs,
        }
    }

    fn buses(&self, direction: BusDirection) -> &[ChannelSet] {
        match direction {
            BusDirection::Input => &self.inputs,
            BusDirection::Output => &self.outputs,
        }
    }
}

impl PluginInstance for GainPlugin {
    fn description(&self) -> &PluginDescription {
        &self.description
    }

    fn prepare(&mut self, sample_rate: f64, block_size: usize) {
        self.sample_rate = sample_rate;
        self.block_size = block_size;
        self.prepared = true;
    }

    fn release(&mut self) {
        self.prepared = false;
    }

    fn process_f32(&mut self, buffer: &mut AudioBuffer<'_>, _midi: &mut MidiEventVec) {
        let n = buffer.num_channels();
        for ch in 0..n {
            let g = self.channel_gain(ch, n);
            if let Some(samples) = buffer.channel_mut(ch) {
                samples.iter_mut().for_each(|s| *s *= g);
            }
        }
    }

    fn supports_f64(&self) -> bool {
        true
    }

    fn process_f64(&mut self, buffer: &mut AudioBuffer64<'_>, _midi: &mut MidiEventVec) -> bool {
        let n = buffer.num_channels();
        for ch in 0..n {
            let g = self.channel_gain(ch, n) as f64;
            if let Some(samples) = buffer.channel_mut(ch) {
                samples.iter_mut().for_each(|s| *s *= g);
            }
        }
        true
    }

    fn get_state(&mut self) -> Result<Vec<u8>> {
        let mut data = Vec::with_capacity(STATE_LEN);
        data.extend_from_slice(&self.gain.to_le_bytes());
        data.extend_from_slice(&self.pan.to_le_bytes());
        Ok(data)
    }

    fn set_state(&mut self, data: &[u8]) -> Result<()> {
        if data.len() != STATE_LEN {
            return Err(PluginError::State(format!(
                "expected {} bytes of gain state, got {}",
                STATE_LEN,
                data.len()
            )));
        }
        let (gain, pan) = data.split_at(4);
        let read = |bytes: &[u8]| f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        self.gain = read(gain).clamp(0.0, 1.0);
        self.pan = read(pan).clamp(0.0, 1.0);
        Ok(())
    }

    fn load_preset(&mut self, data: &[u8]) -> Result<()> {
        self.set_state(data).map_err(|e| PluginError::Preset(e.to_string()))
    }

    fn parameters(&self) -> Vec<ParameterInfo> {
        vec![
            ParameterInfo::new(PARAM_GAIN, "gain").with_default(0.5),
            ParameterInfo::new(PARAM_PAN, "pan").with_default(0.5),
        ]
    }

    fn get_parameter(&self, index: usize) -> Option<f32> {
        match index {
            PARAM_GAIN => Some(self.gain),
            PARAM_PAN => Some(self.pan),
            _ => None,
        }
    }

    fn set_parameter(&mut self, index: usize, value: f32) {
        let value = value.clamp(0.0, 1.0);
        match index {
            PARAM_GAIN => self.gain = value,
            PARAM_PAN => self.pan = value,
            _ => {}
        }
    }

    fn bus_count(&self, direction: BusDirection) -> usize {
        self.buses(direction).len()
    }

    fn channel_set(&self, direction: BusDirection, index: usize) -> Option<ChannelSet> {
        self.buses(direction).get(index).cloned()
    }

    fn set_channel_set(
        &mut self,
        direction: BusDirection,
        index: usize,
        set: &ChannelSet,
    ) -> bool {
        if set.is_empty() || set.num_channels() > MAX_CHANNELS_PER_BUS {
            return false;
        }
        match self.buses_mut(direction).get_mut(index) {
            Some(bus) => {
                *bus = set.clone();
                true
            }
            None => false,
        }
    }

    fn add_bus(&mut self, direction: BusDirection) -> bool {
        let buses = self.buses_mut(direction);
        if buses.len() >= MAX_BUSES {
            return false;
        }
        buses.push(ChannelSet::stereo());
        true
    }

    fn remove_bus(&mut self, direction: BusDirection) -> bool {
        let buses = self.buses_mut(direction);
        if buses.len() <= 1 {
            return false;
        }
        buses.pop();
        true
    }

    fn enable_all_buses(&mut self) {
        for bus in self.inputs.iter_mut().chain(self.outputs.iter_mut()) {
            if bus.is_disabled() {
                *bus = ChannelSet::stereo();
            }
        }
    }

    fn create_editor(&mut self) -> Option<Box<dyn PluginEditor>> {
        Some(Box::new(GainEditor))
    }
}

struct GainEditor;

impl PluginEditor for GainEditor {
    fn size(&self) -> (u32, u32) {
        (240, 120)
    }
}
