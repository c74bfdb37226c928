//! Processing types shared by the host and wrapped instances.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

const MIDI_STACK_CAPACITY: usize = 256;

/// Reference block size used when nothing better is known.
pub const DEFAULT_BLOCK_SIZE: usize = 512;

/// Reference sample rate used when nothing better is known.
pub const DEFAULT_SAMPLE_RATE: f64 = 44_100.0;

/// Short MIDI message with its position in the current block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MidiEvent {
    pub frame_offset: usize,
    pub status: u8,
    pub data1: u8,
    pub data2: u8,
}

impl MidiEvent {
    pub fn new(frame_offset: usize, status: u8, data1: u8, data2: u8) -> Self {
        Self {
            frame_offset,
            status,
            data1,
            data2,
        }
    }

    /// Control change on `channel` (0-15).
    pub fn controller(frame_offset: usize, channel: u8, controller: u8, value: u8) -> Self {
        Self::new(frame_offset, 0xB0 | (channel & 0x0F), controller & 0x7F, value & 0x7F)
    }

    #[inline]
    pub fn is_controller(&self) -> bool {
        self.status & 0xF0 == 0xB0
    }

    #[inline]
    pub fn channel(&self) -> u8 {
        self.status & 0x0F
    }
}

pub type MidiEventVec = SmallVec<[MidiEvent; MIDI_STACK_CAPACITY]>;

/// A control change captured on the audio thread for relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerEvent {
    pub channel: u8,
    pub controller: u8,
    pub value: u8,
}

impl ControllerEvent {
    pub fn from_midi(event: &MidiEvent) -> Option<Self> {
        event.is_controller().then(|| Self {
            channel: event.channel(),
            controller: event.data1,
            value: event.data2,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransportInfo {
    pub playing: bool,
    pub recording: bool,
    pub looping: bool,
    pub tempo: f64,
    pub time_sig_numerator: i32,
    pub time_sig_denominator: i32,
    pub position_samples: i64,
    pub position_quarters: f64,
    pub bar_position_quarters: f64,
}

impl Default for TransportInfo {
    fn default() -> Self {
        Self {
            playing: false,
            recording: false,
            looping: false,
            tempo: 120.0,
            time_sig_numerator: 4,
            time_sig_denominator: 4,
            position_samples: 0,
            position_quarters: 0.0,
            bar_position_quarters: 0.0,
        }
    }
}

/// In-place audio block. Inputs arrive in `channels` and outputs are written
/// back to the same slices.
pub struct AudioBuffer<'a, T = f32> {
    pub channels: &'a mut [&'a mut [T]],
    pub num_samples: usize,
}

pub type AudioBuffer64<'a> = AudioBuffer<'a, f64>;

impl<'a, T> AudioBuffer<'a, T> {
    pub fn new(channels: &'a mut [&'a mut [T]], num_samples: usize) -> Self {
        Self {
            channels,
            num_samples,
        }
    }

    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    pub fn channel_mut(&mut self, index: usize) -> Option<&mut [T]> {
        let n = self.num_samples;
        self.channels.get_mut(index).map(|ch| {
            let len = n.min(ch.len());
            &mut ch[..len]
        })
    }
}

/// Sample rate and block size an instance was prepared with.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AudioConfig {
    pub sample_rate: f64,
    pub block_size: usize,
}

impl AudioConfig {
    pub fn new(sample_rate: f64, block_size: usize) -> Self {
        Self {
            sample_rate,
            block_size,
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_RATE, DEFAULT_BLOCK_SIZE)
    }
}

/// Parameter metadata. Values are normalized 0..1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterInfo {
    pub index: usize,
    pub name: String,
    pub unit: String,
    pub default_value: f32,
    pub automatable: bool,
}

impl ParameterInfo {
    pub fn new(index: usize, name: impl Into<String>) -> Self {
        Self {
            index,
            name: name.into(),
            unit: String::new(),
            default_value: 0.0,
            automatable: true,
        }
    }

    pub fn with_default(mut self, value: f32) -> Self {
        self.default_value = value;
        self
    }
}
