//! Test helpers and fixtures for hostwrap integration tests
//!
//! Hosts built here never open the control socket; packets are fed through
//! `HostProcessor::route_packet` and outgoing OSC lands in a `RecordingRelay`.

pub mod tolerances;

use hostwrap::control::rosc::{OscMessage, OscPacket, OscType};
use hostwrap::control::{ControlError, RelaySink};
use hostwrap::prelude::*;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

pub const TEST_SAMPLE_RATE: f64 = 48000.0;

pub const TEST_BLOCK_SIZE: usize = 256;

/// Captures everything the host sends.
#[derive(Clone, Default)]
pub struct RecordingRelay {
    sent: Arc<Mutex<Vec<(SocketAddr, OscPacket)>>>,
}

impl RecordingRelay {
    pub fn sent(&self) -> Vec<(SocketAddr, OscPacket)> {
        self.sent.lock().unwrap().clone()
    }

    /// Addresses of every message sent, in order.
    pub fn addresses(&self) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|(_, packet)| match packet {
                OscPacket::Message(m) => Some(m.addr),
                OscPacket::Bundle(_) => None,
            })
            .collect()
    }
}

impl RelaySink for RecordingRelay {
    fn send(&self, destination: SocketAddr, packet: &OscPacket) -> Result<(), ControlError> {
        self.sent.lock().unwrap().push((destination, packet.clone()));
        Ok(())
    }
}

/// Host without a control socket, with outgoing OSC recorded.
pub fn test_host(config: ControlConfig) -> (HostProcessor, RecordingRelay) {
    let relay = RecordingRelay::default();
    let host = HostProcessor::builder()
        .control(config)
        .relay_sink(Box::new(relay.clone()))
        .without_control_socket()
        .build()
        .expect("Failed to create test host");
    (host, relay)
}

/// Test host with the builtin gain plugin installed and prepared.
pub fn host_with_gain(config: ControlConfig) -> (HostProcessor, RecordingRelay) {
    let (mut host, relay) = test_host(config);
    host.prepare_to_play(TEST_SAMPLE_RATE, TEST_BLOCK_SIZE);
    host.create_plugin_blocking(&GainPlugin::description_template())
        .expect("Failed to install gain plugin");
    // Drop the EditorReady notification from the install
    host.notifications().for_each(drop);
    (host, relay)
}

/// Pump the host until it has an instance or `timeout` elapses.
pub fn wait_for_instance(host: &mut HostProcessor, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        host.dispatch_pending_timeout(Duration::from_millis(20));
        if host.has_instance() {
            return true;
        }
    }
    false
}

/// Pump the host until a notification arrives or `timeout` elapses.
pub fn wait_for_notification(
    host: &mut HostProcessor,
    timeout: Duration,
) -> Option<HostNotification> {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        host.dispatch_pending_timeout(Duration::from_millis(20));
        if let Some(n) = host.notifications().next() {
            return Some(n);
        }
    }
    None
}

/// Run one stereo f32 block filled with `value` through `dispatcher`.
pub fn process_stereo(
    dispatcher: &AudioDispatcher,
    value: f32,
    midi: &mut MidiEventVec,
) -> (bool, Vec<f32>, Vec<f32>) {
    let mut left = vec![value; TEST_BLOCK_SIZE];
    let mut right = vec![value; TEST_BLOCK_SIZE];
    let processed = {
        let mut chans: [&mut [f32]; 2] = [&mut left, &mut right];
        let mut buffer = AudioBuffer::new(&mut chans, TEST_BLOCK_SIZE);
        dispatcher.process_f32(&mut buffer, midi, &TransportInfo::default())
    };
    (processed, left, right)
}

pub fn message(addr: &str, args: Vec<OscType>) -> OscPacket {
    OscPacket::Message(OscMessage {
        addr: addr.to_string(),
        args,
    })
}

/// Write `<dir>/<name>.fxp` holding a gain-plugin preset.
pub fn write_gain_preset(dir: &Path, name: &str, gain: f32, pan: f32) {
    let mut data = Vec::new();
    data.extend_from_slice(&gain.to_le_bytes());
    data.extend_from_slice(&pan.to_le_bytes());
    std::fs::write(dir.join(format!("{}.fxp", name)), data).unwrap();
}
