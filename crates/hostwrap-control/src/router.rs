//! Message routing on the message thread.
//!
//! Packets are handled strictly in arrival order. Bundle elements are handled
//! depth-first in element order and their timetags are ignored, so
//! `[set A=1, set B=2, set A=3]` always leaves A at 3.

use crate::address::{ControlAddresses, RouteAction};
use crate::config::{ControlConfig, RelayPolicy};
use crate::error::ControlError;
use crate::preset::PresetLibrary;
use crate::relay::RelaySink;
use rosc::{OscMessage, OscPacket, OscType};
use std::net::SocketAddr;
use tracing::debug;

/// The host side of routing: whatever owns the wrapped instance.
pub trait ControlTarget {
    /// Hand a preset file's bytes to the wrapped instance. Returns true if a
    /// live instance accepted them.
    fn load_preset(&mut self, data: &[u8]) -> bool;

    /// Set the first parameter named `name` exactly. Returns true on a match.
    fn set_parameter_by_name(&mut self, name: &str, value: f32) -> bool;
}

/// Tally of what one packet did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouteOutcome {
    pub messages: usize,
    pub parameters_set: usize,
    pub parameters_unmatched: usize,
    pub presets_loaded: usize,
    pub presets_missing: usize,
    pub presets_rejected: usize,
    pub confirmations: usize,
    pub relayed: usize,
    pub relay_suppressed: usize,
    pub malformed: usize,
    pub send_errors: usize,
}

impl RouteOutcome {
    fn merge(&mut self, other: RouteOutcome) {
        self.messages += other.messages;
        self.parameters_set += other.parameters_set;
        self.parameters_unmatched += other.parameters_unmatched;
        self.presets_loaded += other.presets_loaded;
        self.presets_missing += other.presets_missing;
        self.presets_rejected += other.presets_rejected;
        self.confirmations += other.confirmations;
        self.relayed += other.relayed;
        self.relay_suppressed += other.relay_suppressed;
        self.malformed += other.malformed;
        self.send_errors += other.send_errors;
    }
}

impl std::ops::AddAssign for RouteOutcome {
    fn add_assign(&mut self, rhs: Self) {
        self.merge(rhs);
    }
}

pub struct ControlRouter {
    addresses: ControlAddresses,
    presets: PresetLibrary,
    relay_policy: RelayPolicy,
    relay_destinations: Vec<SocketAddr>,
    feedback_destination: Option<SocketAddr>,
    /// Address the control socket is bound to. Nothing is ever sent there.
    inbound: Option<SocketAddr>,
}

impl ControlRouter {
    pub fn new(instance_number: u32, config: &ControlConfig) -> Self {
        Self {
            addresses: ControlAddresses::for_instance(instance_number),
            presets: PresetLibrary::new(config.preset_folder.clone()),
            relay_policy: config.relay_policy.clone(),
            relay_destinations: config.relay_destinations.clone(),
            feedback_destination: config.feedback_destination,
            inbound: None,
        }
    }

    pub fn addresses(&self) -> &ControlAddresses {
        &self.addresses
    }

    pub fn presets(&self) -> &PresetLibrary {
        &self.presets
    }

    pub fn set_instance_number(&mut self, instance_number: u32) {
        if self.addresses.instance() != instance_number {
            self.addresses = ControlAddresses::for_instance(instance_number);
        }
    }

    pub fn set_relay_policy(&mut self, policy: RelayPolicy) {
        self.relay_policy = policy;
    }

    pub fn relay_policy(&self) -> &RelayPolicy {
        &self.relay_policy
    }

    pub fn feedback_destination(&self) -> Option<SocketAddr> {
        self.feedback_destination
    }

    pub fn relay_destinations(&self) -> &[SocketAddr] {
        &self.relay_destinations
    }

    /// Record where the control socket is listening, or `None` when unbound.
    pub fn set_inbound(&mut self, addr: Option<SocketAddr>) {
        self.inbound = addr;
    }

    pub fn inbound(&self) -> Option<SocketAddr> {
        self.inbound
    }

    /// True if a datagram sent to `destination` would arrive back on our own
    /// control socket.
    pub fn loops_back(&self, destination: SocketAddr) -> bool {
        let Some(bound) = self.inbound else {
            return false;
        };
        if bound.port() != destination.port() {
            return false;
        }
        let ip = destination.ip();
        ip.is_loopback() || ip.is_unspecified() || ip == bound.ip()
    }

    /// Configured destinations that point back at the control socket.
    pub fn looping_destinations(&self) -> Vec<SocketAddr> {
        self.relay_destinations
            .iter()
            .copied()
            .chain(self.feedback_destination)
            .filter(|d| self.loops_back(*d))
            .collect()
    }

    /// Route one packet. Never fails: bad elements are counted and skipped.
    pub fn route_packet(
        &self,
        packet: &OscPacket,
        target: &mut dyn ControlTarget,
        sink: &dyn RelaySink,
    ) -> RouteOutcome {
        let mut outcome = RouteOutcome::default();
        match packet {
            OscPacket::Message(message) => {
                outcome += self.route_message(message, target, sink);
            }
            OscPacket::Bundle(bundle) => {
                for element in &bundle.content {
                    outcome += self.route_packet(element, target, sink);
                }
            }
        }
        outcome
    }

    fn route_message(
        &self,
        message: &OscMessage,
        target: &mut dyn ControlTarget,
        sink: &dyn RelaySink,
    ) -> RouteOutcome {
        let mut outcome = RouteOutcome {
            messages: 1,
            ..RouteOutcome::default()
        };

        match self.addresses.classify(message) {
            RouteAction::LoadPreset(name) => self.load_preset(name, target, sink, &mut outcome),
            RouteAction::SetParameter { name, value } => {
                if target.set_parameter_by_name(name, value) {
                    outcome.parameters_set += 1;
                } else {
                    outcome.parameters_unmatched += 1;
                }
            }
            RouteAction::Relay => self.relay(message, sink, &mut outcome),
            RouteAction::Malformed(reason) => {
                debug!("Dropping: {}", ControlError::malformed(&message.addr, reason));
                outcome.malformed += 1;
            }
        }
        outcome
    }

    fn load_preset(
        &self,
        name: &str,
        target: &mut dyn ControlTarget,
        sink: &dyn RelaySink,
        outcome: &mut RouteOutcome,
    ) {
        let data = match self.presets.read(name) {
            Ok(data) => data,
            Err(e) => {
                debug!("Ignoring preset load '{}': {}", name, e);
                outcome.presets_missing += 1;
                return;
            }
        };

        if !target.load_preset(&data) {
            outcome.presets_rejected += 1;
            return;
        }
        outcome.presets_loaded += 1;

        if let Some(destination) = self.feedback_destination {
            if self.loops_back(destination) {
                debug!("Not confirming preset to own control socket {}", destination);
                return;
            }
            let confirmation = OscPacket::Message(OscMessage {
                addr: self.addresses.loaded(),
                args: vec![OscType::String(name.to_string())],
            });
            match sink.send(destination, &confirmation) {
                Ok(()) => outcome.confirmations += 1,
                Err(e) => {
                    debug!("Preset confirmation to {} failed: {}", destination, e);
                    outcome.send_errors += 1;
                }
            }
        }
    }

    fn relay(&self, message: &OscMessage, sink: &dyn RelaySink, outcome: &mut RouteOutcome) {
        if !self.relay_policy.allows(&message.addr) {
            outcome.relay_suppressed += 1;
            return;
        }

        let packet = OscPacket::Message(message.clone());
        for destination in &self.relay_destinations {
            if self.loops_back(*destination) {
                debug!("Not relaying {} to own control socket {}", message.addr, destination);
                outcome.relay_suppressed += 1;
                continue;
            }
            match sink.send(*destination, &packet) {
                Ok(()) => outcome.relayed += 1,
                Err(e) => {
                    debug!("Relay of {} to {} failed: {}", message.addr, destination, e);
                    outcome.send_errors += 1;
                }
            }
        }
    }

    /// MIDI controller change relayed as `/module/{n}/midi/cc [channel, controller, value]`.
    pub fn controller_message(&self, channel: u8, controller: u8, value: u8) -> OscPacket {
        OscPacket::Message(OscMessage {
            addr: self.addresses.controller(),
            args: vec![
                OscType::Int(channel as i32),
                OscType::Int(controller as i32),
                OscType::Int(value as i32),
            ],
        })
    }

    /// Send a controller change to every relay destination.
    pub fn send_controller(&self, channel: u8, controller: u8, value: u8, sink: &dyn RelaySink) {
        let packet = self.controller_message(channel, controller, value);
        for destination in &self.relay_destinations {
            if self.loops_back(*destination) {
                continue;
            }
            if let Err(e) = sink.send(*destination, &packet) {
                debug!("Controller relay to {} failed: {}", destination, e);
            }
        }
    }
}
