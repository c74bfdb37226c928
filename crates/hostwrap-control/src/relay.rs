//! Outgoing OSC.

use crate::error::{ControlError, Result};
use rosc::OscPacket;
use std::net::{SocketAddr, UdpSocket};

/// Fire-and-forget OSC sender.
pub trait RelaySink {
    fn send(&self, destination: SocketAddr, packet: &OscPacket) -> Result<()>;
}

pub fn encode(packet: &OscPacket) -> Result<Vec<u8>> {
    rosc::encoder::encode(packet).map_err(|e| ControlError::Encode(format!("{:?}", e)))
}

/// UDP sender on an ephemeral port. Non-blocking: a full send buffer drops
/// the datagram.
pub struct UdpRelay {
    socket: UdpSocket,
}

impl UdpRelay {
    pub fn bind_ephemeral() -> Result<Self> {
        let socket = UdpSocket::bind(("0.0.0.0", 0))?;
        socket.set_nonblocking(true)?;
        Ok(Self { socket })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }
}

impl RelaySink for UdpRelay {
    fn send(&self, destination: SocketAddr, packet: &OscPacket) -> Result<()> {
        let buf = encode(packet)?;
        self.socket.send_to(&buf, destination)?;
        Ok(())
    }
}

/// Sink that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRelay;

impl RelaySink for NullRelay {
    fn send(&self, _destination: SocketAddr, _packet: &OscPacket) -> Result<()> {
        Ok(())
    }
}
