//! UDP receiver for the control plane.
//!
//! One tokio task per bound port decodes datagrams and forwards packets, in
//! arrival order, into a crossbeam channel drained by the message thread.

use crate::error::{ControlError, Result};
use crossbeam_channel::Sender;
use rosc::OscPacket;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const RECV_BUFFER_SIZE: usize = 65536;

const RECV_ERROR_BASE_DELAY: Duration = Duration::from_millis(1);
const RECV_ERROR_MAX_DELAY: Duration = Duration::from_millis(100);

/// Pause after the `consecutive`-th receive error in a row: doubles from
/// 1 ms up to 100 ms.
fn recv_error_delay(consecutive: u32) -> Duration {
    let shift = consecutive.saturating_sub(1).min(16);
    RECV_ERROR_BASE_DELAY
        .saturating_mul(1 << shift)
        .min(RECV_ERROR_MAX_DELAY)
}

/// Something the receive task can hand packets to.
pub trait PacketSink: Send + 'static {
    /// Returns false once the receiving side is gone.
    fn deliver(&self, packet: OscPacket) -> bool;
}

impl PacketSink for Sender<OscPacket> {
    fn deliver(&self, packet: OscPacket) -> bool {
        self.send(packet).is_ok()
    }
}

pub struct ControlServer<S: PacketSink + Clone = Sender<OscPacket>> {
    runtime: Handle,
    sink: S,
    bind_address: IpAddr,
    task: Option<JoinHandle<()>>,
    local_addr: Option<SocketAddr>,
}

impl<S: PacketSink + Clone> ControlServer<S> {
    pub fn new(runtime: Handle, sink: S) -> Self {
        Self {
            runtime,
            sink,
            bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            task: None,
            local_addr: None,
        }
    }

    pub fn with_bind_address(mut self, address: IpAddr) -> Self {
        self.bind_address = address;
        self
    }

    pub fn is_bound(&self) -> bool {
        self.task.is_some()
    }

    /// Address actually bound (useful with port 0).
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Unbind, then bind `port`. On failure the server stays unbound.
    pub fn rebind(&mut self, port: u16) -> Result<SocketAddr> {
        self.unbind();

        let bind_err = |source| ControlError::Bind { port, source };
        let std_socket =
            std::net::UdpSocket::bind(SocketAddr::new(self.bind_address, port)).map_err(bind_err)?;
        std_socket.set_nonblocking(true).map_err(bind_err)?;
        let local = std_socket.local_addr().map_err(bind_err)?;

        let socket = {
            let _guard = self.runtime.enter();
            tokio::net::UdpSocket::from_std(std_socket).map_err(bind_err)?
        };

        let sink = self.sink.clone();
        self.task = Some(self.runtime.spawn(receive_loop(socket, sink)));
        self.local_addr = Some(local);

        info!("Control plane listening on {}", local);
        Ok(local)
    }

    pub fn unbind(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            if let Some(addr) = self.local_addr.take() {
                info!("Control plane on {} stopped", addr);
            }
        }
        self.local_addr = None;
    }
}

impl<S: PacketSink + Clone> Drop for ControlServer<S> {
    fn drop(&mut self) {
        self.unbind();
    }
}

async fn receive_loop<S: PacketSink>(socket: tokio::net::UdpSocket, sink: S) {
    let mut buf = vec![0u8; RECV_BUFFER_SIZE];
    let mut consecutive_errors = 0u32;
    loop {
        let received = socket.recv_from(&mut buf).await;
        if received.is_ok() {
            consecutive_errors = 0;
        }
        match received {
            Ok((size, from)) => match rosc::decoder::decode_udp(&buf[..size]) {
                Ok((_rest, packet)) => {
                    if !sink.deliver(packet) {
                        debug!("Control receiver dropped, stopping");
                        break;
                    }
                }
                Err(e) => debug!("Undecodable datagram from {}: {:?}", from, e),
            },
            Err(e) => {
                // ICMP errors from earlier sends surface here on some platforms.
                consecutive_errors = consecutive_errors.saturating_add(1);
                if consecutive_errors == 1 {
                    warn!("Control socket receive error: {}", e);
                } else {
                    debug!("Control socket receive error ({} in a row): {}", consecutive_errors, e);
                }
                tokio::time::sleep(recv_error_delay(consecutive_errors)).await;
            }
        }
    }
}
