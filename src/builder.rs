//! Builder for configuring and constructing a `HostProcessor`.

use crate::host::{ControlForwarder, HostProcessor};
use crate::settings::HostSettings;
use crate::{Error, Result};
use hostwrap_control::{ControlConfig, ControlRouter, ControlServer, NullRelay, RelaySink, UdpRelay};
use hostwrap_plugin::protocol::DEFAULT_SAMPLE_RATE;
use hostwrap_plugin::{AudioDispatcher, FormatRegistry, Instantiator, WrappedInstanceManager};
use std::sync::Arc;
use tokio::runtime::Handle;

/// Every field has a working default: the builtin format registry, a private
/// single-worker runtime, a UDP relay and a control socket on port 9000.
///
/// # Example
///
/// ```ignore
/// use hostwrap::prelude::*;
///
/// let mut host = HostProcessor::builder()
///     .osc_port(9100)
///     .instance_number(2)
///     .build()?;
///
/// host.create_plugin(GainPlugin::description_template());
/// host.prepare_to_play(48000.0, 256);
/// ```
pub struct HostBuilder {
    settings: HostSettings,
    control: ControlConfig,
    registry: Option<Arc<FormatRegistry>>,
    runtime: Option<Handle>,
    reference_sample_rate: f64,
    relay: Option<Box<dyn RelaySink + Send>>,
    bind_control: bool,
}

impl Default for HostBuilder {
    fn default() -> Self {
        Self {
            settings: HostSettings::default(),
            control: ControlConfig::default(),
            registry: None,
            runtime: None,
            reference_sample_rate: DEFAULT_SAMPLE_RATE,
            relay: None,
            bind_control: true,
        }
    }
}

impl HostBuilder {
    pub fn settings(mut self, settings: HostSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Clamped to the minimum editor size.
    pub fn ui_size(mut self, width: u32, height: u32) -> Self {
        self.settings.set_ui_size(width, height);
        self
    }

    /// Default: 9000. Port 0 binds an ephemeral port.
    pub fn osc_port(mut self, port: u16) -> Self {
        self.settings.osc_port = port;
        self
    }

    /// Default: 0
    pub fn instance_number(mut self, instance_number: u32) -> Self {
        self.settings.instance_number = instance_number;
        self
    }

    pub fn control(mut self, config: ControlConfig) -> Self {
        self.control = config;
        self
    }

    /// Default: a registry holding only the builtin format.
    pub fn registry(mut self, registry: Arc<FormatRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Run instantiation workers and the UDP receiver on an existing runtime
    /// instead of a private one.
    pub fn runtime(mut self, handle: Handle) -> Self {
        self.runtime = Some(handle);
        self
    }

    pub fn reference_sample_rate(mut self, sample_rate: f64) -> Self {
        self.reference_sample_rate = sample_rate;
        self
    }

    /// Replace the outgoing OSC sender.
    pub fn relay_sink(mut self, relay: Box<dyn RelaySink + Send>) -> Self {
        self.relay = Some(relay);
        self
    }

    /// Don't open the control socket. Packets can still be routed with
    /// `HostProcessor::route_packet`.
    pub fn without_control_socket(mut self) -> Self {
        self.bind_control = false;
        self
    }

    pub fn build(self) -> Result<HostProcessor> {
        let (handle, owned_runtime) = match self.runtime {
            Some(handle) => (handle, None),
            None => {
                let runtime = tokio::runtime::Builder::new_multi_thread()
                    .worker_threads(1)
                    .thread_name("hostwrap-worker")
                    .enable_all()
                    .build()
                    .map_err(Error::Io)?;
                (runtime.handle().clone(), Some(runtime))
            }
        };

        let registry = self
            .registry
            .unwrap_or_else(|| Arc::new(FormatRegistry::with_builtin()));

        let manager = WrappedInstanceManager::new();
        let dispatcher = AudioDispatcher::new(manager.published());
        dispatcher.set_cc_relay(self.control.cc_relay);

        let relay = match self.relay {
            Some(relay) => relay,
            None => match UdpRelay::bind_ephemeral() {
                Ok(relay) => Box::new(relay) as Box<dyn RelaySink + Send>,
                Err(e) => {
                    tracing::warn!("Outgoing OSC disabled: {}", e);
                    Box::new(NullRelay)
                }
            },
        };

        let (sender, messages) = crossbeam_channel::unbounded();
        let (notify_tx, notify_rx) = crossbeam_channel::unbounded();

        let server = ControlServer::new(handle.clone(), ControlForwarder(sender.clone()))
            .with_bind_address(self.control.bind_address);
        let router = ControlRouter::new(self.settings.instance_number, &self.control);

        let mut host = HostProcessor {
            settings: self.settings,
            control_config: self.control,
            reference_sample_rate: self.reference_sample_rate,
            instantiator: Instantiator::new(registry, handle),
            manager,
            dispatcher,
            router,
            server,
            control_enabled: self.bind_control,
            relay,
            messages,
            sender,
            notify_tx,
            notify_rx,
            _runtime: owned_runtime,
        };

        // A busy port is reported, not fatal: the host still wraps and
        // processes without its control plane.
        if let Err(e) = host.bind_control() {
            tracing::debug!("Host built without control plane: {}", e);
        }

        Ok(host)
    }
}

