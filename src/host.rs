//! The host processor: owns the wrapped instance, its settings and the
//! control plane.
//!
//! All `HostProcessor` methods run on the message thread. The audio callback
//! gets an `AudioDispatcher` from `audio_dispatcher()` and never touches the
//! processor itself. Work arriving from other threads (instantiation results,
//! control packets) is queued and applied by `dispatch_pending()`.

use crate::error::Result;
use crate::settings::HostSettings;
use crate::state::StateCodec;
use crossbeam_channel::{Receiver, Sender};
use hostwrap_control::rosc::OscPacket;
use hostwrap_control::{
    ControlConfig, ControlRouter, ControlServer, ControlTarget, PacketSink, RelaySink,
    RouteOutcome,
};
use hostwrap_plugin::reconcile::reconcile;
use hostwrap_plugin::{
    AudioConfig, AudioDispatcher, BusDirection, ChannelLayout, ChannelSet, FormatRegistry,
    InstantiationOutcome, Instantiator, PluginDescription, PluginEditor, PluginError,
    PreparedInstance, WrappedInstanceManager,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Work queued for the message thread.
#[derive(Debug)]
pub enum HostMessage {
    InstanceCreated(InstantiationOutcome),
    Control(OscPacket),
}

/// User-facing events. The embedding UI drains these with `notifications()`.
#[derive(Debug, Clone, PartialEq)]
pub enum HostNotification {
    /// Shown to the user; the previous instance is still live
    InstantiationFailed {
        description: PluginDescription,
        error: String,
    },
    ConnectionFailed { port: u16, error: String },
    /// A new instance is live; its editor (if any) can be shown
    EditorReady {
        description: PluginDescription,
        editor_size: Option<(u32, u32)>,
    },
}

/// Forwards decoded control packets into the host queue.
#[derive(Clone)]
pub(crate) struct ControlForwarder(pub(crate) Sender<HostMessage>);

impl PacketSink for ControlForwarder {
    fn deliver(&self, packet: OscPacket) -> bool {
        self.0.send(HostMessage::Control(packet)).is_ok()
    }
}

/// Routes control actions into the wrapped instance.
struct InstanceTarget<'a> {
    manager: &'a WrappedInstanceManager,
}

impl ControlTarget for InstanceTarget<'_> {
    fn load_preset(&mut self, data: &[u8]) -> bool {
        match self.manager.with_instance(|inst| inst.load_preset(data)) {
            Some(Ok(())) => true,
            Some(Err(e)) => {
                debug!("Preset rejected by wrapped instance: {}", e);
                false
            }
            None => false,
        }
    }

    fn set_parameter_by_name(&mut self, name: &str, value: f32) -> bool {
        self.manager.set_parameter_by_name(name, value)
    }
}

pub struct HostProcessor {
    pub(crate) settings: HostSettings,
    pub(crate) control_config: ControlConfig,
    pub(crate) reference_sample_rate: f64,
    pub(crate) instantiator: Instantiator,
    pub(crate) manager: WrappedInstanceManager,
    pub(crate) dispatcher: AudioDispatcher,
    pub(crate) router: ControlRouter,
    pub(crate) server: ControlServer<ControlForwarder>,
    /// False when built without a control socket; port changes are stored only
    pub(crate) control_enabled: bool,
    pub(crate) relay: Box<dyn RelaySink + Send>,
    pub(crate) messages: Receiver<HostMessage>,
    pub(crate) sender: Sender<HostMessage>,
    pub(crate) notify_tx: Sender<HostNotification>,
    pub(crate) notify_rx: Receiver<HostNotification>,
    /// Set when the builder created the runtime itself; dropped last
    pub(crate) _runtime: Option<tokio::runtime::Runtime>,
}

impl HostProcessor {
    pub fn builder() -> crate::HostBuilder {
        crate::HostBuilder::default()
    }

    // ---- settings ----

    pub fn settings(&self) -> &HostSettings {
        &self.settings
    }

    /// Direct access for the embedding UI. Port and instance number changes
    /// made here take effect through `apply_settings()`.
    pub fn settings_mut(&mut self) -> &mut HostSettings {
        &mut self.settings
    }

    pub fn set_ui_size(&mut self, width: u32, height: u32) {
        self.settings.set_ui_size(width, height);
    }

    pub fn set_instance_number(&mut self, instance_number: u32) {
        self.settings.instance_number = instance_number;
        self.router.set_instance_number(instance_number);
    }

    /// Rebind the control plane to `port`. On failure the plane stays unbound
    /// and a `ConnectionFailed` notification is raised.
    pub fn set_osc_port(&mut self, port: u16) -> Result<()> {
        self.settings.osc_port = port;
        self.bind_control()
    }

    /// Push port and instance number from `settings` into the control plane.
    pub fn apply_settings(&mut self) -> Result<()> {
        self.router.set_instance_number(self.settings.instance_number);
        let bound_port = self.server.local_addr().map(|a| a.port());
        if bound_port != Some(self.settings.osc_port) {
            self.bind_control()?;
        }
        Ok(())
    }

    pub(crate) fn bind_control(&mut self) -> Result<()> {
        if !self.control_enabled {
            return Ok(());
        }
        let port = self.settings.osc_port;
        let bound = self.server.rebind(port);
        self.router.set_inbound(self.server.local_addr());
        match bound {
            Ok(_) => {
                for destination in self.router.looping_destinations() {
                    warn!(
                        "OSC destination {} is this host's own control port; nothing will be sent there",
                        destination
                    );
                }
                Ok(())
            }
            Err(e) => {
                warn!("Control plane unavailable: {}", e);
                self.notify(HostNotification::ConnectionFailed {
                    port,
                    error: e.to_string(),
                });
                Err(e.into())
            }
        }
    }

    pub fn control_address(&self) -> Option<SocketAddr> {
        self.server.local_addr()
    }

    pub fn control_config(&self) -> &ControlConfig {
        &self.control_config
    }

    // ---- audio lifecycle ----

    pub fn prepare_to_play(&mut self, sample_rate: f64, block_size: usize) {
        let config = AudioConfig::new(sample_rate, block_size);
        self.dispatcher.set_config(config);
        self.manager.prepare(config);
    }

    pub fn release_resources(&mut self) {
        self.dispatcher.mark_released();
        self.manager.release();
    }

    pub fn reset(&mut self) {
        self.manager.reset();
    }

    /// Whether the host side accepts `layout`. With an instance loaded every
    /// layout is accepted and left to the instance. Without one, only a main
    /// output of one or two channels is accepted, with the main input either
    /// disabled or matching it.
    pub fn is_layout_supported(&self, layout: &ChannelLayout) -> bool {
        self.manager.has_instance() || empty_host_supports(layout)
    }

    /// Handle for the audio callback.
    pub fn audio_dispatcher(&self) -> AudioDispatcher {
        self.dispatcher.clone()
    }

    /// Configuration a new instance is prepared with: the live one once the
    /// host is prepared, otherwise the reference rate.
    pub fn current_config(&self) -> AudioConfig {
        if self.dispatcher.is_prepared() {
            self.dispatcher.config()
        } else {
            AudioConfig::new(self.reference_sample_rate, self.dispatcher.block_size())
        }
    }

    // ---- wrapped instance ----

    /// Start instantiating `description` off-thread. The result is applied by
    /// a later `dispatch_pending()`. Returns the request ticket.
    pub fn create_plugin(&self, description: PluginDescription) -> u64 {
        let config = self.current_config();
        let sender = self.sender.clone();
        self.instantiator.create_async(
            description,
            config.sample_rate,
            config.block_size,
            move |outcome| {
                let _ = sender.send(HostMessage::InstanceCreated(outcome));
            },
        )
    }

    /// Instantiate on the calling thread and install on success.
    pub fn create_plugin_blocking(&mut self, description: &PluginDescription) -> Result<()> {
        let config = self.current_config();
        match self
            .instantiator
            .create_blocking(description, config.sample_rate, config.block_size)
        {
            Ok(prepared) => {
                self.install(prepared);
                Ok(())
            }
            Err(e) => {
                self.instantiation_failed(description, &e);
                Err(e.into())
            }
        }
    }

    fn install(&mut self, mut prepared: PreparedInstance) {
        let description = prepared.description().clone();
        let editor = prepared.instance_mut().create_editor();
        let editor_size = editor.as_ref().map(|e| e.size());
        let config = self.current_config();
        self.manager.replace(prepared, editor, config);
        self.notify(HostNotification::EditorReady {
            description,
            editor_size,
        });
    }

    fn instantiation_failed(&self, description: &PluginDescription, error: &PluginError) {
        warn!("Couldn't create {}: {}", description, error);
        self.notify(HostNotification::InstantiationFailed {
            description: description.clone(),
            error: error.to_string(),
        });
    }

    fn apply_outcome(&mut self, outcome: InstantiationOutcome) {
        debug!("Instantiation ticket {} completed", outcome.ticket);
        match outcome.result {
            Ok(prepared) => self.install(prepared),
            Err(e) => self.instantiation_failed(&outcome.description, &e),
        }
    }

    pub fn has_instance(&self) -> bool {
        self.manager.has_instance()
    }

    pub fn description(&self) -> Option<PluginDescription> {
        self.manager.description()
    }

    pub fn editor(&self) -> Option<&dyn PluginEditor> {
        self.manager.editor()
    }

    pub fn manager(&self) -> &WrappedInstanceManager {
        &self.manager
    }

    pub fn registry(&self) -> &Arc<FormatRegistry> {
        self.instantiator.registry()
    }

    /// Set a wrapped-instance parameter by exact name.
    pub fn set_parameter_by_name(&mut self, name: &str, value: f32) -> bool {
        InstanceTarget {
            manager: &self.manager,
        }
        .set_parameter_by_name(name, value)
    }

    pub fn get_parameter_by_name(&self, name: &str) -> Option<f32> {
        self.manager.get_parameter_by_name(name)
    }

    /// Load `<preset folder>/<name>.fxp` into the wrapped instance.
    pub fn load_preset_by_name(&mut self, name: &str) -> Result<()> {
        let data = self.router.presets().read(name)?;
        match self.manager.with_instance(|inst| inst.load_preset(&data)) {
            Some(result) => Ok(result?),
            None => Ok(()),
        }
    }

    // ---- message pump ----

    /// Route one control packet immediately.
    pub fn route_packet(&mut self, packet: &OscPacket) -> RouteOutcome {
        let mut target = InstanceTarget {
            manager: &self.manager,
        };
        self.router.route_packet(packet, &mut target, &*self.relay)
    }

    /// Apply everything queued for the message thread. Returns the number of
    /// queued messages handled.
    pub fn dispatch_pending(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(message) = self.messages.try_recv() {
            self.handle(message);
            handled += 1;
        }
        self.relay_controllers();
        self.manager.collect_retired();
        handled
    }

    /// Wait up to `timeout` for at least one message, then drain the queue.
    pub fn dispatch_pending_timeout(&mut self, timeout: Duration) -> usize {
        match self.messages.recv_timeout(timeout) {
            Ok(message) => {
                self.handle(message);
                1 + self.dispatch_pending()
            }
            Err(_) => self.dispatch_pending(),
        }
    }

    fn handle(&mut self, message: HostMessage) {
        match message {
            HostMessage::InstanceCreated(outcome) => self.apply_outcome(outcome),
            HostMessage::Control(packet) => {
                let outcome = self.route_packet(&packet);
                debug!("Routed control packet: {:?}", outcome);
            }
        }
    }

    fn relay_controllers(&self) {
        for cc in self.dispatcher.drain_controllers() {
            self.router
                .send_controller(cc.channel, cc.controller, cc.value, &*self.relay);
        }
    }

    /// Sender for injecting messages from other threads.
    pub fn message_sender(&self) -> Sender<HostMessage> {
        self.sender.clone()
    }

    fn notify(&self, notification: HostNotification) {
        let _ = self.notify_tx.send(notification);
    }

    /// Drain pending user-facing notifications.
    pub fn notifications(&self) -> impl Iterator<Item = HostNotification> + '_ {
        self.notify_rx.try_iter()
    }

    // ---- persistence ----

    pub fn save_state(&self) -> Result<Vec<u8>> {
        let record = self
            .manager
            .with_instance(StateCodec::capture)
            .transpose()?;
        StateCodec::encode(&self.settings, record)
    }

    /// Restore settings and, if recorded, the wrapped instance.
    ///
    /// A malformed document changes nothing. A document whose instance cannot
    /// be created still applies its settings and leaves the previous
    /// instance live.
    pub fn load_state(&mut self, data: &[u8]) -> Result<()> {
        let (document, restored) = StateCodec::decode(data)?;

        document.apply_settings(&mut self.settings);
        if let Err(e) = self.apply_settings() {
            debug!("Control plane not rebound after state load: {}", e);
        }

        let Some(restored) = restored else {
            return Ok(());
        };

        let config = self.current_config();
        let mut prepared = match self.instantiator.create_blocking(
            &restored.description,
            config.sample_rate,
            config.block_size,
        ) {
            Ok(prepared) => prepared,
            Err(e) => {
                self.instantiation_failed(&restored.description, &e);
                return Err(e.into());
            }
        };

        reconcile(prepared.instance_mut(), &restored.layout);
        if let Err(e) = prepared.instance_mut().set_state(&restored.state) {
            warn!("Wrapped instance rejected its saved state: {}", e);
        }
        prepared.reprepare(config);

        info!("Restored wrapped instance {}", restored.description);
        self.install(prepared);
        Ok(())
    }
}

fn empty_host_supports(layout: &ChannelLayout) -> bool {
    let input = layout.main_bus(BusDirection::Input);
    let output = layout.main_bus(BusDirection::Output);
    let silent = |set: &ChannelSet| set.is_disabled() || set.is_empty();

    if silent(output) || output.num_channels() > 2 {
        return false;
    }
    silent(input) || input == output
}

impl Drop for HostProcessor {
    fn drop(&mut self) {
        self.server.unbind();
        self.manager.clear();
    }
}
