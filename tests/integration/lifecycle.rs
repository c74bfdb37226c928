//! Instance lifecycle integration tests
//!
//! Instantiation (background and blocking), hot-swap, failure isolation and
//! what the audio thread sees through it all.

use crate::helpers::tolerances::FLOAT_EPSILON;
use crate::helpers::*;
use hostwrap::plugin::{
    ParameterInfo, PluginError, PluginFormat, PluginEditor, MidiEvent, Result as PluginResult,
};
use hostwrap::prelude::*;
use hostwrap::plugin::protocol::DEFAULT_SAMPLE_RATE;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(5);

/// What a `Recorder` instance observed.
#[derive(Default)]
struct Recording {
    prepares: Mutex<Vec<(f64, usize)>>,
    /// Blocks processed between `release` and the next `prepare`
    unprepared_blocks: AtomicUsize,
}

/// Gain plugin that records its lifecycle calls.
struct Recorder {
    inner: GainPlugin,
    prepared: bool,
    recording: Arc<Recording>,
}

impl PluginInstance for Recorder {
    fn description(&self) -> &PluginDescription {
        self.inner.description()
    }
    fn prepare(&mut self, sample_rate: f64, block_size: usize) {
        self.recording
            .prepares
            .lock()
            .unwrap()
            .push((sample_rate, block_size));
        self.prepared = true;
        self.inner.prepare(sample_rate, block_size);
    }
    fn release(&mut self) {
        self.prepared = false;
        self.inner.release();
    }
    fn process_f32(&mut self, buffer: &mut AudioBuffer<'_>, midi: &mut MidiEventVec) {
        if !self.prepared {
            self.recording.unprepared_blocks.fetch_add(1, Ordering::SeqCst);
        }
        self.inner.process_f32(buffer, midi);
    }
    fn get_state(&mut self) -> PluginResult<Vec<u8>> {
        self.inner.get_state()
    }
    fn set_state(&mut self, data: &[u8]) -> PluginResult<()> {
        self.inner.set_state(data)
    }
    fn parameters(&self) -> Vec<ParameterInfo> {
        self.inner.parameters()
    }
    fn get_parameter(&self, index: usize) -> Option<f32> {
        self.inner.get_parameter(index)
    }
    fn set_parameter(&mut self, index: usize, value: f32) {
        self.inner.set_parameter(index, value);
    }
    fn bus_count(&self, direction: BusDirection) -> usize {
        self.inner.bus_count(direction)
    }
    fn channel_set(&self, direction: BusDirection, index: usize) -> Option<ChannelSet> {
        self.inner.channel_set(direction, index)
    }
    fn set_channel_set(&mut self, direction: BusDirection, index: usize, set: &ChannelSet) -> bool {
        self.inner.set_channel_set(direction, index, set)
    }
    fn create_editor(&mut self) -> Option<Box<dyn PluginEditor>> {
        None
    }
}

struct RecorderFormat {
    recording: Arc<Recording>,
}

impl PluginFormat for RecorderFormat {
    fn name(&self) -> &str {
        "recorder"
    }

    fn create_instance(
        &self,
        description: &PluginDescription,
        _sample_rate: f64,
        _block_size: usize,
    ) -> PluginResult<Box<dyn PluginInstance>> {
        if description.unique_id == "recorder.broken" {
            return Err(PluginError::Instantiation {
                format: "recorder".into(),
                plugin: description.unique_id.clone(),
                reason: "refused".into(),
            });
        }
        Ok(Box::new(Recorder {
            inner: GainPlugin::new(description.clone()),
            prepared: false,
            recording: Arc::clone(&self.recording),
        }))
    }
}

fn recorder_registry() -> (Arc<FormatRegistry>, Arc<Recording>) {
    let recording = Arc::new(Recording::default());
    let registry = FormatRegistry::with_builtin();
    registry.register(RecorderFormat {
        recording: Arc::clone(&recording),
    });
    (Arc::new(registry), recording)
}

fn recorder_host() -> (HostProcessor, Arc<Recording>) {
    let (registry, recording) = recorder_registry();
    let host = HostProcessor::builder()
        .registry(registry)
        .without_control_socket()
        .build()
        .unwrap();
    (host, recording)
}

#[test]
fn test_background_instantiation_reports_editor() {
    let (mut host, _) = test_host(ControlConfig::default());
    host.prepare_to_play(TEST_SAMPLE_RATE, TEST_BLOCK_SIZE);
    assert!(!host.has_instance());

    host.create_plugin(GainPlugin::description_template());
    let notification = wait_for_notification(&mut host, WAIT).expect("no completion");

    assert_eq!(
        notification,
        HostNotification::EditorReady {
            description: GainPlugin::description_template(),
            editor_size: Some((240, 120)),
        }
    );
    assert!(host.has_instance());
    assert_eq!(host.editor().map(|e| e.size()), Some((240, 120)));
    assert!(host.audio_dispatcher().is_active());
}

#[test]
fn test_wait_for_instance_after_async_create() {
    let (mut host, _) = test_host(ControlConfig::default());
    host.create_plugin(GainPlugin::description_template());
    assert!(wait_for_instance(&mut host, WAIT));
    assert_eq!(host.description(), Some(GainPlugin::description_template()));
}

#[test]
fn test_unknown_format_keeps_previous_instance() {
    let (mut host, _) = host_with_gain(ControlConfig::default());
    let dispatcher = host.audio_dispatcher();
    assert!(host.set_parameter_by_name("gain", 0.25));

    host.create_plugin(PluginDescription::new("vst3", "com.example.missing", "/nowhere.vst3"));
    match wait_for_notification(&mut host, WAIT) {
        Some(HostNotification::InstantiationFailed { description, .. }) => {
            assert_eq!(description.format, "vst3");
        }
        other => panic!("expected InstantiationFailed, got {:?}", other),
    }

    assert_eq!(host.description(), Some(GainPlugin::description_template()));
    let (processed, left, _) = process_stereo(&dispatcher, 1.0, &mut MidiEventVec::new());
    assert!(processed);
    assert!((left[0] - 0.5).abs() < FLOAT_EPSILON);
}

#[test]
fn test_failed_constructor_is_reported_not_fatal() {
    let (mut host, _) = recorder_host();

    let err = host
        .create_plugin_blocking(&PluginDescription::new("recorder", "recorder.broken", ""))
        .unwrap_err();
    assert!(err.is_instantiation());
    assert!(!host.has_instance());
    assert!(matches!(
        host.notifications().next(),
        Some(HostNotification::InstantiationFailed { .. })
    ));
}

#[test]
fn test_swap_installs_fresh_instance() {
    let (mut host, _) = host_with_gain(ControlConfig::default());
    let dispatcher = host.audio_dispatcher();
    host.set_parameter_by_name("gain", 0.25);

    host.create_plugin_blocking(&GainPlugin::description_template())
        .unwrap();

    // Fresh instance is at unity again
    let (processed, left, right) = process_stereo(&dispatcher, 0.8, &mut MidiEventVec::new());
    assert!(processed);
    approx::assert_abs_diff_eq!(left[0], 0.8, epsilon = FLOAT_EPSILON);
    approx::assert_abs_diff_eq!(right[TEST_BLOCK_SIZE - 1], 0.8, epsilon = FLOAT_EPSILON);
    assert_eq!(host.manager().retired_count(), 0);
}

#[test]
fn test_pass_through_without_instance() {
    let (host, _) = test_host(ControlConfig::default());
    let dispatcher = host.audio_dispatcher();

    let (processed, left, right) = process_stereo(&dispatcher, 0.3, &mut MidiEventVec::new());
    assert!(!processed);
    assert!(left.iter().chain(right.iter()).all(|&s| s == 0.3));
}

#[test]
fn test_release_and_prepare_toggle_dispatch() {
    let (mut host, _) = host_with_gain(ControlConfig::default());
    let dispatcher = host.audio_dispatcher();
    assert!(dispatcher.is_active());

    host.release_resources();
    assert!(!dispatcher.is_active());
    assert!(!dispatcher.is_prepared());
    assert!(!process_stereo(&dispatcher, 1.0, &mut MidiEventVec::new()).0);

    host.prepare_to_play(96000.0, 128);
    assert!(dispatcher.is_active());
    assert_eq!(dispatcher.sample_rate(), 96000.0);
    assert_eq!(dispatcher.block_size(), 128);
}

#[test]
fn test_unprepared_host_uses_reference_rate() {
    let (mut host, recording) = recorder_host();

    host.create_plugin_blocking(&PluginDescription::new("recorder", "recorder.gain", ""))
        .unwrap();
    assert_eq!(recording.prepares.lock().unwrap()[0].0, DEFAULT_SAMPLE_RATE);

    host.prepare_to_play(TEST_SAMPLE_RATE, TEST_BLOCK_SIZE);
    assert_eq!(
        recording.prepares.lock().unwrap().last().copied(),
        Some((TEST_SAMPLE_RATE, TEST_BLOCK_SIZE))
    );
}

#[test]
fn test_prepared_host_instantiates_at_live_config() {
    let (mut host, recording) = recorder_host();
    host.prepare_to_play(TEST_SAMPLE_RATE, TEST_BLOCK_SIZE);

    host.create_plugin(PluginDescription::new("recorder", "recorder.gain", ""));
    assert!(wait_for_instance(&mut host, WAIT));

    // Prepared once, at the live configuration
    assert_eq!(
        *recording.prepares.lock().unwrap(),
        vec![(TEST_SAMPLE_RATE, TEST_BLOCK_SIZE)]
    );
}

#[test]
fn test_controller_changes_relayed_as_osc() {
    let config = ControlConfig::default().with_cc_relay(true);
    let (mut host, relay) = host_with_gain(config);
    let dispatcher = host.audio_dispatcher();

    let mut midi = MidiEventVec::new();
    midi.push(MidiEvent::new(0, 0x90, 60, 100));
    midi.push(MidiEvent::controller(3, 1, 7, 100));
    process_stereo(&dispatcher, 0.0, &mut midi);

    host.dispatch_pending();
    let sent = relay.sent();
    assert_eq!(sent.len(), 1);

    let (destination, packet) = &sent[0];
    assert_eq!(*destination, host.control_config().relay_destinations[0]);
    assert_eq!(
        *packet,
        message(
            "/module/0/midi/cc",
            vec![
                hostwrap::control::rosc::OscType::Int(1),
                hostwrap::control::rosc::OscType::Int(7),
                hostwrap::control::rosc::OscType::Int(100),
            ]
        )
    );
}

#[test]
fn test_controller_relay_off_by_default() {
    let (mut host, relay) = host_with_gain(ControlConfig::default());
    let mut midi = MidiEventVec::new();
    midi.push(MidiEvent::controller(0, 0, 1, 64));
    process_stereo(&host.audio_dispatcher(), 0.0, &mut midi);

    host.dispatch_pending();
    assert!(relay.sent().is_empty());
}

#[test]
fn test_audio_thread_never_sees_unprepared_instance() {
    let (mut host, recording) = recorder_host();
    host.prepare_to_play(TEST_SAMPLE_RATE, TEST_BLOCK_SIZE);
    let description = PluginDescription::new("recorder", "recorder.gain", "");
    host.create_plugin_blocking(&description).unwrap();

    let dispatcher = host.audio_dispatcher();
    let stop = Arc::new(AtomicBool::new(false));
    let blocks = Arc::new(AtomicUsize::new(0));
    let audio = {
        let stop = Arc::clone(&stop);
        let blocks = Arc::clone(&blocks);
        thread::spawn(move || {
            while !stop.load(Ordering::Acquire) {
                if process_stereo(&dispatcher, 0.5, &mut MidiEventVec::new()).0 {
                    blocks.fetch_add(1, Ordering::Relaxed);
                }
            }
        })
    };
    while blocks.load(Ordering::Relaxed) == 0 {
        thread::yield_now();
    }

    for i in 0..200 {
        host.create_plugin_blocking(&description).unwrap();
        if i % 10 == 0 {
            host.release_resources();
            host.prepare_to_play(TEST_SAMPLE_RATE, TEST_BLOCK_SIZE);
        }
        if i % 50 == 0 {
            thread::sleep(Duration::from_millis(1));
        }
    }

    stop.store(true, Ordering::Release);
    audio.join().unwrap();
    host.dispatch_pending();

    assert_eq!(recording.unprepared_blocks.load(Ordering::SeqCst), 0);
    assert_eq!(host.manager().retired_count(), 0);
}

#[test]
fn test_layout_rules_without_instance() {
    let (host, _) = test_host(ControlConfig::default());
    let stereo = ChannelSet::stereo();
    let mono = ChannelSet::mono();

    assert!(host.is_layout_supported(&ChannelLayout::stereo()));
    assert!(host.is_layout_supported(&ChannelLayout::new(vec![mono.clone()], vec![mono.clone()])));
    assert!(host.is_layout_supported(&ChannelLayout::new(
        vec![ChannelSet::Disabled],
        vec![stereo.clone()]
    )));
    assert!(host.is_layout_supported(&ChannelLayout::new(vec![], vec![mono.clone()])));

    // Input must match output
    assert!(!host.is_layout_supported(&ChannelLayout::new(vec![mono.clone()], vec![stereo.clone()])));
    // Output must exist and be at most stereo
    assert!(!host.is_layout_supported(&ChannelLayout::new(
        vec![ChannelSet::Disabled],
        vec![ChannelSet::Disabled]
    )));
    assert!(!host.is_layout_supported(&ChannelLayout::new(vec![], vec![])));
    let surround = ChannelSet::discrete(6);
    assert!(!host.is_layout_supported(&ChannelLayout::new(vec![surround.clone()], vec![surround])));
}

#[test]
fn test_layout_left_to_loaded_instance() {
    let (host, _) = host_with_gain(ControlConfig::default());
    let surround = ChannelSet::discrete(6);

    assert!(host.is_layout_supported(&ChannelLayout::new(
        vec![ChannelSet::mono()],
        vec![surround]
    )));
}
