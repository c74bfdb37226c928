//! State document integration tests
//!
//! Save on one host, load on another: identity, parameters, bus layout and
//! host settings must all survive.

use crate::helpers::tolerances::FLOAT_EPSILON;
use crate::helpers::*;
use hostwrap::plugin::reconcile::snapshot;
use hostwrap::prelude::*;
use hostwrap::Error;

fn layout(host: &HostProcessor) -> ChannelLayout {
    host.manager()
        .with_instance(|inst| snapshot(inst))
        .expect("no instance")
}

#[test]
fn test_save_load_roundtrip() {
    let (mut source, _) = host_with_gain(ControlConfig::default());
    source.set_parameter_by_name("gain", 0.8);
    source.set_parameter_by_name("pan", 0.3);
    source.set_ui_size(640, 480);
    source.set_instance_number(2);
    source.settings_mut().osc_port = 9200;

    let saved = source.save_state().unwrap();

    let (mut target, _) = test_host(ControlConfig::default());
    target.load_state(&saved).unwrap();

    assert_eq!(target.description(), source.description());
    approx::assert_abs_diff_eq!(
        target.get_parameter_by_name("gain").unwrap(),
        0.8,
        epsilon = FLOAT_EPSILON
    );
    approx::assert_abs_diff_eq!(
        target.get_parameter_by_name("pan").unwrap(),
        0.3,
        epsilon = FLOAT_EPSILON
    );
    assert_eq!(target.settings(), source.settings());
    assert!(target.audio_dispatcher().is_active());
}

#[test]
fn test_layout_survives_roundtrip() {
    let (source, _) = host_with_gain(ControlConfig::default());
    source.manager().with_instance(|inst| {
        assert!(inst.add_bus(BusDirection::Input));
        assert!(inst.set_channel_set(BusDirection::Input, 1, &ChannelSet::mono()));
        assert!(inst.set_channel_set(BusDirection::Output, 0, &ChannelSet::Disabled));
    });
    let expected = layout(&source);
    assert_eq!(expected.bus_count(BusDirection::Input), 2);

    let saved = source.save_state().unwrap();
    let (mut target, _) = test_host(ControlConfig::default());
    target.load_state(&saved).unwrap();

    let restored = layout(&target);
    assert_eq!(restored, expected);
    assert_eq!(restored.outputs[0].to_abbreviated(), "disabled");
    assert_eq!(restored.inputs[1].to_abbreviated(), "C");
}

#[test]
fn test_save_without_instance_has_settings_only() {
    let (host, _) = test_host(ControlConfig::default());
    let saved = host.save_state().unwrap();
    let json = String::from_utf8(saved.clone()).unwrap();
    assert!(!json.contains("wrappedInstance"));

    let (mut target, _) = host_with_gain(ControlConfig::default());
    target.load_state(&saved).unwrap();
    // No record: the current instance stays
    assert!(target.has_instance());
}

#[test]
fn test_malformed_document_changes_nothing() {
    let (mut host, _) = host_with_gain(ControlConfig::default());
    host.set_parameter_by_name("gain", 0.3);
    host.set_ui_size(500, 300);
    let before = host.settings().clone();

    assert!(matches!(host.load_state(b"{\"uiWidth\": "), Err(Error::State(_))));

    let bad_blob = br#"{"uiWidth": 900, "wrappedInstance": {
        "description": {"format": "builtin", "uniqueId": "builtin.gain", "path": ""},
        "state": "%%%"
    }}"#;
    assert!(matches!(host.load_state(bad_blob), Err(Error::State(_))));

    assert_eq!(host.settings(), &before);
    assert_eq!(host.get_parameter_by_name("gain"), Some(0.3));
}

#[test]
fn test_unknown_format_applies_settings_keeps_instance() {
    let (mut host, _) = host_with_gain(ControlConfig::default());
    host.set_parameter_by_name("gain", 0.3);

    let document = br#"{"uiWidth": 10, "uiHeight": 700, "instanceNumber": 7,
        "wrappedInstance": {
            "description": {"format": "vst3", "uniqueId": "com.example.gone", "path": "/gone.vst3"},
            "state": ""
        }}"#;
    let err = host.load_state(document).unwrap_err();
    assert!(err.is_instantiation());

    assert_eq!(host.settings().ui_size(), (400, 700));
    assert_eq!(host.settings().instance_number, 7);
    assert_eq!(host.description(), Some(GainPlugin::description_template()));
    assert_eq!(host.get_parameter_by_name("gain"), Some(0.3));
    assert!(host
        .notifications()
        .any(|n| matches!(n, HostNotification::InstantiationFailed { .. })));
}

#[test]
fn test_rejected_state_blob_still_installs() {
    let (mut host, _) = test_host(ControlConfig::default());
    // Valid base64, wrong length for the gain plugin
    let document = br#"{"wrappedInstance": {
        "description": {"format": "builtin", "uniqueId": "builtin.gain", "path": ""},
        "state": "AAEC"
    }}"#;
    host.load_state(document).unwrap();

    assert!(host.has_instance());
    assert_eq!(host.get_parameter_by_name("gain"), Some(0.5));
}

#[test]
fn test_load_before_prepare_then_prepare() {
    let (source, _) = host_with_gain(ControlConfig::default());
    let saved = source.save_state().unwrap();

    let (mut host, _) = test_host(ControlConfig::default());
    host.load_state(&saved).unwrap();
    host.prepare_to_play(TEST_SAMPLE_RATE, TEST_BLOCK_SIZE);

    let dispatcher = host.audio_dispatcher();
    let (processed, left, _) = process_stereo(&dispatcher, 0.5, &mut MidiEventVec::new());
    assert!(processed);
    approx::assert_abs_diff_eq!(left[0], 0.5, epsilon = FLOAT_EPSILON);
}
