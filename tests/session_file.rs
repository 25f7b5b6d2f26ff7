//! Session file integration tests — YAML on disk through to a running scheduler.

use std::fs;

use euclidfx::config::{ConfigError, SessionConfig};
use euclidfx::euclid::{EffectMode, EffectTarget};
use euclidfx::event::{NoteEvent, ProcessorId, RawEvent, Timeline};

const SESSION: &str = r#"
bpm: 96
lookahead_secs: 0.1
processors:
  - id: 1
    steps: 8
    pulses: 8
    target: pitch
    mode: relative
    high: 12
  - id: 2
    steps: 8
    pulses: 8
    target: channel
    high: 10
"#;

#[test]
fn session_file_drives_a_chain() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.yaml");
    fs::write(&path, SESSION).unwrap();

    let config = SessionConfig::load_from(&path).unwrap();
    assert_eq!(config.processors[0].mode, EffectMode::Relative);
    assert_eq!(config.processors[1].target, EffectTarget::Channel);

    let mut timeline = Timeline::new();
    timeline.insert_batch((0..8).map(|i| RawEvent::from(NoteEvent::new(i * 120, 60, 1, 80, 48))));
    let mut scheduler = config.scheduler(timeline);
    assert_eq!(scheduler.transport().bpm(), 96.0);

    scheduler.play();
    let out: Vec<NoteEvent> = (0..200)
        .filter_map(|_| scheduler.tick(1.0 / 60.0))
        .flat_map(|scan| scan.events)
        .collect();

    assert_eq!(out.len(), 8);
    // pitch shifted up an octave, then routed to channel 10
    assert!(out.iter().all(|n| n.pitch == 60 && n.channel == 10));
    assert_eq!(scheduler.params(ProcessorId(2)).unwrap().high(), 10.0);
}

#[test]
fn saved_session_loads_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.yaml");
    let config = SessionConfig::from_yaml(SESSION).unwrap();
    fs::write(&path, config.to_yaml().unwrap()).unwrap();
    assert_eq!(SessionConfig::load_from(&path).unwrap(), config);
}

#[test]
fn invalid_session_file_reports_reason() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.yaml");
    fs::write(&path, "bpm: 120\nprocessors:\n  - id: 5\n  - id: 5\n").unwrap();
    let err = SessionConfig::load_from(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
    assert!(err.to_string().contains("duplicate processor id 5"));
}
