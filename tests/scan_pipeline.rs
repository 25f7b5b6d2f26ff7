//! Scan pipeline integration tests — session → transport → event source → processor chain.
//!
//! Everything runs against a simulated 60 Hz clock; no wall-clock time or
//! MIDI hardware is involved.

use assert_approx_eq::assert_approx_eq;

use euclidfx::config::SessionConfig;
use euclidfx::euclid::{EffectTarget, ParamKey};
use euclidfx::event::{
    ticks_to_ms, Beat, EventScheduler, EventSource, NoteEvent, ProcessorId, RawEvent, ScanOutput, ScanWindow, Timeline,
    PPQN,
};

const FRAME: f64 = 1.0 / 60.0;
const FX: ProcessorId = ProcessorId(1);

/// Emits one note on every beat of whatever window it is asked about.
struct Metronome;

impl EventSource for Metronome {
    fn scan(&mut self, window: ScanWindow) -> Vec<RawEvent> {
        let first = window.start.div_ceil(PPQN) * PPQN;
        (first..window.end)
            .step_by(PPQN as usize)
            .map(|t| RawEvent::from(NoteEvent::new(t, 120, 1, 90, 64)))
            .collect()
    }
}

fn session(yaml: &str) -> SessionConfig {
    SessionConfig::from_yaml(yaml).expect("valid session")
}

fn sixteenths(bars: u64) -> Timeline {
    let mut timeline = Timeline::new();
    timeline.insert_batch((0..bars * 16).map(|i| RawEvent::from(NoteEvent::new(i * 120, 60, 1, 80, 60))));
    timeline
}

fn run<S: EventSource>(scheduler: &mut EventScheduler<S>, frames: usize) -> Vec<ScanOutput> {
    (0..frames).filter_map(|_| scheduler.tick(FRAME)).collect()
}

fn notes(scans: &[ScanOutput]) -> Vec<NoteEvent> {
    let mut all: Vec<NoteEvent> = scans.iter().flat_map(|s| s.events.iter().copied()).collect();
    all.sort_by_key(|n| n.timestamp_ticks);
    all
}

// =============================================================================
// Velocity pattern and trace records
// =============================================================================

#[test]
fn velocity_pattern_over_two_bars() {
    let config = session("processors:\n  - id: 1\n    steps: 8\n    pulses: 3\n");
    let mut scheduler = config.scheduler(sixteenths(2));
    scheduler.play();
    let out = notes(&run(&mut scheduler, 300));

    assert_eq!(out.len(), 32);
    for (i, note) in out.iter().enumerate() {
        let expected = if [0, 3, 6].contains(&(i % 8)) { 100 } else { 50 };
        assert_eq!(note.velocity, expected, "note {i}");
    }
}

#[test]
fn trace_records_are_window_relative_milliseconds() {
    let config = session("bpm: 120\nprocessors:\n  - id: 1\n    steps: 8\n    pulses: 3\n");
    let mut scheduler = config.scheduler(sixteenths(1));
    scheduler.play();
    let scans = run(&mut scheduler, 4);
    let first = scans.first().expect("first window dispatched");
    assert_eq!(first.window.start, 0);

    let ms = ticks_to_ms(120.0);
    let records = &first.traces[&FX];
    assert_eq!(records.len(), 2);
    assert_eq!(records[1].step_index, 1);
    assert_approx_eq!(records[0].delay_from_now_to_note_start, 0.0);
    assert_approx_eq!(records[0].delay_from_now_to_note_end, 60.0 * ms);
    assert_approx_eq!(records[1].delay_from_now_to_note_start, 120.0 * ms);
    assert_approx_eq!(records[1].delay_from_now_to_note_end, 180.0 * ms);
}

// =============================================================================
// Delay routing across scans
// =============================================================================

#[test]
fn delayed_notes_are_released_once_in_their_window() {
    let config = session("processors:\n  - id: 1\n    steps: 4\n    pulses: 0\n    target: delay\n    low: 4\n");
    let mut scheduler = config.scheduler(sixteenths(1));
    scheduler.play();
    let scans = run(&mut scheduler, 240);

    let out = notes(&scans);
    let expected: Vec<u64> = (0..16).map(|i| i * 120 + 240).collect();
    assert_eq!(out.iter().map(|n| n.timestamp_ticks).collect::<Vec<_>>(), expected);
    for scan in &scans {
        for note in &scan.events {
            assert!(note.timestamp_ticks <= scan.window.end);
        }
    }
    assert_eq!(scheduler.processor(FX).unwrap().delayed_len(), 0);
}

#[test]
fn rewind_keeps_queued_delayed_notes() {
    let config = session("processors:\n  - id: 1\n    steps: 4\n    pulses: 0\n    target: delay\n    low: 32\n");
    let mut timeline = Timeline::new();
    timeline.insert_batch([RawEvent::from(NoteEvent::new(0, 60, 1, 80, 60))]);
    let mut scheduler = config.scheduler(timeline);
    scheduler.play();

    run(&mut scheduler, 3);
    assert_eq!(scheduler.processor(FX).unwrap().delayed_len(), 1);

    scheduler.rewind();
    assert_eq!(scheduler.processor(FX).unwrap().delayed_len(), 1);

    // the rescanned note is delayed again; both copies surface at one measure
    let out = notes(&run(&mut scheduler, 180));
    assert_eq!(out.len(), 2);
    assert!(out.iter().all(|n| n.timestamp_ticks == 1920));
}

// =============================================================================
// Loop, tempo and live parameter changes
// =============================================================================

#[test]
fn looping_session_repeats_the_bar() {
    let config = session("loop:\n  start_beats: 0\n  end_beats: 4\nprocessors:\n  - id: 1\n    steps: 16\n    pulses: 16\n");
    let mut scheduler = config.scheduler(sixteenths(4));
    scheduler.play();
    let out = notes(&run(&mut scheduler, 420));

    assert!(out.len() > 32, "expected at least two passes, got {}", out.len());
    assert!(out.iter().all(|n| n.timestamp_ticks < 1920));
    assert!(out.iter().all(|n| n.velocity == 100));
}

#[test]
fn looping_session_render_runs_for_requested_beats() {
    let config = session("loop:\n  start_beats: 0\n  end_beats: 4\nprocessors:\n  - id: 1\n    steps: 16\n    pulses: 16\n");
    let mut scheduler = config.scheduler(sixteenths(4));
    let duration = Beat::from_beats(16).to_seconds(scheduler.transport().bpm());
    let scans = scheduler.render(duration, FRAME);

    assert!(!scans.is_empty());
    // four passes over the one-bar loop, plus whatever the lookahead reaches of a fifth
    let out = notes(&scans);
    assert!(out.len() >= 48 && out.len() <= 80, "got {}", out.len());
    assert!(scheduler.transport().position().ticks() < 1920);
}

#[test]
fn tempo_change_rescales_trace_milliseconds() {
    let mut scheduler = EventScheduler::new(120.0, 0.2, Metronome);
    scheduler.add_processor(FX, Default::default());
    scheduler.play();
    let before = run(&mut scheduler, 60);
    assert!(!before.is_empty());

    scheduler.set_bpm(60.0);
    let after = run(&mut scheduler, 240);
    let traced = after.iter().find(|s| !s.traces.is_empty()).expect("a beat after the change");
    let record = traced.traces[&FX][0];
    assert_approx_eq!(
        record.delay_from_now_to_note_end - record.delay_from_now_to_note_start,
        120.0 * ticks_to_ms(60.0)
    );

    let windows: Vec<ScanWindow> = before.iter().chain(&after).map(|s| s.window).collect();
    for pair in windows.windows(2) {
        assert!((pair[0].end as i64 - pair[1].start as i64).abs() <= 1);
    }
}

#[test]
fn metronome_source_feeds_the_chain() {
    let mut scheduler = EventScheduler::new(120.0, 0.2, Metronome);
    scheduler.play();
    let out = notes(&run(&mut scheduler, 130));
    let times: Vec<u64> = out.iter().map(|n| n.timestamp_ticks).collect();
    assert_eq!(&times[..4], &[0, 480, 960, 1440]);
}

#[test]
fn parameter_change_takes_effect_on_following_scans() {
    let config = session("processors:\n  - id: 1\n    steps: 8\n    pulses: 0\n");
    let mut scheduler = config.scheduler(sixteenths(2));
    scheduler.play();
    let early = run(&mut scheduler, 60);
    assert!(notes(&early).iter().all(|n| n.velocity == 50));

    assert!(scheduler.set_param(FX, ParamKey::Pulses, 8.0));
    let late = run(&mut scheduler, 180);
    let late_notes = notes(&late);
    assert!(!late_notes.is_empty());
    assert!(late_notes.iter().all(|n| n.velocity == 100));
    assert_eq!(notes(&early).len() + late_notes.len(), 32);
}

#[test]
fn changes_queued_between_scans_apply_in_order() {
    let config = session("processors:\n  - id: 1\n    steps: 16\n    pulses: 0\n");
    let mut scheduler = config.scheduler(sixteenths(1));
    scheduler.set_param(FX, ParamKey::Steps, 4.0);
    scheduler.set_param(FX, ParamKey::Pulses, 10.0);
    scheduler.play();
    let out = notes(&run(&mut scheduler, 150));

    // pulses capped at the new step count: every note lands on a pulse
    assert_eq!(out.len(), 16);
    assert!(out.iter().all(|n| n.velocity == 100));
    assert_eq!(scheduler.params(FX).unwrap().pulses(), 4);
}

#[test]
fn target_switch_reseeds_and_rewrites_pitch() {
    let config = session("processors:\n  - id: 1\n    steps: 4\n    pulses: 4\n");
    let mut scheduler = config.scheduler(sixteenths(1));
    scheduler.set_param(FX, ParamKey::Target, EffectTarget::Pitch.index() as f64);
    scheduler.play();
    let out = notes(&run(&mut scheduler, 150));

    assert_eq!(out.len(), 16);
    assert!(out.iter().all(|n| n.pitch == 60 && n.velocity == 80));
    assert_eq!(scheduler.params(FX).unwrap().high(), 60.0);
}

#[test]
fn malformed_input_is_dropped_without_breaking_the_scan() {
    let mut timeline = sixteenths(1);
    let mut bend = RawEvent::from(NoteEvent::new(60, 10, 1, 80, 60));
    bend.kind = "pitchbend".to_string();
    timeline.insert_batch([bend]);
    let mut unpitched = RawEvent::from(NoteEvent::new(180, 10, 1, 80, 60));
    unpitched.pitch = None;
    timeline.insert_batch([unpitched]);

    let config = session("processors:\n  - id: 1\n");
    let mut scheduler = config.scheduler(timeline);
    scheduler.play();
    let scans = run(&mut scheduler, 150);
    assert_eq!(notes(&scans).len(), 16);
    let traced: usize = scans.iter().filter_map(|s| s.traces.get(&FX)).map(Vec::len).sum();
    assert_eq!(traced, 16);
}
