//! Euclid FX — rewrites or delays notes according to a rotating Euclidean pattern.
//!
//! Each scan the processor maps every incoming note's timestamp onto a step
//! of the pattern, picks the `high` value on pulses and `low` on rests, and
//! applies it to one note property. Notes pushed past the end of the scan
//! window by the delay effect are parked in a [`DelayedEventQueue`] and
//! released by the first later scan whose window contains them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::delay_queue::DelayedEventQueue;
use super::params::{ParamKey, ParameterSet};
use super::pattern;
use super::settings::{EffectSettings, EffectTarget};
use super::store::ParamMessage;
use crate::event::beat::{units_to_ticks, PPQN};
use crate::event::types::{clamp_channel, clamp_midi, NoteEvent, ProcessorId, RawEvent, ScanWindow};

/// Per-note display record for the UI, in milliseconds relative to the window start.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TraceRecord {
    pub step_index: usize,
    pub delay_from_now_to_note_start: f64,
    pub delay_from_now_to_note_end: f64,
}

/// Trace records of one scan, keyed by processor.
pub type Traces = BTreeMap<ProcessorId, Vec<TraceRecord>>;

/// Timing of the scan being processed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanContext {
    pub window: ScanWindow,
    /// Duration of one tick in ms. Only used for trace records.
    pub ticks_to_ms: f64,
}

/// Where a note goes after the effect is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelayRouting {
    /// Output during this scan.
    Immediate(NoteEvent),
    /// Start lies beyond the window; hold until a later scan reaches it.
    Delayed(NoteEvent),
}

/// The scan window expressed in the pattern's own cyclic time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LocalWindow {
    Contiguous { start: f64, end: f64 },
    /// The window crosses the end of the pattern: `[tail_start, duration)` then `[0, head_end)`.
    Wrapped {
        tail_start: f64,
        duration: f64,
        head_end: f64,
    },
}

impl LocalWindow {
    /// `None` when the pattern has no length.
    pub fn new(window: ScanWindow, pattern_duration: f64) -> Option<Self> {
        if pattern_duration <= 0.0 {
            return None;
        }
        let start = window.start as f64 % pattern_duration;
        let end = window.end as f64 % pattern_duration;
        Some(if start > end {
            LocalWindow::Wrapped {
                tail_start: start,
                duration: pattern_duration,
                head_end: end,
            }
        } else {
            LocalWindow::Contiguous { start, end }
        })
    }

    pub fn is_wrapped(&self) -> bool {
        matches!(self, LocalWindow::Wrapped { .. })
    }
}

/// A Euclidean-rhythm MIDI effect processor.
#[derive(Debug)]
pub struct EuclidFx {
    id: ProcessorId,
    params: ParameterSet,
    /// Unrotated pattern, kept so rotation changes don't regenerate.
    base_pattern: Vec<bool>,
    pattern: Vec<bool>,
    step_duration: f64,
    pattern_duration: f64,
    delayed: DelayedEventQueue,
    output: Vec<NoteEvent>,
}

impl EuclidFx {
    /// Create a processor and derive its pattern, timing and effect range.
    pub fn new(id: ProcessorId, params: ParameterSet) -> Self {
        let mut fx = Self {
            id,
            params,
            base_pattern: Vec::new(),
            pattern: Vec::new(),
            step_duration: 0.0,
            pattern_duration: 0.0,
            delayed: DelayedEventQueue::new(),
            output: Vec::new(),
        };
        fx.rederive();
        fx
    }

    pub fn id(&self) -> ProcessorId {
        self.id
    }

    pub fn params(&self) -> &ParameterSet {
        &self.params
    }

    /// The rotated pattern in effect.
    pub fn pattern(&self) -> &[bool] {
        &self.pattern
    }

    /// Ticks per step.
    pub fn step_duration(&self) -> f64 {
        self.step_duration
    }

    /// Ticks per pattern cycle.
    pub fn pattern_duration(&self) -> f64 {
        self.pattern_duration
    }

    /// Output of the last scan.
    pub fn output(&self) -> &[NoteEvent] {
        &self.output
    }

    /// Number of notes waiting in the delay queue.
    pub fn delayed_len(&self) -> usize {
        self.delayed.len()
    }

    /// Drop queued delayed notes and the last output.
    pub fn reset(&mut self) {
        self.delayed.clear();
        self.output.clear();
    }

    /// React to a parameter message.
    ///
    /// Messages for other processors are ignored. A change only carries its
    /// own value; it is clamped against the bounds this processor derived so
    /// far, since the snapshot may predate earlier queued changes. Returns
    /// the processor's parameters when they differ from the message snapshot
    /// and the store should adopt them.
    pub fn handle(&mut self, message: &ParamMessage) -> Option<ParameterSet> {
        if message.processor_id() != self.id {
            return None;
        }
        let incoming = match message {
            ParamMessage::Changed {
                key, value, params, ..
            } => {
                self.params.set(*key, *value);
                self.react(*key);
                params
            }
            ParamMessage::Recreated { params, .. } => {
                self.params = params.clone();
                self.rederive();
                params
            }
        };
        (self.params != *incoming).then(|| self.params.clone())
    }

    fn react(&mut self, key: ParamKey) {
        debug!(processor = %self.id, %key, "reacting to parameter change");
        match key {
            ParamKey::Steps => {
                self.rebound_pulses_and_rotation();
                self.regenerate();
                self.update_durations();
            }
            ParamKey::Pulses => self.regenerate(),
            ParamKey::Rotation => self.rerotate(),
            ParamKey::IsTriplets | ParamKey::Rate => self.update_durations(),
            ParamKey::Low | ParamKey::High => {}
            ParamKey::Target | ParamKey::Mode => self.update_effect_settings(),
        }
    }

    /// Full derivation from the current snapshot, as for a steps plus target change.
    fn rederive(&mut self) {
        self.rebound_pulses_and_rotation();
        self.regenerate();
        self.update_durations();
        self.update_effect_settings();
    }

    fn rebound_pulses_and_rotation(&mut self) {
        let steps = self.params.steps() as f64;
        self.params.pulses.set_range(0.0, steps);
        self.params.rotation.set_range(0.0, (steps - 1.0).max(0.0));
    }

    fn regenerate(&mut self) {
        self.base_pattern = pattern::generate(self.params.steps(), self.params.pulses());
        self.rerotate();
    }

    fn rerotate(&mut self) {
        self.pattern = pattern::rotate(&self.base_pattern, self.params.rotation());
        trace!(processor = %self.id, pattern = %pattern::to_ascii(&self.pattern), "pattern updated");
    }

    fn update_durations(&mut self) {
        let straight = self.params.rate() * PPQN as f64;
        self.step_duration = if self.params.is_triplets() {
            straight * 2.0 / 3.0
        } else {
            straight
        };
        self.pattern_duration = self.params.steps() as f64 * self.step_duration;
    }

    fn update_effect_settings(&mut self) {
        let settings = EffectSettings::derive(self.params.target(), self.params.is_relative());
        for param in [&mut self.params.low, &mut self.params.high] {
            param.set_range(settings.min, settings.max);
        }
        self.params.low.set(settings.low_default);
        self.params.high.set(settings.high_default);
    }

    /// Pattern step a timestamp falls on, regardless of how many cycles have elapsed.
    pub fn step_index(&self, timestamp_ticks: u64) -> Option<usize> {
        if self.pattern.is_empty() || self.pattern_duration <= 0.0 {
            return None;
        }
        let local = timestamp_ticks as f64 % self.pattern_duration;
        let index = (local / self.step_duration).floor() as usize;
        Some(index.min(self.pattern.len() - 1))
    }

    /// Process one scan window.
    ///
    /// Malformed inputs are skipped without a trace. Delayed notes that fall
    /// due in this window are appended after the directly processed ones.
    pub fn process(&mut self, ctx: &ScanContext, input: &[RawEvent], traces: &mut Traces) -> &[NoteEvent] {
        self.output.clear();
        traces.remove(&self.id);

        if input.is_empty() {
            self.release_delayed(ctx.window);
            return &self.output;
        }

        if let Some(local) = LocalWindow::new(ctx.window, self.pattern_duration) {
            trace!(processor = %self.id, ?local, wrapped = local.is_wrapped(), "scanning pattern window");
        }

        let target = self.params.target();
        let relative = self.params.is_relative();
        for raw in input {
            let note = match NoteEvent::try_from(raw) {
                Ok(note) => note,
                Err(err) => {
                    trace!(processor = %self.id, %err, "skipping input event");
                    continue;
                }
            };

            let step_index = self.step_index(note.timestamp_ticks);
            let on_pulse = step_index.is_some_and(|i| self.pattern[i]);
            let value = if on_pulse {
                self.params.high()
            } else {
                self.params.low()
            };

            let routing = apply_effect(note, target, relative, value, ctx.window);
            let shown = match routing {
                DelayRouting::Immediate(n) => n,
                DelayRouting::Delayed(_) => note,
            };
            let start_ms = (shown.timestamp_ticks as f64 - ctx.window.start as f64) * ctx.ticks_to_ms;
            traces.entry(self.id).or_default().push(TraceRecord {
                step_index: step_index.unwrap_or(0),
                delay_from_now_to_note_start: start_ms,
                delay_from_now_to_note_end: start_ms + shown.duration_ticks as f64 * ctx.ticks_to_ms,
            });

            match routing {
                DelayRouting::Immediate(n) => self.output.push(n),
                DelayRouting::Delayed(n) => {
                    trace!(processor = %self.id, at = n.timestamp_ticks, "note delayed past window");
                    self.delayed.push(n);
                }
            }
        }

        self.release_delayed(ctx.window);
        &self.output
    }

    fn release_delayed(&mut self, window: ScanWindow) {
        let due = self.delayed.drain(window);
        self.output.extend(due);
    }
}

/// Apply an effect value to one note property and decide its routing.
pub fn apply_effect(
    mut note: NoteEvent,
    target: EffectTarget,
    relative: bool,
    value: f64,
    window: ScanWindow,
) -> DelayRouting {
    let amount = value.round() as i64;
    let combine = |current: u8| if relative { current as i64 + amount } else { amount };
    match target {
        EffectTarget::Velocity => note.velocity = clamp_midi(combine(note.velocity)),
        EffectTarget::Pitch => note.pitch = clamp_midi(combine(note.pitch)),
        EffectTarget::Channel => note.channel = clamp_channel(combine(note.channel)),
        EffectTarget::Length => {
            let ticks = units_to_ticks(value);
            let duration = if relative {
                note.duration_ticks as f64 + ticks
            } else {
                ticks
            };
            note.duration_ticks = duration.round().max(1.0) as u64;
        }
        EffectTarget::Delay => {
            if value > 0.0 {
                let delay = units_to_ticks(value).max(0.0).round() as u64;
                let shifted = note.timestamp_ticks.saturating_add(delay);
                if shifted > window.end {
                    return DelayRouting::Delayed(NoteEvent {
                        timestamp_ticks: shifted,
                        ..note
                    });
                }
                note.timestamp_ticks = shifted;
            }
        }
        EffectTarget::Output => {}
    }
    DelayRouting::Immediate(note)
}
