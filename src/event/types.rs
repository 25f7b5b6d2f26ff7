//! Event data model — note events, their loosely typed wire form, and scan windows.
//!
//! Upstream sources hand the core [`RawEvent`]s. Only well-formed `"note"`
//! events become [`NoteEvent`]s; everything else is rejected with an
//! [`EventError`] that the processor drops silently.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifies a processor instance. Keys parameter messages and trace records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProcessorId(pub u32);

impl std::fmt::Display for ProcessorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The only event type the processors act on.
pub const NOTE_TYPE: &str = "note";

/// A MIDI note with start time and duration in ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteEvent {
    pub timestamp_ticks: u64,
    /// Always at least 1.
    pub duration_ticks: u64,
    /// 1–16.
    pub channel: u8,
    /// 0–127.
    pub velocity: u8,
    /// 0–127.
    pub pitch: u8,
}

impl NoteEvent {
    /// Create a note, clamping every field into its legal range.
    pub fn new(timestamp_ticks: u64, duration_ticks: u64, channel: i64, velocity: i64, pitch: i64) -> Self {
        Self {
            timestamp_ticks,
            duration_ticks: duration_ticks.max(1),
            channel: clamp_channel(channel),
            velocity: clamp_midi(velocity),
            pitch: clamp_midi(pitch),
        }
    }

    /// End of the note in ticks.
    pub fn end_ticks(&self) -> u64 {
        self.timestamp_ticks.saturating_add(self.duration_ticks)
    }
}

/// Clamp to the 7-bit MIDI data range.
pub fn clamp_midi(value: i64) -> u8 {
    value.clamp(0, 127) as u8
}

/// Clamp to the 1-based MIDI channel range.
pub fn clamp_channel(value: i64) -> u8 {
    value.clamp(1, 16) as u8
}

/// Why a [`RawEvent`] could not become a [`NoteEvent`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventError {
    #[error("unsupported event type '{0}'")]
    UnsupportedType(String),

    #[error("note event is missing '{0}'")]
    MissingField(&'static str),
}

/// An input event as delivered by a source or loaded from a file.
///
/// Every field besides the type is optional so that incomplete events can be
/// represented and rejected instead of failing deserialization of a whole batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEvent {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp_ticks: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ticks: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub velocity: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pitch: Option<i64>,
}

impl RawEvent {
    /// Timestamp used for ordering and range scans; events without one sort first.
    pub fn timestamp(&self) -> u64 {
        self.timestamp_ticks.unwrap_or(0)
    }
}

impl From<NoteEvent> for RawEvent {
    fn from(note: NoteEvent) -> Self {
        Self {
            kind: NOTE_TYPE.to_string(),
            timestamp_ticks: Some(note.timestamp_ticks),
            duration_ticks: Some(note.duration_ticks),
            channel: Some(note.channel as i64),
            velocity: Some(note.velocity as i64),
            pitch: Some(note.pitch as i64),
        }
    }
}

impl TryFrom<&RawEvent> for NoteEvent {
    type Error = EventError;

    fn try_from(raw: &RawEvent) -> Result<Self, Self::Error> {
        if raw.kind != NOTE_TYPE {
            return Err(EventError::UnsupportedType(raw.kind.clone()));
        }
        let timestamp = raw
            .timestamp_ticks
            .ok_or(EventError::MissingField("timestamp_ticks"))?;
        let duration = raw
            .duration_ticks
            .ok_or(EventError::MissingField("duration_ticks"))?;
        let channel = raw.channel.ok_or(EventError::MissingField("channel"))?;
        let velocity = raw.velocity.ok_or(EventError::MissingField("velocity"))?;
        let pitch = raw.pitch.ok_or(EventError::MissingField("pitch"))?;
        Ok(NoteEvent::new(timestamp, duration, channel, velocity, pitch))
    }
}

/// Half-open tick interval `[start, end)` being scanned for events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScanWindow {
    pub start: u64,
    pub end: u64,
}

impl ScanWindow {
    pub fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    /// Whether `ticks` falls inside the window.
    pub fn contains(&self, ticks: u64) -> bool {
        self.start <= ticks && ticks < self.end
    }

    /// Width of the window in ticks.
    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}
