//! Musical time in integer ticks.
//!
//! All event timestamps are ticks at [`PPQN`] resolution. Conversion to and
//! from wall-clock seconds happens only at the transport boundary, using the
//! current tempo.

use std::cmp::Ordering;

/// Ticks per quarter note.
pub const PPQN: u64 = 480;

/// Beats in one measure.
pub const BEATS_PER_MEASURE: u64 = 4;

/// Ticks in one measure (`PPQN * 4`). Length and delay effects express
/// their values as 32nds of this.
pub const TICKS_PER_MEASURE: u64 = PPQN * BEATS_PER_MEASURE;

/// Number of effect units in one measure for the length and delay targets.
pub const UNITS_PER_MEASURE: f64 = 32.0;

/// Musical time measured in integer ticks at [`PPQN`] resolution.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Default)]
pub struct Beat {
    ticks: u64,
}

impl Beat {
    /// Zero time — the very start of the timeline.
    pub const ZERO: Beat = Beat { ticks: 0 };

    /// Create a `Beat` from a raw tick count.
    pub fn from_ticks(ticks: u64) -> Self {
        Self { ticks }
    }

    /// Create a `Beat` from whole beats (quarter notes).
    pub fn from_beats(beats: u32) -> Self {
        Self {
            ticks: beats as u64 * PPQN,
        }
    }

    /// Create a `Beat` from a fractional beat value (e.g. 1.5 = one and a half beats).
    /// Negative values clamp to zero.
    pub fn from_beats_f64(beats: f64) -> Self {
        Self {
            ticks: (beats.max(0.0) * PPQN as f64).round() as u64,
        }
    }

    /// Create a `Beat` from seconds since timeline start at the given tempo.
    ///
    /// Rounds down, so contiguous second ranges map to contiguous tick ranges.
    pub fn from_seconds(seconds: f64, bpm: f64) -> Self {
        Self {
            ticks: (seconds.max(0.0) * ticks_per_second(bpm)).floor() as u64,
        }
    }

    /// Return the raw tick count.
    pub fn ticks(self) -> u64 {
        self.ticks
    }

    /// Seconds from timeline start at the given tempo.
    pub fn to_seconds(self, bpm: f64) -> f64 {
        self.ticks as f64 / ticks_per_second(bpm)
    }
}

/// Ticks elapsing per second at `bpm`.
pub fn ticks_per_second(bpm: f64) -> f64 {
    bpm / 60.0 * PPQN as f64
}

/// Duration of one tick in milliseconds at `bpm`.
pub fn ticks_to_ms(bpm: f64) -> f64 {
    60_000.0 / (bpm * PPQN as f64)
}

/// Convert a value in 32nds of a measure to ticks.
pub fn units_to_ticks(units: f64) -> f64 {
    units / UNITS_PER_MEASURE * TICKS_PER_MEASURE as f64
}

impl Ord for Beat {
    fn cmp(&self, other: &Self) -> Ordering {
        self.ticks.cmp(&other.ticks)
    }
}

impl PartialOrd for Beat {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
