//! Effect targets and the value ranges they impose on the `low`/`high` parameters.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The note property an effect rewrites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EffectTarget {
    #[default]
    Velocity,
    Pitch,
    Channel,
    Length,
    Delay,
    /// Reserved for output routing; applying it leaves notes untouched.
    Output,
}

impl EffectTarget {
    pub const ALL: [EffectTarget; 6] = [
        EffectTarget::Velocity,
        EffectTarget::Pitch,
        EffectTarget::Channel,
        EffectTarget::Length,
        EffectTarget::Delay,
        EffectTarget::Output,
    ];

    /// Position in [`EffectTarget::ALL`]; the value stored in the `target` parameter.
    pub fn index(self) -> usize {
        Self::ALL.iter().position(|&t| t == self).unwrap_or(0)
    }

    /// Inverse of [`EffectTarget::index`]; out-of-range values clamp to the last target.
    pub fn from_index(index: usize) -> Self {
        Self::ALL[index.min(Self::ALL.len() - 1)]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EffectTarget::Velocity => "velocity",
            EffectTarget::Pitch => "pitch",
            EffectTarget::Channel => "channel",
            EffectTarget::Length => "length",
            EffectTarget::Delay => "delay",
            EffectTarget::Output => "output",
        }
    }
}

impl fmt::Display for EffectTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EffectTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown effect target '{s}'"))
    }
}

/// How the effect value combines with the note's own value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EffectMode {
    /// Replace the note's value.
    #[default]
    Absolute,
    /// Add to the note's value.
    Relative,
}

impl EffectMode {
    pub fn index(self) -> usize {
        match self {
            EffectMode::Absolute => 0,
            EffectMode::Relative => 1,
        }
    }

    pub fn from_index(index: usize) -> Self {
        if index == 0 {
            EffectMode::Absolute
        } else {
            EffectMode::Relative
        }
    }
}

impl FromStr for EffectMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "absolute" => Ok(EffectMode::Absolute),
            "relative" => Ok(EffectMode::Relative),
            other => Err(format!("unknown effect mode '{other}'")),
        }
    }
}

/// Range and seed values for `low`/`high` under a given target and mode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectSettings {
    pub min: f64,
    pub max: f64,
    pub low_default: f64,
    pub high_default: f64,
}

impl EffectSettings {
    /// Derive the settings for `target`. Defaults are already clamped into range.
    pub fn derive(target: EffectTarget, relative: bool) -> Self {
        let (min, max, low, high) = match (target, relative) {
            (EffectTarget::Velocity, false) => (0.0, 127.0, 50.0, 100.0),
            (EffectTarget::Velocity, true) => (-127.0, 127.0, 0.0, 0.0),
            (EffectTarget::Pitch, false) => (0.0, 127.0, 58.0, 60.0),
            (EffectTarget::Pitch, true) => (-127.0, 127.0, 0.0, 0.0),
            (EffectTarget::Channel, false) => (1.0, 16.0, 1.0, 2.0),
            (EffectTarget::Channel, true) => (-16.0, 16.0, 0.0, 0.0),
            (EffectTarget::Length, false) => (0.0, 32.0, 4.0, 8.0),
            (EffectTarget::Length, true) => (-32.0, 32.0, 0.0, 0.0),
            // delay never goes negative, relative or not
            (EffectTarget::Delay, false) => (0.0, 32.0, 0.0, 2.0),
            (EffectTarget::Delay, true) => (0.0, 32.0, 0.0, 0.0),
            (EffectTarget::Output, _) => (1.0, 2.0, 1.0, 2.0),
        };
        Self {
            min,
            max,
            low_default: f64::clamp(low, min, max),
            high_default: f64::clamp(high, min, max),
        }
    }
}
