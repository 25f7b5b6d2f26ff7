//! Processor parameters: identity, bounds and the full set a processor reads.
//!
//! Every parameter is a number with `min`, `max` and `default`. Itemized
//! parameters (`target`, `mode`, `is_triplets`) store their variant index.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::settings::{EffectMode, EffectTarget};

/// Parameter identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKey {
    Steps,
    Pulses,
    Rotation,
    IsTriplets,
    Rate,
    Low,
    High,
    Target,
    Mode,
}

impl ParamKey {
    pub const ALL: [ParamKey; 9] = [
        ParamKey::Steps,
        ParamKey::Pulses,
        ParamKey::Rotation,
        ParamKey::IsTriplets,
        ParamKey::Rate,
        ParamKey::Low,
        ParamKey::High,
        ParamKey::Target,
        ParamKey::Mode,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ParamKey::Steps => "steps",
            ParamKey::Pulses => "pulses",
            ParamKey::Rotation => "rotation",
            ParamKey::IsTriplets => "is_triplets",
            ParamKey::Rate => "rate",
            ParamKey::Low => "low",
            ParamKey::High => "high",
            ParamKey::Target => "target",
            ParamKey::Mode => "mode",
        }
    }
}

impl fmt::Display for ParamKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParamKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| format!("unknown parameter '{s}'"))
    }
}

/// A single bounded numeric parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Parameter {
    pub key: ParamKey,
    pub value: f64,
    pub min: f64,
    pub max: f64,
    pub default: f64,
}

impl Parameter {
    /// Create a parameter at its default value.
    pub fn new(key: ParamKey, default: f64, min: f64, max: f64) -> Self {
        Self {
            key,
            value: default.clamp(min, max),
            min,
            max,
            default,
        }
    }

    /// Set the value, clamped into `[min, max]`.
    pub fn set(&mut self, value: f64) {
        self.value = value.clamp(self.min, self.max);
    }

    /// Replace the bounds and pull the current value into them.
    /// An inverted range collapses onto `min`.
    pub fn set_range(&mut self, min: f64, max: f64) {
        self.min = min;
        self.max = max.max(min);
        self.set(self.value);
    }

    pub fn is_default(&self) -> bool {
        self.value == self.default
    }
}

/// Every parameter of one Euclid FX processor.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSet {
    pub steps: Parameter,
    pub pulses: Parameter,
    pub rotation: Parameter,
    pub is_triplets: Parameter,
    pub rate: Parameter,
    pub low: Parameter,
    pub high: Parameter,
    pub target: Parameter,
    pub mode: Parameter,
}

/// Longest pattern a processor accepts.
pub const MAX_STEPS: f64 = 64.0;

impl Default for ParameterSet {
    fn default() -> Self {
        Self {
            steps: Parameter::new(ParamKey::Steps, 16.0, 1.0, MAX_STEPS),
            pulses: Parameter::new(ParamKey::Pulses, 4.0, 0.0, 16.0),
            rotation: Parameter::new(ParamKey::Rotation, 0.0, 0.0, 15.0),
            is_triplets: Parameter::new(ParamKey::IsTriplets, 0.0, 0.0, 1.0),
            // quarter notes per step
            rate: Parameter::new(ParamKey::Rate, 0.25, 0.0625, 4.0),
            low: Parameter::new(ParamKey::Low, 50.0, 0.0, 127.0),
            high: Parameter::new(ParamKey::High, 100.0, 0.0, 127.0),
            target: Parameter::new(
                ParamKey::Target,
                EffectTarget::Velocity.index() as f64,
                0.0,
                (EffectTarget::ALL.len() - 1) as f64,
            ),
            mode: Parameter::new(ParamKey::Mode, EffectMode::Absolute.index() as f64, 0.0, 1.0),
        }
    }
}

impl ParameterSet {
    pub fn get(&self, key: ParamKey) -> &Parameter {
        match key {
            ParamKey::Steps => &self.steps,
            ParamKey::Pulses => &self.pulses,
            ParamKey::Rotation => &self.rotation,
            ParamKey::IsTriplets => &self.is_triplets,
            ParamKey::Rate => &self.rate,
            ParamKey::Low => &self.low,
            ParamKey::High => &self.high,
            ParamKey::Target => &self.target,
            ParamKey::Mode => &self.mode,
        }
    }

    pub fn get_mut(&mut self, key: ParamKey) -> &mut Parameter {
        match key {
            ParamKey::Steps => &mut self.steps,
            ParamKey::Pulses => &mut self.pulses,
            ParamKey::Rotation => &mut self.rotation,
            ParamKey::IsTriplets => &mut self.is_triplets,
            ParamKey::Rate => &mut self.rate,
            ParamKey::Low => &mut self.low,
            ParamKey::High => &mut self.high,
            ParamKey::Target => &mut self.target,
            ParamKey::Mode => &mut self.mode,
        }
    }

    /// Set a value, clamped into the parameter's current bounds.
    pub fn set(&mut self, key: ParamKey, value: f64) {
        self.get_mut(key).set(value);
    }

    pub fn steps(&self) -> usize {
        self.steps.value.round().max(0.0) as usize
    }

    pub fn pulses(&self) -> usize {
        self.pulses.value.round().max(0.0) as usize
    }

    pub fn rotation(&self) -> i64 {
        self.rotation.value.round() as i64
    }

    pub fn is_triplets(&self) -> bool {
        self.is_triplets.value >= 0.5
    }

    /// Quarter notes per step.
    pub fn rate(&self) -> f64 {
        self.rate.value
    }

    pub fn low(&self) -> f64 {
        self.low.value
    }

    pub fn high(&self) -> f64 {
        self.high.value
    }

    pub fn target(&self) -> EffectTarget {
        EffectTarget::from_index(self.target.value.round().max(0.0) as usize)
    }

    pub fn mode(&self) -> EffectMode {
        EffectMode::from_index(self.mode.value.round().max(0.0) as usize)
    }

    /// Relative mode is any mode other than the parameter's default.
    pub fn is_relative(&self) -> bool {
        !self.mode.is_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let p = ParameterSet::default();
        assert_eq!(p.steps(), 16);
        assert_eq!(p.pulses(), 4);
        assert_eq!(p.rotation(), 0);
        assert!(!p.is_triplets());
        assert_eq!(p.target(), EffectTarget::Velocity);
        assert_eq!(p.mode(), EffectMode::Absolute);
        assert!(!p.is_relative());
    }

    #[test]
    fn set_clamps_into_range() {
        let mut p = ParameterSet::default();
        p.set(ParamKey::Pulses, 40.0);
        assert_eq!(p.pulses(), 16);
        p.set(ParamKey::Low, -5.0);
        assert_eq!(p.low(), 0.0);
    }

    #[test]
    fn set_range_pulls_value_inside() {
        let mut param = Parameter::new(ParamKey::Rotation, 0.0, 0.0, 15.0);
        param.set(12.0);
        param.set_range(0.0, 7.0);
        assert_eq!(param.value, 7.0);
    }

    #[test]
    fn inverted_range_collapses_to_min() {
        let mut param = Parameter::new(ParamKey::Rotation, 0.0, 0.0, 15.0);
        param.set_range(0.0, -1.0);
        assert_eq!((param.min, param.max, param.value), (0.0, 0.0, 0.0));
    }

    #[test]
    fn mode_other_than_default_is_relative() {
        let mut p = ParameterSet::default();
        p.set(ParamKey::Mode, EffectMode::Relative.index() as f64);
        assert!(p.is_relative());
        assert_eq!(p.mode(), EffectMode::Relative);
    }

    #[test]
    fn key_lookup_matches_fields() {
        let p = ParameterSet::default();
        for key in ParamKey::ALL {
            assert_eq!(p.get(key).key, key);
            assert_eq!(key.as_str().parse::<ParamKey>(), Ok(key));
        }
    }
}
