//! Session configuration — tempo, loop and processor chain loaded from ~/.euclidfx/session.yaml.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::euclid::{EffectMode, EffectTarget, ParamKey, ParameterSet};
use crate::event::{Beat, EventScheduler, EventSource, ProcessorId, DEFAULT_LOOKAHEAD_SECS};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid session yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid session: {0}")]
    Invalid(String),
}

/// Loop points in beats.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoopConfig {
    pub start_beats: f64,
    pub end_beats: f64,
}

/// Initial parameters of one processor in the chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessorConfig {
    pub id: u32,
    #[serde(default = "ProcessorConfig::default_steps")]
    pub steps: u32,
    #[serde(default = "ProcessorConfig::default_pulses")]
    pub pulses: u32,
    #[serde(default)]
    pub rotation: u32,
    /// Quarter notes per step.
    #[serde(default = "ProcessorConfig::default_rate")]
    pub rate: f64,
    #[serde(default)]
    pub triplets: bool,
    #[serde(default)]
    pub target: EffectTarget,
    #[serde(default)]
    pub mode: EffectMode,
    /// Overrides the target's seeded rest value.
    #[serde(default)]
    pub low: Option<f64>,
    /// Overrides the target's seeded pulse value.
    #[serde(default)]
    pub high: Option<f64>,
}

impl ProcessorConfig {
    fn default_steps() -> u32 {
        16
    }

    fn default_pulses() -> u32 {
        4
    }

    fn default_rate() -> f64 {
        0.25
    }

    pub fn processor_id(&self) -> ProcessorId {
        ProcessorId(self.id)
    }

    /// Parameter snapshot for this processor. `low`/`high` are left to the
    /// processor, which seeds them from the target.
    pub fn params(&self) -> ParameterSet {
        let mut params = ParameterSet::default();
        let steps = self.steps as f64;
        params.set(ParamKey::Steps, steps);
        params.pulses.set_range(0.0, params.steps() as f64);
        params.rotation.set_range(0.0, (params.steps() as f64 - 1.0).max(0.0));
        params.set(ParamKey::Pulses, self.pulses as f64);
        params.set(ParamKey::Rotation, self.rotation as f64);
        params.set(ParamKey::Rate, self.rate);
        params.set(ParamKey::IsTriplets, if self.triplets { 1.0 } else { 0.0 });
        params.set(ParamKey::Target, self.target.index() as f64);
        params.set(ParamKey::Mode, self.mode.index() as f64);
        params
    }
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            id: 1,
            steps: Self::default_steps(),
            pulses: Self::default_pulses(),
            rotation: 0,
            rate: Self::default_rate(),
            triplets: false,
            target: EffectTarget::default(),
            mode: EffectMode::default(),
            low: None,
            high: None,
        }
    }
}

/// A complete session: transport settings plus the processor chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "SessionConfig::default_bpm")]
    pub bpm: f64,
    #[serde(default = "SessionConfig::default_lookahead")]
    pub lookahead_secs: f64,
    #[serde(default, rename = "loop")]
    pub loop_range: Option<LoopConfig>,
    #[serde(default = "SessionConfig::default_processors")]
    pub processors: Vec<ProcessorConfig>,
}

impl SessionConfig {
    fn default_bpm() -> f64 {
        120.0
    }

    fn default_lookahead() -> f64 {
        DEFAULT_LOOKAHEAD_SECS
    }

    fn default_processors() -> Vec<ProcessorConfig> {
        vec![ProcessorConfig::default()]
    }

    /// Standard location, `~/.euclidfx/session.yaml`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".euclidfx").join("session.yaml"))
    }

    /// Load from the standard path. Returns None if the file is missing or invalid.
    pub fn load() -> Option<Self> {
        let path = Self::default_path()?;
        Self::load_from(&path).ok()
    }

    /// Load and validate a session file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_yaml(&content)?;
        debug!(path = %path.display(), processors = config.processors.len(), "session loaded");
        Ok(config)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bpm.is_nan() || self.bpm <= 0.0 {
            return Err(ConfigError::Invalid(format!("bpm must be positive, got {}", self.bpm)));
        }
        if self.lookahead_secs.is_nan() || self.lookahead_secs <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "lookahead_secs must be positive, got {}",
                self.lookahead_secs
            )));
        }
        if let Some(range) = self.loop_range {
            if range.start_beats < 0.0 || range.end_beats <= range.start_beats {
                return Err(ConfigError::Invalid(format!(
                    "loop end ({}) must lie after loop start ({})",
                    range.end_beats, range.start_beats
                )));
            }
        }
        let mut seen = BTreeSet::new();
        for processor in &self.processors {
            if !seen.insert(processor.id) {
                return Err(ConfigError::Invalid(format!("duplicate processor id {}", processor.id)));
            }
        }
        Ok(())
    }

    /// Build a stopped scheduler for this session around `source`.
    ///
    /// `low`/`high` overrides go through the parameter store, so they land
    /// after the processor seeded its own values and before the first scan.
    pub fn scheduler<S: EventSource>(&self, source: S) -> EventScheduler<S> {
        let mut scheduler = EventScheduler::new(self.bpm, self.lookahead_secs, source);
        if let Some(range) = self.loop_range {
            let transport = scheduler.transport_mut();
            transport.set_loop_start(Beat::from_beats_f64(range.start_beats));
            transport.set_loop_end(Beat::from_beats_f64(range.end_beats));
            transport.set_loop(true);
        }
        for processor in &self.processors {
            let id = processor.processor_id();
            scheduler.add_processor(id, processor.params());
            if let Some(low) = processor.low {
                scheduler.set_param(id, ParamKey::Low, low);
            }
            if let Some(high) = processor.high {
                scheduler.set_param(id, ParamKey::High, high);
            }
        }
        scheduler
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            bpm: Self::default_bpm(),
            lookahead_secs: Self::default_lookahead(),
            loop_range: None,
            processors: Self::default_processors(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Timeline;
    use std::io::Write;

    #[test]
    fn default_session() {
        let config = SessionConfig::default();
        assert_eq!(config.bpm, 120.0);
        assert_eq!(config.lookahead_secs, 0.2);
        assert!(config.loop_range.is_none());
        assert_eq!(config.processors.len(), 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn missing_fields_take_defaults() {
        let config = SessionConfig::from_yaml("bpm: 90\n").unwrap();
        assert_eq!(config.bpm, 90.0);
        assert_eq!(config.processors, vec![ProcessorConfig::default()]);
    }

    #[test]
    fn custom_session_deserialize() {
        let yaml = r#"
bpm: 100
lookahead_secs: 0.1
loop:
  start_beats: 0
  end_beats: 8
processors:
  - id: 1
    steps: 8
    pulses: 3
    target: pitch
    mode: relative
    high: 12
  - id: 2
    steps: 5
    pulses: 2
    rotation: 1
    rate: 0.5
    triplets: true
    target: delay
"#;
        let config = SessionConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.loop_range.unwrap().end_beats, 8.0);
        assert_eq!(config.processors[0].target, EffectTarget::Pitch);
        assert_eq!(config.processors[0].mode, EffectMode::Relative);
        assert_eq!(config.processors[0].high, Some(12.0));
        assert!(config.processors[1].triplets);
    }

    #[test]
    fn rejects_bad_values() {
        for yaml in [
            "bpm: 0",
            "bpm: -5",
            "lookahead_secs: 0",
            "loop: { start_beats: 4, end_beats: 2 }",
            "processors: [{ id: 1 }, { id: 1 }]",
        ] {
            let err = SessionConfig::from_yaml(yaml).unwrap_err();
            assert!(matches!(err, ConfigError::Invalid(_)), "{yaml}: {err}");
        }
    }

    #[test]
    fn malformed_yaml_is_a_yaml_error() {
        let err = SessionConfig::from_yaml("processors: [ {").unwrap_err();
        assert!(matches!(err, ConfigError::Yaml(_)));
    }

    #[test]
    fn params_respect_pattern_bounds() {
        let processor = ProcessorConfig {
            steps: 5,
            pulses: 9,
            rotation: 7,
            ..ProcessorConfig::default()
        };
        let params = processor.params();
        assert_eq!(params.steps(), 5);
        assert_eq!(params.pulses(), 5);
        assert_eq!(params.rotation(), 4);
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "bpm: 140\nprocessors:\n  - id: 3\n    steps: 12").unwrap();
        let config = SessionConfig::load_from(file.path()).unwrap();
        assert_eq!(config.bpm, 140.0);
        assert_eq!(config.processors[0].processor_id(), ProcessorId(3));
    }

    #[test]
    fn load_from_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = SessionConfig::load_from(&dir.path().join("absent.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn yaml_roundtrip() {
        let config = SessionConfig {
            loop_range: Some(LoopConfig {
                start_beats: 2.0,
                end_beats: 6.0,
            }),
            ..SessionConfig::default()
        };
        let yaml = config.to_yaml().unwrap();
        assert_eq!(SessionConfig::from_yaml(&yaml).unwrap(), config);
    }

    #[test]
    fn scheduler_applies_overrides_before_first_scan() {
        let yaml = r#"
processors:
  - id: 4
    steps: 8
    pulses: 3
    target: pitch
    low: 40
    high: 72
"#;
        let config = SessionConfig::from_yaml(yaml).unwrap();
        let mut scheduler = config.scheduler(Timeline::new());
        scheduler.apply_param_messages();
        let fx = scheduler.processor(ProcessorId(4)).unwrap();
        assert_eq!((fx.params().low(), fx.params().high()), (40.0, 72.0));
        assert_eq!(fx.params().target(), EffectTarget::Pitch);
    }

    #[test]
    fn scheduler_sets_loop() {
        let config = SessionConfig {
            loop_range: Some(LoopConfig {
                start_beats: 4.0,
                end_beats: 8.0,
            }),
            ..SessionConfig::default()
        };
        let scheduler = config.scheduler(Timeline::new());
        let transport = scheduler.transport();
        assert!(transport.is_looping());
        let (start, end) = transport.loop_range();
        assert!((start.ticks() as i64 - 1920).abs() <= 1);
        assert!((end.ticks() as i64 - 3840).abs() <= 1);
    }
}
