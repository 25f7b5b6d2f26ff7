//! Euclidean-rhythm MIDI effect: pattern generation, parameters and the processor.

pub mod delay_queue;
pub mod params;
pub mod pattern;
pub mod processor;
pub mod settings;
pub mod store;

pub use delay_queue::DelayedEventQueue;
pub use params::{ParamKey, Parameter, ParameterSet};
pub use processor::{apply_effect, DelayRouting, EuclidFx, LocalWindow, ScanContext, TraceRecord, Traces};
pub use settings::{EffectMode, EffectSettings, EffectTarget};
pub use store::{param_channel, ParamMessage, ParamReceiver, ParamSender, ParameterStore};
