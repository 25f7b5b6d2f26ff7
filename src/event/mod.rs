//! Event scheduling — transport scanner, event source and the processor chain.
//!
//! The [`EventScheduler`] is driven by one recurring tick. Each tick it
//! applies pending parameter messages, advances the [`Transport`], and when
//! a scan is due runs the window's events through every processor in order.
//!
//! The scheduler does not own any output device. Each dispatched scan is
//! returned as a [`ScanOutput`] for the caller to forward.

pub mod beat;
pub mod timeline;
pub mod transport;
pub mod types;

pub use beat::{ticks_to_ms, Beat, PPQN, TICKS_PER_MEASURE};
pub use timeline::Timeline;
pub use transport::{PlayState, Transport, DEFAULT_LOOKAHEAD_SECS};
pub use types::{EventError, NoteEvent, ProcessorId, RawEvent, ScanWindow};

use tracing::debug;

use crate::euclid::{EuclidFx, ParamKey, ParamReceiver, ParameterSet, ParameterStore, ScanContext, Traces};

/// Anything that can list the input events inside a scan window.
///
/// Events need not be time-sorted.
pub trait EventSource {
    fn scan(&mut self, window: ScanWindow) -> Vec<RawEvent>;
}

/// The result of one dispatched scan.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanOutput {
    pub window: ScanWindow,
    /// Output of the last processor in the chain.
    pub events: Vec<NoteEvent>,
    /// Trace records of every processor that saw a note this scan.
    pub traces: Traces,
}

/// Drives a transport, an event source and a chain of Euclid FX processors.
pub struct EventScheduler<S: EventSource> {
    transport: Transport,
    source: S,
    processors: Vec<EuclidFx>,
    store: ParameterStore,
    param_rx: ParamReceiver,
}

impl<S: EventSource> EventScheduler<S> {
    /// Create a scheduler with a stopped transport and no processors.
    pub fn new(bpm: f64, lookahead_secs: f64, source: S) -> Self {
        let mut store = ParameterStore::new();
        let param_rx = store.subscribe();
        Self {
            transport: Transport::new(bpm, lookahead_secs),
            source,
            processors: Vec::new(),
            store,
            param_rx,
        }
    }

    /// Append a processor to the end of the chain.
    pub fn add_processor(&mut self, id: ProcessorId, params: ParameterSet) {
        let fx = EuclidFx::new(id, params);
        self.store.sync(id, fx.params().clone());
        debug!(processor = %id, "processor added");
        self.processors.push(fx);
    }

    pub fn processors(&self) -> &[EuclidFx] {
        &self.processors
    }

    pub fn processor(&self, id: ProcessorId) -> Option<&EuclidFx> {
        self.processors.iter().find(|fx| fx.id() == id)
    }

    /// Change a processor parameter. Takes effect before the next scan.
    pub fn set_param(&mut self, id: ProcessorId, key: ParamKey, value: f64) -> bool {
        self.store.change(id, key, value)
    }

    /// Replace a processor's parameters. Takes effect before the next scan.
    pub fn recreate_params(&mut self, id: ProcessorId, params: ParameterSet) {
        self.store.recreate(id, params);
    }

    /// Current parameters as held by the store.
    pub fn params(&self, id: ProcessorId) -> Option<&ParameterSet> {
        self.store.get(id)
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut Transport {
        &mut self.transport
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    pub fn play(&mut self) {
        self.transport.start();
    }

    pub fn pause(&mut self) {
        self.transport.pause();
    }

    /// Rewind the transport. Delayed notes stay queued.
    pub fn rewind(&mut self) {
        self.transport.rewind();
    }

    pub fn set_bpm(&mut self, bpm: f64) {
        self.transport.set_bpm(bpm);
    }

    /// Run one scheduling tick. Returns the scan dispatched during it, if any.
    pub fn tick(&mut self, elapsed_secs: f64) -> Option<ScanOutput> {
        self.apply_param_messages();
        let window = self.transport.tick(elapsed_secs)?;
        Some(self.scan(window))
    }

    /// Play for `duration_secs` of simulated time, ticking every `frame_secs`.
    ///
    /// The run is bounded by elapsed time rather than playhead position, so
    /// it ends even when a loop keeps the playhead short of any target.
    pub fn render(&mut self, duration_secs: f64, frame_secs: f64) -> Vec<ScanOutput> {
        if frame_secs <= 0.0 {
            return Vec::new();
        }
        let frames = (duration_secs.max(0.0) / frame_secs).ceil() as usize;
        self.play();
        (0..frames).filter_map(|_| self.tick(frame_secs)).collect()
    }

    /// Apply queued parameter messages and write derived values back to the store.
    pub fn apply_param_messages(&mut self) {
        for message in self.param_rx.drain() {
            for fx in &mut self.processors {
                if let Some(derived) = fx.handle(&message) {
                    self.store.sync(fx.id(), derived);
                }
            }
        }
    }

    /// Run one window through the chain.
    pub fn scan(&mut self, window: ScanWindow) -> ScanOutput {
        let ctx = ScanContext {
            window,
            ticks_to_ms: ticks_to_ms(self.transport.bpm()),
        };
        let mut traces = Traces::new();
        let mut input = self.source.scan(window);
        let mut events: Vec<NoteEvent> = input
            .iter()
            .filter_map(|raw| NoteEvent::try_from(raw).ok())
            .collect();

        for fx in &mut self.processors {
            events = fx.process(&ctx, &input, &mut traces).to_vec();
            input = events.iter().copied().map(RawEvent::from).collect();
        }

        ScanOutput {
            window,
            events,
            traces,
        }
    }
}
