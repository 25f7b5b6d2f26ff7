//! Sorted event storage answering range scans.
//!
//! Events are kept sorted by timestamp. Scans do not consume anything: a
//! looping transport revisits the same range and must see the same notes
//! again. Batch insertion defers sorting until the next read.

use super::types::{RawEvent, ScanWindow};
use super::EventSource;

/// A sorted timeline of input events.
#[derive(Debug, Default)]
pub struct Timeline {
    events: Vec<RawEvent>,
    dirty: bool,
}

impl Timeline {
    /// Create an empty timeline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a batch of events. Defers sorting until the next read.
    pub fn insert_batch(&mut self, events: impl IntoIterator<Item = RawEvent>) {
        self.events.extend(events);
        self.dirty = true;
    }

    /// Copies of all events with a timestamp in `[window.start, window.end)`, in time order.
    pub fn range(&mut self, window: ScanWindow) -> Vec<RawEvent> {
        self.ensure_sorted();
        let from = self
            .events
            .partition_point(|e| e.timestamp() < window.start);
        let to = self.events.partition_point(|e| e.timestamp() < window.end);
        if from >= to {
            return Vec::new();
        }
        self.events[from..to].to_vec()
    }

    /// Total number of events in the timeline.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the timeline is empty.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Stable sort keeps insertion order for simultaneous events.
    fn ensure_sorted(&mut self) {
        if self.dirty {
            self.events.sort_by_key(RawEvent::timestamp);
            self.dirty = false;
        }
    }
}

impl EventSource for Timeline {
    fn scan(&mut self, window: ScanWindow) -> Vec<RawEvent> {
        self.range(window)
    }
}
