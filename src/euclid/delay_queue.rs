//! Notes held back because their delayed start lies beyond the window being scanned.

use crate::event::types::{NoteEvent, ScanWindow};

/// Unordered store of delayed notes, scanned linearly.
///
/// Each entry leaves the queue exactly once, in the first drained window
/// that contains its timestamp. Entries never expire; a rewind past an
/// entry's timestamp strands it.
#[derive(Debug, Default)]
pub struct DelayedEventQueue {
    events: Vec<NoteEvent>,
}

impl DelayedEventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: NoteEvent) {
        self.events.push(event);
    }

    /// Remove and return every note whose timestamp falls in `window`.
    pub fn drain(&mut self, window: ScanWindow) -> Vec<NoteEvent> {
        let mut due = Vec::new();
        let mut i = self.events.len();
        while i > 0 {
            i -= 1;
            if window.contains(self.events[i].timestamp_ticks) {
                due.push(self.events.swap_remove(i));
            }
        }
        due
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Drop every queued note.
    pub fn clear(&mut self) {
        self.events.clear();
    }
}
