//! Transport scanner — play/pause control and the forward-moving lookahead window.
//!
//! The transport keeps its playhead, scan window and loop points in seconds
//! and advances them once per scheduling tick. Windows are handed out in
//! ticks, converted with the tempo current at dispatch time.
//!
//! A tick does two things, in order:
//! 1. If a scan is pending, hand out the current window and clear the flag.
//! 2. Move the window: jump back across the loop if `loop_end` falls inside
//!    the next lookahead horizon, otherwise advance `scan_start = scan_end`
//!    once the playhead is within [`SCAN_THRESHOLD_SECS`] of `scan_end`.

use tracing::{debug, trace};

use super::beat::Beat;
use super::types::ScanWindow;

/// Advance the window when less than this much time remains before its end.
/// One 60 Hz frame.
pub const SCAN_THRESHOLD_SECS: f64 = 0.0167;

/// Default scan window width.
pub const DEFAULT_LOOKAHEAD_SECS: f64 = 0.2;

/// Playback state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayState {
    Stopped,
    Running,
}

/// Lookahead transport: owns the scan window, loop bounds and tempo.
#[derive(Debug)]
pub struct Transport {
    bpm: f64,
    state: PlayState,
    lookahead: f64,
    /// Playhead in seconds from timeline start.
    position: f64,
    scan_start: f64,
    scan_end: f64,
    loop_start: f64,
    loop_end: f64,
    looping: bool,
    needs_scan: bool,
}

impl Transport {
    /// Create a stopped transport at position zero with an empty scan window.
    pub fn new(bpm: f64, lookahead_secs: f64) -> Self {
        Self {
            bpm,
            state: PlayState::Stopped,
            lookahead: lookahead_secs,
            position: 0.0,
            scan_start: 0.0,
            scan_end: 0.0,
            loop_start: 0.0,
            loop_end: 0.0,
            looping: false,
            needs_scan: false,
        }
    }

    /// Start playback. Takes effect on the next tick.
    pub fn start(&mut self) {
        self.state = PlayState::Running;
    }

    /// Pause playback. Takes effect on the next tick.
    pub fn pause(&mut self) {
        self.state = PlayState::Stopped;
    }

    /// Reset the playhead and scan window to zero, in any state.
    ///
    /// Delayed notes already queued by processors are left alone.
    pub fn rewind(&mut self) {
        self.position = 0.0;
        self.set_scan_range(0.0);
        debug!("transport rewound");
    }

    /// Current play state.
    pub fn state(&self) -> PlayState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == PlayState::Running
    }

    /// Current tempo.
    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    /// Change tempo. Loop points, playhead and window are rescaled by
    /// `old / new` so they stay at the same musical position.
    pub fn set_bpm(&mut self, bpm: f64) {
        if bpm <= 0.0 || bpm == self.bpm {
            return;
        }
        let factor = self.bpm / bpm;
        self.loop_start *= factor;
        self.loop_end *= factor;
        self.position *= factor;
        self.scan_start *= factor;
        self.scan_end *= factor;
        debug!(old = self.bpm, new = bpm, factor, "tempo changed");
        self.bpm = bpm;
    }

    /// Scan window width in seconds.
    pub fn lookahead(&self) -> f64 {
        self.lookahead
    }

    /// Playhead position in ticks.
    pub fn position(&self) -> Beat {
        Beat::from_seconds(self.position, self.bpm)
    }

    /// The current scan window in ticks.
    pub fn scan_window(&self) -> ScanWindow {
        ScanWindow::new(
            Beat::from_seconds(self.scan_start, self.bpm).ticks(),
            Beat::from_seconds(self.scan_end, self.bpm).ticks(),
        )
    }

    /// Whether a scan of the current window is waiting to be dispatched.
    pub fn needs_scan(&self) -> bool {
        self.needs_scan
    }

    /// Enable or disable looping.
    pub fn set_loop(&mut self, enabled: bool) {
        self.looping = enabled;
    }

    /// Set loop start in musical time.
    pub fn set_loop_start(&mut self, position: Beat) {
        self.loop_start = position.to_seconds(self.bpm);
    }

    /// Set loop end in musical time.
    pub fn set_loop_end(&mut self, position: Beat) {
        self.loop_end = position.to_seconds(self.bpm);
    }

    /// Loop bounds in musical time.
    pub fn loop_range(&self) -> (Beat, Beat) {
        (
            Beat::from_seconds(self.loop_start, self.bpm),
            Beat::from_seconds(self.loop_end, self.bpm),
        )
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    /// Run one scheduling tick after `elapsed_secs` of wall-clock time.
    ///
    /// Returns the window to scan if one was pending. Returns `None` while
    /// stopped.
    pub fn tick(&mut self, elapsed_secs: f64) -> Option<ScanWindow> {
        if self.state == PlayState::Stopped {
            return None;
        }

        let pending = if self.needs_scan {
            self.needs_scan = false;
            Some(self.scan_window())
        } else {
            None
        };

        self.position += elapsed_secs.max(0.0);
        if self.loop_active() {
            let length = self.loop_end - self.loop_start;
            if self.position >= self.loop_end {
                self.position = self.loop_start + (self.position - self.loop_end) % length;
            }
        }

        if self.loop_active() && self.loop_end < self.scan_end + self.lookahead {
            let start = (self.loop_start + (self.loop_end - self.scan_end - self.lookahead)).max(0.0);
            debug!(from = self.scan_end, to = start, "scan window jumps back across loop");
            self.set_scan_range(start);
        } else if self.time_until_scan_end() < SCAN_THRESHOLD_SECS {
            self.set_scan_range(self.scan_end);
        }

        pending
    }

    fn set_scan_range(&mut self, start: f64) {
        self.scan_start = start;
        self.scan_end = start + self.lookahead;
        self.needs_scan = true;
        trace!(start = self.scan_start, end = self.scan_end, "scan range set");
    }

    fn loop_active(&self) -> bool {
        self.looping && self.loop_end > self.loop_start
    }

    /// Seconds of playback left before the playhead reaches `scan_end`,
    /// measured across the loop boundary when the window has already wrapped.
    fn time_until_scan_end(&self) -> f64 {
        if self.scan_end >= self.position {
            return self.scan_end - self.position;
        }
        if self.loop_active() && self.scan_end >= self.loop_start {
            return (self.loop_end - self.position).max(0.0) + (self.scan_end - self.loop_start);
        }
        self.scan_end - self.position
    }
}
