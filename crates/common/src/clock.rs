//! Timing utilities for interactive editing and export progress.
//!
//! Drag and resize gestures produce pointer updates far faster than the
//! timeline needs to be recomputed. [`UpdateThrottle`] caps the rate at
//! which those updates are applied while guaranteeing that the most recent
//! value is never lost. [`format_timemark`] renders seconds in the
//! `HH:MM:SS.cc` form the transcoding engine reports.

use std::time::Instant;

/// A monotonic clock anchored to the moment it was created.
#[derive(Debug, Clone, Copy)]
pub struct SessionClock {
    epoch: Instant,
}

impl SessionClock {
    /// Create a clock anchored to now.
    pub fn start() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }

    /// Nanoseconds elapsed since the clock started.
    pub fn elapsed_ns(&self) -> u64 {
        self.epoch.elapsed().as_nanos() as u64
    }
}

impl Default for SessionClock {
    fn default() -> Self {
        Self::start()
    }
}

/// Rate limiter for a stream of updates that keeps the latest value.
///
/// The first offered value passes immediately. Subsequent values arriving
/// before the interval elapses are held as pending; a later `offer` or a
/// `flush` releases the newest pending value.
#[derive(Debug)]
pub struct UpdateThrottle<T> {
    interval_ns: u64,
    last_emit_ns: Option<u64>,
    pending: Option<T>,
}

impl<T> UpdateThrottle<T> {
    /// Create a throttle targeting the given rate. A rate of zero disables throttling.
    pub fn new(target_hz: u32) -> Self {
        let interval_ns = if target_hz == 0 {
            0
        } else {
            1_000_000_000 / target_hz as u64
        };
        Self {
            interval_ns,
            last_emit_ns: None,
            pending: None,
        }
    }

    /// Offer a value observed at `now_ns`.
    ///
    /// Returns the value to apply now, if any. When the interval has not
    /// elapsed the value replaces any earlier pending value.
    pub fn offer(&mut self, value: T, now_ns: u64) -> Option<T> {
        let ready = match self.last_emit_ns {
            None => true,
            Some(last) => now_ns >= last.saturating_add(self.interval_ns),
        };
        if ready {
            self.last_emit_ns = Some(now_ns);
            self.pending = None;
            Some(value)
        } else {
            self.pending = Some(value);
            None
        }
    }

    /// Release the pending value regardless of timing.
    pub fn flush(&mut self) -> Option<T> {
        self.pending.take()
    }

    /// Whether a value is waiting to be applied.
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }
}

/// Format seconds as `HH:MM:SS.cc`.
pub fn format_timemark(secs: f64) -> String {
    let secs = if secs.is_finite() { secs.max(0.0) } else { 0.0 };
    let total_cs = (secs * 100.0).round() as u64;
    let cs = total_cs % 100;
    let total_s = total_cs / 100;
    format!(
        "{:02}:{:02}:{:02}.{:02}",
        total_s / 3600,
        (total_s / 60) % 60,
        total_s % 60,
        cs
    )
}
