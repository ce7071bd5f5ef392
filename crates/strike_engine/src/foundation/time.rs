//! Time management utilities

use std::time::Instant;

/// Largest simulation step the loop will ever hand to a subsystem, in seconds.
pub const DEFAULT_MAX_DELTA: f32 = 0.1;

/// Clamp a raw frame delta into `[0, max_delta]`.
///
/// A single long stall (tab switch, debugger break, pipeline compile) must not
/// turn into an even larger physics or animation jump on the next frame.
/// Non-finite and negative inputs collapse to zero.
pub fn clamp_delta(raw_delta_seconds: f32, max_delta: f32) -> f32 {
    if !raw_delta_seconds.is_finite() || raw_delta_seconds <= 0.0 {
        return 0.0;
    }
    raw_delta_seconds.min(max_delta.max(0.0))
}

/// High-precision timer for frame timing on the host side
pub struct Timer {
    last_frame: Instant,
    delta_time: f32,
    total_time: f32,
    frame_count: u64,
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

impl Timer {
    /// Create a new timer
    pub fn new() -> Self {
        Self {
            last_frame: Instant::now(),
            delta_time: 0.0,
            total_time: 0.0,
            frame_count: 0,
        }
    }

    /// Update the timer (should be called once per presented frame)
    pub fn update(&mut self) -> f32 {
        let now = Instant::now();
        self.delta_time = now.duration_since(self.last_frame).as_secs_f32();
        self.total_time += self.delta_time;
        self.last_frame = now;
        self.frame_count += 1;
        self.delta_time
    }

    /// Get the time since the last frame in seconds
    pub fn delta_time(&self) -> f32 {
        self.delta_time
    }

    /// Get the total elapsed time since timer creation
    pub fn total_time(&self) -> f32 {
        self.total_time
    }

    /// Get the current frame count
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Get the average FPS since timer creation
    pub fn average_fps(&self) -> f32 {
        if self.total_time > 0.0 {
            self.frame_count as f32 / self.total_time
        } else {
            0.0
        }
    }
}

/// Repeating interval timer driven by simulation deltas.
///
/// Unlike [`Timer`] this never reads the wall clock, so spawn pacing and
/// cooldowns stay deterministic under test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntervalTimer {
    interval: f32,
    elapsed: f32,
}

impl IntervalTimer {
    /// Create a timer that becomes ready every `interval` seconds
    pub fn new(interval: f32) -> Self {
        Self {
            interval: interval.max(0.0),
            elapsed: 0.0,
        }
    }

    /// Create a timer that is ready on its first check
    pub fn ready(interval: f32) -> Self {
        let mut timer = Self::new(interval);
        timer.elapsed = timer.interval;
        timer
    }

    /// Advance the timer. Elapsed time saturates at one interval so a long
    /// blocked period yields a single firing, not a burst.
    pub fn advance(&mut self, delta: f32) {
        self.elapsed = (self.elapsed + delta.max(0.0)).min(self.interval);
    }

    /// Whether a full interval has elapsed
    pub fn is_ready(&self) -> bool {
        self.elapsed >= self.interval
    }

    /// Consume one firing
    pub fn consume(&mut self) {
        self.elapsed = 0.0;
    }

    /// Restart from zero
    pub fn reset(&mut self) {
        self.elapsed = 0.0;
    }

    /// Seconds accumulated toward the next firing
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }
}
