//! Frames-per-second accounting.

use std::time::{Duration, Instant};

/// Minimum window length before a new FPS figure is published.
const WINDOW: Duration = Duration::from_millis(1000);

// ── FpsCounter ───────────────────────────────────────────────────

/// Windowed frame counter.
///
/// Counts frames rendered strictly since `window_start`; once at
/// least a full window has elapsed the rate is published and the
/// window restarts. A coarse sampled rate, not a sliding average.
#[derive(Debug, Clone)]
pub struct FpsCounter {
    frame_count: u32,
    window_start: Instant,
}

impl FpsCounter {
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    /// Start the first window at `now`. Tests inject time here and in
    /// [`record_at`](Self::record_at).
    pub fn starting_at(now: Instant) -> Self {
        Self {
            frame_count: 0,
            window_start: now,
        }
    }

    /// Count one rendered frame at the current time.
    ///
    /// Returns the new FPS figure when the window closes, `None`
    /// otherwise.
    pub fn record(&mut self) -> Option<u32> {
        self.record_at(Instant::now())
    }

    /// Count one rendered frame at `now`.
    pub fn record_at(&mut self, now: Instant) -> Option<u32> {
        self.frame_count += 1;
        let elapsed = now.saturating_duration_since(self.window_start);
        if elapsed < WINDOW {
            return None;
        }
        let elapsed_ms = elapsed.as_millis() as f64;
        let fps = (self.frame_count as f64 * 1000.0 / elapsed_ms).round() as u32;
        self.frame_count = 0;
        self.window_start = now;
        Some(fps)
    }

    /// Frames counted in the currently open window.
    pub fn pending_frames(&self) -> u32 {
        self.frame_count
    }
}

impl Default for FpsCounter {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ────────────────────────────────────────────────────────
