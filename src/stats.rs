//! Per-call timing and frames-per-second accounting for host loops.

use std::time::{Duration, Instant};

/// Length of one FPS reporting window.
pub const FPS_WINDOW: Duration = Duration::from_secs(1);

/// Counts frames and yields a rate once per [`FPS_WINDOW`].
#[derive(Debug, Clone)]
pub struct FpsCounter {
    window_start: Option<Instant>,
    frames: u32,
}

impl Default for FpsCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl FpsCounter {
    pub fn new() -> Self {
        Self {
            window_start: None,
            frames: 0,
        }
    }

    pub fn tick(&mut self) -> Option<f64> {
        self.tick_at(Instant::now())
    }

    /// Record one frame at `now`. Returns the rate when the current window
    /// has lasted at least one second, then starts a new window.
    pub fn tick_at(&mut self, now: Instant) -> Option<f64> {
        let start = *self.window_start.get_or_insert(now);
        self.frames += 1;

        let elapsed = now.saturating_duration_since(start);
        if elapsed < FPS_WINDOW {
            return None;
        }

        let fps = f64::from(self.frames) / elapsed.as_secs_f64();
        self.frames = 0;
        self.window_start = Some(now);
        Some(fps)
    }
}

/// Measures one processing call.
#[derive(Debug, Clone, Copy)]
pub struct FrameTimer {
    started: Instant,
}

impl FrameTimer {
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
        }
    }

    pub fn start_at(started: Instant) -> Self {
        Self { started }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn elapsed_at(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.started)
    }
}
