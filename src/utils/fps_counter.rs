use std::time::{Duration, Instant};

/// Frame-rate sampler for the uniform block and the metrics overlay.
///
/// Frames are accumulated and the average is published once per sampling
/// window, so the reported value does not flicker from frame to frame.
#[derive(Debug, Clone)]
pub struct FpsCounter {
    last_update: Option<Instant>,
    frame_count: u32,
    accumulated_time: Duration,
    window: Duration,
    pub current_fps: f32,
}

impl Default for FpsCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl FpsCounter {
    #[must_use]
    pub fn new() -> Self {
        Self::with_window(Duration::from_secs(1))
    }

    #[must_use]
    pub fn with_window(window: Duration) -> Self {
        Self {
            last_update: None,
            frame_count: 0,
            accumulated_time: Duration::ZERO,
            window,
            current_fps: 0.0,
        }
    }

    /// Counts one frame against the wall clock.
    pub fn update(&mut self) -> Option<f32> {
        let now = Instant::now();
        let delta = self.last_update.map_or(Duration::ZERO, |last| now - last);
        self.last_update = Some(now);
        self.update_with_delta(delta)
    }

    /// Counts one frame that took `delta`. Returns the new average when a
    /// sampling window closes.
    pub fn update_with_delta(&mut self, delta: Duration) -> Option<f32> {
        self.frame_count += 1;
        self.accumulated_time += delta;

        if self.accumulated_time >= self.window && !self.accumulated_time.is_zero() {
            self.current_fps = self.frame_count as f32 / self.accumulated_time.as_secs_f32();

            self.accumulated_time = Duration::ZERO;
            self.frame_count = 0;

            return Some(self.current_fps);
        }

        None
    }
}
