use std::collections::VecDeque;
use std::time::{Duration, Instant};

const FPS_WINDOW: usize = 10;

/// Measures the achieved frame rate over the most recent frames.
#[derive(Debug, Default)]
pub struct FrameClock {
    frames: VecDeque<Instant>,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_frame(&mut self, now: Instant) {
        if self.frames.len() == FPS_WINDOW {
            self.frames.pop_front();
        }
        self.frames.push_back(now);
    }

    /// Frames per second across the recorded window, 0 until two frames
    /// have been seen.
    pub fn fps(&self) -> f32 {
        let (Some(first), Some(last)) = (self.frames.front(), self.frames.back()) else {
            return 0.0;
        };
        let span = last.saturating_duration_since(*first).as_secs_f32();
        if span <= f32::EPSILON {
            return 0.0;
        }
        (self.frames.len() - 1) as f32 / span
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LoopMetricsSnapshot {
    pub fps: f32,
    pub frame_time_ms: f32,
}

#[derive(Debug)]
pub(crate) struct MetricsAccumulator {
    interval_start: Instant,
    interval: Duration,
    frames: u32,
    frame_time_sum: Duration,
}

impl MetricsAccumulator {
    pub(crate) fn new(interval: Duration, now: Instant) -> Self {
        Self {
            interval_start: now,
            interval,
            frames: 0,
            frame_time_sum: Duration::ZERO,
        }
    }

    pub(crate) fn record_frame(&mut self, frame_dt: Duration) {
        self.frames = self.frames.saturating_add(1);
        self.frame_time_sum = self.frame_time_sum.saturating_add(frame_dt);
    }

    pub(crate) fn maybe_snapshot(&mut self, now: Instant) -> Option<LoopMetricsSnapshot> {
        let elapsed = now.saturating_duration_since(self.interval_start);
        if elapsed < self.interval {
            return None;
        }

        let elapsed_seconds = elapsed.as_secs_f32().max(f32::EPSILON);
        let frame_time_ms = if self.frames == 0 {
            0.0
        } else {
            (self.frame_time_sum.as_secs_f32() / self.frames as f32) * 1000.0
        };
        let snapshot = LoopMetricsSnapshot {
            fps: self.frames as f32 / elapsed_seconds,
            frame_time_ms,
        };

        self.interval_start = now;
        self.frames = 0;
        self.frame_time_sum = Duration::ZERO;
        Some(snapshot)
    }
}

pub(crate) fn normalize_non_zero_duration(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}

pub(crate) fn target_frame_duration(fps: u32) -> Duration {
    Duration::from_secs_f64(1.0 / fps.max(1) as f64)
}

pub(crate) fn compute_cap_sleep(elapsed: Duration, target: Duration) -> Duration {
    target.saturating_sub(elapsed)
}
