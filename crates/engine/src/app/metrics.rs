use std::time::{Duration, Instant};

/// Averages over one stats window, shown by the F3 overlay and logged.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LoopStats {
    pub fps: f32,
    pub tps: f32,
    pub frame_time_ms: f32,
    /// Ticks thrown away by the per-frame tick cap.
    pub dropped_ticks: u32,
}

/// Counts frames and ticks until the window length elapses, then reports and resets.
#[derive(Debug)]
pub(crate) struct StatsWindow {
    opened_at: Instant,
    length: Duration,
    frames: u32,
    ticks: u32,
    dropped_ticks: u32,
    frame_time: Duration,
}

impl StatsWindow {
    pub(crate) fn open(length: Duration, now: Instant) -> Self {
        Self {
            opened_at: now,
            length,
            frames: 0,
            ticks: 0,
            dropped_ticks: 0,
            frame_time: Duration::ZERO,
        }
    }

    pub(crate) fn count_frame(&mut self, frame_dt: Duration) {
        self.frames = self.frames.saturating_add(1);
        self.frame_time = self.frame_time.saturating_add(frame_dt);
    }

    pub(crate) fn count_tick(&mut self) {
        self.ticks = self.ticks.saturating_add(1);
    }

    /// Whole ticks only; a partial remainder is not a lost tick.
    pub(crate) fn count_dropped(&mut self, backlog: Duration, fixed_dt: Duration) {
        let Some(whole) = backlog.as_nanos().checked_div(fixed_dt.as_nanos()) else {
            return;
        };
        let whole = u32::try_from(whole).unwrap_or(u32::MAX);
        self.dropped_ticks = self.dropped_ticks.saturating_add(whole);
    }

    pub(crate) fn close_if_due(&mut self, now: Instant) -> Option<LoopStats> {
        let elapsed = now.saturating_duration_since(self.opened_at);
        if elapsed < self.length {
            return None;
        }

        let seconds = elapsed.as_secs_f32().max(f32::EPSILON);
        let frame_time_ms = match self.frames {
            0 => 0.0,
            frames => self.frame_time.as_secs_f32() * 1000.0 / frames as f32,
        };
        let stats = LoopStats {
            fps: self.frames as f32 / seconds,
            tps: self.ticks as f32 / seconds,
            frame_time_ms,
            dropped_ticks: self.dropped_ticks,
        };
        *self = Self::open(self.length, now);
        Some(stats)
    }
}
