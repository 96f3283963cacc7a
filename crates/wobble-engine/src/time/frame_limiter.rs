use std::time::{Duration, Instant};

/// Paces redraws to a target frame rate.
///
/// Deadlines advance by whole frame periods so the average rate does not drift
/// with callback jitter. After a stall that skips past the next deadline, the
/// schedule restarts from the current time instead of bursting to catch up.
#[derive(Debug, Clone)]
pub struct FrameLimiter {
    period: Option<Duration>,
    next: Option<Instant>,
}

impl FrameLimiter {
    /// Creates a limiter for `fps` frames per second. `0` disables pacing.
    pub fn new(fps: u32) -> Self {
        let period = (fps > 0).then(|| Duration::from_secs_f64(1.0 / f64::from(fps)));
        Self { period, next: None }
    }

    /// Returns whether a frame may be drawn at `now`.
    pub fn is_due(&self, now: Instant) -> bool {
        match (self.period, self.next) {
            (Some(_), Some(next)) => now >= next,
            _ => true,
        }
    }

    /// Returns the instant the next frame becomes due.
    ///
    /// `None` when pacing is disabled or no frame has been drawn yet.
    pub fn deadline(&self) -> Option<Instant> {
        self.period.and(self.next)
    }

    /// Records that a frame was drawn at `now` and schedules the next one.
    pub fn mark(&mut self, now: Instant) {
        let Some(period) = self.period else { return };

        let next = match self.next {
            Some(prev) => prev + period,
            None => now + period,
        };

        self.next = Some(if next <= now { now + period } else { next });
    }
}
