use crate::sink::Sink;
use crate::stats::format_count;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};

pub const COUNT_UP_DURATION: Duration = Duration::from_millis(1000);
pub const FRAME_INTERVAL: Duration = Duration::from_millis(16);

pub fn ease_out_cubic(t: f64) -> f64 {
    1.0 - (1.0 - t).powi(3)
}

/// Cosmetic interpolation of a counter from `start` to `end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountUp {
    pub start: u64,
    pub end: u64,
    pub duration: Duration,
}

impl CountUp {
    pub fn from_zero(end: u64) -> Self {
        Self {
            start: 0,
            end,
            duration: COUNT_UP_DURATION,
        }
    }

    pub fn progress(&self, elapsed: Duration) -> f64 {
        if self.duration.is_zero() {
            return 1.0;
        }
        (elapsed.as_secs_f64() / self.duration.as_secs_f64()).min(1.0)
    }

    pub fn value_at(&self, elapsed: Duration) -> u64 {
        let progress = self.progress(elapsed);
        if progress >= 1.0 {
            return self.end;
        }
        let span = self.end as f64 - self.start as f64;
        (self.start as f64 + span * ease_out_cubic(progress)).floor() as u64
    }
}

/// Writes one formatted frame per tick until the duration has elapsed. The last frame is
/// always `end`.
pub async fn run_count_up(sink: Arc<dyn Sink>, id: String, count_up: CountUp) {
    let started = Instant::now();
    let mut frames = tokio::time::interval(FRAME_INTERVAL);
    frames.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        frames.tick().await;
        let elapsed = started.elapsed();
        sink.set_text(&id, &format_count(count_up.value_at(elapsed)));
        if elapsed >= count_up.duration {
            break;
        }
    }
}
