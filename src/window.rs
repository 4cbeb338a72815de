use crate::options::StaggerOptions;
use crate::scheduler::{Generation, TimerId};
use crate::sink::Sink;
use std::time::{Duration, Instant};

/// Point-in-time copy of a logger's window bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSnapshot {
    pub collecting: bool,
    /// Events counted in the open window; stale once `collecting` is false.
    pub event_count: u64,
    pub interval_factor: u32,
    pub interval: Duration,
    pub generation: Generation,
}

/// Everything a staggered logger mutates, guarded as one unit.
pub(crate) struct WindowState {
    pub(crate) sink: Option<Sink>,
    pub(crate) event_count: u64,
    pub(crate) collecting: bool,
    interval_factor: u32,
    generation: Generation,
    started_at: Option<Instant>,
    ended_at: Option<Instant>,
    pub(crate) active_timer: Option<TimerId>,
}

impl WindowState {
    pub(crate) fn new(sink: Option<Sink>) -> Self {
        Self {
            sink,
            event_count: 0,
            collecting: false,
            interval_factor: 1,
            generation: 0,
            started_at: None,
            ended_at: None,
            active_timer: None,
        }
    }

    #[inline]
    pub(crate) fn generation(&self) -> Generation {
        self.generation
    }

    #[inline]
    pub(crate) fn interval_factor(&self) -> u32 {
        self.interval_factor
    }

    /// Opens a window at `now`, first shedding one doubling per full
    /// cooldown of silence since the last window closed.
    ///
    /// Returns the generation to stamp on the timer and the window length.
    pub(crate) fn open(&mut self, now: Instant, options: &StaggerOptions) -> (Generation, Duration) {
        let mut idle = self
            .ended_at
            .map(|ended_at| now.saturating_duration_since(ended_at))
            .unwrap_or(Duration::ZERO);

        self.interval_factor = options.clamp_factor(self.interval_factor);
        while idle > options.cooldown && self.interval_factor > 1 {
            idle -= options.cooldown;
            self.interval_factor -= 1;
        }

        self.event_count = 0;
        self.collecting = true;
        self.started_at = Some(now);
        self.generation += 1;

        (self.generation, options.interval_for(self.interval_factor))
    }

    /// Closes the window at `now` and widens the next one.
    ///
    /// Returns how long the window was open.
    pub(crate) fn close(&mut self, now: Instant, options: &StaggerOptions) -> Duration {
        let elapsed = self
            .started_at
            .map(|started_at| now.saturating_duration_since(started_at))
            .unwrap_or(Duration::ZERO);

        self.collecting = false;
        self.ended_at = Some(now);
        self.interval_factor = options.clamp_factor(self.interval_factor.saturating_add(1));

        elapsed
    }

    /// Backs out of a window whose timer could not be armed.
    pub(crate) fn abandon(&mut self) {
        self.collecting = false;
    }

    pub(crate) fn snapshot(&self, options: &StaggerOptions) -> WindowSnapshot {
        WindowSnapshot {
            collecting: self.collecting,
            event_count: self.event_count,
            interval_factor: self.interval_factor,
            interval: options.interval_for(self.interval_factor),
            generation: self.generation,
        }
    }
}
