use chrono::{Local, NaiveTime, TimeDelta};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Time source for window bookkeeping.
///
/// `now` must be monotonic; `time_of_day` is only used to stamp summary lines.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
    fn time_of_day(&self) -> NaiveTime;
}

/// Monotonic `Instant` plus local wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    #[inline]
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn time_of_day(&self) -> NaiveTime {
        Local::now().time()
    }
}

/// A clock that only moves when told to.
///
/// Monotonic and wall time advance together, so a summary stamped after
/// `advance(d)` shows `start + d` as its time of day.
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    wall_origin: NaiveTime,
    offset: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Arc<Self> {
        Self::starting_at(NaiveTime::MIN)
    }

    pub fn starting_at(wall_origin: NaiveTime) -> Arc<Self> {
        Arc::new(Self {
            origin: Instant::now(),
            wall_origin,
            offset: Mutex::new(Duration::ZERO),
        })
    }

    pub fn advance(&self, by: Duration) {
        let mut offset = self.offset.lock().unwrap_or_else(PoisonError::into_inner);
        *offset += by;
    }

    /// Moves the clock to `origin + offset`. Never moves backwards.
    pub fn set_elapsed(&self, elapsed: Duration) {
        let mut offset = self.offset.lock().unwrap_or_else(PoisonError::into_inner);
        if elapsed > *offset {
            *offset = elapsed;
        }
    }

    /// Time passed since the clock was created.
    pub fn elapsed(&self) -> Duration {
        *self.offset.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + self.elapsed()
    }

    fn time_of_day(&self) -> NaiveTime {
        let delta = TimeDelta::from_std(self.elapsed()).unwrap_or_else(|_| TimeDelta::zero());
        self.wall_origin + delta
    }
}
