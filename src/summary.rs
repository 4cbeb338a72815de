use chrono::NaiveTime;
use std::fmt;
use std::time::Duration;

/// One coalesced report: `<HH:MM:SS>: <message> (<count> times in <ms> milliseconds)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Summary<'a> {
    pub time_of_day: NaiveTime,
    pub message: &'a str,
    pub count: u64,
    pub elapsed: Duration,
}

impl fmt::Display for Summary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} ({} times in {} milliseconds)",
            self.time_of_day.format("%H:%M:%S"),
            self.message,
            self.count,
            self.elapsed.as_millis()
        )
    }
}
