use crate::clock::{Clock, SystemClock};
use crate::error::Result;
use crate::options::StaggerOptions;
use crate::scheduler::{Generation, Scheduler};
use crate::sink::Sink;
use crate::summary::Summary;
use crate::timer_thread::TimerThread;
use crate::window::{WindowSnapshot, WindowState};
use spdlog::{debug, error};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

struct LoggerShared {
    message: String,
    options: StaggerOptions,
    scheduler: Arc<dyn Scheduler>,
    clock: Arc<dyn Clock>,
    state: Mutex<WindowState>,
}

impl LoggerShared {
    fn lock(&self) -> MutexGuard<'_, WindowState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn open_window(self: &Arc<Self>, state: &mut WindowState) {
        let (generation, interval) = state.open(self.clock.now(), &self.options);

        if let Some(previous) = state.active_timer.take() {
            self.scheduler.cancel(previous);
        }

        let shared = Arc::downgrade(self);
        match self
            .scheduler
            .arm(interval, generation, Box::new(move |generation| on_expired(&shared, generation)))
        {
            Ok(id) => {
                state.active_timer = Some(id);
                debug!(
                    "[Stagger] '{}' window {} opened for {:?} (factor {})",
                    self.message,
                    generation,
                    interval,
                    state.interval_factor()
                );
            }
            Err(err) => {
                state.abandon();
                error!(
                    "[Stagger] '{}' could not arm window timer: {}",
                    self.message, err
                );
            }
        }
    }

    fn close_window(&self, generation: Generation) {
        let mut state = self.lock();
        if state.generation() != generation {
            debug!(
                "[Stagger] '{}' discarded stale timer {} (current {})",
                self.message,
                generation,
                state.generation()
            );
            return;
        }

        let now = self.clock.now();
        let elapsed = state.close(now, &self.options);
        let count = state.event_count;
        debug!(
            "[Stagger] '{}' window {} closed after {:?} with {} events",
            self.message, generation, elapsed, count
        );

        if let Some(sink) = state.sink.as_mut() {
            let line = Summary {
                time_of_day: self.clock.time_of_day(),
                message: &self.message,
                count,
                elapsed,
            }
            .to_string();
            sink(&line);
        }
    }
}

fn on_expired(shared: &Weak<LoggerShared>, generation: Generation) {
    if let Some(shared) = shared.upgrade() {
        shared.close_window(generation);
    }
}

/// Coalesces bursts of one recurring event into periodic summary lines.
///
/// The first [`record`](Self::record) after a quiet spell opens a window;
/// when its timer fires the sink receives a single line with the number of
/// events seen. Every closed window doubles the next one (up to
/// `max_interval_factor`), and every full cooldown of silence halves it
/// again, so sustained noise yields fewer lines while sporadic events are
/// still reported promptly.
///
/// Dropping the logger cancels its timer and waits for a timer callback
/// that is already running; no callback touches the logger afterwards.
pub struct StaggeredLogger {
    shared: Arc<LoggerShared>,
}

impl StaggeredLogger {
    /// Creates a logger with default options, driven by its own timer thread.
    pub fn new(message: impl Into<String>, sink: Option<Sink>) -> Result<Self> {
        let mut builder = Self::builder(message);
        if let Some(sink) = sink {
            builder = builder.sink(sink);
        }
        builder.build()
    }

    pub fn builder(message: impl Into<String>) -> StaggeredLoggerBuilder {
        StaggeredLoggerBuilder {
            message: message.into(),
            sink: None,
            options: StaggerOptions::default(),
            scheduler: None,
            clock: None,
        }
    }

    /// Counts one occurrence, opening a window if none is open.
    pub fn record(&self) {
        let mut state = self.shared.lock();
        if !state.collecting {
            self.shared.open_window(&mut state);
        }
        state.event_count += 1;
    }

    /// Replaces the sink. `None` keeps counting but emits nothing.
    ///
    /// The sink in place when a window closes is the one that receives its
    /// line. See [`Sink`] for the re-entrancy restriction.
    pub fn set_sink(&self, sink: Option<Sink>) {
        let previous = std::mem::replace(&mut self.shared.lock().sink, sink);
        drop(previous);
    }

    pub fn message(&self) -> &str {
        &self.shared.message
    }

    pub fn options(&self) -> &StaggerOptions {
        &self.shared.options
    }

    pub fn snapshot(&self) -> WindowSnapshot {
        self.shared.lock().snapshot(&self.shared.options)
    }
}

impl Drop for StaggeredLogger {
    fn drop(&mut self) {
        let timer = self.shared.lock().active_timer.take();
        if let Some(timer) = timer {
            self.shared.scheduler.cancel(timer);
        }
    }
}

pub struct StaggeredLoggerBuilder {
    message: String,
    sink: Option<Sink>,
    options: StaggerOptions,
    scheduler: Option<Arc<dyn Scheduler>>,
    clock: Option<Arc<dyn Clock>>,
}

impl StaggeredLoggerBuilder {
    pub fn sink(mut self, sink: Sink) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn options(mut self, options: StaggerOptions) -> Self {
        self.options = options;
        self
    }

    /// Shares an existing scheduler instead of spawning a timer thread.
    pub fn scheduler(mut self, scheduler: Arc<dyn Scheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn build(self) -> Result<StaggeredLogger> {
        self.options.validate()?;
        let scheduler: Arc<dyn Scheduler> = match self.scheduler {
            Some(scheduler) => scheduler,
            None => TimerThread::spawn()?,
        };
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));

        Ok(StaggeredLogger {
            shared: Arc::new(LoggerShared {
                message: self.message,
                options: self.options,
                scheduler,
                clock,
                state: Mutex::new(WindowState::new(self.sink)),
            }),
        })
    }
}
