use crate::clock::{Clock, SystemClock};
use crate::error::Result;
use crate::logger::StaggeredLogger;
use crate::options::StaggerOptions;
use crate::scheduler::Scheduler;
use crate::sink::{SharedSink, from_shared};
use crate::timer_thread::TimerThread;
use fxhash::FxHashMap;
use spdlog::error;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

struct RegistryState {
    loggers: FxHashMap<String, Arc<StaggeredLogger>>,
    sink: Option<SharedSink>,
}

/// A set of staggered loggers keyed by message, sharing one scheduler.
///
/// Each distinct message gets its own window and its own adaptive
/// interval; all of them report through the registry's sink.
///
/// Messages are keys, not payloads: loggers live until [`remove`](Self::remove)
/// or until the registry drops, so use a fixed set of message templates
/// rather than text with per-event values interpolated into it.
pub struct StaggerRegistry {
    options: StaggerOptions,
    scheduler: Arc<dyn Scheduler>,
    clock: Arc<dyn Clock>,
    state: Mutex<RegistryState>,
}

impl StaggerRegistry {
    /// Creates a registry driven by a freshly spawned timer thread.
    pub fn new(options: StaggerOptions, sink: Option<SharedSink>) -> Result<Self> {
        let scheduler = TimerThread::spawn()?;
        Self::with_scheduler(options, sink, scheduler, Arc::new(SystemClock))
    }

    pub fn with_scheduler(
        options: StaggerOptions,
        sink: Option<SharedSink>,
        scheduler: Arc<dyn Scheduler>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            options,
            scheduler,
            clock,
            state: Mutex::new(RegistryState {
                loggers: FxHashMap::default(),
                sink,
            }),
        })
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the logger for `message`, creating it on first use.
    pub fn logger(&self, message: &str) -> Result<Arc<StaggeredLogger>> {
        let mut state = self.lock();
        if let Some(logger) = state.loggers.get(message) {
            return Ok(logger.clone());
        }

        let mut builder = StaggeredLogger::builder(message)
            .options(self.options)
            .scheduler(self.scheduler.clone())
            .clock(self.clock.clone());
        if let Some(sink) = &state.sink {
            builder = builder.sink(from_shared(sink));
        }
        let logger = Arc::new(builder.build()?);
        state.loggers.insert(message.to_owned(), logger.clone());
        Ok(logger)
    }

    /// Counts one occurrence of `message`.
    pub fn record(&self, message: &str) {
        match self.logger(message) {
            Ok(logger) => logger.record(),
            Err(err) => error!("[Stagger] '{}' could not create logger: {}", message, err),
        }
    }

    /// Drops the logger for `message`, cancelling its open window without a
    /// summary. Returns whether a logger was registered.
    ///
    /// A caller still holding the `Arc` from [`logger`](Self::logger) keeps
    /// that logger alive until it lets go.
    pub fn remove(&self, message: &str) -> bool {
        let removed = self.lock().loggers.remove(message);
        removed.is_some()
    }

    /// Installs `sink` into every logger, present and future.
    pub fn set_sink(&self, sink: Option<SharedSink>) {
        let mut state = self.lock();
        for logger in state.loggers.values() {
            logger.set_sink(sink.as_ref().map(from_shared));
        }
        state.sink = sink;
    }

    pub fn len(&self) -> usize {
        self.lock().loggers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
