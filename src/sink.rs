use spdlog::{Level, Logger};
use std::sync::Arc;

/// Receives each formatted summary line.
///
/// Called with the logger's lock held: a sink must not call back into
/// `record` or `set_sink` of the same logger, or it deadlocks.
pub type Sink = Box<dyn FnMut(&str) + Send + 'static>;

/// A sink that can be installed into many loggers at once.
pub type SharedSink = Arc<dyn Fn(&str) + Send + Sync + 'static>;

/// Forwards summary lines to the default spdlog logger at `level`.
///
/// The default logger is looked up per line, so a later
/// `spdlog::set_default_logger` takes effect.
pub fn spdlog_sink(level: Level) -> Sink {
    Box::new(move |line: &str| {
        spdlog::log!(level, "{}", line);
    })
}

/// Shared form of [`spdlog_sink`], for a [`StaggerRegistry`](crate::StaggerRegistry).
pub fn spdlog_shared_sink(level: Level) -> SharedSink {
    Arc::new(move |line: &str| {
        spdlog::log!(level, "{}", line);
    })
}

/// Forwards summary lines to a specific spdlog logger at `level`.
pub fn logger_sink(logger: Arc<Logger>, level: Level) -> Sink {
    Box::new(move |line: &str| {
        spdlog::log!(logger: logger, level, "{}", line);
    })
}

pub(crate) fn from_shared(shared: &SharedSink) -> Sink {
    let shared = shared.clone();
    Box::new(move |line: &str| shared(line))
}
