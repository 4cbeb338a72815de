mod clock;
mod error;
mod logger;
mod manual_scheduler;
mod options;
mod registry;
mod scheduler;
pub mod sink;
mod summary;
mod timer_thread;
mod window;

pub use crate::clock::{Clock, ManualClock, SystemClock};
pub use crate::error::{Result, StaggerError};
pub use crate::logger::{StaggeredLogger, StaggeredLoggerBuilder};
pub use crate::manual_scheduler::ManualScheduler;
pub use crate::options::StaggerOptions;
pub use crate::registry::StaggerRegistry;
pub use crate::scheduler::{Generation, Scheduler, TimerId, TimerTask};
pub use crate::sink::{SharedSink, Sink, logger_sink, spdlog_shared_sink, spdlog_sink};
pub use crate::summary::Summary;
pub use crate::timer_thread::TimerThread;
pub use crate::window::WindowSnapshot;
