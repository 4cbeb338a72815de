use crate::error::Result;
use std::time::Duration;

/// Stamp carried by every armed timer; a fired timer whose generation is
/// no longer current belongs to a superseded window.
pub type Generation = u64;

/// Work run when a timer expires. Receives the generation it was armed with.
pub type TimerTask = Box<dyn FnOnce(Generation) + Send + 'static>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(pub u64);

/// One-shot delayed execution.
///
/// Implementations must run each armed task at most once and never before
/// `delay` has elapsed. `cancel` must not return while the cancelled task
/// is still running on another thread; after it returns the task will not
/// start. Cancelling an unknown or already fired id is a no-op.
pub trait Scheduler: Send + Sync {
    fn arm(&self, delay: Duration, generation: Generation, task: TimerTask) -> Result<TimerId>;

    fn cancel(&self, id: TimerId);
}

pub(crate) struct PendingTimer {
    pub(crate) generation: Generation,
    pub(crate) task: TimerTask,
}

impl PendingTimer {
    #[inline]
    pub(crate) fn fire(self) {
        (self.task)(self.generation);
    }
}
