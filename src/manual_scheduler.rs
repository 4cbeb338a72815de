use crate::clock::ManualClock;
use crate::error::Result;
use crate::scheduler::{Generation, PendingTimer, Scheduler, TimerId, TimerTask};
use fxhash::FxHashMap;
use std::collections::BTreeMap;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};
use std::time::Duration;

#[derive(Default)]
struct ManualQueue {
    by_deadline: BTreeMap<(Duration, TimerId), PendingTimer>,
    deadlines: FxHashMap<TimerId, Duration>,
    firing: Option<(TimerId, ThreadId)>,
    next_id: u64,
}

/// Deterministic scheduler bound to a [`ManualClock`].
///
/// Nothing fires on its own: [`ManualScheduler::advance`] moves the clock
/// forward and runs each due task on the calling thread, in deadline order,
/// with the clock parked at that task's deadline while it runs.
pub struct ManualScheduler {
    clock: Arc<ManualClock>,
    queue: Mutex<ManualQueue>,
    fired: Condvar,
}

impl ManualScheduler {
    pub fn new(clock: Arc<ManualClock>) -> Arc<Self> {
        Arc::new(Self {
            clock,
            queue: Mutex::new(ManualQueue::default()),
            fired: Condvar::new(),
        })
    }

    pub fn clock(&self) -> &Arc<ManualClock> {
        &self.clock
    }

    fn lock(&self) -> MutexGuard<'_, ManualQueue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn pending(&self) -> usize {
        self.lock().by_deadline.len()
    }

    /// Advances the clock by `by` and returns how many tasks fired.
    pub fn advance(&self, by: Duration) -> usize {
        let target = self.clock.elapsed() + by;
        let mut fired = 0;
        loop {
            let mut queue = self.lock();
            let Some(&(deadline, id)) = queue.by_deadline.keys().next() else {
                break;
            };
            if deadline > target {
                break;
            }
            let Some(timer) = queue.by_deadline.remove(&(deadline, id)) else {
                break;
            };
            queue.deadlines.remove(&id);
            queue.firing = Some((id, thread::current().id()));
            drop(queue);

            self.clock.set_elapsed(deadline);
            timer.fire();
            fired += 1;

            self.lock().firing = None;
            self.fired.notify_all();
        }
        self.clock.set_elapsed(target);
        fired
    }
}

impl Scheduler for ManualScheduler {
    fn arm(&self, delay: Duration, generation: Generation, task: TimerTask) -> Result<TimerId> {
        let deadline = self.clock.elapsed() + delay;
        let mut queue = self.lock();
        queue.next_id += 1;
        let id = TimerId(queue.next_id);
        queue
            .by_deadline
            .insert((deadline, id), PendingTimer { generation, task });
        queue.deadlines.insert(id, deadline);
        Ok(id)
    }

    fn cancel(&self, id: TimerId) {
        let current = thread::current().id();
        let mut queue = self.lock();
        let removed = match queue.deadlines.remove(&id) {
            Some(deadline) => queue.by_deadline.remove(&(deadline, id)),
            None => None,
        };
        while matches!(queue.firing, Some((firing, thread)) if firing == id && thread != current) {
            queue = self.fired.wait(queue).unwrap_or_else(PoisonError::into_inner);
        }
        drop(queue);
        drop(removed);
    }
}
