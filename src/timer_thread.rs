use crate::error::{Result, StaggerError};
use crate::scheduler::{Generation, PendingTimer, Scheduler, TimerId, TimerTask};
use fxhash::FxHashMap;
use spdlog::{debug, error};
use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::{Duration, Instant};

#[derive(Default)]
struct TimerQueue {
    by_deadline: BTreeMap<(Instant, TimerId), PendingTimer>,
    deadlines: FxHashMap<TimerId, Instant>,
    firing: Option<TimerId>,
    next_id: u64,
    running: bool,
}

struct TimerShared {
    queue: Mutex<TimerQueue>,
    /// Signalled when the earliest deadline may have changed or on shutdown.
    wake: Condvar,
    /// Signalled after every task completes.
    fired: Condvar,
}

impl TimerShared {
    fn lock(&self) -> MutexGuard<'_, TimerQueue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn run(&self) {
        let mut queue = self.lock();
        while queue.running {
            let now = Instant::now();
            let next = queue.by_deadline.keys().next().copied();
            match next {
                None => {
                    queue = self.wake.wait(queue).unwrap_or_else(PoisonError::into_inner);
                }
                Some((deadline, _)) if deadline > now => {
                    queue = self
                        .wake
                        .wait_timeout(queue, deadline - now)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0;
                }
                Some(key) => {
                    let Some(timer) = queue.by_deadline.remove(&key) else {
                        continue;
                    };
                    let id = key.1;
                    queue.deadlines.remove(&id);
                    queue.firing = Some(id);
                    drop(queue);

                    if panic::catch_unwind(AssertUnwindSafe(move || timer.fire())).is_err() {
                        error!("[TimerThread] task of timer {:?} panicked", id);
                    }

                    queue = self.lock();
                    queue.firing = None;
                    self.fired.notify_all();
                }
            }
        }
        debug!("[TimerThread] worker stopped");
    }
}

/// Production scheduler: a single worker thread sleeping until the
/// earliest deadline of a deadline-ordered queue.
///
/// Tasks run on the worker thread one at a time. Dropping the last handle
/// (or calling [`TimerThread::shutdown`]) discards pending timers and joins
/// the worker, so no task runs after that returns.
pub struct TimerThread {
    shared: Arc<TimerShared>,
    worker: Mutex<Option<JoinHandle<()>>>,
    worker_id: ThreadId,
}

impl TimerThread {
    pub fn spawn() -> Result<Arc<Self>> {
        let shared = Arc::new(TimerShared {
            queue: Mutex::new(TimerQueue {
                running: true,
                ..Default::default()
            }),
            wake: Condvar::new(),
            fired: Condvar::new(),
        });

        let worker_shared = shared.clone();
        let handle = thread::Builder::new()
            .name("stagger-timer".into())
            .spawn(move || worker_shared.run())?;
        let worker_id = handle.thread().id();

        Ok(Arc::new(Self {
            shared,
            worker: Mutex::new(Some(handle)),
            worker_id,
        }))
    }

    /// Number of armed timers that have not fired or been cancelled.
    pub fn pending(&self) -> usize {
        self.shared.lock().by_deadline.len()
    }

    pub fn is_running(&self) -> bool {
        self.shared.lock().running
    }

    /// Stops the worker and drops every pending timer unfired. Blocks until a
    /// task that is currently running has returned, unless called from
    /// within a task. Later `arm` calls fail with `SchedulerShutDown`.
    pub fn shutdown(&self) {
        let discarded = {
            let mut queue = self.shared.lock();
            queue.running = false;
            queue.deadlines.clear();
            std::mem::take(&mut queue.by_deadline)
        };
        self.shared.wake.notify_all();
        drop(discarded);

        if thread::current().id() == self.worker_id {
            return;
        }
        let handle = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle
            && handle.join().is_err()
        {
            error!("[TimerThread] worker thread panicked");
        }
    }
}

impl Scheduler for TimerThread {
    fn arm(&self, delay: Duration, generation: Generation, task: TimerTask) -> Result<TimerId> {
        let mut queue = self.shared.lock();
        if !queue.running {
            return Err(StaggerError::SchedulerShutDown);
        }
        queue.next_id += 1;
        let id = TimerId(queue.next_id);
        let deadline = Instant::now() + delay;
        queue
            .by_deadline
            .insert((deadline, id), PendingTimer { generation, task });
        queue.deadlines.insert(id, deadline);
        drop(queue);

        self.shared.wake.notify_one();
        Ok(id)
    }

    fn cancel(&self, id: TimerId) {
        let mut queue = self.shared.lock();
        let removed = match queue.deadlines.remove(&id) {
            Some(deadline) => queue.by_deadline.remove(&(deadline, id)),
            None => None,
        };
        if thread::current().id() != self.worker_id {
            while queue.firing == Some(id) {
                queue = self
                    .shared
                    .fired
                    .wait(queue)
                    .unwrap_or_else(PoisonError::into_inner);
            }
        }
        drop(queue);
        drop(removed);
    }
}

impl Drop for TimerThread {
    fn drop(&mut self) {
        self.shutdown();
    }
}
