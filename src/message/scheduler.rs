//! Delayed jobs for removal timers and exit transitions.
//!
//! [`ThreadScheduler`] runs jobs on one background thread ordered by deadline.
//! [`ManualScheduler`] keeps a virtual clock that the caller advances, which
//! suits frame-driven UI loops and deterministic tests.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::{Duration, Instant};

use crate::error::{Error, Result};

pub type Job = Box<dyn FnOnce() + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

pub trait Scheduler: Send + Sync {
    /// Runs `job` once `delay` has elapsed. Never runs it synchronously.
    /// A delay too large to represent as a deadline never fires but can still
    /// be cancelled.
    fn schedule(&self, delay: Duration, job: Job) -> TimerId;

    /// Drops a pending job. Returns `false` if it already ran or was cancelled.
    fn cancel(&self, id: TimerId) -> bool;
}

fn run_job(job: Job) {
    if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
        tracing::error!("scheduled job panicked");
    }
}

struct Queue<T> {
    heap: BinaryHeap<Reverse<(T, u64)>>,
    jobs: HashMap<u64, Job>,
    next_id: u64,
}

impl<T: Ord> Queue<T> {
    fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            jobs: HashMap::new(),
            next_id: 1,
        }
    }

    fn push(&mut self, deadline: Option<T>, job: Job) -> TimerId {
        let id = self.next_id;
        self.next_id += 1;
        if let Some(deadline) = deadline {
            self.heap.push(Reverse((deadline, id)));
        }
        self.jobs.insert(id, job);
        TimerId(id)
    }

    fn cancel(&mut self, id: TimerId) -> bool {
        self.jobs.remove(&id.0).is_some()
    }

    /// Drops heap entries whose job was cancelled.
    fn skip_cancelled(&mut self) {
        while let Some(Reverse((_, id))) = self.heap.peek() {
            if self.jobs.contains_key(id) {
                break;
            }
            self.heap.pop();
        }
    }
}

struct ThreadState {
    queue: Queue<Instant>,
    shutdown: bool,
}

struct Inner {
    state: Mutex<ThreadState>,
    condvar: Condvar,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, ThreadState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Runs jobs on a dedicated worker thread.
pub struct ThreadScheduler {
    inner: Arc<Inner>,
    worker: Option<JoinHandle<()>>,
    worker_id: ThreadId,
}

impl ThreadScheduler {
    pub fn new() -> Result<Self> {
        let inner = Arc::new(Inner {
            state: Mutex::new(ThreadState {
                queue: Queue::new(),
                shutdown: false,
            }),
            condvar: Condvar::new(),
        });
        let thread_inner = inner.clone();
        let worker = thread::Builder::new()
            .name("message-timers".into())
            .spawn(move || Self::run(thread_inner))
            .map_err(Error::SchedulerSpawn)?;
        let worker_id = worker.thread().id();
        Ok(Self {
            inner,
            worker: Some(worker),
            worker_id,
        })
    }

    fn run(inner: Arc<Inner>) {
        let mut state = inner.lock();
        loop {
            if state.shutdown {
                return;
            }
            state.queue.skip_cancelled();
            let Some(Reverse((deadline, id))) = state.queue.heap.peek().copied() else {
                state = inner
                    .condvar
                    .wait(state)
                    .unwrap_or_else(PoisonError::into_inner);
                continue;
            };
            let now = Instant::now();
            if deadline > now {
                let wait = deadline.saturating_duration_since(now);
                state = inner
                    .condvar
                    .wait_timeout(state, wait)
                    .unwrap_or_else(PoisonError::into_inner)
                    .0;
                continue;
            }
            state.queue.heap.pop();
            if let Some(job) = state.queue.jobs.remove(&id) {
                drop(state);
                run_job(job);
                state = inner.lock();
            }
        }
    }

    /// Number of jobs still waiting to run.
    pub fn pending(&self) -> usize {
        self.inner.lock().queue.jobs.len()
    }
}

impl Scheduler for ThreadScheduler {
    fn schedule(&self, delay: Duration, job: Job) -> TimerId {
        let mut state = self.inner.lock();
        let id = state.queue.push(Instant::now().checked_add(delay), job);
        self.inner.condvar.notify_one();
        id
    }

    fn cancel(&self, id: TimerId) -> bool {
        let cancelled = self.inner.lock().queue.cancel(id);
        if cancelled {
            self.inner.condvar.notify_one();
        }
        cancelled
    }
}

impl Drop for ThreadScheduler {
    fn drop(&mut self) {
        self.inner.lock().shutdown = true;
        self.inner.condvar.notify_one();
        // A job may drop the last owner from the worker itself.
        if thread::current().id() == self.worker_id {
            return;
        }
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

struct ManualState {
    now: Duration,
    queue: Queue<Duration>,
}

/// Scheduler driven by an explicit virtual clock.
///
/// Nothing runs until [`advance`](ManualScheduler::advance) is called. Jobs
/// scheduled by a running job are picked up by the same `advance` call when
/// their deadline falls inside the advanced window.
pub struct ManualScheduler {
    state: Mutex<ManualState>,
}

impl Default for ManualScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ManualState {
                now: Duration::ZERO,
                queue: Queue::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ManualState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Virtual time elapsed since creation.
    pub fn elapsed(&self) -> Duration {
        self.lock().now
    }

    pub fn pending(&self) -> usize {
        self.lock().queue.jobs.len()
    }

    /// Moves the clock forward by `by`, running every job that falls due in
    /// deadline order. Returns the number of jobs run.
    pub fn advance(&self, by: Duration) -> usize {
        let target = self.lock().now.saturating_add(by);
        let mut ran = 0;
        loop {
            let job = {
                let mut state = self.lock();
                state.queue.skip_cancelled();
                match state.queue.heap.peek().copied() {
                    Some(Reverse((deadline, id))) if deadline <= target => {
                        state.queue.heap.pop();
                        state.now = state.now.max(deadline);
                        state.queue.jobs.remove(&id)
                    }
                    _ => {
                        state.now = target;
                        break;
                    }
                }
            };
            if let Some(job) = job {
                run_job(job);
                ran += 1;
            }
        }
        ran
    }

    pub fn advance_ms(&self, ms: u64) -> usize {
        self.advance(Duration::from_millis(ms))
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, delay: Duration, job: Job) -> TimerId {
        let mut state = self.lock();
        let deadline = state.now.checked_add(delay);
        state.queue.push(deadline, job)
    }

    fn cancel(&self, id: TimerId) -> bool {
        self.lock().queue.cancel(id)
    }
}

impl<S: Scheduler + ?Sized> Scheduler for Arc<S> {
    fn schedule(&self, delay: Duration, job: Job) -> TimerId {
        (**self).schedule(delay, job)
    }

    fn cancel(&self, id: TimerId) -> bool {
        (**self).cancel(id)
    }
}
