//! Time sources for trackers
//!
//! Trackers never read the ambient system clock directly. Production code
//! injects [`SystemClock`]; tests inject [`ManualClock`] and advance virtual
//! time explicitly, so multi-second debounce scenarios run instantly.

use crate::timer::{TimerHandle, TimerQueue, TimerTask};
use crossbeam_channel::Sender;
use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error};

/// Current time plus deferred, cancellable callbacks
pub trait Clock: Send + Sync + fmt::Debug {
    /// Current monotonic time
    fn now(&self) -> Instant;

    /// Run `task` once `deadline` has passed
    ///
    /// Tasks are always invoked without any clock-internal lock held, so a
    /// task may schedule further timers.
    fn schedule_at(&self, deadline: Instant, task: TimerTask) -> TimerHandle;
}

/// Worker threads a [`SystemClock`] starts with by default
pub const DEFAULT_TIMER_WORKERS: usize = 4;

/// Real time clock
///
/// A single driver thread sleeps until the nearest deadline and hands due
/// tasks, in deadline order, to a pool of worker threads. A slow task only
/// occupies its own worker, so other deadlines keep firing on time as long
/// as a worker is free. The driver exits when the clock is dropped; tasks
/// still queued at that point never run.
pub struct SystemClock {
    shared: Arc<DriverShared>,
    driver: Option<JoinHandle<()>>,
    workers: usize,
}

struct DriverShared {
    state: Mutex<DriverState>,
    wake: Condvar,
}

struct DriverState {
    queue: TimerQueue,
    shutdown: bool,
}

impl SystemClock {
    /// Start a clock with [`DEFAULT_TIMER_WORKERS`] workers
    pub fn new() -> std::io::Result<Self> {
        Self::with_workers(DEFAULT_TIMER_WORKERS)
    }

    /// Start a clock whose tasks run on `workers` threads (at least one)
    pub fn with_workers(workers: usize) -> std::io::Result<Self> {
        let workers = workers.max(1);
        let (task_tx, task_rx) = crossbeam_channel::unbounded::<TimerTask>();

        // Workers exit once the driver drops its sender
        for id in 0..workers {
            let task_rx = task_rx.clone();
            thread::Builder::new()
                .name(format!("audit-timer-worker-{}", id))
                .spawn(move || {
                    for task in task_rx.iter() {
                        run_task(task);
                    }
                })?;
        }

        let shared = Arc::new(DriverShared {
            state: Mutex::new(DriverState {
                queue: TimerQueue::new(),
                shutdown: false,
            }),
            wake: Condvar::new(),
        });

        let driver_shared = Arc::clone(&shared);
        let driver = thread::Builder::new()
            .name("audit-timer".to_string())
            .spawn(move || drive(&driver_shared, task_tx))?;

        Ok(Self {
            shared,
            driver: Some(driver),
            workers,
        })
    }

    /// Number of scheduled tasks not yet dispatched or cancelled
    pub fn pending_timers(&self) -> usize {
        self.shared.state.lock().queue.live_len()
    }
}

fn drive(shared: &DriverShared, task_tx: Sender<TimerTask>) {
    debug!("Timer driver started");
    let mut state = shared.state.lock();

    loop {
        if state.shutdown {
            break;
        }

        if let Some((_, task)) = state.queue.pop_due(Instant::now()) {
            if task_tx.send(task).is_err() {
                error!("Timer workers gone, stopping driver");
                break;
            }
            continue;
        }

        match state.queue.next_deadline() {
            Some(deadline) => {
                shared.wake.wait_until(&mut state, deadline);
            }
            None => shared.wake.wait(&mut state),
        }
    }

    debug!("Timer driver stopped");
}

fn run_task(task: TimerTask) {
    // A panicking task must not take its worker down with it
    if panic::catch_unwind(AssertUnwindSafe(task)).is_err() {
        error!("Timer task panicked");
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn schedule_at(&self, deadline: Instant, task: TimerTask) -> TimerHandle {
        let mut state = self.shared.state.lock();
        let current_head = state.queue.next_deadline();
        let handle = state.queue.push(deadline, task);

        if current_head.map_or(true, |head| deadline < head) {
            self.shared.wake.notify_one();
        }

        handle
    }
}

impl Drop for SystemClock {
    fn drop(&mut self) {
        self.shared.state.lock().shutdown = true;
        self.shared.wake.notify_one();

        // The driver never runs tasks, so joining it cannot wait on a sink.
        // Workers are left to finish what they already hold.
        if let Some(driver) = self.driver.take() {
            let _ = driver.join();
        }
    }
}

impl fmt::Debug for SystemClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SystemClock")
            .field("workers", &self.workers)
            .field("queue", &self.shared.state.lock().queue)
            .finish()
    }
}

/// Manually advanced virtual clock
///
/// Time only moves through [`advance`](Self::advance) and
/// [`advance_to`](Self::advance_to). While a task runs, `now()` reports
/// that task's deadline.
pub struct ManualClock {
    state: Mutex<ManualState>,
}

struct ManualState {
    now: Instant,
    queue: TimerQueue,
}

impl ManualClock {
    /// Create a clock frozen at the current instant
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    /// Create a clock frozen at `now`
    pub fn starting_at(now: Instant) -> Self {
        Self {
            state: Mutex::new(ManualState {
                now,
                queue: TimerQueue::new(),
            }),
        }
    }

    /// Move time forward by `by`, running every task that falls due
    pub fn advance(&self, by: Duration) {
        let target = self.now() + by;
        self.advance_to(target);
    }

    /// Move time forward to `target`, running every task that falls due
    ///
    /// Tasks run in deadline order, including tasks scheduled by earlier
    /// tasks during this call. Moving backwards is a no-op.
    pub fn advance_to(&self, target: Instant) {
        loop {
            let task = {
                let mut state = self.state.lock();
                match state.queue.pop_due(target) {
                    Some((deadline, task)) => {
                        if deadline > state.now {
                            state.now = deadline;
                        }
                        task
                    }
                    None => {
                        if target > state.now {
                            state.now = target;
                        }
                        return;
                    }
                }
            };

            task();
        }
    }

    /// Number of scheduled tasks not yet run or cancelled
    pub fn pending_timers(&self) -> usize {
        self.state.lock().queue.live_len()
    }

}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.state.lock().now
    }

    fn schedule_at(&self, deadline: Instant, task: TimerTask) -> TimerHandle {
        self.state.lock().queue.push(deadline, task)
    }
}

impl fmt::Debug for ManualClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ManualClock")
            .field("now", &state.now)
            .field("queue", &state.queue)
            .finish()
    }
}
