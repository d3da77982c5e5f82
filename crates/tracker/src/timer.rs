//! Deadline-ordered timer queue
//!
//! Every pending deadline lives in one min-heap instead of one scheduling
//! primitive per key. Cancellation only flips a flag on the entry; cancelled
//! entries are discarded when they reach the top of the heap.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::Instant;

/// One-shot deferred callback
pub type TimerTask = Box<dyn FnOnce() + Send + 'static>;

/// Cancellable handle to a scheduled task
#[derive(Debug, Clone)]
pub struct TimerHandle {
    cancelled: Arc<AtomicBool>,
}

impl TimerHandle {
    fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Prevent the task from running
    ///
    /// Has no effect if the task was already popped for execution.
    pub fn cancel(&self) {
        self.cancelled.store(true, AtomicOrdering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(AtomicOrdering::Acquire)
    }
}

struct Entry {
    deadline: Instant,
    seq: u64,
    handle: TimerHandle,
    task: TimerTask,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.seq == other.seq
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    // Reversed so BinaryHeap pops the earliest deadline first; ties run in
    // scheduling order.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Min-heap of scheduled tasks
#[derive(Default)]
pub struct TimerQueue {
    heap: BinaryHeap<Entry>,
    next_seq: u64,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule a task for `deadline`
    pub fn push(&mut self, deadline: Instant, task: TimerTask) -> TimerHandle {
        let handle = TimerHandle::new();
        let seq = self.next_seq;
        self.next_seq += 1;

        self.heap.push(Entry {
            deadline,
            seq,
            handle: handle.clone(),
            task,
        });

        handle
    }

    /// Earliest live deadline
    pub fn next_deadline(&mut self) -> Option<Instant> {
        self.prune_cancelled();
        self.heap.peek().map(|entry| entry.deadline)
    }

    /// Pop the earliest live task whose deadline is at or before `now`
    pub fn pop_due(&mut self, now: Instant) -> Option<(Instant, TimerTask)> {
        self.prune_cancelled();
        if self.heap.peek()?.deadline > now {
            return None;
        }
        self.heap.pop().map(|entry| (entry.deadline, entry.task))
    }

    /// Number of scheduled tasks that have not been cancelled
    pub fn live_len(&self) -> usize {
        self.heap
            .iter()
            .filter(|entry| !entry.handle.is_cancelled())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    fn prune_cancelled(&mut self) {
        while self
            .heap
            .peek()
            .is_some_and(|entry| entry.handle.is_cancelled())
        {
            self.heap.pop();
        }
    }
}

impl fmt::Debug for TimerQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerQueue")
            .field("entries", &self.heap.len())
            .field("next_seq", &self.next_seq)
            .finish()
    }
}
