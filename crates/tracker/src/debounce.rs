//! Per-key debouncing of audit occurrences
//!
//! A [`Tracker`] turns a burst of small reads (or writes) on one path into a
//! single combined event. Each key moves through three states:
//!
//! ```text
//! ABSENT --first occurrence--> OPEN --merge--> OPEN
//!                               |
//!                               +--deadline / max-debounce / flush--> ABSENT
//! ```
//!
//! All transitions happen under one table lock as a claim step: the record
//! is removed from the table while locked and handed to the emission
//! callback after the lock is released. Whoever removes a record owns its
//! emission, so a deadline racing a flush emits exactly once.

use ahash::AHashMap;
use audit_core::{AggregationKey, Coalesce, EmitCause, EmitContext, TrackerConfig};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, debug_span, trace, warn};

use crate::clock::Clock;
use crate::timer::TimerHandle;

/// Emission callback
pub type EmitFn<E> = Arc<dyn Fn(&EmitContext, E) + Send + Sync>;

/// Coalescing tracker for one operation kind
///
/// Cloning yields another handle to the same table. Pending records are not
/// emitted when the last handle is dropped; owners must call
/// [`flush`](Self::flush) at teardown.
pub struct Tracker<E: Coalesce> {
    shared: Arc<Shared<E>>,
}

impl<E: Coalesce> Clone for Tracker<E> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

struct Shared<E: Coalesce> {
    /// In-flight runs, present only while OPEN
    pending: Mutex<AHashMap<AggregationKey, Pending<E>>>,
    config: TrackerConfig,
    clock: Arc<dyn Clock>,
    emit: EmitFn<E>,
    /// Source of schedule tokens; a firing only counts if its token is current
    next_token: AtomicU64,
}

/// State of one open run
struct Pending<E> {
    /// First occurrence of the run; identifying fields are never overwritten
    template: E,
    accumulated_length: u32,
    /// Offset of the first occurrence
    offset: u64,
    run_start: Instant,
    deadline: Instant,
    token: u64,
    timer: TimerHandle,
}

/// A record removed from the table, awaiting emission
struct Claimed<E> {
    key: AggregationKey,
    event: E,
    cause: EmitCause,
    run_duration: Duration,
}

impl<E> Pending<E>
where
    E: Coalesce,
{
    fn claim(self, key: AggregationKey, cause: EmitCause, now: Instant) -> Claimed<E> {
        self.timer.cancel();
        Claimed {
            key,
            event: self.template.with_extent(self.offset, self.accumulated_length),
            cause,
            run_duration: now.saturating_duration_since(self.run_start),
        }
    }
}

impl<E: Coalesce> Tracker<E> {
    /// Create a tracker
    ///
    /// `emit` receives every combined event exactly once. It is called from
    /// whichever context closed the run: the clock's timer context, the
    /// caller of [`add_event`](Self::add_event), or the caller of
    /// [`flush`](Self::flush).
    pub fn new<F>(config: TrackerConfig, clock: Arc<dyn Clock>, emit: F) -> Self
    where
        F: Fn(&EmitContext, E) + Send + Sync + 'static,
    {
        Self {
            shared: Arc::new(Shared {
                pending: Mutex::new(AHashMap::new()),
                config,
                clock,
                emit: Arc::new(emit),
                next_token: AtomicU64::new(0),
            }),
        }
    }

    /// Ingest one occurrence
    ///
    /// Merges into the key's open run, or opens a new one. A run that has
    /// already outlived max-debounce is emitted on this call before the new
    /// run starts.
    pub fn add_event(&self, event: E) {
        let shared = &self.shared;
        let key = event.key();

        let stale = {
            let mut pending = shared.pending.lock();
            // Sampled under the lock: no merge sees a now earlier than run_start
            let now = shared.clock.now();

            if let Some(record) = pending.get_mut(&key) {
                if now.saturating_duration_since(record.run_start) < shared.config.max_debounce() {
                    shared.merge(&key, record, &event, now);
                    return;
                }
            }

            let stale = pending
                .remove(&key)
                .map(|record| record.claim(key.clone(), EmitCause::MaxDebounce, now));

            let record = shared.open_run(&key, event, now);
            pending.insert(key, record);
            stale
        };

        if let Some(claimed) = stale {
            shared.deliver(claimed);
        }
    }

    /// Emit every pending record now and leave the table empty
    ///
    /// Returns the number of records emitted.
    pub fn flush(&self) -> usize {
        let shared = &self.shared;
        let now = shared.clock.now();

        let claimed: Vec<_> = {
            let mut pending = shared.pending.lock();
            pending
                .drain()
                .map(|(key, record)| record.claim(key, EmitCause::Flush, now))
                .collect()
        };

        let count = claimed.len();
        if count > 0 {
            debug!(kind = %self.kind_label(&claimed), count, "Flushing pending audit runs");
        }

        for record in claimed {
            shared.deliver(record);
        }

        count
    }

    /// Number of open runs
    pub fn pending_len(&self) -> usize {
        self.shared.pending.lock().len()
    }

    /// Whether `key` currently has an open run
    pub fn is_pending(&self, key: &AggregationKey) -> bool {
        self.shared.pending.lock().contains_key(key)
    }

    /// Scheduled emission time for `key`'s open run
    pub fn deadline(&self, key: &AggregationKey) -> Option<Instant> {
        self.shared.pending.lock().get(key).map(|record| record.deadline)
    }

    fn kind_label(&self, claimed: &[Claimed<E>]) -> &'static str {
        claimed
            .first()
            .map(|record| record.event.kind().as_str())
            .unwrap_or("none")
    }
}

impl<E: Coalesce> Shared<E> {
    fn open_run(self: &Arc<Self>, key: &AggregationKey, event: E, now: Instant) -> Pending<E> {
        // debounce <= max_debounce, so the first deadline never needs clamping
        let deadline = now + self.config.debounce();
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        let timer = self.schedule(key, token, deadline);

        debug!(kind = %event.kind(), key = %key, length = event.length(), "Opened audit run");

        Pending {
            accumulated_length: event.length(),
            offset: event.offset(),
            template: event,
            run_start: now,
            deadline,
            token,
            timer,
        }
    }

    fn merge(self: &Arc<Self>, key: &AggregationKey, record: &mut Pending<E>, event: &E, now: Instant) {
        record.accumulated_length = match record.accumulated_length.checked_add(event.length()) {
            Some(total) => total,
            None => {
                warn!(key = %key, "Accumulated length overflowed, saturating");
                u32::MAX
            }
        };

        let cap = record.run_start + self.config.max_debounce();
        let deadline = (now + self.config.debounce()).min(cap);

        trace!(
            key = %key,
            length = record.accumulated_length,
            until_deadline = ?deadline.saturating_duration_since(now),
            "Merged occurrence into audit run"
        );

        // Once clamped to the cap, the deadline stops moving
        if deadline == record.deadline {
            return;
        }

        record.timer.cancel();
        record.token = self.next_token.fetch_add(1, Ordering::Relaxed);
        record.timer = self.schedule(key, record.token, deadline);
        record.deadline = deadline;
    }

    fn schedule(self: &Arc<Self>, key: &AggregationKey, token: u64, deadline: Instant) -> TimerHandle {
        let weak = Arc::downgrade(self);
        let key = key.clone();

        self.clock.schedule_at(
            deadline,
            Box::new(move || {
                if let Some(shared) = weak.upgrade() {
                    shared.fire(&key, token);
                }
            }),
        )
    }

    /// Deadline callback for `key`
    ///
    /// No-op if the run was already claimed or rescheduled since.
    fn fire(&self, key: &AggregationKey, token: u64) {
        let now = self.clock.now();

        let claimed = {
            let mut pending = self.pending.lock();
            if pending.get(key).is_some_and(|record| record.token == token) {
                pending
                    .remove(key)
                    .map(|record| record.claim(key.clone(), EmitCause::Deadline, now))
            } else {
                None
            }
        };

        match claimed {
            Some(claimed) => self.deliver(claimed),
            None => trace!(key = %key, "Ignoring superseded audit deadline"),
        }
    }

    /// Hand a claimed record to the emission callback; never called with the
    /// table lock held
    fn deliver(&self, claimed: Claimed<E>) {
        let span = debug_span!(
            "audit_emit",
            kind = %claimed.event.kind(),
            key = %claimed.key,
            cause = %claimed.cause,
        );
        let _entered = span.enter();

        debug!(
            length = claimed.event.length(),
            offset = claimed.event.offset(),
            run_duration = ?claimed.run_duration,
            "Emitting combined audit event"
        );

        let ctx = EmitContext {
            cause: claimed.cause,
            run_duration: claimed.run_duration,
            span: span.clone(),
        };
        (self.emit)(&ctx, claimed.event);
    }
}
