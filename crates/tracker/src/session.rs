//! Per-session shared directory auditing
//!
//! One [`DirectoryAuditor`] lives for the duration of a desktop session and
//! owns a tracker per operation kind. Both trackers feed the same sink.

use audit_core::{
    AuditConfig, AuditEvent, AuditSink, EmitContext, SharedDirectoryRead, SharedDirectoryWrite,
};
use std::sync::Arc;
use tracing::{info, warn};

use crate::clock::Clock;
use crate::debounce::Tracker;

/// Shared directory audit state for one session
pub struct DirectoryAuditor {
    session_id: String,
    reads: Tracker<SharedDirectoryRead>,
    writes: Tracker<SharedDirectoryWrite>,
    closed: bool,
}

impl DirectoryAuditor {
    pub fn new(
        session_id: impl Into<String>,
        config: AuditConfig,
        clock: Arc<dyn Clock>,
        sink: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            reads: Tracker::new(config.read, Arc::clone(&clock), forward(Arc::clone(&sink))),
            writes: Tracker::new(config.write, clock, forward(sink)),
            closed: false,
        }
    }

    /// Record a read chunk
    ///
    /// Events without a session id are stamped with this session's.
    pub fn on_read(&self, mut event: SharedDirectoryRead) {
        if event.session_id.is_empty() {
            event.session_id.clone_from(&self.session_id);
        }
        self.reads.add_event(event);
    }

    /// Record a write chunk
    ///
    /// Events without a session id are stamped with this session's.
    pub fn on_write(&self, mut event: SharedDirectoryWrite) {
        if event.session_id.is_empty() {
            event.session_id.clone_from(&self.session_id);
        }
        self.writes.add_event(event);
    }

    /// Emit everything pending in both trackers
    pub fn flush(&self) -> usize {
        self.reads.flush() + self.writes.flush()
    }

    /// Open runs across both trackers
    pub fn pending_len(&self) -> usize {
        self.reads.pending_len() + self.writes.pending_len()
    }

    /// Tear the session down, flushing all pending runs
    pub fn close(mut self) -> usize {
        self.closed = true;
        let flushed = self.flush();
        info!(session_id = %self.session_id, flushed, "Closed shared directory auditor");
        flushed
    }
}

impl Drop for DirectoryAuditor {
    fn drop(&mut self) {
        if !self.closed {
            let flushed = self.flush();
            if flushed > 0 {
                info!(session_id = %self.session_id, flushed, "Flushed shared directory auditor on drop");
            }
        }
    }
}

/// Adapt a sink into a tracker emission callback
///
/// Sink failures are logged and dropped; the run stays emitted.
fn forward<E>(sink: Arc<dyn AuditSink>) -> impl Fn(&EmitContext, E) + Send + Sync + 'static
where
    E: Into<AuditEvent> + 'static,
{
    move |ctx: &EmitContext, event: E| {
        if let Err(e) = sink.emit(ctx, event.into()) {
            warn!(cause = %ctx.cause, "Audit sink failed to record combined event: {:#}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use audit_core::{EmitCause, FnSink, OperationKind};
    use parking_lot::Mutex;
    use std::time::Duration;

    fn recording_sink() -> (Arc<dyn AuditSink>, Arc<Mutex<Vec<(EmitCause, AuditEvent)>>>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink_log = Arc::clone(&log);
        let sink: Arc<dyn AuditSink> = Arc::new(FnSink(move |ctx: &EmitContext, event: AuditEvent| -> anyhow::Result<()> {
            sink_log.lock().push((ctx.cause, event));
            Ok(())
        }));
        (sink, log)
    }

    fn read(path: &str, length: u32) -> SharedDirectoryRead {
        SharedDirectoryRead {
            session_id: String::new(),
            directory_id: 2,
            directory_name: "share".to_string(),
            path: path.to_string(),
            offset: 0,
            length,
        }
    }

    fn write(path: &str, length: u32) -> SharedDirectoryWrite {
        SharedDirectoryWrite {
            session_id: String::new(),
            directory_id: 2,
            directory_name: "share".to_string(),
            path: path.to_string(),
            offset: 0,
            length,
        }
    }

    #[test]
    fn test_reads_and_writes_never_combine() {
        let clock = Arc::new(ManualClock::new());
        let (sink, log) = recording_sink();
        let auditor = DirectoryAuditor::new("sess-9", AuditConfig::default(), clock.clone(), sink);

        auditor.on_read(read("report.docx", 10));
        auditor.on_write(write("report.docx", 20));
        auditor.on_read(read("report.docx", 5));
        assert_eq!(auditor.pending_len(), 2);

        clock.advance(Duration::from_secs(1));

        let log = log.lock();
        assert_eq!(log.len(), 2);
        let read_event = log.iter().find(|(_, e)| e.kind() == OperationKind::Read).unwrap();
        let write_event = log.iter().find(|(_, e)| e.kind() == OperationKind::Write).unwrap();
        assert_eq!(read_event.1.length(), 15);
        assert_eq!(write_event.1.length(), 20);
    }

    #[test]
    fn test_stamps_session_id() {
        let clock = Arc::new(ManualClock::new());
        let (sink, log) = recording_sink();
        let auditor = DirectoryAuditor::new("sess-9", AuditConfig::default(), clock, sink);

        auditor.on_read(read("a.txt", 1));
        let mut foreign = write("b.txt", 1);
        foreign.session_id = "other".to_string();
        auditor.on_write(foreign);
        auditor.flush();

        let log = log.lock();
        let ids: Vec<_> = log.iter().map(|(_, e)| e.session_id().to_string()).collect();
        assert!(ids.contains(&"sess-9".to_string()));
        assert!(ids.contains(&"other".to_string()));
    }

    #[test]
    fn test_close_flushes_everything() {
        let clock = Arc::new(ManualClock::new());
        let (sink, log) = recording_sink();
        let auditor = DirectoryAuditor::new("sess", AuditConfig::default(), clock.clone(), sink);

        auditor.on_read(read("a.txt", 1));
        auditor.on_read(read("b.txt", 1));
        auditor.on_write(write("a.txt", 1));

        assert_eq!(auditor.close(), 3);
        clock.advance(Duration::from_secs(30));

        let log = log.lock();
        assert_eq!(log.len(), 3);
        assert!(log.iter().all(|(cause, _)| *cause == EmitCause::Flush));
    }

    #[test]
    fn test_drop_flushes_pending() {
        let clock = Arc::new(ManualClock::new());
        let (sink, log) = recording_sink();

        {
            let auditor = DirectoryAuditor::new("sess", AuditConfig::default(), clock, sink);
            auditor.on_write(write("out.bin", 512));
        }

        let log = log.lock();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].0, EmitCause::Flush);
        assert_eq!(log[0].1.length(), 512);
    }

    #[test]
    fn test_sink_failure_does_not_requeue() {
        let clock = Arc::new(ManualClock::new());
        let attempts = Arc::new(Mutex::new(0usize));
        let sink_attempts = Arc::clone(&attempts);
        let sink: Arc<dyn AuditSink> = Arc::new(FnSink(move |_: &EmitContext, _: AuditEvent| -> anyhow::Result<()> {
            *sink_attempts.lock() += 1;
            anyhow::bail!("audit log unreachable")
        }));
        let auditor = DirectoryAuditor::new("sess", AuditConfig::default(), clock.clone(), sink);

        auditor.on_read(read("a.txt", 1));
        clock.advance(Duration::from_secs(2));

        assert_eq!(*attempts.lock(), 1);
        assert_eq!(auditor.pending_len(), 0);
        assert_eq!(auditor.close(), 0);
        assert_eq!(*attempts.lock(), 1);
    }
}
