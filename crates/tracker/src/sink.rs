//! Channel-backed audit sink
//!
//! Bridges synchronous emission (timer thread, flush caller) to an async
//! audit writer task.

use audit_core::{AuditEvent, AuditSink, EmitCause, EmitContext};
use tokio::sync::mpsc;

/// A combined event and what closed its run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Emitted {
    pub cause: EmitCause,
    pub event: AuditEvent,
}

/// Sink that forwards every event over an unbounded tokio channel
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<Emitted>,
}

impl ChannelSink {
    /// Create a sink and the receiving end for the writer task
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Emitted>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl AuditSink for ChannelSink {
    fn emit(&self, ctx: &EmitContext, event: AuditEvent) -> anyhow::Result<()> {
        self.tx
            .send(Emitted {
                cause: ctx.cause,
                event,
            })
            .map_err(|_| anyhow::anyhow!("audit writer channel closed"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::session::DirectoryAuditor;
    use audit_core::{AuditConfig, SharedDirectoryRead};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_writer_task_receives_combined_events() {
        let clock = Arc::new(ManualClock::new());
        let (sink, mut rx) = ChannelSink::new();
        let auditor = DirectoryAuditor::new("sess", AuditConfig::default(), clock.clone(), Arc::new(sink));

        let writer = tokio::spawn(async move {
            let mut received = Vec::new();
            while let Some(emitted) = rx.recv().await {
                received.push(emitted);
            }
            received
        });

        for _ in 0..4 {
            auditor.on_read(SharedDirectoryRead {
                session_id: String::new(),
                directory_id: 1,
                directory_name: "dir".to_string(),
                path: "notes.txt".to_string(),
                offset: 0,
                length: 25,
            });
        }
        clock.advance(Duration::from_secs(1));
        auditor.close();

        let received = writer.await.unwrap();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].cause, EmitCause::Deadline);
        assert_eq!(received[0].event.length(), 100);
    }

    #[test]
    fn test_closed_channel_is_an_error() {
        let (sink, rx) = ChannelSink::new();
        drop(rx);

        let event = AuditEvent::from(SharedDirectoryRead {
            session_id: String::new(),
            directory_id: 1,
            directory_name: "dir".to_string(),
            path: "a".to_string(),
            offset: 0,
            length: 1,
        });
        let ctx = EmitContext::new(EmitCause::Flush, Duration::ZERO);
        assert!(sink.emit(&ctx, event).is_err());
    }
}
