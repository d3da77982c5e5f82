//! Append-only audit journal using sled

use crate::Result;
use anyhow::Context;
use audit_core::{AuditEvent, AuditSink, EmitCause, EmitContext};
use serde::{Deserialize, Serialize};
use sled::Db;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// One journaled audit event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalRecord {
    /// Monotonic sequence number
    pub seq: u64,
    /// Wall-clock time the record was written (Unix milliseconds)
    pub recorded_at_ms: u64,
    /// What closed the run
    pub cause: EmitCause,
    pub event: AuditEvent,
}

impl JournalRecord {
    fn serialize(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).context("Failed to serialize journal record")
    }

    fn deserialize(bytes: &[u8]) -> Result<Self> {
        bincode::deserialize(bytes).context("Failed to deserialize journal record")
    }
}

/// Append-only journal for audit events
pub struct AuditJournal {
    /// Sled database, keyed by big-endian sequence number
    db: Db,
    /// Next sequence number
    seq_counter: AtomicU64,
}

impl AuditJournal {
    /// Open or create a journal in the given directory
    pub fn open(path: &Path) -> Result<Self> {
        let db = sled::open(path.join("audit.db"))
            .with_context(|| format!("Failed to open audit journal at {}", path.display()))?;

        // Keys sort by sequence, so the last key is the highest one
        let next_seq = match db.last()? {
            Some((key, _)) => decode_seq(&key)? + 1,
            None => 0,
        };

        Ok(Self {
            db,
            seq_counter: AtomicU64::new(next_seq),
        })
    }

    /// Append an event to the journal
    pub fn append(&self, cause: EmitCause, event: AuditEvent) -> Result<u64> {
        let seq = self.seq_counter.fetch_add(1, Ordering::SeqCst);
        let record = JournalRecord {
            seq,
            recorded_at_ms: current_timestamp_ms(),
            cause,
            event,
        };

        self.db.insert(seq.to_be_bytes(), record.serialize()?)?;

        // Flush to ensure durability
        self.db.flush()?;

        tracing::trace!(seq, "Appended audit record");
        Ok(seq)
    }

    /// Get a record by sequence number
    pub fn get(&self, seq: u64) -> Result<Option<JournalRecord>> {
        match self.db.get(seq.to_be_bytes())? {
            Some(value) => Ok(Some(JournalRecord::deserialize(&value)?)),
            None => Ok(None),
        }
    }

    /// Get the last N records, oldest first
    pub fn last_n(&self, count: usize) -> Result<Vec<JournalRecord>> {
        let mut records = self
            .db
            .iter()
            .rev()
            .take(count)
            .map(|item| {
                let (_, value) = item?;
                JournalRecord::deserialize(&value)
            })
            .collect::<Result<Vec<_>>>()?;

        records.reverse();
        Ok(records)
    }

    /// All records in sequence order
    pub fn records(&self) -> Result<Vec<JournalRecord>> {
        self.db
            .iter()
            .map(|item| {
                let (_, value) = item?;
                JournalRecord::deserialize(&value)
            })
            .collect()
    }

    /// Get the total number of records
    pub fn count(&self) -> usize {
        self.db.len()
    }
}

impl AuditSink for AuditJournal {
    fn emit(&self, ctx: &EmitContext, event: AuditEvent) -> anyhow::Result<()> {
        self.append(ctx.cause, event).map(|_| ())
    }
}

fn decode_seq(key: &[u8]) -> Result<u64> {
    let bytes: [u8; 8] = key
        .try_into()
        .context("Corrupt journal key: expected 8 bytes")?;
    Ok(u64::from_be_bytes(bytes))
}

/// Get current timestamp in milliseconds
fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use audit_core::{SharedDirectoryRead, SharedDirectoryWrite};
    use std::time::Duration;
    use tempfile::TempDir;

    fn read(length: u32) -> AuditEvent {
        AuditEvent::from(SharedDirectoryRead {
            session_id: "sess".to_string(),
            directory_id: 1,
            directory_name: "dir".to_string(),
            path: "a.txt".to_string(),
            offset: 0,
            length,
        })
    }

    #[test]
    fn test_append_and_get() {
        let temp_dir = TempDir::new().unwrap();
        let journal = AuditJournal::open(temp_dir.path()).unwrap();

        let seq = journal.append(EmitCause::Deadline, read(50)).unwrap();
        let record = journal.get(seq).unwrap().unwrap();

        assert_eq!(record.seq, seq);
        assert_eq!(record.cause, EmitCause::Deadline);
        assert_eq!(record.event.length(), 50);
        assert!(record.recorded_at_ms > 0);
        assert!(journal.get(seq + 1).unwrap().is_none());
    }

    #[test]
    fn test_sequence_survives_reopen() {
        let temp_dir = TempDir::new().unwrap();

        {
            let journal = AuditJournal::open(temp_dir.path()).unwrap();
            journal.append(EmitCause::Deadline, read(1)).unwrap();
            journal.append(EmitCause::Flush, read(2)).unwrap();
        }

        let journal = AuditJournal::open(temp_dir.path()).unwrap();
        assert_eq!(journal.count(), 2);
        assert_eq!(journal.append(EmitCause::Flush, read(3)).unwrap(), 2);
    }

    #[test]
    fn test_last_n_oldest_first() {
        let temp_dir = TempDir::new().unwrap();
        let journal = AuditJournal::open(temp_dir.path()).unwrap();

        // More than 255 records so byte-wise key ordering matters
        for i in 0..300 {
            journal.append(EmitCause::Deadline, read(i)).unwrap();
        }

        let last: Vec<_> = journal
            .last_n(3)
            .unwrap()
            .into_iter()
            .map(|r| r.event.length())
            .collect();
        assert_eq!(last, vec![297, 298, 299]);
        assert_eq!(journal.records().unwrap().len(), 300);
    }

    #[test]
    fn test_journal_as_sink() {
        let temp_dir = TempDir::new().unwrap();
        let journal = AuditJournal::open(temp_dir.path()).unwrap();

        let event = AuditEvent::from(SharedDirectoryWrite {
            session_id: "sess".to_string(),
            directory_id: 4,
            directory_name: "share".to_string(),
            path: "out.bin".to_string(),
            offset: 8,
            length: 16,
        });
        let ctx = EmitContext::new(EmitCause::MaxDebounce, Duration::from_secs(5));
        journal.emit(&ctx, event.clone()).unwrap();

        let records = journal.records().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].cause, EmitCause::MaxDebounce);
        assert_eq!(records[0].event, event);
    }
}
