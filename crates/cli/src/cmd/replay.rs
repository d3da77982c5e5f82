//! Replay recorded occurrences through the trackers
//!
//! Time is virtual: the clock jumps to each occurrence's `at_ms`, firing any
//! deadlines that fall due on the way. The session closes at end of input.

use crate::cmd::config;
use crate::input::{self, TimedOccurrence};
use anyhow::{Context, Result};
use audit_core::{AuditConfig, AuditEvent};
use journal::AuditJournal;
use owo_colors::OwoColorize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracker::{ChannelSink, Clock, DirectoryAuditor, ManualClock};

/// Outcome of a replay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplaySummary {
    /// Occurrences read from the input
    pub occurrences: usize,
    /// Combined records written to the journal
    pub records: usize,
    /// Records emitted by the closing flush
    pub flushed: usize,
}

pub async fn run(input: &Path, journal_dir: &Path, config_path: Option<&Path>, session: &str) -> Result<()> {
    // 1. Load configuration and input
    let config = config::load(config_path)?;
    let occurrences = input::read_file(input)?;

    // 2. Open journal
    std::fs::create_dir_all(journal_dir)
        .with_context(|| format!("Failed to create journal directory {}", journal_dir.display()))?;
    let journal = Arc::new(AuditJournal::open(journal_dir).context("Failed to open audit journal")?);

    // 3. Replay
    let summary = replay(occurrences, config, session, journal).await?;

    // 4. Display output
    println!("{}", "Replay Complete".bold());
    println!("Occurrences:   {}", summary.occurrences.to_string().cyan());
    println!("Records:       {}", summary.records.to_string().green());
    println!("  on teardown: {}", summary.flushed);

    Ok(())
}

/// Drive a session auditor over `occurrences`, journaling every record
pub async fn replay(
    occurrences: Vec<TimedOccurrence>,
    config: AuditConfig,
    session: &str,
    journal: Arc<AuditJournal>,
) -> Result<ReplaySummary> {
    let (sink, mut rx) = ChannelSink::new();

    // sled inserts and flushes block, so the writer stays off the async workers
    let writer_journal = Arc::clone(&journal);
    let writer = tokio::task::spawn_blocking(move || {
        let mut written = 0usize;
        while let Some(emitted) = rx.blocking_recv() {
            writer_journal.append(emitted.cause, emitted.event)?;
            written += 1;
        }
        Ok::<_, anyhow::Error>(written)
    });

    let clock = Arc::new(ManualClock::new());
    let start = clock.now();
    let auditor = DirectoryAuditor::new(session, config, clock.clone(), Arc::new(sink));
    let total = occurrences.len();

    for occurrence in occurrences {
        clock.advance_to(start + Duration::from_millis(occurrence.at_ms));
        match occurrence.event {
            AuditEvent::SharedDirectoryRead(event) => auditor.on_read(event),
            AuditEvent::SharedDirectoryWrite(event) => auditor.on_write(event),
        }
    }

    tracing::debug!(pending = auditor.pending_len(), "End of input, closing session");
    let flushed = auditor.close();

    // Closing the auditor drops the sink, which ends the writer loop
    let records = writer.await.context("Audit writer task failed")??;

    Ok(ReplaySummary {
        occurrences: total,
        records,
        flushed,
    })
}
