//! Show journaled audit records

use anyhow::{Context, Result};
use audit_core::{EmitCause, OperationKind};
use journal::{AuditJournal, JournalRecord};
use owo_colors::OwoColorize;
use std::path::Path;

const DEFAULT_LIMIT: usize = 20;

pub async fn run(journal_dir: &Path, limit: Option<usize>, json: bool) -> Result<()> {
    if !journal_dir.exists() {
        anyhow::bail!("No audit journal at {}", journal_dir.display());
    }

    let journal = AuditJournal::open(journal_dir).context("Failed to open audit journal")?;
    let records = journal.last_n(limit.unwrap_or(DEFAULT_LIMIT))?;

    if json {
        for record in &records {
            println!("{}", serde_json::to_string(record)?);
        }
        return Ok(());
    }

    if records.is_empty() {
        println!("{}", "No audit records".dimmed());
        return Ok(());
    }

    println!(
        "{}",
        format!("Showing {} of {} records", records.len(), journal.count()).bold()
    );
    println!();
    for record in &records {
        println!("{}", format_record(record));
    }

    Ok(())
}

fn format_record(record: &JournalRecord) -> String {
    let kind = match record.event.kind() {
        OperationKind::Read => "read ".green().to_string(),
        OperationKind::Write => "write".yellow().to_string(),
    };
    let cause = match record.cause {
        EmitCause::Flush => record.cause.to_string().magenta().to_string(),
        _ => record.cause.to_string().dimmed().to_string(),
    };

    format!(
        "{:>6}  {}  {:<12}  {}  offset={} length={}",
        record.seq.to_string().cyan(),
        kind,
        cause,
        record.event.key(),
        record.event.offset(),
        record.event.length(),
    )
}
