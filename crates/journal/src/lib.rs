//! Durable audit log
//!
//! This crate provides:
//! - Append-only journal of combined audit events (sled embedded DB)
//! - An `AuditSink` implementation writing straight to the journal

pub mod journal;

// Re-exports
pub use journal::{AuditJournal, JournalRecord};

/// Result type for journal operations
pub type Result<T> = anyhow::Result<T>;
