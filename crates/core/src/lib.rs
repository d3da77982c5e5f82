//! Core types for shared directory audit coalescing
//!
//! This crate provides:
//! - Occurrence events for shared directory reads and writes
//! - Aggregation keys (directory id + path)
//! - Tracker configuration (debounce / max-debounce)
//! - The `AuditSink` emission seam

pub mod config;
pub mod error;
pub mod event;
pub mod key;
pub mod sink;

// Re-exports
pub use config::{AuditConfig, TrackerConfig};
pub use error::{Error, Result};
pub use event::{AuditEvent, Coalesce, OperationKind, SharedDirectoryRead, SharedDirectoryWrite};
pub use key::AggregationKey;
pub use sink::{AuditSink, EmitCause, EmitContext, FnSink};
