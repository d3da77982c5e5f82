//! Audit event coalescing for shared directory access
//!
//! This crate provides:
//! - Per-key debouncing with a hard max-debounce ceiling
//! - Exactly-once emission across deadlines, forced closes and flushes
//! - A swappable clock (real time or manually advanced virtual time)
//! - A per-session auditor owning one tracker per operation kind

pub mod clock;
pub mod debounce;
pub mod session;
pub mod sink;
pub mod timer;

// Re-exports
pub use clock::{Clock, ManualClock, SystemClock};
pub use debounce::Tracker;
pub use session::DirectoryAuditor;
pub use sink::{ChannelSink, Emitted};
pub use timer::{TimerHandle, TimerQueue, TimerTask};
