//! Emission seam between trackers and the durable audit log

use crate::AuditEvent;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::Span;

/// Why a pending run was emitted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmitCause {
    /// Quiet period elapsed (or the deadline clamp at max-debounce was hit)
    Deadline,
    /// A new occurrence arrived after the run outlived max-debounce
    MaxDebounce,
    /// Explicit flush (session teardown)
    Flush,
}

impl EmitCause {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Deadline => "deadline",
            Self::MaxDebounce => "max_debounce",
            Self::Flush => "flush",
        }
    }
}

impl fmt::Display for EmitCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trace context handed to every emission
#[derive(Debug, Clone)]
pub struct EmitContext {
    /// What closed the run
    pub cause: EmitCause,
    /// Time between the run's first occurrence and its emission
    pub run_duration: Duration,
    /// Span the emission was issued under
    pub span: Span,
}

impl EmitContext {
    pub fn new(cause: EmitCause, run_duration: Duration) -> Self {
        Self {
            cause,
            run_duration,
            span: Span::current(),
        }
    }
}

/// Destination for combined audit events
///
/// Delivery failures belong to the sink. Callers log a returned error and
/// move on; they never retry, since re-emitting combined volume would
/// double-count it.
pub trait AuditSink: Send + Sync {
    fn emit(&self, ctx: &EmitContext, event: AuditEvent) -> anyhow::Result<()>;
}

impl<S: AuditSink + ?Sized> AuditSink for Arc<S> {
    fn emit(&self, ctx: &EmitContext, event: AuditEvent) -> anyhow::Result<()> {
        (**self).emit(ctx, event)
    }
}

/// Closure-backed sink
pub struct FnSink<F>(pub F);

impl<F> AuditSink for FnSink<F>
where
    F: Fn(&EmitContext, AuditEvent) -> anyhow::Result<()> + Send + Sync,
{
    fn emit(&self, ctx: &EmitContext, event: AuditEvent) -> anyhow::Result<()> {
        (self.0)(ctx, event)
    }
}
