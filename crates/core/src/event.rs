//! Shared directory occurrence events
//!
//! Each value is one discrete I/O notification from the desktop file
//! redirection channel. The same types double as the combined record a
//! tracker emits: the first occurrence of a run is kept as a template and
//! re-issued with the run's offset and accumulated length.

use crate::AggregationKey;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of shared directory operation
///
/// A tracker only ever handles a single kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Read,
    Write,
}

impl OperationKind {
    /// Stable string code used in logs and CLI input
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An occurrence that can be merged into a pending run
pub trait Coalesce: Clone + Send + Sync + fmt::Debug + 'static {
    /// Operation kind this event type represents
    fn kind(&self) -> OperationKind;

    /// Aggregation key (directory id + path)
    fn key(&self) -> AggregationKey;

    /// Byte offset of the operation
    fn offset(&self) -> u64;

    /// Byte length of the operation
    fn length(&self) -> u32;

    /// Copy of this event's identifying fields carrying a new extent
    fn with_extent(&self, offset: u64, length: u32) -> Self;
}

/// A chunk read from a shared directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedDirectoryRead {
    /// Desktop session the read belongs to
    #[serde(default)]
    pub session_id: String,
    pub directory_id: u32,
    pub directory_name: String,
    pub path: String,
    pub offset: u64,
    pub length: u32,
}

/// A chunk written to a shared directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedDirectoryWrite {
    /// Desktop session the write belongs to
    #[serde(default)]
    pub session_id: String,
    pub directory_id: u32,
    pub directory_name: String,
    pub path: String,
    pub offset: u64,
    pub length: u32,
}

impl Coalesce for SharedDirectoryRead {
    fn kind(&self) -> OperationKind {
        OperationKind::Read
    }

    fn key(&self) -> AggregationKey {
        AggregationKey::new(self.directory_id, self.path.clone())
    }

    fn offset(&self) -> u64 {
        self.offset
    }

    fn length(&self) -> u32 {
        self.length
    }

    fn with_extent(&self, offset: u64, length: u32) -> Self {
        Self {
            offset,
            length,
            ..self.clone()
        }
    }
}

impl Coalesce for SharedDirectoryWrite {
    fn kind(&self) -> OperationKind {
        OperationKind::Write
    }

    fn key(&self) -> AggregationKey {
        AggregationKey::new(self.directory_id, self.path.clone())
    }

    fn offset(&self) -> u64 {
        self.offset
    }

    fn length(&self) -> u32 {
        self.length
    }

    fn with_extent(&self, offset: u64, length: u32) -> Self {
        Self {
            offset,
            length,
            ..self.clone()
        }
    }
}

/// Audit event delivered to a sink
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEvent {
    SharedDirectoryRead(SharedDirectoryRead),
    SharedDirectoryWrite(SharedDirectoryWrite),
}

impl AuditEvent {
    pub fn kind(&self) -> OperationKind {
        match self {
            Self::SharedDirectoryRead(e) => e.kind(),
            Self::SharedDirectoryWrite(e) => e.kind(),
        }
    }

    pub fn key(&self) -> AggregationKey {
        match self {
            Self::SharedDirectoryRead(e) => e.key(),
            Self::SharedDirectoryWrite(e) => e.key(),
        }
    }

    pub fn offset(&self) -> u64 {
        match self {
            Self::SharedDirectoryRead(e) => e.offset,
            Self::SharedDirectoryWrite(e) => e.offset,
        }
    }

    pub fn length(&self) -> u32 {
        match self {
            Self::SharedDirectoryRead(e) => e.length,
            Self::SharedDirectoryWrite(e) => e.length,
        }
    }

    pub fn session_id(&self) -> &str {
        match self {
            Self::SharedDirectoryRead(e) => &e.session_id,
            Self::SharedDirectoryWrite(e) => &e.session_id,
        }
    }
}

impl From<SharedDirectoryRead> for AuditEvent {
    fn from(event: SharedDirectoryRead) -> Self {
        Self::SharedDirectoryRead(event)
    }
}

impl From<SharedDirectoryWrite> for AuditEvent {
    fn from(event: SharedDirectoryWrite) -> Self {
        Self::SharedDirectoryWrite(event)
    }
}
