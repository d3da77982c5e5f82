//! Recorded occurrence input for replay
//!
//! One JSON object per line; blank lines and `#` comments are skipped:
//!
//! ```text
//! {"at_ms": 0, "op": "read", "directory_id": 1, "directory_name": "dir", "path": "a.txt", "offset": 0, "length": 10}
//! ```
//!
//! `at_ms` is the occurrence time relative to the start of the recording and
//! must never decrease.

use anyhow::{Context, Result};
use audit_core::{AuditEvent, OperationKind, SharedDirectoryRead, SharedDirectoryWrite};
use serde::Deserialize;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// One recorded occurrence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimedOccurrence {
    /// Milliseconds since the start of the recording
    pub at_ms: u64,
    pub event: AuditEvent,
}

#[derive(Deserialize)]
struct RawLine {
    at_ms: u64,
    op: OperationKind,
    #[serde(default)]
    session_id: String,
    directory_id: u32,
    directory_name: String,
    path: String,
    #[serde(default)]
    offset: u64,
    length: u32,
}

impl RawLine {
    fn into_occurrence(self) -> TimedOccurrence {
        let event = match self.op {
            OperationKind::Read => AuditEvent::from(SharedDirectoryRead {
                session_id: self.session_id,
                directory_id: self.directory_id,
                directory_name: self.directory_name,
                path: self.path,
                offset: self.offset,
                length: self.length,
            }),
            OperationKind::Write => AuditEvent::from(SharedDirectoryWrite {
                session_id: self.session_id,
                directory_id: self.directory_id,
                directory_name: self.directory_name,
                path: self.path,
                offset: self.offset,
                length: self.length,
            }),
        };

        TimedOccurrence {
            at_ms: self.at_ms,
            event,
        }
    }
}

/// Read occurrences from a JSON-lines file
pub fn read_file(path: &Path) -> Result<Vec<TimedOccurrence>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open input {}", path.display()))?;
    parse(BufReader::new(file))
}

/// Parse occurrences from JSON lines
pub fn parse(reader: impl BufRead) -> Result<Vec<TimedOccurrence>> {
    let mut occurrences: Vec<TimedOccurrence> = Vec::new();

    for (idx, line) in reader.lines().enumerate() {
        let line_no = idx + 1;
        let line = line.with_context(|| format!("Failed to read line {}", line_no))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let raw: RawLine = serde_json::from_str(trimmed)
            .with_context(|| format!("Invalid occurrence on line {}", line_no))?;

        if let Some(prev) = occurrences.last() {
            if raw.at_ms < prev.at_ms {
                anyhow::bail!(
                    "Out-of-order occurrence on line {}: at_ms {} is before {}",
                    line_no,
                    raw.at_ms,
                    prev.at_ms
                );
            }
        }

        occurrences.push(raw.into_occurrence());
    }

    Ok(occurrences)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_parse_reads_and_writes() {
        let input = r#"
# recorded session
{"at_ms": 0, "op": "read", "directory_id": 1, "directory_name": "dir", "path": "a.txt", "offset": 42, "length": 10}

{"at_ms": 5, "op": "write", "session_id": "s1", "directory_id": 1, "directory_name": "dir", "path": "b.txt", "length": 3}
"#;
        let occurrences = parse(Cursor::new(input)).unwrap();

        assert_eq!(occurrences.len(), 2);
        assert_eq!(occurrences[0].event.kind(), OperationKind::Read);
        assert_eq!(occurrences[0].event.offset(), 42);
        assert_eq!(occurrences[1].at_ms, 5);
        assert_eq!(occurrences[1].event.kind(), OperationKind::Write);
        assert_eq!(occurrences[1].event.session_id(), "s1");
        assert_eq!(occurrences[1].event.offset(), 0);
    }

    #[test]
    fn test_parse_rejects_out_of_order() {
        let input = concat!(
            r#"{"at_ms": 10, "op": "read", "directory_id": 1, "directory_name": "d", "path": "a", "length": 1}"#,
            "\n",
            r#"{"at_ms": 9, "op": "read", "directory_id": 1, "directory_name": "d", "path": "a", "length": 1}"#,
            "\n",
        );
        let err = parse(Cursor::new(input)).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_parse_reports_bad_line_number() {
        let input = "{\"at_ms\": 0}\n";
        let err = parse(Cursor::new(input)).unwrap_err();
        assert!(err.to_string().contains("line 1"));
    }
}
