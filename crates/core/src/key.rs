//! Aggregation keys

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity under which occurrences are combined
///
/// Two occurrences combine if and only if their keys are equal. Different
/// paths under the same directory never combine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AggregationKey {
    /// Shared directory id
    pub directory_id: u32,
    /// Path within the shared directory
    pub path: String,
}

impl AggregationKey {
    pub fn new(directory_id: u32, path: impl Into<String>) -> Self {
        Self {
            directory_id,
            path: path.into(),
        }
    }
}

impl fmt::Display for AggregationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.directory_id, self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_key_display() {
        let key = AggregationKey::new(7, r"C:\Windows\logs\teleport.txt");
        assert_eq!(key.to_string(), r"7/C:\Windows\logs\teleport.txt");
    }

    #[test]
    fn test_same_directory_different_paths_are_distinct() {
        let mut keys = HashSet::new();
        keys.insert(AggregationKey::new(1, "a.txt"));
        keys.insert(AggregationKey::new(1, "b.txt"));
        keys.insert(AggregationKey::new(2, "a.txt"));
        keys.insert(AggregationKey::new(1, "a.txt"));
        assert_eq!(keys.len(), 3);
    }
}
