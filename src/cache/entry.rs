//! Stored results and their metadata

use crate::operation::OperationResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A stored query result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedResult {
    /// The result as it came back from the network
    pub result: OperationResult,

    /// Entry metadata
    pub metadata: CacheMetadata,
}

impl CachedResult {
    /// Wrap a freshly received result
    pub fn new(result: OperationResult, type_names: BTreeSet<String>) -> Self {
        Self {
            result,
            metadata: CacheMetadata {
                stored_at: Utc::now(),
                served_at: None,
                serve_count: 0,
                type_names,
            },
        }
    }

    /// Mark the entry as served from cache
    pub fn mark_served(&mut self) {
        self.metadata.served_at = Some(Utc::now());
        self.metadata.serve_count += 1;
    }
}

/// Metadata associated with a stored result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheMetadata {
    /// When the result was stored
    pub stored_at: DateTime<Utc>,

    /// Last time the result was served from cache
    pub served_at: Option<DateTime<Utc>>,

    /// Number of times the result was served from cache
    pub serve_count: u64,

    /// Type names found in the result when it was stored
    pub type_names: BTreeSet<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::Operation;
    use serde_json::json;

    fn entry() -> CachedResult {
        let op = Operation::query("{ user { id } }", json!({}));
        let result = OperationResult::data(op, json!({"user": {"__typename": "User", "id": 1}}));
        CachedResult::new(result, BTreeSet::from(["User".to_string()]))
    }

    #[test]
    fn test_cached_result_creation() {
        let entry = entry();
        assert_eq!(entry.metadata.serve_count, 0);
        assert!(entry.metadata.served_at.is_none());
        assert!(entry.metadata.type_names.contains("User"));
        assert!(!entry.metadata.type_names.contains("Post"));
    }

    #[test]
    fn test_mark_served() {
        let mut entry = entry();
        entry.mark_served();
        entry.mark_served();

        assert_eq!(entry.metadata.serve_count, 2);
        assert!(entry.metadata.served_at.is_some());
    }
}
