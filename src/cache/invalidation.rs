//! Cache invalidation bookkeeping
//!
//! Invalidation is type-based: a sweep over a set of type names takes every
//! identity recorded under those names, drops the ones still stored, and
//! hands their operations back for network-only re-execution.

use crate::operation::{Operation, OperationKey};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Reason for cache invalidation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvalidationReason {
    /// A mutation result contained these types
    MutationResult { type_names: BTreeSet<String> },

    /// Invalidation requested by the caller for these types
    Manual { type_names: BTreeSet<String> },

    /// The whole cache was cleared
    Cleared,
}

impl std::fmt::Display for InvalidationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvalidationReason::MutationResult { type_names } => {
                write!(f, "mutation touched: {}", join(type_names))
            }
            InvalidationReason::Manual { type_names } => {
                write!(f, "manual invalidation: {}", join(type_names))
            }
            InvalidationReason::Cleared => write!(f, "cache cleared"),
        }
    }
}

fn join(names: &BTreeSet<String>) -> String {
    names.iter().cloned().collect::<Vec<_>>().join(", ")
}

/// Event describing one invalidation pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvalidationEvent {
    /// Reason for invalidation
    pub reason: InvalidationReason,

    /// When the invalidation occurred
    pub timestamp: DateTime<Utc>,

    /// Keys whose entries were removed
    pub keys: Vec<OperationKey>,

    /// Additional context
    pub context: Option<String>,
}

impl InvalidationEvent {
    /// Create a new invalidation event
    pub fn new(reason: InvalidationReason, keys: Vec<OperationKey>) -> Self {
        Self {
            reason,
            timestamp: Utc::now(),
            keys,
            context: None,
        }
    }

    /// Add context to the event
    pub fn with_context(mut self, context: String) -> Self {
        self.context = Some(context);
        self
    }

    /// Whether the pass removed anything
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Outcome of a sweep: the event plus the operations to re-execute
#[derive(Debug, Clone)]
pub struct Sweep {
    pub event: InvalidationEvent,
    pub stale: Vec<Operation>,
}
