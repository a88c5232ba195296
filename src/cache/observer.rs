//! Optional observability hook for the cache exchange

use crate::operation::{OperationKey, RequestPolicy};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Mutex;
use tracing::info;

/// Something the cache exchange decided or did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CacheEvent {
    /// An operation was served from the store (or as a cache-only miss)
    Served {
        key: OperationKey,
        policy: RequestPolicy,
        hit: bool,
    },
    /// An operation was sent on to the network stage
    Forwarded { key: OperationKey, kind: String },
    /// A query result was written to the store
    Stored {
        key: OperationKey,
        type_names: BTreeSet<String>,
    },
    /// Entries were removed by a sweep over these types
    Invalidated {
        type_names: BTreeSet<String>,
        keys: Vec<OperationKey>,
    },
    /// An operation was re-submitted with a network-only policy
    Reexecuted { key: OperationKey },
}

/// Receives cache events; called synchronously from the event handlers
pub trait CacheObserver: Send + Sync {
    fn on_event(&self, event: &CacheEvent);
}

/// Observer that reports every event through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl CacheObserver for TracingObserver {
    fn on_event(&self, event: &CacheEvent) {
        match event {
            CacheEvent::Served { key, policy, hit } => {
                info!(key = %key.short(), %policy, hit, "cache served");
            }
            CacheEvent::Forwarded { key, kind } => {
                info!(key = %key.short(), kind = %kind, "cache forwarded");
            }
            CacheEvent::Stored { key, type_names } => {
                info!(key = %key.short(), types = ?type_names, "cache stored");
            }
            CacheEvent::Invalidated { type_names, keys } => {
                info!(types = ?type_names, removed = keys.len(), "cache invalidated");
            }
            CacheEvent::Reexecuted { key } => {
                info!(key = %key.short(), "cache reexecuted");
            }
        }
    }
}

/// Observer that keeps every event in memory
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<CacheEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events seen so far
    pub fn events(&self) -> Vec<CacheEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Number of re-executions seen for `key`
    pub fn reexecutions_of(&self, key: &OperationKey) -> usize {
        self.events()
            .iter()
            .filter(|event| matches!(event, CacheEvent::Reexecuted { key: k } if k == key))
            .count()
    }
}

impl CacheObserver for RecordingObserver {
    fn on_event(&self, event: &CacheEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}
