//! Core type definitions for the cache system

use serde::{Deserialize, Serialize};
use std::fmt;

/// Statistics for cache behaviour monitoring
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CacheStats {
    /// Operations served from a stored result
    pub hits: u64,

    /// Cache-only operations that found nothing stored
    pub misses: u64,

    /// Operations sent on to the network stage
    pub forwarded: u64,

    /// Query results written to the store
    pub stored: u64,

    /// Entries removed by invalidation sweeps
    pub invalidations: u64,

    /// Operations re-submitted with a forced network-only policy
    pub reexecutions: u64,

    /// Number of entries currently in the store
    pub entries: usize,

    /// Number of type names with an index bucket
    pub tracked_types: usize,
}

impl CacheStats {
    /// Cache hit rate as a percentage of cache reads
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }

    /// Share of operations that never reached the network, as a percentage
    pub fn offload_rate(&self) -> f64 {
        let total = self.hits + self.misses + self.forwarded;
        if total == 0 {
            0.0
        } else {
            ((self.hits + self.misses) as f64 / total as f64) * 100.0
        }
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CacheStats {{ hits: {}, misses: {}, hit_rate: {:.2}%, forwarded: {}, offload_rate: {:.2}%, entries: {}, invalidations: {}, reexecutions: {} }}",
            self.hits,
            self.misses,
            self.hit_rate(),
            self.forwarded,
            self.offload_rate(),
            self.entries,
            self.invalidations,
            self.reexecutions
        )
    }
}
