//! # Document Cache with Type-Based Invalidation
//!
//! This module implements the caching stage of the operation pipeline. It
//! stores whole operation results keyed by operation identity, and uses the
//! type names found in those results to decide which entries a mutation may
//! have made stale.
//!
//! ## Features
//!
//! - **Request policies**: cache-first, cache-only, network-only and
//!   cache-and-network, chosen per operation
//! - **Type-based invalidation**: a mutation result sweeps every stored query
//!   that shares a type with it, without any server-side signal
//! - **Silent refresh**: swept queries are re-submitted as network-only so
//!   live subscribers receive fresh data
//! - **Observability**: `tracing` logs plus an optional [`CacheObserver`] hook
//!
//! ## Example
//!
//! ```rust
//! use ouroboros_exchange::cache::{CacheConfig, CacheExchange, Resubmit, Route};
//! use ouroboros_exchange::operation::{Operation, OperationResult};
//! use serde_json::json;
//! use std::cell::RefCell;
//!
//! struct Queue(RefCell<Vec<Operation>>);
//!
//! impl Resubmit for Queue {
//!     fn resubmit(&self, operation: Operation) {
//!         self.0.borrow_mut().push(operation);
//!     }
//! }
//!
//! let queue = Queue(RefCell::new(Vec::new()));
//! let mut cache = CacheExchange::new(CacheConfig::default());
//! let query = Operation::query("{ user { id } }", json!({}));
//!
//! // First sight of the query goes to the network
//! let Route::Forward(forwarded) = cache.on_operation(query.clone(), &queue) else {
//!     unreachable!()
//! };
//! let data = json!({"user": {"__typename": "User", "id": 1}});
//! cache.on_result(OperationResult::data(forwarded, data.clone()), &queue);
//!
//! // The second is answered from the store
//! match cache.on_operation(query, &queue) {
//!     Route::Cached(result) => assert_eq!(result.data, Some(data)),
//!     Route::Forward(_) => unreachable!(),
//! }
//! ```

pub mod config;
pub mod entry;
pub mod exchange;
pub mod invalidation;
pub mod observer;
pub mod store;
pub mod types;

pub use config::{CacheConfig, CacheConfigBuilder};
pub use entry::{CacheMetadata, CachedResult};
pub use exchange::{reexecute_operation, CacheExchange, Classification, Resubmit, Route};
pub use invalidation::{InvalidationEvent, InvalidationReason, Sweep};
pub use observer::{CacheEvent, CacheObserver, RecordingObserver, TracingObserver};
pub use store::{CacheStore, ResultStore, TypeIndex};
pub use types::CacheStats;
