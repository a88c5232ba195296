//! # Ouroboros Exchange (ouroboros-exchange)
//!
//! A result cache for typed query/mutation pipelines. It sits between the
//! callers issuing operations and the transport that executes them, answers
//! repeated queries from memory, and invalidates cached results when a
//! mutation response mentions a type they contain. No server-side
//! invalidation signal is needed.
//!
//! ## Features
//!
//! - Four request policies per operation: cache-first, cache-only,
//!   network-only, cache-and-network
//! - Deterministic SHA-256 operation identity over (document, variables)
//! - Automatic `__typename` annotation of forwarded documents
//! - Type-based invalidation with silent network-only refresh of affected
//!   queries
//! - Async pipeline driver on tokio with out-of-order completion
//!
//! ## Quick start
//!
//! ```no_run
//! use async_trait::async_trait;
//! use ouroboros_exchange::{CacheConfig, Client, Operation, OperationResult, Transport};
//! use serde_json::json;
//!
//! struct Backend;
//!
//! #[async_trait]
//! impl Transport for Backend {
//!     async fn execute(&self, operation: Operation) -> Option<OperationResult> {
//!         // Send the annotated document to the service here
//!         Some(OperationResult::data(operation, json!({})))
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut client = Client::new(CacheConfig::from_env()?, Backend)?;
//!
//!     let query = client.query("{ user(id: 1) { id name } }", json!({}));
//!     client.submit(query.clone())?;
//!     client.submit(query)?;
//!
//!     for result in client.run_until_idle().await {
//!         println!("{:?}", result.data);
//!     }
//!     println!("{}", client.stats());
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod client;
pub mod error;
pub mod operation;
pub mod typenames;

// Re-export main types for convenience
pub use cache::{
    CacheConfig, CacheConfigBuilder, CacheEvent, CacheExchange, CacheObserver, CacheStats,
    CachedResult, Classification, InvalidationEvent, InvalidationReason, Resubmit, Route,
    TracingObserver,
};
pub use client::{Client, Dispatcher, Transport};
pub use error::{ExchangeError, Result};
pub use operation::{
    Document, Operation, OperationContext, OperationError, OperationKey, OperationKind,
    OperationResult, RequestPolicy,
};
pub use typenames::{DocumentTyper, TypenameTyper};
