//! The cache exchange: a pipeline stage routing operations between the
//! result store and the network
//!
//! Each incoming operation is either served from the store or forwarded with
//! its document annotated for type names. Each result coming back from the
//! network is observed before it moves downstream: query results are stored
//! and indexed by type, mutation results sweep every stored query sharing a
//! type with them and re-submit those queries as network-only.
//!
//! Re-submission never recurses into the exchange. It goes through a
//! [`Resubmit`] handle that enqueues the operation at the pipeline entry, so
//! a re-executed query is handled later as an ordinary event.

use crate::cache::{
    config::CacheConfig,
    entry::CachedResult,
    invalidation::{InvalidationEvent, InvalidationReason},
    observer::{CacheEvent, CacheObserver},
    store::CacheStore,
    types::CacheStats,
};
use crate::error::Result;
use crate::operation::{Operation, OperationKey, OperationKind, OperationResult, RequestPolicy};
use crate::typenames::{DocumentTyper, TypenameTyper};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info};

/// Entry point of the pipeline, as seen from inside a stage
pub trait Resubmit {
    /// Inject an operation as if a caller had just issued it
    fn resubmit(&self, operation: Operation);
}

/// Re-submit `operation` with its request policy forced to network-only
///
/// The copy keeps the identity and document, so its result fills the same
/// store slot, and network-only always forwards, so it cannot loop back
/// into the cache.
pub fn reexecute_operation(dispatcher: &dyn Resubmit, operation: &Operation) {
    debug!("Reexecuting operation: {}", operation.key.short());
    dispatcher.resubmit(operation.with_request_policy(RequestPolicy::NetworkOnly));
}

/// How the exchange will treat an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Answer from the store without (or alongside) a network request
    Servable,
    /// Annotate and send to the network
    Forward,
    /// Not a query or mutation; passes through untouched
    Bypass,
}

/// Where an operation went
#[derive(Debug, Clone, PartialEq)]
pub enum Route {
    /// Answered from the store; emit downstream immediately
    Cached(OperationResult),
    /// Hand to the network stage
    Forward(Operation),
}

/// Document cache with type-based invalidation
///
/// Owns its result store and type index outright. Handlers take `&mut self`
/// and must be driven one event at a time.
pub struct CacheExchange {
    config: CacheConfig,
    store: CacheStore,
    typer: Box<dyn DocumentTyper>,
    observer: Option<Arc<dyn CacheObserver>>,
    stats: CacheStats,
}

impl CacheExchange {
    /// Create an exchange using the type-name field from `config`
    pub fn new(config: CacheConfig) -> Self {
        let typer = TypenameTyper::new(config.typename_field.clone());
        Self::with_typer(config, typer)
    }

    /// Create an exchange after validating `config`
    pub fn try_new(config: CacheConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(config))
    }

    /// Create an exchange with a custom document typer
    pub fn with_typer(config: CacheConfig, typer: impl DocumentTyper + 'static) -> Self {
        info!(
            "Initializing cache exchange (default policy: {}, typename field: {})",
            config.default_request_policy, config.typename_field
        );

        Self {
            config,
            store: CacheStore::new(),
            typer: Box::new(typer),
            observer: None,
            stats: CacheStats::default(),
        }
    }

    /// Attach an observer
    pub fn with_observer(mut self, observer: Arc<dyn CacheObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    /// Stored entry for an identity
    pub fn cached(&self, key: &OperationKey) -> Option<&CachedResult> {
        self.store.get(key)
    }

    /// Current statistics
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.store.results().len(),
            tracked_types: self.store.types().len(),
            ..self.stats.clone()
        }
    }

    /// Decide how an operation will be handled, without side effects
    ///
    /// Only queries are servable, and only when the policy allows reading
    /// the cache and either a result is stored or the policy is cache-only.
    pub fn classify(&self, operation: &Operation) -> Classification {
        if !operation.kind.is_cache_relevant() {
            return Classification::Bypass;
        }

        let policy = operation.request_policy();
        let servable = operation.kind == OperationKind::Query
            && policy != RequestPolicy::NetworkOnly
            && (policy == RequestPolicy::CacheOnly || self.store.contains(&operation.key));

        if servable {
            Classification::Servable
        } else {
            Classification::Forward
        }
    }

    /// Route an incoming operation
    pub fn on_operation(&mut self, operation: Operation, dispatcher: &dyn Resubmit) -> Route {
        let classification = self.classify(&operation);
        debug!(
            "Classified {} {} ({}): {:?}",
            operation.kind,
            operation.key.short(),
            operation.request_policy(),
            classification
        );

        match classification {
            Classification::Servable => Route::Cached(self.serve(operation, dispatcher)),
            Classification::Forward => {
                let annotated = operation.with_query(self.typer.annotate(&operation.query));
                self.forwarded(&annotated);
                Route::Forward(annotated)
            }
            Classification::Bypass => {
                self.forwarded(&operation);
                Route::Forward(operation)
            }
        }
    }

    /// Observe a result coming back from the network and pass it on
    pub fn on_result(&mut self, result: OperationResult, dispatcher: &dyn Resubmit) -> OperationResult {
        match result.operation.kind {
            OperationKind::Mutation => self.after_mutation(&result, dispatcher),
            OperationKind::Query => self.after_query(&result),
            _ => {}
        }
        result
    }

    /// Sweep the given types as a mutation would, re-executing affected queries
    pub fn invalidate_types<I, S>(&mut self, type_names: I, dispatcher: &dyn Resubmit) -> InvalidationEvent
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let type_names: BTreeSet<String> = type_names.into_iter().map(Into::into).collect();
        let reason = InvalidationReason::Manual {
            type_names: type_names.clone(),
        };
        self.invalidate(&type_names, reason, dispatcher)
    }

    /// Drop every stored result without re-executing anything
    pub fn clear(&mut self) -> InvalidationEvent {
        let event = self.store.clear();
        info!("Cleared {} entries from cache", event.keys.len());
        self.record(|stats| stats.invalidations += event.keys.len() as u64);
        event
    }

    fn serve(&mut self, operation: Operation, dispatcher: &dyn Resubmit) -> OperationResult {
        let policy = operation.request_policy();
        if policy == RequestPolicy::CacheAndNetwork {
            self.reexecute(&operation, dispatcher);
        }

        let served = self.store.serve(&operation.key);
        let hit = served.is_some();
        if hit {
            debug!("Cache hit: {}", operation.key.short());
            self.record(|stats| stats.hits += 1);
        } else {
            debug!("Cache miss under cache-only: {}", operation.key.short());
            self.record(|stats| stats.misses += 1);
        }

        self.emit(CacheEvent::Served {
            key: operation.key,
            policy,
            hit,
        });

        served.unwrap_or_else(|| OperationResult::empty(operation))
    }

    fn forwarded(&mut self, operation: &Operation) {
        self.record(|stats| stats.forwarded += 1);
        self.emit(CacheEvent::Forwarded {
            key: operation.key,
            kind: operation.kind.to_string(),
        });
    }

    fn after_query(&mut self, result: &OperationResult) {
        if result.data.is_none() {
            return;
        }

        let key = result.operation.key;
        let type_names = self.typer.collect_type_names(result.data.as_ref());
        self.store.store(result.clone(), type_names.clone());
        self.record(|stats| stats.stored += 1);
        self.emit(CacheEvent::Stored { key, type_names });
    }

    fn after_mutation(&mut self, result: &OperationResult, dispatcher: &dyn Resubmit) {
        let type_names = self.typer.collect_type_names(result.data.as_ref());
        if type_names.is_empty() {
            return;
        }

        let reason = InvalidationReason::MutationResult {
            type_names: type_names.clone(),
        };
        self.invalidate(&type_names, reason, dispatcher);
    }

    fn invalidate(
        &mut self,
        type_names: &BTreeSet<String>,
        reason: InvalidationReason,
        dispatcher: &dyn Resubmit,
    ) -> InvalidationEvent {
        let sweep = self.store.sweep(type_names, reason);
        let removed = sweep.event.keys.len();

        if removed > 0 {
            info!("Invalidated {} entries ({})", removed, sweep.event.reason);
        } else {
            debug!("Invalidation found no stored entries ({})", sweep.event.reason);
        }

        self.record(|stats| stats.invalidations += removed as u64);
        self.emit(CacheEvent::Invalidated {
            type_names: type_names.clone(),
            keys: sweep.event.keys.clone(),
        });

        for operation in &sweep.stale {
            self.reexecute(operation, dispatcher);
        }

        sweep.event
    }

    fn reexecute(&mut self, operation: &Operation, dispatcher: &dyn Resubmit) {
        reexecute_operation(dispatcher, operation);
        self.record(|stats| stats.reexecutions += 1);
        self.emit(CacheEvent::Reexecuted { key: operation.key });
    }

    fn record(&mut self, update: impl FnOnce(&mut CacheStats)) {
        if self.config.enable_metrics {
            update(&mut self.stats);
        }
    }

    fn emit(&self, event: CacheEvent) {
        if let Some(observer) = &self.observer {
            observer.on_event(&event);
        }
    }
}

impl std::fmt::Debug for CacheExchange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheExchange")
            .field("config", &self.config)
            .field("entries", &self.store.results().len())
            .field("tracked_types", &self.store.types().len())
            .field("has_observer", &self.observer.is_some())
            .finish()
    }
}
