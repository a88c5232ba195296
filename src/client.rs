//! Pipeline driver
//!
//! `Client` owns the cache exchange and a transport, and drives both from a
//! single task. Operations enter through an unbounded queue: callers push to
//! it with a [`Dispatcher`], and the exchange pushes re-executions to the
//! same queue. Forwarded operations run concurrently on the transport and
//! their results are observed in completion order, which across different
//! identities need not match submission order.

use crate::cache::{CacheConfig, CacheExchange, CacheStats, InvalidationEvent, Resubmit, Route};
use crate::error::{ExchangeError, Result};
use crate::operation::{
    Document, Operation, OperationContext, OperationKind, OperationResult, RequestPolicy,
};
use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, Stream, StreamExt};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Network stage at the end of the pipeline
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Execute an operation
    ///
    /// Returns `None` when the operation produces no result, as for
    /// teardown control operations.
    async fn execute(&self, operation: Operation) -> Option<OperationResult>;
}

/// Handle for injecting operations at the pipeline entry
#[derive(Debug, Clone)]
pub struct Dispatcher {
    sender: mpsc::UnboundedSender<Operation>,
}

impl Dispatcher {
    /// Submit an operation as issued
    pub fn submit(&self, operation: Operation) -> Result<()> {
        self.sender
            .send(operation)
            .map_err(|e| ExchangeError::PipelineClosed {
                context: format!("submit {}", e.0.key.short()),
            })
    }

    /// Submit a network-only copy of an operation
    pub fn reexecute(&self, operation: &Operation) -> Result<()> {
        self.submit(operation.with_request_policy(RequestPolicy::NetworkOnly))
    }
}

impl Resubmit for Dispatcher {
    fn resubmit(&self, operation: Operation) {
        if let Err(e) = self.submit(operation) {
            warn!("Dropping re-submitted operation: {}", e);
        }
    }
}

/// Client driving a cache exchange in front of a transport
pub struct Client<T: Transport> {
    exchange: CacheExchange,
    transport: Arc<T>,
    dispatcher: Dispatcher,
    queue: mpsc::UnboundedReceiver<Operation>,
    in_flight: FuturesUnordered<BoxFuture<'static, Option<OperationResult>>>,
}

impl<T: Transport> Client<T> {
    /// Create a client with a fresh cache exchange
    pub fn new(config: CacheConfig, transport: T) -> Result<Self> {
        Ok(Self::with_exchange(CacheExchange::try_new(config)?, transport))
    }

    /// Create a client around an existing exchange
    pub fn with_exchange(exchange: CacheExchange, transport: T) -> Self {
        let (sender, queue) = mpsc::unbounded_channel();
        Self {
            exchange,
            transport: Arc::new(transport),
            dispatcher: Dispatcher { sender },
            queue,
            in_flight: FuturesUnordered::new(),
        }
    }

    /// Handle for submitting operations
    pub fn dispatcher(&self) -> Dispatcher {
        self.dispatcher.clone()
    }

    pub fn exchange(&self) -> &CacheExchange {
        &self.exchange
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn stats(&self) -> CacheStats {
        self.exchange.stats()
    }

    /// Number of operations waiting on the transport
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Build an operation carrying the configured default request policy
    pub fn operation(
        &self,
        kind: OperationKind,
        query: impl Into<Document>,
        variables: JsonValue,
    ) -> Operation {
        let context = OperationContext {
            request_policy: self.exchange.config().default_request_policy,
        };
        Operation::new(kind, query, variables, context)
    }

    pub fn query(&self, query: impl Into<Document>, variables: JsonValue) -> Operation {
        self.operation(OperationKind::Query, query, variables)
    }

    pub fn mutation(&self, query: impl Into<Document>, variables: JsonValue) -> Operation {
        self.operation(OperationKind::Mutation, query, variables)
    }

    /// Submit an operation to the pipeline entry
    pub fn submit(&self, operation: Operation) -> Result<()> {
        self.dispatcher.submit(operation)
    }

    /// Sweep the given types and re-execute the queries they referenced
    pub fn invalidate_types<I, S>(&mut self, type_names: I) -> InvalidationEvent
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exchange.invalidate_types(type_names, &self.dispatcher)
    }

    /// Drop every cached result
    pub fn clear(&mut self) -> InvalidationEvent {
        self.exchange.clear()
    }

    /// Drive the pipeline until the next result moves downstream
    ///
    /// Queued operations are routed first, in arrival order. Waits for new
    /// operations when nothing is queued or in flight. The client keeps a
    /// sender of its own for re-executions, so an idle pipeline waits
    /// indefinitely rather than returning `None`; bound the wait with
    /// `tokio::time::timeout` or use [`Client::run_until_idle`].
    pub async fn next_result(&mut self) -> Option<OperationResult> {
        loop {
            while let Ok(operation) = self.queue.try_recv() {
                if let Some(result) = self.route(operation) {
                    return Some(result);
                }
            }

            if self.in_flight.is_empty() {
                let operation = self.queue.recv().await?;
                if let Some(result) = self.route(operation) {
                    return Some(result);
                }
                continue;
            }

            tokio::select! {
                Some(operation) = self.queue.recv() => {
                    if let Some(result) = self.route(operation) {
                        return Some(result);
                    }
                }
                Some(completed) = self.in_flight.next() => {
                    if let Some(result) = completed {
                        return Some(self.observe(result));
                    }
                }
                else => return None,
            }
        }
    }

    /// Drive the pipeline until nothing is queued or in flight
    ///
    /// Returns every result that moved downstream, in emission order.
    pub async fn run_until_idle(&mut self) -> Vec<OperationResult> {
        let mut results = Vec::new();
        loop {
            while let Ok(operation) = self.queue.try_recv() {
                if let Some(result) = self.route(operation) {
                    results.push(result);
                }
            }

            match self.in_flight.next().await {
                Some(Some(result)) => results.push(self.observe(result)),
                Some(None) => {}
                None => break,
            }
        }
        debug!("Pipeline idle after {} results", results.len());
        results
    }

    /// Downstream stream of results
    ///
    /// The stream never ends on its own; take what is needed from it or
    /// drop it to shut the pipeline down.
    pub fn into_stream(self) -> impl Stream<Item = OperationResult> {
        futures::stream::unfold(self, |mut client| async move {
            let result = client.next_result().await?;
            Some((result, client))
        })
    }

    fn route(&mut self, operation: Operation) -> Option<OperationResult> {
        match self.exchange.on_operation(operation, &self.dispatcher) {
            Route::Cached(result) => Some(result),
            Route::Forward(operation) => {
                let transport = Arc::clone(&self.transport);
                self.in_flight
                    .push(Box::pin(async move { transport.execute(operation).await }));
                None
            }
        }
    }

    fn observe(&mut self, result: OperationResult) -> OperationResult {
        self.exchange.on_result(result, &self.dispatcher)
    }
}

impl<T: Transport> std::fmt::Debug for Client<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("exchange", &self.exchange)
            .field("in_flight", &self.in_flight.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    /// Answers every query with a fixed user payload
    #[derive(Default)]
    struct EchoTransport {
        calls: Mutex<Vec<Operation>>,
    }

    #[async_trait]
    impl Transport for EchoTransport {
        async fn execute(&self, operation: Operation) -> Option<OperationResult> {
            self.calls.lock().unwrap().push(operation.clone());
            match operation.kind {
                OperationKind::Teardown => None,
                _ => Some(OperationResult::data(
                    operation,
                    json!({"user": {"__typename": "User", "id": 1}}),
                )),
            }
        }
    }

    #[test]
    fn test_dispatcher_reexecute_forces_network_only() {
        let (sender, mut queue) = mpsc::unbounded_channel();
        let dispatcher = Dispatcher { sender };
        let operation = Operation::query("{ a }", json!({}));

        dispatcher.reexecute(&operation).unwrap();

        let queued = queue.try_recv().unwrap();
        assert_eq!(queued.key, operation.key);
        assert_eq!(queued.request_policy(), RequestPolicy::NetworkOnly);
    }

    #[test]
    fn test_dispatcher_closed_pipeline() {
        let (sender, queue) = mpsc::unbounded_channel();
        drop(queue);
        let dispatcher = Dispatcher { sender };

        let err = dispatcher
            .submit(Operation::query("{ a }", json!({})))
            .unwrap_err();
        assert!(matches!(err, ExchangeError::PipelineClosed { .. }));
    }

    #[test]
    fn test_operation_uses_default_policy() {
        let config = CacheConfig::builder()
            .default_request_policy(RequestPolicy::CacheAndNetwork)
            .build();
        let client = Client::new(config, EchoTransport::default()).unwrap();

        let operation = client.query("{ a }", json!({}));
        assert_eq!(operation.request_policy(), RequestPolicy::CacheAndNetwork);
        assert_eq!(operation.kind, OperationKind::Query);
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = CacheConfig::builder().typename_field("not valid").build();
        assert!(Client::new(config, EchoTransport::default()).is_err());
    }

    #[test]
    fn test_run_until_idle_with_block_on() {
        let mut client = Client::new(CacheConfig::default(), EchoTransport::default()).unwrap();
        let operation = client.query("{ user { id } }", json!({}));
        client.submit(operation.clone()).unwrap();
        client.submit(operation.teardown()).unwrap();

        let results = tokio_test::block_on(client.run_until_idle());

        assert_eq!(results.len(), 1);
        assert_eq!(client.transport().calls.lock().unwrap().len(), 2);
        assert!(client.exchange().cached(&operation.key).is_some());
    }

    #[tokio::test]
    async fn test_next_result_serves_cache_hits() {
        let mut client = Client::new(CacheConfig::default(), EchoTransport::default()).unwrap();
        let operation = client.query("{ user { id } }", json!({}));

        client.submit(operation.clone()).unwrap();
        let first = client.next_result().await.unwrap();
        assert!(first.has_data());

        client.submit(operation.clone()).unwrap();
        let second = client.next_result().await.unwrap();
        assert_eq!(second.data, first.data);
        assert_eq!(client.transport().calls.lock().unwrap().len(), 1);
        assert_eq!(client.stats().hits, 1);
    }

    #[tokio::test]
    async fn test_next_result_waits_when_idle() {
        let mut client = Client::new(CacheConfig::default(), EchoTransport::default()).unwrap();
        let operation = client.query("{ user { id } }", json!({}));
        client.submit(operation).unwrap();
        assert!(client.next_result().await.is_some());

        let waited =
            tokio::time::timeout(std::time::Duration::from_millis(20), client.next_result()).await;
        assert!(waited.is_err());
        assert_eq!(client.in_flight(), 0);
    }
}
