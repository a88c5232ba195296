//! Type definitions for operations flowing through the pipeline

use crate::error::ExchangeError;
use crate::operation::key::OperationKey;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use std::str::FromStr;

/// Caller-selected strategy for consulting the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestPolicy {
    /// Serve from cache when present, otherwise go to the network
    #[default]
    CacheFirst,
    /// Never go to the network; a miss yields an empty result
    CacheOnly,
    /// Always go to the network and never read the cache
    NetworkOnly,
    /// Serve from cache when present and revalidate in the background
    CacheAndNetwork,
}

impl RequestPolicy {
    /// Tag used on the wire and in configuration
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestPolicy::CacheFirst => "cache-first",
            RequestPolicy::CacheOnly => "cache-only",
            RequestPolicy::NetworkOnly => "network-only",
            RequestPolicy::CacheAndNetwork => "cache-and-network",
        }
    }
}

impl fmt::Display for RequestPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestPolicy {
    type Err = ExchangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "cache-first" => Ok(RequestPolicy::CacheFirst),
            "cache-only" => Ok(RequestPolicy::CacheOnly),
            "network-only" => Ok(RequestPolicy::NetworkOnly),
            "cache-and-network" => Ok(RequestPolicy::CacheAndNetwork),
            other => Err(ExchangeError::InvalidRequestPolicy(other.to_string())),
        }
    }
}

/// Kind of operation, parsed from its literal tag
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Query,
    Mutation,
    Subscription,
    Teardown,
    /// Anything else; never cached, always forwarded
    Other(String),
}

impl OperationKind {
    /// Parse a kind tag; unknown tags are kept as `Other`
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "query" => OperationKind::Query,
            "mutation" => OperationKind::Mutation,
            "subscription" => OperationKind::Subscription,
            "teardown" => OperationKind::Teardown,
            other => OperationKind::Other(other.to_string()),
        }
    }

    /// Literal tag for this kind
    pub fn as_str(&self) -> &str {
        match self {
            OperationKind::Query => "query",
            OperationKind::Mutation => "mutation",
            OperationKind::Subscription => "subscription",
            OperationKind::Teardown => "teardown",
            OperationKind::Other(tag) => tag.as_str(),
        }
    }

    /// Queries and mutations take part in caching; everything else bypasses it
    pub fn is_cache_relevant(&self) -> bool {
        matches!(self, OperationKind::Query | OperationKind::Mutation)
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Query document text
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document(String);

impl Document {
    pub fn new(source: impl Into<String>) -> Self {
        Self(source.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Document {
    fn from(source: &str) -> Self {
        Self::new(source)
    }
}

impl From<String> for Document {
    fn from(source: String) -> Self {
        Self(source)
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Per-call context set by the caller
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationContext {
    /// How the cache should be consulted for this call
    pub request_policy: RequestPolicy,
}

/// A single query, mutation or control request
///
/// The key is computed once at construction from the original document and
/// variables. Copies made with [`Operation::with_request_policy`] or by the
/// document typer keep the key, so their results land in the same cache slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    /// Stable identity derived from (query, variables)
    pub key: OperationKey,
    /// Operation kind
    pub kind: OperationKind,
    /// The query document
    pub query: Document,
    /// Variables sent alongside the document
    pub variables: JsonValue,
    /// Caller context
    pub context: OperationContext,
}

impl Operation {
    /// Create an operation of any kind
    pub fn new(
        kind: OperationKind,
        query: impl Into<Document>,
        variables: JsonValue,
        context: OperationContext,
    ) -> Self {
        let query = query.into();
        let key = OperationKey::derive(query.as_str(), &variables);
        Self {
            key,
            kind,
            query,
            variables,
            context,
        }
    }

    /// Create a query with the default request policy
    pub fn query(query: impl Into<Document>, variables: JsonValue) -> Self {
        Self::new(
            OperationKind::Query,
            query,
            variables,
            OperationContext::default(),
        )
    }

    /// Create a mutation with the default request policy
    pub fn mutation(query: impl Into<Document>, variables: JsonValue) -> Self {
        Self::new(
            OperationKind::Mutation,
            query,
            variables,
            OperationContext::default(),
        )
    }

    /// Copy with a different request policy and the same identity
    pub fn with_request_policy(&self, request_policy: RequestPolicy) -> Self {
        Self {
            context: OperationContext {
                request_policy,
                ..self.context.clone()
            },
            ..self.clone()
        }
    }

    /// Copy with a replaced document and the same identity
    pub fn with_query(&self, query: Document) -> Self {
        Self {
            query,
            ..self.clone()
        }
    }

    /// Teardown control operation for this identity
    pub fn teardown(&self) -> Self {
        Self {
            kind: OperationKind::Teardown,
            ..self.clone()
        }
    }

    /// Request policy from the context
    pub fn request_policy(&self) -> RequestPolicy {
        self.context.request_policy
    }
}
