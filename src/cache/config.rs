//! Configuration for the cache exchange

use crate::error::{ExchangeError, Result};
use crate::operation::RequestPolicy;
use crate::typenames::TYPENAME_FIELD;
use apollo_compiler::Name;
use serde::{Deserialize, Serialize};
use std::env;

/// Environment variable holding the default request policy
pub const ENV_DEFAULT_POLICY: &str = "OUROBOROS_CACHE_DEFAULT_POLICY";
/// Environment variable holding the type-name field
pub const ENV_TYPENAME_FIELD: &str = "OUROBOROS_CACHE_TYPENAME_FIELD";
/// Environment variable toggling metrics collection
pub const ENV_METRICS: &str = "OUROBOROS_CACHE_METRICS";

/// Configuration for the cache exchange
///
/// The store itself is unbounded and keyed by operation identity, so there
/// are no size or TTL knobs here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Request policy given to operations built by the client
    pub default_request_policy: RequestPolicy,

    /// Field the service uses to report an object's type
    pub typename_field: String,

    /// Enable metrics collection
    pub enable_metrics: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_request_policy: RequestPolicy::CacheFirst,
            typename_field: TYPENAME_FIELD.to_string(),
            enable_metrics: true,
        }
    }
}

impl CacheConfig {
    /// Create a new builder for cache configuration
    pub fn builder() -> CacheConfigBuilder {
        CacheConfigBuilder::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let field = self.typename_field.as_str();
        if field.is_empty() {
            return Err(ExchangeError::ConfigError(
                "typename_field must not be empty".to_string(),
            ));
        }

        if Name::new(field).is_err() {
            return Err(ExchangeError::ConfigError(format!(
                "typename_field must be a field name, got {:?}",
                field
            )));
        }

        Ok(())
    }

    /// Load configuration from the environment (and a `.env` file if present)
    ///
    /// Unset variables keep their defaults; malformed values are errors.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let mut builder = CacheConfig::builder();

        if let Ok(policy) = env::var(ENV_DEFAULT_POLICY) {
            builder = builder.default_request_policy(policy.parse()?);
        }

        if let Ok(field) = env::var(ENV_TYPENAME_FIELD) {
            builder = builder.typename_field(field);
        }

        if let Ok(metrics) = env::var(ENV_METRICS) {
            let enabled = match metrics.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                other => {
                    return Err(ExchangeError::ConfigError(format!(
                        "{} must be a boolean, got {:?}",
                        ENV_METRICS, other
                    )))
                }
            };
            builder = builder.enable_metrics(enabled);
        }

        let config = builder.build();
        config.validate()?;
        Ok(config)
    }
}

/// Builder for cache configuration
#[derive(Debug, Default)]
pub struct CacheConfigBuilder {
    default_request_policy: Option<RequestPolicy>,
    typename_field: Option<String>,
    enable_metrics: Option<bool>,
}

impl CacheConfigBuilder {
    /// Set the request policy given to new operations
    pub fn default_request_policy(mut self, policy: RequestPolicy) -> Self {
        self.default_request_policy = Some(policy);
        self
    }

    /// Set the type-name field
    pub fn typename_field(mut self, field: impl Into<String>) -> Self {
        self.typename_field = Some(field.into());
        self
    }

    /// Enable or disable metrics collection
    pub fn enable_metrics(mut self, enable: bool) -> Self {
        self.enable_metrics = Some(enable);
        self
    }

    /// Build the cache configuration
    pub fn build(self) -> CacheConfig {
        let defaults = CacheConfig::default();

        CacheConfig {
            default_request_policy: self
                .default_request_policy
                .unwrap_or(defaults.default_request_policy),
            typename_field: self.typename_field.unwrap_or(defaults.typename_field),
            enable_metrics: self.enable_metrics.unwrap_or(defaults.enable_metrics),
        }
    }
}

/// Preset configurations for common use cases
impl CacheConfig {
    /// Always show cached data first, then refresh it from the network
    pub fn stale_while_revalidate() -> Self {
        Self {
            default_request_policy: RequestPolicy::CacheAndNetwork,
            ..Default::default()
        }
    }

    /// Bypass cache reads unless a call opts in explicitly
    pub fn network_first() -> Self {
        Self {
            default_request_policy: RequestPolicy::NetworkOnly,
            ..Default::default()
        }
    }
}
