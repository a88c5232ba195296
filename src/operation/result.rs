//! Results returned for operations

use crate::operation::types::Operation;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;

/// Where an error came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationErrorKind {
    /// The request never produced a response
    Network,
    /// The service answered with errors
    GraphQl,
}

/// Error carried by a result; passed through the cache untouched
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationError {
    pub kind: OperationErrorKind,
    pub message: String,
}

impl OperationError {
    pub fn network(message: impl Into<String>) -> Self {
        Self {
            kind: OperationErrorKind::Network,
            message: message.into(),
        }
    }

    pub fn graphql(message: impl Into<String>) -> Self {
        Self {
            kind: OperationErrorKind::GraphQl,
            message: message.into(),
        }
    }
}

impl fmt::Display for OperationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationError { kind: OperationErrorKind::Network, message } => {
                write!(f, "[Network] {}", message)
            }
            OperationError { kind: OperationErrorKind::GraphQl, message } => {
                write!(f, "[GraphQL] {}", message)
            }
        }
    }
}

/// Outcome of one round-trip, tagged with its originating operation
///
/// `data == None` means "not resolved" or "errored", never "empty but
/// successful". A result with neither data nor error is what a cache-only
/// miss produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationResult {
    /// Operation that produced this result
    pub operation: Operation,
    /// Response payload
    pub data: Option<JsonValue>,
    /// Error, mutually exclusive with data
    pub error: Option<OperationError>,
}

impl OperationResult {
    /// Successful result
    pub fn data(operation: Operation, data: JsonValue) -> Self {
        Self {
            operation,
            data: Some(data),
            error: None,
        }
    }

    /// Failed result
    pub fn error(operation: Operation, error: OperationError) -> Self {
        Self {
            operation,
            data: None,
            error: Some(error),
        }
    }

    /// Result with neither data nor error
    pub fn empty(operation: Operation) -> Self {
        Self {
            operation,
            data: None,
            error: None,
        }
    }

    pub fn has_data(&self) -> bool {
        self.data.is_some()
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_result_constructors() {
        let op = Operation::query("{ a }", JsonValue::Null);

        let ok = OperationResult::data(op.clone(), json!({"a": 1}));
        assert!(ok.has_data());
        assert!(!ok.is_error());

        let failed = OperationResult::error(op.clone(), OperationError::network("offline"));
        assert!(!failed.has_data());
        assert!(failed.is_error());

        let empty = OperationResult::empty(op);
        assert!(!empty.has_data());
        assert!(!empty.is_error());
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            OperationError::network("connection reset").to_string(),
            "[Network] connection reset"
        );
        assert!(OperationError::graphql("bad field").to_string().starts_with("[GraphQL]"));
    }
}
