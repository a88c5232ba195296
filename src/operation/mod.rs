//! Operation model
//!
//! Operations are immutable values. Their identity is fixed at construction
//! from the document and variables; re-executions are copies that share the
//! identity but carry a different context.

pub mod key;
pub mod result;
pub mod types;

pub use key::{ContentHash, OperationKey};
pub use result::{OperationError, OperationErrorKind, OperationResult};
pub use types::{Document, Operation, OperationContext, OperationKind, RequestPolicy};
