//! Error handling.

use crate::models::DType;

use ndarray::ShapeError;
use thiserror::Error;

/// Active storage client error type
///
/// This type encapsulates the various errors that may occur. All errors are scoped to a single
/// read or merge invocation and are surfaced synchronously to the caller; none are swallowed,
/// converted to sentinel values or retried internally.
#[derive(Debug, Error)]
pub enum ActiveStorageError {
    /// Data type of a storage payload does not match the handle
    #[error("data type mismatch: expected {expected}, found {found}")]
    DTypeMismatch {
        expected: DType,
        found: DType,
    },

    /// Attempt to perform an invalid operation on an empty array or selection
    #[error("cannot perform {operation} on empty array or selection")]
    EmptyArray { operation: &'static str },

    /// Error converting from bytes to a type
    #[error("failed to convert from bytes to {type_name}")]
    FromBytes { type_name: &'static str },

    /// An operation name outside the supported set was requested
    #[error("invalid active storage operation {operation:?}")]
    InvalidOperation { operation: String },

    /// Error reading or writing variable metadata
    #[error("variable metadata is not valid")]
    Metadata(#[from] serde_json::Error),

    /// An operation-dependent capability was requested on an unconfigured handle
    #[error("no active storage operation has been set")]
    NoOperationConfigured,

    /// Backing resource cannot be accessed
    #[error("failed to access resource {path}")]
    ResourceAccess {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Selection rank does not match the array rank
    #[error("selection length {got} does not match array rank {expected}")]
    SelectionShape { expected: usize, got: usize },

    /// Selection contains a zero stride
    #[error("selection stride must not be equal to zero")]
    SelectionStride,

    /// Error creating ndarray ArrayView from Shape
    #[error("failed to create array from shape")]
    ShapeInvalid(#[from] ShapeError),

    /// Partial results for an operation without a merge rule
    #[error("unsupported operation {operation} requested on resource {path} variable {variable}")]
    UnsupportedOperation {
        operation: String,
        path: String,
        variable: String,
    },

    /// Named variable is missing from the backing resource
    #[error("variable {variable} not found in resource {path}")]
    VariableNotFound { path: String, variable: String },
}
