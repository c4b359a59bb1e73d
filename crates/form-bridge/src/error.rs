//! Error types for decoding and validating form submissions.

use crate::errors::ErrorTree;
use thiserror::Error;

/// Failure while rebuilding a nested value from flat entries.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// A key path needs a container type different from the one already
    /// built at that location by an earlier entry.
    #[error("structural mismatch at '{path}': expected {expected}, found {found}")]
    StructuralMismatch {
        /// Dotted path of the node that could not be written.
        path: String,
        /// Shape the current entry needs at that node.
        expected: &'static str,
        /// Shape already present.
        found: &'static str,
    },

    /// An array index in a key path exceeds the configured limit.
    #[error("array index at '{path}' exceeds the limit of {limit}")]
    IndexOutOfRange { path: String, limit: usize },

    /// Sparse indices asked for more `null` padding than one decode allows.
    #[error("array padding at '{path}' exceeds the budget of {limit} slots")]
    PaddingExceeded { path: String, limit: usize },
}

/// The validation capability failed to run (as opposed to reporting
/// field errors).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("validator unavailable: {message}")]
pub struct ValidatorFault {
    pub message: String,
}

impl ValidatorFault {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Errors surfaced to the request handler.
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    ValidatorUnavailable(#[from] ValidatorFault),

    /// Submission failed validation; the tree holds per-field messages.
    #[error("form submission failed validation ({} field(s))", .0.len())]
    Invalid(ErrorTree),

    /// Validated data could not be converted into the requested type.
    #[error("validated data does not match the target type: {0}")]
    Deserialize(#[from] serde_json::Error),
}

pub type Result<T, E = BridgeError> = std::result::Result<T, E>;
