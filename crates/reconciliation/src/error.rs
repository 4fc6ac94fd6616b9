//! Reconciliation error types

use thiserror::Error;
use uuid::Uuid;

use crate::types::ExceptionStatus;

/// Errors that can occur in the reconciliation engine
#[derive(Error, Debug)]
pub enum ReconError {
    /// Input rejected before any persistence attempt
    #[error("Validation error: {0}")]
    Validation(String),

    /// Reconciliation or exception not found within the current tenant
    #[error("Reconciliation record not found: {0}")]
    NotFound(Uuid),

    /// The exception exists but its state does not permit the transition
    #[error("Invalid state: cannot {action} an exception in {current} status")]
    InvalidState {
        /// Status the exception is currently in
        current: ExceptionStatus,
        /// Attempted action
        action: &'static str,
    },

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(String),
}

/// Result type for reconciliation operations
pub type Result<T> = std::result::Result<T, ReconError>;
