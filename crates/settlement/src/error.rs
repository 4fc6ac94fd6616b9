//! Settlement error types

use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur in settlement processing
#[derive(Error, Debug)]
pub enum SettlementError {
    /// Input rejected before any persistence attempt
    #[error("Validation error: {0}")]
    Validation(String),

    /// Batch or obligation not found within the current tenant
    #[error("Settlement record not found: {0}")]
    NotFound(Uuid),

    /// The record exists but its state does not permit the transition
    #[error("Invalid state: cannot {action} a {entity} in {current} status")]
    InvalidState {
        /// Entity kind ("batch" or "obligation")
        entity: &'static str,
        /// Status the record is currently in
        current: String,
        /// Attempted action
        action: &'static str,
    },

    /// Uniqueness conflict (duplicate settlement number or obligation)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(String),
}

/// Result type for settlement operations
pub type Result<T> = std::result::Result<T, SettlementError>;
