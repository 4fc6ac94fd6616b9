//! Trade error types

use thiserror::Error;
use uuid::Uuid;

use crate::types::TradeStatus;

/// Errors that can occur in the trade lifecycle
#[derive(Error, Debug)]
pub enum TradeError {
    /// Input rejected before any persistence attempt
    #[error("Validation error: {0}")]
    Validation(String),

    /// Trade not found within the current tenant
    #[error("Trade not found: {0}")]
    NotFound(Uuid),

    /// The trade exists but its state does not permit the transition
    #[error("Invalid state: cannot {action} a trade in {current} status")]
    InvalidState {
        /// Status the trade is currently in
        current: TradeStatus,
        /// Attempted action
        action: &'static str,
    },

    /// Uniqueness conflict (duplicate trade number)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(String),
}

/// Result type for trade operations
pub type Result<T> = std::result::Result<T, TradeError>;
