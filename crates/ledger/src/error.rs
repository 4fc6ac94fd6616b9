//! Ledger error types

use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur in the ledger posting engine
#[derive(Error, Debug)]
pub enum LedgerError {
    /// Input rejected before any persistence attempt
    #[error("Validation error: {0}")]
    Validation(String),

    /// Entry not found within the current tenant
    #[error("Ledger entry not found: {0}")]
    NotFound(Uuid),

    /// Uniqueness conflict (duplicate voucher number)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(String),
}

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, LedgerError>;
