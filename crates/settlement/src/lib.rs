//! Settlement batch and obligation netting for OpenBackOffice
//!
//! A settlement batch groups the pay-in/pay-out obligations of one
//! settlement cycle. Processing a batch settles every pending obligation
//! and completes the batch as one atomic unit; a single obligation can
//! also be settled on its own. Obligation rows themselves are created by
//! the external clearing/netting process through the store boundary.
//!
//! # Features
//!
//! - Batch creation with date and uniqueness validation
//! - All-or-nothing batch processing
//! - Single-obligation settlement with state-machine guards
//!
//! # Feature Flags
//!
//! - `postgres` - Enable PostgreSQL storage

pub mod error;
pub mod manager;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use error::{Result, SettlementError};
pub use manager::SettlementManager;
pub use types::{
    BatchAction, BatchStatus, NewBatch, NewObligation, ObligationAction, ObligationStatus,
    SettlementBatch, SettlementObligation,
};

// Store exports
pub use store::memory::InMemorySettlementStore;
pub use store::traits::SettlementStore;

#[cfg(feature = "postgres")]
pub use store::postgres::PostgresSettlementStore;
