//! Reconciliation engine for OpenBackOffice
//!
//! Compares an internally computed figure against the exchange-reported
//! figure for one settlement cycle. The absolute difference is always
//! recomputed here, never trusted from input; a difference within the
//! tolerance limit is a match, anything beyond it opens exactly one
//! exception in the same atomic unit. Exceptions carry their own
//! resolution lifecycle.
//!
//! # Features
//!
//! - Tolerance-based match/mismatch classification
//! - Automatic exception creation, atomic with the reconciliation
//! - Exception resolution guarded by a transition table
//!
//! # Feature Flags
//!
//! - `postgres` - Enable PostgreSQL storage

pub mod error;
pub mod manager;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use error::{ReconError, Result};
pub use manager::ReconManager;
pub use types::{
    ExceptionAction, ExceptionStatus, NewReconciliation, ReconException, ReconRun, ReconStatus,
    ReconType, Reconciliation,
};

// Store exports
pub use store::memory::InMemoryReconStore;
pub use store::traits::ReconStore;

#[cfg(feature = "postgres")]
pub use store::postgres::PostgresReconStore;
