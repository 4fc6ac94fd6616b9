//! Ledger posting engine for OpenBackOffice
//!
//! This crate appends signed entries to per-account running balances. A
//! balance sequence is partitioned by `(tenant, client, ledger type)`; the
//! running balance of each entry is derived from its predecessor inside a
//! unit of work that is serialized per partition, so concurrent postings
//! can never produce a lost update.
//!
//! # Features
//!
//! - Append-only posting with validation (exactly one of debit/credit set)
//! - Per-partition running-balance recurrence, safe under concurrency
//! - Globally unique voucher numbers
//! - Partition statements and current-balance reads
//!
//! # Feature Flags
//!
//! - `postgres` - Enable PostgreSQL storage

pub mod error;
pub mod manager;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use error::{LedgerError, Result};
pub use manager::LedgerManager;
pub use types::{EntryType, LedgerEntry, LedgerType, NewLedgerEntry, PartitionKey, ReferenceType};

// Store exports
pub use store::memory::InMemoryLedgerStore;
pub use store::traits::LedgerStore;

#[cfg(feature = "postgres")]
pub use store::postgres::PostgresLedgerStore;
