//! LedgerStore trait definition

use async_trait::async_trait;
use rust_decimal::Decimal;

use common::{ActorId, ClientId, TenantId};

use crate::error::LedgerError;
use crate::types::{LedgerEntry, LedgerType, NewLedgerEntry};

/// LedgerStore trait - defines the interface for ledger persistence
///
/// This trait allows different storage implementations (in-memory,
/// PostgreSQL, etc.) to be swapped without changing the posting logic.
///
/// # Serialization contract
///
/// [`append`](LedgerStore::append) is the one operation in the back office
/// where a naive read-then-write is unsafe: two concurrent postings to the
/// same `(tenant, client, ledger type)` partition that each read the last
/// balance before either writes would lose an update. Every implementation
/// must make the read of the predecessor balance and the insert of the new
/// entry indivisible per partition key. Postings to different partitions
/// must not block each other.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Append a posting to its partition
    ///
    /// Inside a unit of work serialized on the entry's partition key:
    /// reads the most recent prior entry (ordered by posting date, then
    /// insertion order), computes `balance = last + credit - debit`, and
    /// persists the new entry with that balance and the next sequence
    /// number. Voucher-number uniqueness is global and enforced inside the
    /// same unit; duplicates surface as [`LedgerError::Conflict`].
    async fn append(
        &self,
        tenant: TenantId,
        actor: ActorId,
        entry: NewLedgerEntry,
    ) -> LedgerResult<LedgerEntry>;

    /// All entries of one partition, ordered by posting date then sequence
    async fn entries(
        &self,
        tenant: TenantId,
        client: ClientId,
        ledger_type: LedgerType,
    ) -> LedgerResult<Vec<LedgerEntry>>;

    /// Current running balance of a partition (zero when empty)
    async fn balance(
        &self,
        tenant: TenantId,
        client: ClientId,
        ledger_type: LedgerType,
    ) -> LedgerResult<Decimal>;
}

/// Result type for LedgerStore operations
pub type LedgerResult<T> = std::result::Result<T, LedgerError>;
