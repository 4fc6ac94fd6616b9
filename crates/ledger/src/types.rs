//! Ledger domain types
//!
//! A ledger entry is one signed posting against a client account. Entries
//! are append-only: there is no update or delete path, and the reversal
//! fields are reserved for a future amendment process that this crate does
//! not drive.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use common::{ActorId, AuditMeta, BrokerId, ClientId, TenantId};

/// Ledger book an entry is posted to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerType {
    /// Client running-balance ledger
    ClientLedger,
    /// Broker running-balance ledger
    BrokerLedger,
}

impl LedgerType {
    /// Stable string form, used in storage and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerType::ClientLedger => "client_ledger",
            LedgerType::BrokerLedger => "broker_ledger",
        }
    }
}

impl std::fmt::Display for LedgerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for LedgerType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "client_ledger" => Ok(LedgerType::ClientLedger),
            "broker_ledger" => Ok(LedgerType::BrokerLedger),
            other => Err(format!("unknown ledger type: {}", other)),
        }
    }
}

/// What kind of movement an entry records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryType {
    /// Trade consideration
    Trade,
    /// Pay-in/pay-out movement
    Payment,
    /// Brokerage, taxes, and other charges
    Charge,
    /// Reversal of an earlier entry (reserved)
    Reversal,
}

impl EntryType {
    /// Stable string form, used in storage and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryType::Trade => "trade",
            EntryType::Payment => "payment",
            EntryType::Charge => "charge",
            EntryType::Reversal => "reversal",
        }
    }
}

impl std::fmt::Display for EntryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for EntryType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "trade" => Ok(EntryType::Trade),
            "payment" => Ok(EntryType::Payment),
            "charge" => Ok(EntryType::Charge),
            "reversal" => Ok(EntryType::Reversal),
            other => Err(format!("unknown entry type: {}", other)),
        }
    }
}

/// Record that caused a posting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceType {
    /// A booked trade
    Trade,
    /// A settlement obligation
    Obligation,
    /// An external payment instruction
    Payment,
    /// A manually keyed voucher
    Manual,
}

impl ReferenceType {
    /// Stable string form, used in storage and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            ReferenceType::Trade => "trade",
            ReferenceType::Obligation => "obligation",
            ReferenceType::Payment => "payment",
            ReferenceType::Manual => "manual",
        }
    }
}

impl std::fmt::Display for ReferenceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ReferenceType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "trade" => Ok(ReferenceType::Trade),
            "obligation" => Ok(ReferenceType::Obligation),
            "payment" => Ok(ReferenceType::Payment),
            "manual" => Ok(ReferenceType::Manual),
            other => Err(format!("unknown reference type: {}", other)),
        }
    }
}

/// Key of an independently ordered running-balance sequence
///
/// All postings sharing one key are linearized; postings to different keys
/// never block each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PartitionKey {
    /// Owning tenant
    pub tenant: TenantId,
    /// Client account
    pub client: ClientId,
    /// Ledger book
    pub ledger_type: LedgerType,
}

impl PartitionKey {
    /// Build the key for a posting
    pub fn new(tenant: TenantId, client: ClientId, ledger_type: LedgerType) -> Self {
        Self {
            tenant,
            client,
            ledger_type,
        }
    }
}

impl std::fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.tenant, self.client, self.ledger_type)
    }
}

/// Input for a new posting
///
/// The running balance and the partition sequence number are assigned by
/// the store inside the serialized unit of work, never by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewLedgerEntry {
    /// Broker the account belongs to
    pub broker_id: BrokerId,
    /// Client account being posted to
    pub client_id: ClientId,
    /// Globally unique external reference for this posting
    pub voucher_number: String,
    /// Date the entry takes effect in the ledger
    pub posting_date: NaiveDate,
    /// Date funds actually move
    pub value_date: NaiveDate,
    /// Ledger book
    pub ledger_type: LedgerType,
    /// Movement kind
    pub entry_type: EntryType,
    /// Debit amount (>= 0)
    pub debit: Decimal,
    /// Credit amount (>= 0)
    pub credit: Decimal,
    /// Kind of record that caused the posting
    pub reference_type: ReferenceType,
    /// Id of the record that caused the posting
    pub reference_id: Uuid,
    /// Free-text narration
    pub narration: Option<String>,
}

/// One posting in a running-balance sequence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Unique entry identifier
    pub id: Uuid,
    /// Owning tenant
    pub tenant_id: TenantId,
    /// Broker the account belongs to
    pub broker_id: BrokerId,
    /// Client account
    pub client_id: ClientId,
    /// Globally unique external reference
    pub voucher_number: String,
    /// Date the entry takes effect
    pub posting_date: NaiveDate,
    /// Date funds actually move
    pub value_date: NaiveDate,
    /// Ledger book
    pub ledger_type: LedgerType,
    /// Movement kind
    pub entry_type: EntryType,
    /// Debit amount (>= 0)
    pub debit: Decimal,
    /// Credit amount (>= 0)
    pub credit: Decimal,
    /// Balance after this entry, per the partition recurrence
    pub running_balance: Decimal,
    /// Insertion order within the partition, assigned by the store
    pub sequence: u64,
    /// Kind of record that caused the posting
    pub reference_type: ReferenceType,
    /// Id of the record that caused the posting
    pub reference_id: Uuid,
    /// Free-text narration
    pub narration: Option<String>,
    /// Reversal marker (reserved, never set by this crate)
    pub reversal: bool,
    /// Entry this one reverses (reserved, never set by this crate)
    pub reversal_of: Option<Uuid>,
    /// Audit trail
    pub audit: AuditMeta,
}

impl LedgerEntry {
    /// Materialize a stored entry from posting input plus the balance and
    /// sequence computed inside the serialized unit of work
    pub fn materialize(
        tenant: TenantId,
        actor: ActorId,
        input: NewLedgerEntry,
        running_balance: Decimal,
        sequence: u64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id: tenant,
            broker_id: input.broker_id,
            client_id: input.client_id,
            voucher_number: input.voucher_number,
            posting_date: input.posting_date,
            value_date: input.value_date,
            ledger_type: input.ledger_type,
            entry_type: input.entry_type,
            debit: input.debit,
            credit: input.credit,
            running_balance,
            sequence,
            reference_type: input.reference_type,
            reference_id: input.reference_id,
            narration: input.narration,
            reversal: false,
            reversal_of: None,
            audit: AuditMeta::new(actor),
        }
    }

    /// Partition this entry belongs to
    pub fn partition(&self) -> PartitionKey {
        PartitionKey::new(self.tenant_id, self.client_id, self.ledger_type)
    }

    /// Signed movement of this entry (credit minus debit)
    pub fn signed_amount(&self) -> Decimal {
        self.credit - self.debit
    }
}
