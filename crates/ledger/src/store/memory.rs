//! In-memory ledger store implementation
//!
//! Used for tests and development. Per-partition serialization is an async
//! mutex held across the read-balance + insert critical section; the lock
//! registry itself is only held long enough to clone the partition's lock
//! handle, so independent partitions proceed concurrently.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use rust_decimal::Decimal;

use common::{ActorId, ClientId, TenantId};

use crate::error::LedgerError;
use crate::store::traits::{LedgerResult, LedgerStore};
use crate::types::{LedgerEntry, LedgerType, NewLedgerEntry, PartitionKey};

/// In-memory ledger store for testing and development
pub struct InMemoryLedgerStore {
    /// Entries per partition, in insertion order
    entries: RwLock<HashMap<PartitionKey, Vec<LedgerEntry>>>,
    /// Voucher numbers across all tenants
    vouchers: Mutex<HashSet<String>>,
    /// One append lock per partition
    locks: Mutex<HashMap<PartitionKey, Arc<tokio::sync::Mutex<()>>>>,
}

impl InMemoryLedgerStore {
    /// Create a new in-memory ledger store
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            vouchers: Mutex::new(HashSet::new()),
            locks: Mutex::new(HashMap::new()),
        }
    }

    fn partition_lock(&self, key: PartitionKey) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock();
        locks
            .entry(key)
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    /// Predecessor balance: most recent prior entry ordered by posting
    /// date, then insertion order. Zero when the partition is empty.
    fn last_balance(&self, key: &PartitionKey) -> Decimal {
        let entries = self.entries.read();
        entries
            .get(key)
            .and_then(|partition| {
                partition
                    .iter()
                    .filter(|e| !e.audit.deleted)
                    .max_by_key(|e| (e.posting_date, e.sequence))
            })
            .map(|e| e.running_balance)
            .unwrap_or(Decimal::ZERO)
    }
}

impl Default for InMemoryLedgerStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn append(
        &self,
        tenant: TenantId,
        actor: ActorId,
        entry: NewLedgerEntry,
    ) -> LedgerResult<LedgerEntry> {
        let key = PartitionKey::new(tenant, entry.client_id, entry.ledger_type);
        let lock = self.partition_lock(key);
        let _serialized = lock.lock().await;

        // Voucher uniqueness is global. Reserving the number up front keeps
        // the check-and-claim atomic even against appends to other
        // partitions; nothing after this point can fail, so a reservation
        // never leaks.
        {
            let mut vouchers = self.vouchers.lock();
            if !vouchers.insert(entry.voucher_number.clone()) {
                return Err(LedgerError::Conflict(format!(
                    "duplicate voucher number: {}",
                    entry.voucher_number
                )));
            }
        }

        let last = self.last_balance(&key);
        let balance = last + entry.credit - entry.debit;

        let sequence = {
            let entries = self.entries.read();
            entries.get(&key).map(|p| p.len() as u64).unwrap_or(0) + 1
        };

        let stored = LedgerEntry::materialize(tenant, actor, entry, balance, sequence);

        self.entries
            .write()
            .entry(key)
            .or_default()
            .push(stored.clone());

        Ok(stored)
    }

    async fn entries(
        &self,
        tenant: TenantId,
        client: ClientId,
        ledger_type: LedgerType,
    ) -> LedgerResult<Vec<LedgerEntry>> {
        let key = PartitionKey::new(tenant, client, ledger_type);
        let entries = self.entries.read();
        let mut result: Vec<LedgerEntry> = entries
            .get(&key)
            .map(|p| p.iter().filter(|e| !e.audit.deleted).cloned().collect())
            .unwrap_or_default();
        result.sort_by_key(|e| (e.posting_date, e.sequence));
        Ok(result)
    }

    async fn balance(
        &self,
        tenant: TenantId,
        client: ClientId,
        ledger_type: LedgerType,
    ) -> LedgerResult<Decimal> {
        let key = PartitionKey::new(tenant, client, ledger_type);
        Ok(self.last_balance(&key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use common::BrokerId;
    use uuid::Uuid;

    use crate::types::{EntryType, ReferenceType};

    fn posting(
        client: ClientId,
        voucher: &str,
        debit: Decimal,
        credit: Decimal,
        posting_date: NaiveDate,
    ) -> NewLedgerEntry {
        NewLedgerEntry {
            broker_id: BrokerId::new(),
            client_id: client,
            voucher_number: voucher.to_string(),
            posting_date,
            value_date: posting_date,
            ledger_type: LedgerType::ClientLedger,
            entry_type: EntryType::Payment,
            debit,
            credit,
            reference_type: ReferenceType::Payment,
            reference_id: Uuid::new_v4(),
            narration: None,
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 4, d).unwrap()
    }

    #[tokio::test]
    async fn test_append_assigns_running_balance() {
        let store = InMemoryLedgerStore::new();
        let tenant = TenantId::new();
        let actor = ActorId::new();
        let client = ClientId::new();

        let first = store
            .append(
                tenant,
                actor,
                posting(client, "V-1", Decimal::ZERO, Decimal::new(500, 0), day(1)),
            )
            .await
            .unwrap();
        assert_eq!(first.running_balance, Decimal::new(500, 0));
        assert_eq!(first.sequence, 1);

        let second = store
            .append(
                tenant,
                actor,
                posting(client, "V-2", Decimal::new(200, 0), Decimal::ZERO, day(1)),
            )
            .await
            .unwrap();
        assert_eq!(second.running_balance, Decimal::new(300, 0));
        assert_eq!(second.sequence, 2);
    }

    #[tokio::test]
    async fn test_predecessor_is_latest_by_posting_date_then_sequence() {
        let store = InMemoryLedgerStore::new();
        let tenant = TenantId::new();
        let actor = ActorId::new();
        let client = ClientId::new();

        store
            .append(
                tenant,
                actor,
                posting(client, "V-1", Decimal::ZERO, Decimal::new(100, 0), day(5)),
            )
            .await
            .unwrap();

        // Backdated posting: its balance still chains off the entry that is
        // latest by (posting date, sequence), which is the day-5 entry.
        let backdated = store
            .append(
                tenant,
                actor,
                posting(client, "V-2", Decimal::ZERO, Decimal::new(50, 0), day(2)),
            )
            .await
            .unwrap();
        assert_eq!(backdated.running_balance, Decimal::new(150, 0));

        // Statement order is by posting date first.
        let entries = store
            .entries(tenant, client, LedgerType::ClientLedger)
            .await
            .unwrap();
        assert_eq!(entries[0].voucher_number, "V-2");
        assert_eq!(entries[1].voucher_number, "V-1");
    }

    #[tokio::test]
    async fn test_duplicate_voucher_rejected_across_tenants() {
        let store = InMemoryLedgerStore::new();
        let actor = ActorId::new();

        store
            .append(
                TenantId::new(),
                actor,
                posting(ClientId::new(), "V-DUP", Decimal::ZERO, Decimal::ONE, day(1)),
            )
            .await
            .unwrap();

        let err = store
            .append(
                TenantId::new(),
                actor,
                posting(ClientId::new(), "V-DUP", Decimal::ZERO, Decimal::ONE, day(1)),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_partitions_are_independent() {
        let store = InMemoryLedgerStore::new();
        let tenant = TenantId::new();
        let actor = ActorId::new();
        let client = ClientId::new();

        store
            .append(
                tenant,
                actor,
                posting(client, "V-C", Decimal::ZERO, Decimal::new(700, 0), day(1)),
            )
            .await
            .unwrap();

        let mut broker_side =
            posting(client, "V-B", Decimal::ZERO, Decimal::new(40, 0), day(1));
        broker_side.ledger_type = LedgerType::BrokerLedger;
        let entry = store.append(tenant, actor, broker_side).await.unwrap();

        // Separate partition starts its own sequence from zero balance.
        assert_eq!(entry.running_balance, Decimal::new(40, 0));
        assert_eq!(entry.sequence, 1);
    }
}
