//! Ledger Manager - posting logic for client account ledgers

use std::sync::Arc;

use rust_decimal::Decimal;

use common::{money, ClientId, TenantContext};

use crate::error::LedgerError;
use crate::store::traits::{LedgerResult, LedgerStore};
use crate::types::{LedgerEntry, LedgerType, NewLedgerEntry};

/// Ledger Manager - validates and appends running-balance postings
pub struct LedgerManager {
    store: Arc<dyn LedgerStore>,
}

impl LedgerManager {
    /// Create a new LedgerManager
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Post a new ledger entry
    ///
    /// Validates the posting, then hands it to the store, whose append is
    /// serialized per `(tenant, client, ledger type)` partition. The
    /// returned entry carries the running balance assigned inside that
    /// serialized unit.
    pub async fn post_entry(
        &self,
        ctx: &TenantContext,
        mut entry: NewLedgerEntry,
    ) -> LedgerResult<LedgerEntry> {
        self.validate_entry(&entry)?;

        entry.debit = money::quantize(entry.debit);
        entry.credit = money::quantize(entry.credit);

        let voucher = entry.voucher_number.clone();
        let posted = self.store.append(ctx.tenant, ctx.actor, entry).await?;

        tracing::info!(
            voucher = %voucher,
            partition = %posted.partition(),
            balance = %posted.running_balance,
            "Ledger entry posted"
        );

        Ok(posted)
    }

    /// Statement of one partition, ordered by posting date then sequence
    pub async fn entries(
        &self,
        ctx: &TenantContext,
        client: ClientId,
        ledger_type: LedgerType,
    ) -> LedgerResult<Vec<LedgerEntry>> {
        self.store.entries(ctx.tenant, client, ledger_type).await
    }

    /// Current running balance of a partition (zero when empty)
    pub async fn balance(
        &self,
        ctx: &TenantContext,
        client: ClientId,
        ledger_type: LedgerType,
    ) -> LedgerResult<Decimal> {
        self.store.balance(ctx.tenant, client, ledger_type).await
    }

    /// Validate posting parameters
    fn validate_entry(&self, entry: &NewLedgerEntry) -> LedgerResult<()> {
        if entry.voucher_number.trim().is_empty() {
            return Err(LedgerError::Validation(
                "Voucher number is required".to_string(),
            ));
        }

        if entry.debit < Decimal::ZERO {
            return Err(LedgerError::Validation(
                "Debit must not be negative".to_string(),
            ));
        }

        if entry.credit < Decimal::ZERO {
            return Err(LedgerError::Validation(
                "Credit must not be negative".to_string(),
            ));
        }

        let debit_set = entry.debit > Decimal::ZERO;
        let credit_set = entry.credit > Decimal::ZERO;
        if !debit_set && !credit_set {
            return Err(LedgerError::Validation(
                "Either debit or credit must be positive".to_string(),
            ));
        }
        if debit_set && credit_set {
            return Err(LedgerError::Validation(
                "Exactly one of debit and credit may be positive".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::NaiveDate;
    use uuid::Uuid;

    use common::{ActorId, BrokerId, TenantId};

    use crate::store::memory::InMemoryLedgerStore;
    use crate::types::{EntryType, ReferenceType};

    fn test_ctx() -> TenantContext {
        TenantContext::new(TenantId::new(), ActorId::new())
    }

    fn manager() -> LedgerManager {
        LedgerManager::new(Arc::new(InMemoryLedgerStore::new()))
    }

    fn posting(client: ClientId, voucher: &str, debit: i64, credit: i64) -> NewLedgerEntry {
        NewLedgerEntry {
            broker_id: BrokerId::new(),
            client_id: client,
            voucher_number: voucher.to_string(),
            posting_date: NaiveDate::from_ymd_opt(2026, 4, 6).unwrap(),
            value_date: NaiveDate::from_ymd_opt(2026, 4, 7).unwrap(),
            ledger_type: LedgerType::ClientLedger,
            entry_type: EntryType::Payment,
            debit: Decimal::new(debit, 0),
            credit: Decimal::new(credit, 0),
            reference_type: ReferenceType::Payment,
            reference_id: Uuid::new_v4(),
            narration: None,
        }
    }

    #[tokio::test]
    async fn test_credit_then_debit_running_balances() {
        let manager = manager();
        let ctx = test_ctx();
        let client = ClientId::new();

        let first = manager
            .post_entry(&ctx, posting(client, "V-1", 0, 200_000))
            .await
            .unwrap();
        assert_eq!(first.running_balance, Decimal::new(200_000, 0));

        let second = manager
            .post_entry(&ctx, posting(client, "V-2", 50_000, 0))
            .await
            .unwrap();
        assert_eq!(second.running_balance, Decimal::new(150_000, 0));

        let balance = manager
            .balance(&ctx, client, LedgerType::ClientLedger)
            .await
            .unwrap();
        assert_eq!(balance, Decimal::new(150_000, 0));
    }

    #[tokio::test]
    async fn test_rejects_empty_voucher() {
        let manager = manager();
        let ctx = test_ctx();
        let result = manager
            .post_entry(&ctx, posting(ClientId::new(), "  ", 0, 100))
            .await;
        assert_matches!(result, Err(LedgerError::Validation(_)));
    }

    #[tokio::test]
    async fn test_rejects_negative_amounts() {
        let manager = manager();
        let ctx = test_ctx();

        let mut entry = posting(ClientId::new(), "V-NEG", 0, 0);
        entry.debit = Decimal::new(-1, 0);
        assert_matches!(
            manager.post_entry(&ctx, entry).await,
            Err(LedgerError::Validation(_))
        );

        let mut entry = posting(ClientId::new(), "V-NEG2", 0, 0);
        entry.credit = Decimal::new(-1, 0);
        assert_matches!(
            manager.post_entry(&ctx, entry).await,
            Err(LedgerError::Validation(_))
        );
    }

    #[tokio::test]
    async fn test_rejects_zero_and_double_sided_entries() {
        let manager = manager();
        let ctx = test_ctx();

        assert_matches!(
            manager
                .post_entry(&ctx, posting(ClientId::new(), "V-Z", 0, 0))
                .await,
            Err(LedgerError::Validation(_))
        );
        assert_matches!(
            manager
                .post_entry(&ctx, posting(ClientId::new(), "V-D", 10, 10))
                .await,
            Err(LedgerError::Validation(_))
        );
    }

    #[tokio::test]
    async fn test_duplicate_voucher_is_conflict() {
        let manager = manager();
        let ctx = test_ctx();
        let client = ClientId::new();

        manager
            .post_entry(&ctx, posting(client, "V-DUP", 0, 100))
            .await
            .unwrap();
        let result = manager
            .post_entry(&ctx, posting(client, "V-DUP", 0, 100))
            .await;
        assert_matches!(result, Err(LedgerError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_tenant_isolation() {
        let store = Arc::new(InMemoryLedgerStore::new());
        let manager = LedgerManager::new(store);
        let ctx_a = test_ctx();
        let ctx_b = test_ctx();
        let client = ClientId::new();

        manager
            .post_entry(&ctx_a, posting(client, "V-A", 0, 900))
            .await
            .unwrap();

        // Same client id under another tenant is a different partition.
        let balance_b = manager
            .balance(&ctx_b, client, LedgerType::ClientLedger)
            .await
            .unwrap();
        assert_eq!(balance_b, Decimal::ZERO);
        let entries_b = manager
            .entries(&ctx_b, client, LedgerType::ClientLedger)
            .await
            .unwrap();
        assert!(entries_b.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_postings_preserve_recurrence() {
        let store = Arc::new(InMemoryLedgerStore::new());
        let manager = Arc::new(LedgerManager::new(store));
        let ctx = test_ctx();
        let client = ClientId::new();
        let other_client = ClientId::new();

        let mut handles = Vec::new();
        for i in 0..25 {
            let manager = Arc::clone(&manager);
            let ctx = ctx;
            handles.push(tokio::spawn(async move {
                let entry = posting(client, &format!("V-{}", i), 0, 10);
                manager.post_entry(&ctx, entry).await
            }));
        }
        // Interleave postings to an unrelated partition.
        for i in 0..10 {
            let manager = Arc::clone(&manager);
            let ctx = ctx;
            handles.push(tokio::spawn(async move {
                let entry = posting(other_client, &format!("W-{}", i), 0, 3);
                manager.post_entry(&ctx, entry).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let entries = manager
            .entries(&ctx, client, LedgerType::ClientLedger)
            .await
            .unwrap();
        assert_eq!(entries.len(), 25);

        // Replay in stored order: balance[i] = balance[i-1] + credit - debit.
        let mut expected = Decimal::ZERO;
        for entry in &entries {
            expected = expected + entry.credit - entry.debit;
            assert_eq!(entry.running_balance, expected);
        }
        assert_eq!(expected, Decimal::new(250, 0));

        let other_balance = manager
            .balance(&ctx, other_client, LedgerType::ClientLedger)
            .await
            .unwrap();
        assert_eq!(other_balance, Decimal::new(30, 0));
    }
}
