//! Settlement Manager - batch processing and obligation settlement

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;

use common::{money, TenantContext};

use crate::error::SettlementError;
use crate::store::traits::{SettlementResult, SettlementStore};
use crate::types::{NewBatch, SettlementBatch, SettlementObligation};

/// Settlement Manager - drives batch and obligation lifecycles
pub struct SettlementManager {
    store: Arc<dyn SettlementStore>,
}

impl SettlementManager {
    /// Create a new SettlementManager
    pub fn new(store: Arc<dyn SettlementStore>) -> Self {
        Self { store }
    }

    /// Create a pending settlement batch
    pub async fn create_batch(
        &self,
        ctx: &TenantContext,
        mut input: NewBatch,
    ) -> SettlementResult<SettlementBatch> {
        self.validate_batch(&input)?;

        input.total_turnover = money::quantize(input.total_turnover);
        let batch = SettlementBatch::create(ctx.tenant, ctx.actor, input);
        let created = self.store.create_batch(batch).await?;

        tracing::info!(
            settlement_number = %created.settlement_number,
            trades = created.total_trades,
            "Settlement batch created"
        );

        Ok(created)
    }

    /// Process a batch: settle all its pending obligations and complete it
    ///
    /// The store applies the whole transition as one atomic unit; a batch
    /// that is not `Pending` is rejected, and a batch with no pending
    /// obligations completes vacuously.
    pub async fn process_batch(
        &self,
        ctx: &TenantContext,
        batch_id: Uuid,
    ) -> SettlementResult<SettlementBatch> {
        let (batch, settled) = self
            .store
            .complete_batch(ctx.tenant, ctx.actor, batch_id, Utc::now())
            .await?;

        tracing::info!(
            settlement_number = %batch.settlement_number,
            obligations_settled = settled,
            "Settlement batch completed"
        );

        Ok(batch)
    }

    /// Settle a single obligation outside batch processing
    pub async fn settle_obligation(
        &self,
        ctx: &TenantContext,
        obligation_id: Uuid,
    ) -> SettlementResult<SettlementObligation> {
        let obligation = self
            .store
            .settle_obligation(ctx.tenant, ctx.actor, obligation_id, Utc::now())
            .await?;

        tracing::info!(
            settlement_number = %obligation.settlement_number,
            client = %obligation.client_id,
            "Obligation settled"
        );

        Ok(obligation)
    }

    /// Get a batch by id
    pub async fn get_batch(
        &self,
        ctx: &TenantContext,
        batch_id: Uuid,
    ) -> SettlementResult<Option<SettlementBatch>> {
        self.store.get_batch(ctx.tenant, batch_id).await
    }

    /// Get an obligation by id
    ///
    /// Net figures are computed by the external clearing step and trusted
    /// at write time; this read re-checks them and reports a mismatch as
    /// storage corruption instead of returning bad figures.
    pub async fn get_obligation(
        &self,
        ctx: &TenantContext,
        obligation_id: Uuid,
    ) -> SettlementResult<Option<SettlementObligation>> {
        let obligation = self.store.get_obligation(ctx.tenant, obligation_id).await?;

        if let Some(ref o) = obligation {
            if !o.nets_consistent() {
                return Err(SettlementError::Storage(format!(
                    "obligation {} net figures disagree with gross figures",
                    o.id
                )));
            }
        }

        Ok(obligation)
    }

    /// All obligations of a batch
    pub async fn obligations_for_batch(
        &self,
        ctx: &TenantContext,
        batch_id: Uuid,
    ) -> SettlementResult<Vec<SettlementObligation>> {
        self.store.obligations_for_batch(ctx.tenant, batch_id).await
    }

    /// Validate batch parameters
    fn validate_batch(&self, input: &NewBatch) -> SettlementResult<()> {
        if input.settlement_number.trim().is_empty() {
            return Err(SettlementError::Validation(
                "Settlement number is required".to_string(),
            ));
        }

        if input.settlement_date < input.trade_date {
            return Err(SettlementError::Validation(
                "Settlement date must not be before trade date".to_string(),
            ));
        }

        if input.total_turnover < Decimal::ZERO {
            return Err(SettlementError::Validation(
                "Total turnover must not be negative".to_string(),
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

    use common::{ActorId, BrokerId, ClientId, ExchangeId, TenantId};

    use crate::store::memory::InMemorySettlementStore;
    use crate::types::{BatchStatus, NewObligation, ObligationStatus};

    fn test_ctx() -> TenantContext {
        TenantContext::new(TenantId::new(), ActorId::new())
    }

    fn batch_input(settlement_number: &str) -> NewBatch {
        NewBatch {
            settlement_number: settlement_number.to_string(),
            trade_date: NaiveDate::from_ymd_opt(2026, 4, 6).unwrap(),
            settlement_date: NaiveDate::from_ymd_opt(2026, 4, 8).unwrap(),
            exchange_id: ExchangeId::new(),
            total_trades: 120,
            total_turnover: Decimal::new(5_000_000, 0),
        }
    }

    fn obligation_input(batch: &SettlementBatch, client: ClientId) -> NewObligation {
        NewObligation {
            batch_id: batch.id,
            broker_id: BrokerId::new(),
            client_id: client,
            settlement_number: batch.settlement_number.clone(),
            funds_pay_in: Decimal::new(1000, 0),
            funds_pay_out: Decimal::new(250, 0),
            net_funds_obligation: Decimal::new(750, 0),
            securities_pay_in: Decimal::ZERO,
            securities_pay_out: Decimal::new(10, 0),
            net_securities_obligation: Decimal::new(-10, 0),
        }
    }

    async fn setup() -> (Arc<InMemorySettlementStore>, SettlementManager, TenantContext) {
        let store = Arc::new(InMemorySettlementStore::new());
        let manager = SettlementManager::new(store.clone());
        (store, manager, test_ctx())
    }

    #[tokio::test]
    async fn test_create_batch() {
        let (_, manager, ctx) = setup().await;

        let batch = manager.create_batch(&ctx, batch_input("2026068")).await.unwrap();

        assert_eq!(batch.status, BatchStatus::Pending);
        assert_eq!(batch.tenant_id, ctx.tenant);
        assert!(batch.processed_at.is_none());
    }

    #[tokio::test]
    async fn test_create_batch_rejects_bad_dates() {
        let (_, manager, ctx) = setup().await;

        let mut input = batch_input("2026069");
        input.settlement_date = NaiveDate::from_ymd_opt(2026, 4, 3).unwrap();
        assert_matches!(
            manager.create_batch(&ctx, input).await,
            Err(SettlementError::Validation(_))
        );
    }

    #[tokio::test]
    async fn test_duplicate_settlement_number_per_tenant() {
        let (_, manager, ctx) = setup().await;

        manager.create_batch(&ctx, batch_input("2026070")).await.unwrap();
        assert_matches!(
            manager.create_batch(&ctx, batch_input("2026070")).await,
            Err(SettlementError::Conflict(_))
        );

        // A different tenant may reuse the number.
        let other = test_ctx();
        manager.create_batch(&other, batch_input("2026070")).await.unwrap();
    }

    #[tokio::test]
    async fn test_process_batch_settles_all_pending_obligations() {
        let (store, manager, ctx) = setup().await;

        let batch = manager.create_batch(&ctx, batch_input("2026071")).await.unwrap();
        for _ in 0..3 {
            store
                .create_obligation(ctx.tenant, ctx.actor, obligation_input(&batch, ClientId::new()))
                .await
                .unwrap();
        }

        let completed = manager.process_batch(&ctx, batch.id).await.unwrap();
        assert_eq!(completed.status, BatchStatus::Completed);
        assert!(completed.processed_at.is_some());
        assert_eq!(completed.processed_by, Some(ctx.actor));

        let obligations = manager.obligations_for_batch(&ctx, batch.id).await.unwrap();
        assert_eq!(obligations.len(), 3);
        for obligation in obligations {
            assert_eq!(obligation.status, ObligationStatus::Settled);
            assert!(obligation.settled_at.is_some());
        }
    }

    #[tokio::test]
    async fn test_process_batch_vacuous_completion() {
        let (_, manager, ctx) = setup().await;

        let batch = manager.create_batch(&ctx, batch_input("2026072")).await.unwrap();
        let completed = manager.process_batch(&ctx, batch.id).await.unwrap();

        assert_eq!(completed.status, BatchStatus::Completed);
    }

    #[tokio::test]
    async fn test_process_batch_twice_rejected() {
        let (_, manager, ctx) = setup().await;

        let batch = manager.create_batch(&ctx, batch_input("2026073")).await.unwrap();
        manager.process_batch(&ctx, batch.id).await.unwrap();

        let result = manager.process_batch(&ctx, batch.id).await;
        assert_matches!(
            result,
            Err(SettlementError::InvalidState { entity: "batch", .. })
        );
    }

    #[tokio::test]
    async fn test_process_missing_batch_not_found() {
        let (_, manager, ctx) = setup().await;

        let missing = Uuid::new_v4();
        assert_matches!(
            manager.process_batch(&ctx, missing).await,
            Err(SettlementError::NotFound(id)) if id == missing
        );
    }

    #[tokio::test]
    async fn test_settle_single_obligation_then_reject_resettle() {
        let (store, manager, ctx) = setup().await;

        let batch = manager.create_batch(&ctx, batch_input("2026074")).await.unwrap();
        let obligation = store
            .create_obligation(ctx.tenant, ctx.actor, obligation_input(&batch, ClientId::new()))
            .await
            .unwrap();

        let settled = manager.settle_obligation(&ctx, obligation.id).await.unwrap();
        assert_eq!(settled.status, ObligationStatus::Settled);

        assert_matches!(
            manager.settle_obligation(&ctx, obligation.id).await,
            Err(SettlementError::InvalidState {
                entity: "obligation",
                ..
            })
        );
    }

    #[tokio::test]
    async fn test_already_settled_obligation_survives_batch_processing() {
        let (store, manager, ctx) = setup().await;

        let batch = manager.create_batch(&ctx, batch_input("2026075")).await.unwrap();
        let early = store
            .create_obligation(ctx.tenant, ctx.actor, obligation_input(&batch, ClientId::new()))
            .await
            .unwrap();
        store
            .create_obligation(ctx.tenant, ctx.actor, obligation_input(&batch, ClientId::new()))
            .await
            .unwrap();

        let early_settled = manager.settle_obligation(&ctx, early.id).await.unwrap();
        let early_time = early_settled.settled_at;

        manager.process_batch(&ctx, batch.id).await.unwrap();

        // The individually settled obligation keeps its original timestamp.
        let after = manager.get_obligation(&ctx, early.id).await.unwrap().unwrap();
        assert_eq!(after.settled_at, early_time);
    }

    #[tokio::test]
    async fn test_rejected_processing_leaves_obligations_untouched() {
        let (store, manager, ctx) = setup().await;

        let batch = manager.create_batch(&ctx, batch_input("2026080")).await.unwrap();
        manager.process_batch(&ctx, batch.id).await.unwrap();

        // A straggler obligation loaded after completion stays pending when
        // re-processing is rejected: the guard fires before any write.
        let straggler = store
            .create_obligation(ctx.tenant, ctx.actor, obligation_input(&batch, ClientId::new()))
            .await
            .unwrap();

        assert_matches!(
            manager.process_batch(&ctx, batch.id).await,
            Err(SettlementError::InvalidState { .. })
        );

        let after = manager.get_obligation(&ctx, straggler.id).await.unwrap().unwrap();
        assert_eq!(after.status, ObligationStatus::Pending);
        assert!(after.settled_at.is_none());
    }

    #[tokio::test]
    async fn test_get_obligation_detects_corrupt_nets() {
        let (store, manager, ctx) = setup().await;

        let batch = manager.create_batch(&ctx, batch_input("2026076")).await.unwrap();
        let mut input = obligation_input(&batch, ClientId::new());
        input.net_funds_obligation = Decimal::new(1, 0); // disagrees with 1000 - 250
        let obligation = store
            .create_obligation(ctx.tenant, ctx.actor, input)
            .await
            .unwrap();

        assert_matches!(
            manager.get_obligation(&ctx, obligation.id).await,
            Err(SettlementError::Storage(_))
        );
    }

    #[tokio::test]
    async fn test_batch_invisible_to_other_tenant() {
        let (_, manager, ctx) = setup().await;
        let other = test_ctx();

        let batch = manager.create_batch(&ctx, batch_input("2026077")).await.unwrap();

        assert!(manager.get_batch(&other, batch.id).await.unwrap().is_none());
        assert_matches!(
            manager.process_batch(&other, batch.id).await,
            Err(SettlementError::NotFound(_))
        );
    }
}
