//! Trade Manager - booking and cancellation logic

use std::sync::Arc;

use rust_decimal::Decimal;
use uuid::Uuid;

use common::TenantContext;

use crate::error::TradeError;
use crate::number::TradeNumberGenerator;
use crate::store::traits::{TradeResult, TradeStore};
use crate::types::{NewTrade, Trade, TradeAction};

/// Trade Manager - handles the booked-trade lifecycle
pub struct TradeManager {
    store: Arc<dyn TradeStore>,
    numbers: TradeNumberGenerator,
}

impl TradeManager {
    /// Create a new TradeManager
    pub fn new(store: Arc<dyn TradeStore>) -> Self {
        Self {
            store,
            numbers: TradeNumberGenerator::new(),
        }
    }

    /// Book a trade
    ///
    /// Validates the input, generates a trade number, and persists the
    /// trade as `Pending`. A trade-number collision is retried exactly
    /// once with a freshly generated number; a second collision is a
    /// fatal persistence error.
    pub async fn book_trade(&self, ctx: &TenantContext, input: NewTrade) -> TradeResult<Trade> {
        self.validate_booking(&input)?;

        let trade = Trade::book(ctx.tenant, ctx.actor, self.numbers.next(), input);

        let booked = match self.store.create(trade.clone()).await {
            Err(TradeError::Conflict(_)) => {
                let retry = Trade {
                    trade_number: self.numbers.next(),
                    ..trade
                };
                self.store.create(retry).await.map_err(|e| match e {
                    TradeError::Conflict(msg) => {
                        TradeError::Storage(format!("trade number collision after retry: {}", msg))
                    }
                    other => other,
                })?
            }
            other => other?,
        };

        tracing::info!(
            trade_number = %booked.trade_number,
            client = %booked.client_id,
            value = %booked.trade_value,
            "Trade booked"
        );

        Ok(booked)
    }

    /// Cancel a trade
    ///
    /// Only `Pending` and `Validated` trades are cancellable; settled,
    /// already-cancelled, rejected, and amended trades reject the
    /// transition.
    pub async fn cancel_trade(
        &self,
        ctx: &TenantContext,
        trade_id: Uuid,
        reason: impl Into<String>,
    ) -> TradeResult<Trade> {
        let mut trade = self
            .store
            .get(ctx.tenant, trade_id)
            .await?
            .ok_or(TradeError::NotFound(trade_id))?;

        let next = trade
            .status
            .transition(TradeAction::Cancel)
            .ok_or(TradeError::InvalidState {
                current: trade.status,
                action: "cancel",
            })?;

        trade.status = next;
        trade.rejection_reason = Some(reason.into());
        trade.audit.touch(ctx.actor);
        self.store.update(&trade).await?;

        tracing::info!(trade_number = %trade.trade_number, "Trade cancelled");

        Ok(trade)
    }

    /// Get a trade by id
    pub async fn get_trade(&self, ctx: &TenantContext, trade_id: Uuid) -> TradeResult<Option<Trade>> {
        self.store.get(ctx.tenant, trade_id).await
    }

    /// Validate booking parameters
    fn validate_booking(&self, input: &NewTrade) -> TradeResult<()> {
        if input.quantity == 0 {
            return Err(TradeError::Validation(
                "Quantity must be greater than 0".to_string(),
            ));
        }

        if input.price <= Decimal::ZERO {
            return Err(TradeError::Validation(
                "Price must be greater than 0".to_string(),
            ));
        }

        if input.settlement_number.trim().is_empty() {
            return Err(TradeError::Validation(
                "Settlement number is required".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::Utc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;
    use common::{ActorId, BrokerId, ClientId, InstrumentId, Side, TenantId};

    use crate::store::memory::InMemoryTradeStore;
    use crate::types::{TradeSource, TradeStatus};

    fn test_ctx() -> TenantContext {
        TenantContext::new(TenantId::new(), ActorId::new())
    }

    fn manager() -> TradeManager {
        TradeManager::new(Arc::new(InMemoryTradeStore::new()))
    }

    fn booking() -> NewTrade {
        NewTrade {
            broker_id: BrokerId::new(),
            client_id: ClientId::new(),
            instrument_id: InstrumentId::new(),
            side: Side::Buy,
            quantity: 100,
            price: Decimal::new(25050, 2), // 250.50
            traded_at: Utc::now(),
            settlement_number: "2026068".to_string(),
            source: TradeSource::ExchangeFeed,
            exchange_trade_number: Some("EX-1".to_string()),
            source_reference: None,
        }
    }

    /// Store wrapper that rejects the first `fail_creates` inserts with a
    /// trade-number conflict, then delegates.
    struct ConflictingStore {
        inner: InMemoryTradeStore,
        remaining_conflicts: AtomicU32,
    }

    impl ConflictingStore {
        fn new(conflicts: u32) -> Self {
            Self {
                inner: InMemoryTradeStore::new(),
                remaining_conflicts: AtomicU32::new(conflicts),
            }
        }
    }

    #[async_trait]
    impl TradeStore for ConflictingStore {
        async fn create(&self, trade: Trade) -> TradeResult<Trade> {
            if self
                .remaining_conflicts
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(TradeError::Conflict("duplicate trade number".to_string()));
            }
            self.inner.create(trade).await
        }

        async fn get(&self, tenant: TenantId, trade_id: Uuid) -> TradeResult<Option<Trade>> {
            self.inner.get(tenant, trade_id).await
        }

        async fn update(&self, trade: &Trade) -> TradeResult<()> {
            self.inner.update(trade).await
        }
    }

    #[tokio::test]
    async fn test_book_trade_values() {
        let manager = manager();
        let ctx = test_ctx();

        let trade = manager.book_trade(&ctx, booking()).await.unwrap();

        assert_eq!(trade.trade_value, Decimal::new(2505000, 2)); // 25050.00
        assert_eq!(trade.net_amount, Decimal::new(2505000, 2));
        assert_eq!(trade.status, TradeStatus::Pending);
        assert_eq!(trade.tenant_id, ctx.tenant);
        assert!(trade.trade_number.starts_with("TRD-"));
    }

    #[tokio::test]
    async fn test_book_trade_rejects_bad_input() {
        let manager = manager();
        let ctx = test_ctx();

        let mut zero_qty = booking();
        zero_qty.quantity = 0;
        assert_matches!(
            manager.book_trade(&ctx, zero_qty).await,
            Err(TradeError::Validation(_))
        );

        let mut zero_price = booking();
        zero_price.price = Decimal::ZERO;
        assert_matches!(
            manager.book_trade(&ctx, zero_price).await,
            Err(TradeError::Validation(_))
        );

        let mut blank_settlement = booking();
        blank_settlement.settlement_number = " ".to_string();
        assert_matches!(
            manager.book_trade(&ctx, blank_settlement).await,
            Err(TradeError::Validation(_))
        );
    }

    #[tokio::test]
    async fn test_number_collision_retried_once() {
        let manager = TradeManager::new(Arc::new(ConflictingStore::new(1)));
        let ctx = test_ctx();

        let trade = manager.book_trade(&ctx, booking()).await.unwrap();
        assert_eq!(trade.status, TradeStatus::Pending);
    }

    #[tokio::test]
    async fn test_second_collision_is_fatal() {
        let manager = TradeManager::new(Arc::new(ConflictingStore::new(2)));
        let ctx = test_ctx();

        let result = manager.book_trade(&ctx, booking()).await;
        assert_matches!(result, Err(TradeError::Storage(_)));
    }

    #[tokio::test]
    async fn test_cancel_trade() {
        let manager = manager();
        let ctx = test_ctx();

        let trade = manager.book_trade(&ctx, booking()).await.unwrap();
        let cancelled = manager
            .cancel_trade(&ctx, trade.id, "keyed against wrong client")
            .await
            .unwrap();

        assert_eq!(cancelled.status, TradeStatus::Cancelled);
        assert_eq!(
            cancelled.rejection_reason.as_deref(),
            Some("keyed against wrong client")
        );
    }

    #[tokio::test]
    async fn test_cancel_twice_rejected() {
        let manager = manager();
        let ctx = test_ctx();

        let trade = manager.book_trade(&ctx, booking()).await.unwrap();
        manager.cancel_trade(&ctx, trade.id, "dup").await.unwrap();

        let result = manager.cancel_trade(&ctx, trade.id, "again").await;
        assert_matches!(
            result,
            Err(TradeError::InvalidState {
                current: TradeStatus::Cancelled,
                ..
            })
        );
    }

    #[tokio::test]
    async fn test_cancel_settled_trade_rejected() {
        let store = Arc::new(InMemoryTradeStore::new());
        let manager = TradeManager::new(store.clone());
        let ctx = test_ctx();

        let mut trade = manager.book_trade(&ctx, booking()).await.unwrap();
        trade.status = TradeStatus::Settled;
        store.update(&trade).await.unwrap();

        let result = manager.cancel_trade(&ctx, trade.id, "too late").await;
        assert_matches!(
            result,
            Err(TradeError::InvalidState {
                current: TradeStatus::Settled,
                ..
            })
        );
    }

    #[tokio::test]
    async fn test_cancel_missing_trade_not_found() {
        let manager = manager();
        let ctx = test_ctx();

        let missing = Uuid::new_v4();
        let result = manager.cancel_trade(&ctx, missing, "nope").await;
        assert_matches!(result, Err(TradeError::NotFound(id)) if id == missing);
    }

    #[tokio::test]
    async fn test_trade_invisible_to_other_tenant() {
        let store = Arc::new(InMemoryTradeStore::new());
        let manager = TradeManager::new(store);
        let ctx_a = test_ctx();
        let ctx_b = test_ctx();

        let trade = manager.book_trade(&ctx_a, booking()).await.unwrap();

        assert!(manager.get_trade(&ctx_b, trade.id).await.unwrap().is_none());
        assert_matches!(
            manager.cancel_trade(&ctx_b, trade.id, "cross-tenant").await,
            Err(TradeError::NotFound(_))
        );
    }
}
