//! TradeStore trait definition

use async_trait::async_trait;
use uuid::Uuid;

use common::TenantId;

use crate::error::TradeError;
use crate::types::Trade;

/// TradeStore trait - defines the interface for trade persistence
///
/// This trait allows different storage implementations (in-memory,
/// PostgreSQL, etc.) to be swapped without changing the lifecycle logic.
/// Every method is scoped by tenant; no implementation may return a row
/// belonging to another tenant.
#[async_trait]
pub trait TradeStore: Send + Sync {
    /// Persist a newly booked trade
    ///
    /// Trade numbers are globally unique; a duplicate surfaces as
    /// [`TradeError::Conflict`].
    async fn create(&self, trade: Trade) -> TradeResult<Trade>;

    /// Get a trade by id within a tenant
    async fn get(&self, tenant: TenantId, trade_id: Uuid) -> TradeResult<Option<Trade>>;

    /// Update an existing trade
    async fn update(&self, trade: &Trade) -> TradeResult<()>;
}

/// Result type for TradeStore operations
pub type TradeResult<T> = std::result::Result<T, TradeError>;
