//! SettlementStore trait definition

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use common::{ActorId, TenantId};

use crate::error::SettlementError;
use crate::types::{NewObligation, SettlementBatch, SettlementObligation};

/// SettlementStore trait - defines the interface for settlement persistence
///
/// This trait allows different storage implementations (in-memory,
/// PostgreSQL, etc.) to be swapped without changing the settlement logic.
/// Every method is scoped by tenant.
///
/// The compound transitions ([`complete_batch`](SettlementStore::complete_batch),
/// [`settle_obligation`](SettlementStore::settle_obligation)) apply their
/// state-machine guard *inside* the atomic unit, so a concurrent caller
/// cannot complete the same batch twice between a read and a write.
#[async_trait]
pub trait SettlementStore: Send + Sync {
    /// Persist a new batch
    ///
    /// Settlement numbers are unique per tenant; a duplicate surfaces as
    /// [`SettlementError::Conflict`].
    async fn create_batch(&self, batch: SettlementBatch) -> SettlementResult<SettlementBatch>;

    /// Get a batch by id within a tenant
    async fn get_batch(
        &self,
        tenant: TenantId,
        batch_id: Uuid,
    ) -> SettlementResult<Option<SettlementBatch>>;

    /// Settle every pending obligation of a batch and complete the batch,
    /// as one atomic unit
    ///
    /// Fails with [`SettlementError::NotFound`] when the batch is absent
    /// for the tenant and [`SettlementError::InvalidState`] when it is not
    /// `Pending`. Returns the completed batch and the number of
    /// obligations settled; zero pending obligations still completes.
    async fn complete_batch(
        &self,
        tenant: TenantId,
        actor: ActorId,
        batch_id: Uuid,
        now: DateTime<Utc>,
    ) -> SettlementResult<(SettlementBatch, u64)>;

    /// Boundary for the external clearing step: persist a pre-netted
    /// obligation under a pending batch
    ///
    /// Obligations are unique per (tenant, settlement number, client);
    /// a duplicate surfaces as [`SettlementError::Conflict`].
    async fn create_obligation(
        &self,
        tenant: TenantId,
        actor: ActorId,
        obligation: NewObligation,
    ) -> SettlementResult<SettlementObligation>;

    /// Get an obligation by id within a tenant
    async fn get_obligation(
        &self,
        tenant: TenantId,
        obligation_id: Uuid,
    ) -> SettlementResult<Option<SettlementObligation>>;

    /// Settle a single obligation, guard and flip in one atomic unit
    async fn settle_obligation(
        &self,
        tenant: TenantId,
        actor: ActorId,
        obligation_id: Uuid,
        now: DateTime<Utc>,
    ) -> SettlementResult<SettlementObligation>;

    /// All obligations of a batch
    async fn obligations_for_batch(
        &self,
        tenant: TenantId,
        batch_id: Uuid,
    ) -> SettlementResult<Vec<SettlementObligation>>;
}

/// Result type for SettlementStore operations
pub type SettlementResult<T> = std::result::Result<T, SettlementError>;
