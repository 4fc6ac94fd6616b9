//! ReconStore trait definition

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use common::{ActorId, TenantId};

use crate::error::ReconError;
use crate::types::{ReconException, Reconciliation};

/// ReconStore trait - defines the interface for reconciliation persistence
///
/// This trait allows different storage implementations (in-memory,
/// PostgreSQL, etc.) to be swapped without changing the engine logic.
/// Every method is scoped by tenant.
#[async_trait]
pub trait ReconStore: Send + Sync {
    /// Persist a reconciliation and its exception (when mismatched) as
    /// one atomic unit: both commit or neither does
    async fn create_run(
        &self,
        reconciliation: Reconciliation,
        exception: Option<ReconException>,
    ) -> ReconResult<()>;

    /// Get a reconciliation by id within a tenant
    async fn get_reconciliation(
        &self,
        tenant: TenantId,
        reconciliation_id: Uuid,
    ) -> ReconResult<Option<Reconciliation>>;

    /// Get an exception by id within a tenant
    async fn get_exception(
        &self,
        tenant: TenantId,
        exception_id: Uuid,
    ) -> ReconResult<Option<ReconException>>;

    /// Record a resolution, guard and flip in one atomic unit
    async fn resolve_exception(
        &self,
        tenant: TenantId,
        actor: ActorId,
        exception_id: Uuid,
        resolution: String,
        now: DateTime<Utc>,
    ) -> ReconResult<ReconException>;

    /// All open exceptions of a tenant, oldest first
    async fn open_exceptions(&self, tenant: TenantId) -> ReconResult<Vec<ReconException>>;
}

/// Result type for ReconStore operations
pub type ReconResult<T> = std::result::Result<T, ReconError>;
