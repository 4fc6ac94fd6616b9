//! In-memory reconciliation store implementation

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use uuid::Uuid;

use common::{ActorId, TenantId};

use crate::error::ReconError;
use crate::store::traits::{ReconResult, ReconStore};
use crate::types::{ExceptionAction, ExceptionStatus, ReconException, Reconciliation};

#[derive(Default)]
struct TenantData {
    reconciliations: HashMap<Uuid, Reconciliation>,
    exceptions: HashMap<Uuid, ReconException>,
}

/// In-memory reconciliation store for testing and development
pub struct InMemoryReconStore {
    tenants: RwLock<HashMap<TenantId, TenantData>>,
}

impl InMemoryReconStore {
    /// Create a new in-memory reconciliation store
    pub fn new() -> Self {
        Self {
            tenants: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryReconStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReconStore for InMemoryReconStore {
    async fn create_run(
        &self,
        reconciliation: Reconciliation,
        exception: Option<ReconException>,
    ) -> ReconResult<()> {
        // Single write lock spans both inserts.
        let mut tenants = self.tenants.write();
        let data = tenants.entry(reconciliation.tenant_id).or_default();

        data.reconciliations
            .insert(reconciliation.id, reconciliation);
        if let Some(exception) = exception {
            data.exceptions.insert(exception.id, exception);
        }

        Ok(())
    }

    async fn get_reconciliation(
        &self,
        tenant: TenantId,
        reconciliation_id: Uuid,
    ) -> ReconResult<Option<Reconciliation>> {
        let tenants = self.tenants.read();
        Ok(tenants
            .get(&tenant)
            .and_then(|d| d.reconciliations.get(&reconciliation_id))
            .filter(|r| !r.audit.deleted)
            .cloned())
    }

    async fn get_exception(
        &self,
        tenant: TenantId,
        exception_id: Uuid,
    ) -> ReconResult<Option<ReconException>> {
        let tenants = self.tenants.read();
        Ok(tenants
            .get(&tenant)
            .and_then(|d| d.exceptions.get(&exception_id))
            .filter(|e| !e.audit.deleted)
            .cloned())
    }

    async fn resolve_exception(
        &self,
        tenant: TenantId,
        actor: ActorId,
        exception_id: Uuid,
        resolution: String,
        now: DateTime<Utc>,
    ) -> ReconResult<ReconException> {
        let mut tenants = self.tenants.write();
        let exception = tenants
            .get_mut(&tenant)
            .and_then(|d| d.exceptions.get_mut(&exception_id))
            .filter(|e| !e.audit.deleted)
            .ok_or(ReconError::NotFound(exception_id))?;

        let next = exception
            .status
            .transition(ExceptionAction::Resolve)
            .ok_or(ReconError::InvalidState {
                current: exception.status,
                action: "resolve",
            })?;

        exception.status = next;
        exception.resolution = Some(resolution);
        exception.resolved_at = Some(now);
        exception.audit.touch(actor);

        Ok(exception.clone())
    }

    async fn open_exceptions(&self, tenant: TenantId) -> ReconResult<Vec<ReconException>> {
        let tenants = self.tenants.read();
        let mut result: Vec<ReconException> = tenants
            .get(&tenant)
            .map(|d| {
                d.exceptions
                    .values()
                    .filter(|e| e.status == ExceptionStatus::Open && !e.audit.deleted)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        result.sort_by_key(|e| e.audit.created_at);
        Ok(result)
    }
}
