//! In-memory settlement store implementation
//!
//! A single write lock spans each compound transition, so batch
//! completion and single-obligation settlement are all-or-nothing with
//! respect to concurrent readers and writers.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use uuid::Uuid;

use common::{ActorId, TenantId};

use crate::error::SettlementError;
use crate::store::traits::{SettlementResult, SettlementStore};
use crate::types::{
    BatchAction, NewObligation, ObligationAction, SettlementBatch, SettlementObligation,
};

#[derive(Default)]
struct TenantData {
    batches: HashMap<Uuid, SettlementBatch>,
    obligations: HashMap<Uuid, SettlementObligation>,
}

/// In-memory settlement store for testing and development
pub struct InMemorySettlementStore {
    tenants: RwLock<HashMap<TenantId, TenantData>>,
}

impl InMemorySettlementStore {
    /// Create a new in-memory settlement store
    pub fn new() -> Self {
        Self {
            tenants: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemorySettlementStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SettlementStore for InMemorySettlementStore {
    async fn create_batch(&self, batch: SettlementBatch) -> SettlementResult<SettlementBatch> {
        let mut tenants = self.tenants.write();
        let data = tenants.entry(batch.tenant_id).or_default();

        if data
            .batches
            .values()
            .any(|b| !b.audit.deleted && b.settlement_number == batch.settlement_number)
        {
            return Err(SettlementError::Conflict(format!(
                "duplicate settlement number: {}",
                batch.settlement_number
            )));
        }

        data.batches.insert(batch.id, batch.clone());
        Ok(batch)
    }

    async fn get_batch(
        &self,
        tenant: TenantId,
        batch_id: Uuid,
    ) -> SettlementResult<Option<SettlementBatch>> {
        let tenants = self.tenants.read();
        Ok(tenants
            .get(&tenant)
            .and_then(|d| d.batches.get(&batch_id))
            .filter(|b| !b.audit.deleted)
            .cloned())
    }

    async fn complete_batch(
        &self,
        tenant: TenantId,
        actor: ActorId,
        batch_id: Uuid,
        now: DateTime<Utc>,
    ) -> SettlementResult<(SettlementBatch, u64)> {
        let mut tenants = self.tenants.write();
        let data = tenants
            .get_mut(&tenant)
            .ok_or(SettlementError::NotFound(batch_id))?;

        let batch = data
            .batches
            .get_mut(&batch_id)
            .filter(|b| !b.audit.deleted)
            .ok_or(SettlementError::NotFound(batch_id))?;

        let next = batch
            .status
            .transition(BatchAction::Process)
            .ok_or_else(|| SettlementError::InvalidState {
                entity: "batch",
                current: batch.status.to_string(),
                action: "process",
            })?;

        let mut settled = 0u64;
        for obligation in data
            .obligations
            .values_mut()
            .filter(|o| o.batch_id == batch_id && !o.audit.deleted)
        {
            if let Some(next) = obligation.status.transition(ObligationAction::Settle) {
                obligation.status = next;
                obligation.settled_at = Some(now);
                obligation.audit.touch(actor);
                settled += 1;
            }
        }

        batch.status = next;
        batch.processed_at = Some(now);
        batch.processed_by = Some(actor);
        batch.audit.touch(actor);

        Ok((batch.clone(), settled))
    }

    async fn create_obligation(
        &self,
        tenant: TenantId,
        actor: ActorId,
        obligation: NewObligation,
    ) -> SettlementResult<SettlementObligation> {
        let mut tenants = self.tenants.write();
        let data = tenants.entry(tenant).or_default();

        if !data
            .batches
            .get(&obligation.batch_id)
            .map(|b| !b.audit.deleted)
            .unwrap_or(false)
        {
            return Err(SettlementError::NotFound(obligation.batch_id));
        }

        if data.obligations.values().any(|o| {
            !o.audit.deleted
                && o.settlement_number == obligation.settlement_number
                && o.client_id == obligation.client_id
        }) {
            return Err(SettlementError::Conflict(format!(
                "duplicate obligation for client {} in settlement {}",
                obligation.client_id, obligation.settlement_number
            )));
        }

        let stored = SettlementObligation::create(tenant, actor, obligation);
        data.obligations.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn get_obligation(
        &self,
        tenant: TenantId,
        obligation_id: Uuid,
    ) -> SettlementResult<Option<SettlementObligation>> {
        let tenants = self.tenants.read();
        Ok(tenants
            .get(&tenant)
            .and_then(|d| d.obligations.get(&obligation_id))
            .filter(|o| !o.audit.deleted)
            .cloned())
    }

    async fn settle_obligation(
        &self,
        tenant: TenantId,
        actor: ActorId,
        obligation_id: Uuid,
        now: DateTime<Utc>,
    ) -> SettlementResult<SettlementObligation> {
        let mut tenants = self.tenants.write();
        let obligation = tenants
            .get_mut(&tenant)
            .and_then(|d| d.obligations.get_mut(&obligation_id))
            .filter(|o| !o.audit.deleted)
            .ok_or(SettlementError::NotFound(obligation_id))?;

        let next = obligation
            .status
            .transition(ObligationAction::Settle)
            .ok_or_else(|| SettlementError::InvalidState {
                entity: "obligation",
                current: obligation.status.to_string(),
                action: "settle",
            })?;

        obligation.status = next;
        obligation.settled_at = Some(now);
        obligation.audit.touch(actor);

        Ok(obligation.clone())
    }

    async fn obligations_for_batch(
        &self,
        tenant: TenantId,
        batch_id: Uuid,
    ) -> SettlementResult<Vec<SettlementObligation>> {
        let tenants = self.tenants.read();
        Ok(tenants
            .get(&tenant)
            .map(|d| {
                d.obligations
                    .values()
                    .filter(|o| o.batch_id == batch_id && !o.audit.deleted)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}
