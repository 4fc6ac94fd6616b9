//! PostgreSQL settlement store implementation
//!
//! Compound transitions run in one transaction with the target row locked
//! (`SELECT ... FOR UPDATE`), so the state-machine guard and the writes it
//! protects are indivisible.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPool;
use sqlx::Row;
use uuid::Uuid;

use common::{ActorId, AuditMeta, BrokerId, ClientId, ExchangeId, TenantId};

use crate::error::SettlementError;
use crate::store::traits::{SettlementResult, SettlementStore};
use crate::types::{
    BatchAction, NewObligation, ObligationAction, SettlementBatch, SettlementObligation,
};

/// PostgreSQL settlement store
pub struct PostgresSettlementStore {
    pool: Arc<PgPool>,
}

impl PostgresSettlementStore {
    /// Create a new PostgreSQL settlement store
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    fn row_to_batch(row: &sqlx::postgres::PgRow) -> SettlementResult<SettlementBatch> {
        let status: String = row.get("status");
        Ok(SettlementBatch {
            id: row.get("id"),
            tenant_id: TenantId::from_uuid(row.get("tenant_id")),
            settlement_number: row.get("settlement_number"),
            trade_date: row.get("trade_date"),
            settlement_date: row.get("settlement_date"),
            exchange_id: ExchangeId(row.get("exchange_id")),
            total_trades: row.get::<i64, _>("total_trades") as u32,
            total_turnover: row.get("total_turnover"),
            status: status.parse().map_err(SettlementError::Storage)?,
            processed_at: row.get("processed_at"),
            processed_by: row
                .get::<Option<Uuid>, _>("processed_by")
                .map(ActorId::from_uuid),
            audit: Self::row_to_audit(row),
        })
    }

    fn row_to_obligation(row: &sqlx::postgres::PgRow) -> SettlementResult<SettlementObligation> {
        let status: String = row.get("status");
        Ok(SettlementObligation {
            id: row.get("id"),
            tenant_id: TenantId::from_uuid(row.get("tenant_id")),
            batch_id: row.get("batch_id"),
            broker_id: BrokerId(row.get("broker_id")),
            client_id: ClientId::from_uuid(row.get("client_id")),
            settlement_number: row.get("settlement_number"),
            funds_pay_in: row.get("funds_pay_in"),
            funds_pay_out: row.get("funds_pay_out"),
            net_funds_obligation: row.get("net_funds_obligation"),
            securities_pay_in: row.get("securities_pay_in"),
            securities_pay_out: row.get("securities_pay_out"),
            net_securities_obligation: row.get("net_securities_obligation"),
            status: status.parse().map_err(SettlementError::Storage)?,
            settled_at: row.get("settled_at"),
            audit: Self::row_to_audit(row),
        })
    }

    fn row_to_audit(row: &sqlx::postgres::PgRow) -> AuditMeta {
        AuditMeta {
            created_at: row.get("created_at"),
            created_by: ActorId(row.get("created_by")),
            updated_at: row.get("updated_at"),
            updated_by: ActorId(row.get("updated_by")),
            deleted: row.get("deleted"),
        }
    }
}

#[async_trait]
impl SettlementStore for PostgresSettlementStore {
    async fn create_batch(&self, batch: SettlementBatch) -> SettlementResult<SettlementBatch> {
        sqlx::query(
            r#"
            INSERT INTO settlement_batches (
                id, tenant_id, settlement_number, trade_date, settlement_date,
                exchange_id, total_trades, total_turnover, status,
                processed_at, processed_by,
                created_at, created_by, updated_at, updated_by, deleted
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16
            )
            "#,
        )
        .bind(batch.id)
        .bind(batch.tenant_id.0)
        .bind(&batch.settlement_number)
        .bind(batch.trade_date)
        .bind(batch.settlement_date)
        .bind(batch.exchange_id.0)
        .bind(batch.total_trades as i64)
        .bind(batch.total_turnover)
        .bind(batch.status.as_str())
        .bind(batch.processed_at)
        .bind(batch.processed_by.map(|a| a.0))
        .bind(batch.audit.created_at)
        .bind(batch.audit.created_by.0)
        .bind(batch.audit.updated_at)
        .bind(batch.audit.updated_by.0)
        .bind(batch.audit.deleted)
        .execute(&*self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => SettlementError::Conflict(
                format!("duplicate settlement number: {}", batch.settlement_number),
            ),
            _ => SettlementError::Storage(e.to_string()),
        })?;

        Ok(batch)
    }

    async fn get_batch(
        &self,
        tenant: TenantId,
        batch_id: Uuid,
    ) -> SettlementResult<Option<SettlementBatch>> {
        let row = sqlx::query(
            "SELECT * FROM settlement_batches WHERE tenant_id = $1 AND id = $2 AND deleted = FALSE",
        )
        .bind(tenant.0)
        .bind(batch_id)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| SettlementError::Storage(e.to_string()))?;

        match row {
            Some(row) => Ok(Some(Self::row_to_batch(&row)?)),
            None => Ok(None),
        }
    }

    async fn complete_batch(
        &self,
        tenant: TenantId,
        actor: ActorId,
        batch_id: Uuid,
        now: DateTime<Utc>,
    ) -> SettlementResult<(SettlementBatch, u64)> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| SettlementError::Storage(e.to_string()))?;

        let row = sqlx::query(
            r#"
            SELECT * FROM settlement_batches
            WHERE tenant_id = $1 AND id = $2 AND deleted = FALSE
            FOR UPDATE
            "#,
        )
        .bind(tenant.0)
        .bind(batch_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| SettlementError::Storage(e.to_string()))?
        .ok_or(SettlementError::NotFound(batch_id))?;

        let mut batch = Self::row_to_batch(&row)?;
        let next = batch
            .status
            .transition(BatchAction::Process)
            .ok_or_else(|| SettlementError::InvalidState {
                entity: "batch",
                current: batch.status.to_string(),
                action: "process",
            })?;

        let settled = sqlx::query(
            r#"
            UPDATE settlement_obligations
            SET status = $1, settled_at = $2, updated_at = $2, updated_by = $3
            WHERE tenant_id = $4 AND batch_id = $5 AND status = $6 AND deleted = FALSE
            "#,
        )
        .bind("settled")
        .bind(now)
        .bind(actor.0)
        .bind(tenant.0)
        .bind(batch_id)
        .bind("pending")
        .execute(&mut *tx)
        .await
        .map_err(|e| SettlementError::Storage(e.to_string()))?
        .rows_affected();

        sqlx::query(
            r#"
            UPDATE settlement_batches
            SET status = $1, processed_at = $2, processed_by = $3, updated_at = $2, updated_by = $3
            WHERE tenant_id = $4 AND id = $5
            "#,
        )
        .bind(next.as_str())
        .bind(now)
        .bind(actor.0)
        .bind(tenant.0)
        .bind(batch_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| SettlementError::Storage(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| SettlementError::Storage(e.to_string()))?;

        batch.status = next;
        batch.processed_at = Some(now);
        batch.processed_by = Some(actor);
        batch.audit.updated_at = now;
        batch.audit.updated_by = actor;

        Ok((batch, settled))
    }

    async fn create_obligation(
        &self,
        tenant: TenantId,
        actor: ActorId,
        obligation: NewObligation,
    ) -> SettlementResult<SettlementObligation> {
        let stored = SettlementObligation::create(tenant, actor, obligation);

        sqlx::query(
            r#"
            INSERT INTO settlement_obligations (
                id, tenant_id, batch_id, broker_id, client_id, settlement_number,
                funds_pay_in, funds_pay_out, net_funds_obligation,
                securities_pay_in, securities_pay_out, net_securities_obligation,
                status, settled_at,
                created_at, created_by, updated_at, updated_by, deleted
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12,
                $13, $14, $15, $16, $17, $18, $19
            )
            "#,
        )
        .bind(stored.id)
        .bind(stored.tenant_id.0)
        .bind(stored.batch_id)
        .bind(stored.broker_id.0)
        .bind(stored.client_id.0)
        .bind(&stored.settlement_number)
        .bind(stored.funds_pay_in)
        .bind(stored.funds_pay_out)
        .bind(stored.net_funds_obligation)
        .bind(stored.securities_pay_in)
        .bind(stored.securities_pay_out)
        .bind(stored.net_securities_obligation)
        .bind(stored.status.as_str())
        .bind(stored.settled_at)
        .bind(stored.audit.created_at)
        .bind(stored.audit.created_by.0)
        .bind(stored.audit.updated_at)
        .bind(stored.audit.updated_by.0)
        .bind(stored.audit.deleted)
        .execute(&*self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => SettlementError::Conflict(
                format!(
                    "duplicate obligation for client {} in settlement {}",
                    stored.client_id, stored.settlement_number
                ),
            ),
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                SettlementError::NotFound(stored.batch_id)
            }
            _ => SettlementError::Storage(e.to_string()),
        })?;

        Ok(stored)
    }

    async fn get_obligation(
        &self,
        tenant: TenantId,
        obligation_id: Uuid,
    ) -> SettlementResult<Option<SettlementObligation>> {
        let row = sqlx::query(
            "SELECT * FROM settlement_obligations WHERE tenant_id = $1 AND id = $2 AND deleted = FALSE",
        )
        .bind(tenant.0)
        .bind(obligation_id)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| SettlementError::Storage(e.to_string()))?;

        match row {
            Some(row) => Ok(Some(Self::row_to_obligation(&row)?)),
            None => Ok(None),
        }
    }

    async fn settle_obligation(
        &self,
        tenant: TenantId,
        actor: ActorId,
        obligation_id: Uuid,
        now: DateTime<Utc>,
    ) -> SettlementResult<SettlementObligation> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| SettlementError::Storage(e.to_string()))?;

        let row = sqlx::query(
            r#"
            SELECT * FROM settlement_obligations
            WHERE tenant_id = $1 AND id = $2 AND deleted = FALSE
            FOR UPDATE
            "#,
        )
        .bind(tenant.0)
        .bind(obligation_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| SettlementError::Storage(e.to_string()))?
        .ok_or(SettlementError::NotFound(obligation_id))?;

        let mut obligation = Self::row_to_obligation(&row)?;
        let next = obligation
            .status
            .transition(ObligationAction::Settle)
            .ok_or_else(|| SettlementError::InvalidState {
                entity: "obligation",
                current: obligation.status.to_string(),
                action: "settle",
            })?;

        sqlx::query(
            r#"
            UPDATE settlement_obligations
            SET status = $1, settled_at = $2, updated_at = $2, updated_by = $3
            WHERE tenant_id = $4 AND id = $5
            "#,
        )
        .bind(next.as_str())
        .bind(now)
        .bind(actor.0)
        .bind(tenant.0)
        .bind(obligation_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| SettlementError::Storage(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| SettlementError::Storage(e.to_string()))?;

        obligation.status = next;
        obligation.settled_at = Some(now);
        obligation.audit.updated_at = now;
        obligation.audit.updated_by = actor;

        Ok(obligation)
    }

    async fn obligations_for_batch(
        &self,
        tenant: TenantId,
        batch_id: Uuid,
    ) -> SettlementResult<Vec<SettlementObligation>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM settlement_obligations
            WHERE tenant_id = $1 AND batch_id = $2 AND deleted = FALSE
            ORDER BY created_at ASC
            "#,
        )
        .bind(tenant.0)
        .bind(batch_id)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| SettlementError::Storage(e.to_string()))?;

        rows.iter().map(Self::row_to_obligation).collect()
    }
}
