//! PostgreSQL reconciliation store implementation
//!
//! A reconciliation and its exception are inserted in one transaction;
//! exception resolution locks the target row (`SELECT ... FOR UPDATE`)
//! so the guard and the update are indivisible.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;
use uuid::Uuid;

use common::{ActorId, AuditMeta, TenantId};

use crate::error::ReconError;
use crate::store::traits::{ReconResult, ReconStore};
use crate::types::{ExceptionAction, ReconException, Reconciliation};

/// PostgreSQL reconciliation store
pub struct PostgresReconStore {
    pool: Arc<PgPool>,
}

impl PostgresReconStore {
    /// Create a new PostgreSQL reconciliation store
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    fn row_to_reconciliation(row: &PgRow) -> ReconResult<Reconciliation> {
        let recon_type: String = row.get("recon_type");
        let status: String = row.get("status");
        Ok(Reconciliation {
            id: row.get("id"),
            tenant_id: TenantId::from_uuid(row.get("tenant_id")),
            recon_date: row.get("recon_date"),
            settlement_number: row.get("settlement_number"),
            recon_type: recon_type.parse().map_err(ReconError::Storage)?,
            system_value: row.get("system_value"),
            exchange_value: row.get("exchange_value"),
            difference: row.get("difference"),
            tolerance_limit: row.get("tolerance_limit"),
            status: status.parse().map_err(ReconError::Storage)?,
            comments: row.get("comments"),
            resolved_at: row.get("resolved_at"),
            resolved_by: row
                .get::<Option<Uuid>, _>("resolved_by")
                .map(ActorId::from_uuid),
            audit: Self::row_to_audit(row),
        })
    }

    fn row_to_exception(row: &PgRow) -> ReconResult<ReconException> {
        let exception_type: String = row.get("exception_type");
        let status: String = row.get("status");
        Ok(ReconException {
            id: row.get("id"),
            tenant_id: TenantId::from_uuid(row.get("tenant_id")),
            reconciliation_id: row.get("reconciliation_id"),
            exception_type: exception_type.parse().map_err(ReconError::Storage)?,
            description: row.get("description"),
            reference_number: row.get("reference_number"),
            amount: row.get("amount"),
            status: status.parse().map_err(ReconError::Storage)?,
            resolution: row.get("resolution"),
            resolved_at: row.get("resolved_at"),
            audit: Self::row_to_audit(row),
        })
    }

    fn row_to_audit(row: &PgRow) -> AuditMeta {
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
impl ReconStore for PostgresReconStore {
    async fn create_run(
        &self,
        reconciliation: Reconciliation,
        exception: Option<ReconException>,
    ) -> ReconResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| ReconError::Storage(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO reconciliations (
                id, tenant_id, recon_date, settlement_number, recon_type,
                system_value, exchange_value, difference, tolerance_limit,
                status, comments, resolved_at, resolved_by,
                created_at, created_by, updated_at, updated_by, deleted
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13,
                $14, $15, $16, $17, $18
            )
            "#,
        )
        .bind(reconciliation.id)
        .bind(reconciliation.tenant_id.0)
        .bind(reconciliation.recon_date)
        .bind(&reconciliation.settlement_number)
        .bind(reconciliation.recon_type.as_str())
        .bind(reconciliation.system_value)
        .bind(reconciliation.exchange_value)
        .bind(reconciliation.difference)
        .bind(reconciliation.tolerance_limit)
        .bind(reconciliation.status.as_str())
        .bind(&reconciliation.comments)
        .bind(reconciliation.resolved_at)
        .bind(reconciliation.resolved_by.map(|a| a.0))
        .bind(reconciliation.audit.created_at)
        .bind(reconciliation.audit.created_by.0)
        .bind(reconciliation.audit.updated_at)
        .bind(reconciliation.audit.updated_by.0)
        .bind(reconciliation.audit.deleted)
        .execute(&mut *tx)
        .await
        .map_err(|e| ReconError::Storage(e.to_string()))?;

        if let Some(exception) = exception {
            sqlx::query(
                r#"
                INSERT INTO recon_exceptions (
                    id, tenant_id, reconciliation_id, exception_type, description,
                    reference_number, amount, status, resolution, resolved_at,
                    created_at, created_by, updated_at, updated_by, deleted
                ) VALUES (
                    $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15
                )
                "#,
            )
            .bind(exception.id)
            .bind(exception.tenant_id.0)
            .bind(exception.reconciliation_id)
            .bind(exception.exception_type.as_str())
            .bind(&exception.description)
            .bind(&exception.reference_number)
            .bind(exception.amount)
            .bind(exception.status.as_str())
            .bind(&exception.resolution)
            .bind(exception.resolved_at)
            .bind(exception.audit.created_at)
            .bind(exception.audit.created_by.0)
            .bind(exception.audit.updated_at)
            .bind(exception.audit.updated_by.0)
            .bind(exception.audit.deleted)
            .execute(&mut *tx)
            .await
            .map_err(|e| ReconError::Storage(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| ReconError::Storage(e.to_string()))?;

        Ok(())
    }

    async fn get_reconciliation(
        &self,
        tenant: TenantId,
        reconciliation_id: Uuid,
    ) -> ReconResult<Option<Reconciliation>> {
        let row = sqlx::query(
            "SELECT * FROM reconciliations WHERE tenant_id = $1 AND id = $2 AND deleted = FALSE",
        )
        .bind(tenant.0)
        .bind(reconciliation_id)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| ReconError::Storage(e.to_string()))?;

        match row {
            Some(row) => Ok(Some(Self::row_to_reconciliation(&row)?)),
            None => Ok(None),
        }
    }

    async fn get_exception(
        &self,
        tenant: TenantId,
        exception_id: Uuid,
    ) -> ReconResult<Option<ReconException>> {
        let row = sqlx::query(
            "SELECT * FROM recon_exceptions WHERE tenant_id = $1 AND id = $2 AND deleted = FALSE",
        )
        .bind(tenant.0)
        .bind(exception_id)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| ReconError::Storage(e.to_string()))?;

        match row {
            Some(row) => Ok(Some(Self::row_to_exception(&row)?)),
            None => Ok(None),
        }
    }

    async fn resolve_exception(
        &self,
        tenant: TenantId,
        actor: ActorId,
        exception_id: Uuid,
        resolution: String,
        now: DateTime<Utc>,
    ) -> ReconResult<ReconException> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| ReconError::Storage(e.to_string()))?;

        let row = sqlx::query(
            r#"
            SELECT * FROM recon_exceptions
            WHERE tenant_id = $1 AND id = $2 AND deleted = FALSE
            FOR UPDATE
            "#,
        )
        .bind(tenant.0)
        .bind(exception_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| ReconError::Storage(e.to_string()))?
        .ok_or(ReconError::NotFound(exception_id))?;

        let mut exception = Self::row_to_exception(&row)?;
        let next = exception
            .status
            .transition(ExceptionAction::Resolve)
            .ok_or(ReconError::InvalidState {
                current: exception.status,
                action: "resolve",
            })?;

        sqlx::query(
            r#"
            UPDATE recon_exceptions
            SET status = $1, resolution = $2, resolved_at = $3, updated_at = $3, updated_by = $4
            WHERE tenant_id = $5 AND id = $6
            "#,
        )
        .bind(next.as_str())
        .bind(&resolution)
        .bind(now)
        .bind(actor.0)
        .bind(tenant.0)
        .bind(exception_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| ReconError::Storage(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| ReconError::Storage(e.to_string()))?;

        exception.status = next;
        exception.resolution = Some(resolution);
        exception.resolved_at = Some(now);
        exception.audit.updated_at = now;
        exception.audit.updated_by = actor;

        Ok(exception)
    }

    async fn open_exceptions(&self, tenant: TenantId) -> ReconResult<Vec<ReconException>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM recon_exceptions
            WHERE tenant_id = $1 AND status = $2 AND deleted = FALSE
            ORDER BY created_at ASC
            "#,
        )
        .bind(tenant.0)
        .bind("open")
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| ReconError::Storage(e.to_string()))?;

        rows.iter().map(Self::row_to_exception).collect()
    }
}
