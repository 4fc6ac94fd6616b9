//! PostgreSQL ledger store implementation
//!
//! Per-partition serialization uses a transaction-scoped advisory lock
//! derived from the partition key, taken before the predecessor-balance
//! query. Two postings to the same partition therefore queue on the lock;
//! postings to different partitions hash to different lock keys and run
//! concurrently. Voucher uniqueness is a database constraint checked by
//! the insert inside the same transaction.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::postgres::PgPool;
use sqlx::Row;
use uuid::Uuid;

use common::{ActorId, AuditMeta, BrokerId, ClientId, TenantId};

use crate::error::LedgerError;
use crate::store::traits::{LedgerResult, LedgerStore};
use crate::types::{LedgerEntry, LedgerType, NewLedgerEntry, PartitionKey};

/// PostgreSQL ledger store
pub struct PostgresLedgerStore {
    pool: Arc<PgPool>,
}

impl PostgresLedgerStore {
    /// Create a new PostgreSQL ledger store
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Advisory-lock key for a partition
    ///
    /// `DefaultHasher::new()` hashes with fixed keys, so every process
    /// computes the same lock id for the same partition.
    fn lock_key(key: &PartitionKey) -> i64 {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        hasher.finish() as i64
    }

    fn row_to_entry(row: &sqlx::postgres::PgRow) -> LedgerResult<LedgerEntry> {
        let ledger_type: String = row.get("ledger_type");
        let entry_type: String = row.get("entry_type");
        let reference_type: String = row.get("reference_type");

        Ok(LedgerEntry {
            id: row.get("id"),
            tenant_id: TenantId::from_uuid(row.get("tenant_id")),
            broker_id: BrokerId(row.get("broker_id")),
            client_id: ClientId::from_uuid(row.get("client_id")),
            voucher_number: row.get("voucher_number"),
            posting_date: row.get("posting_date"),
            value_date: row.get("value_date"),
            ledger_type: ledger_type.parse().map_err(LedgerError::Storage)?,
            entry_type: entry_type.parse().map_err(LedgerError::Storage)?,
            debit: row.get("debit"),
            credit: row.get("credit"),
            running_balance: row.get("running_balance"),
            sequence: row.get::<i64, _>("sequence") as u64,
            reference_type: reference_type.parse().map_err(LedgerError::Storage)?,
            reference_id: row.get("reference_id"),
            narration: row.get("narration"),
            reversal: row.get("reversal"),
            reversal_of: row.get("reversal_of"),
            audit: AuditMeta {
                created_at: row.get("created_at"),
                created_by: ActorId(row.get("created_by")),
                updated_at: row.get("updated_at"),
                updated_by: ActorId(row.get("updated_by")),
                deleted: row.get("deleted"),
            },
        })
    }
}

#[async_trait]
impl LedgerStore for PostgresLedgerStore {
    async fn append(
        &self,
        tenant: TenantId,
        actor: ActorId,
        entry: NewLedgerEntry,
    ) -> LedgerResult<LedgerEntry> {
        let key = PartitionKey::new(tenant, entry.client_id, entry.ledger_type);

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| LedgerError::Storage(e.to_string()))?;

        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(Self::lock_key(&key))
            .execute(&mut *tx)
            .await
            .map_err(|e| LedgerError::Storage(e.to_string()))?;

        let last: Option<Decimal> = sqlx::query(
            r#"
            SELECT running_balance FROM ledger_entries
            WHERE tenant_id = $1 AND client_id = $2 AND ledger_type = $3 AND deleted = FALSE
            ORDER BY posting_date DESC, sequence DESC
            LIMIT 1
            "#,
        )
        .bind(tenant.0)
        .bind(entry.client_id.0)
        .bind(entry.ledger_type.as_str())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| LedgerError::Storage(e.to_string()))?
        .map(|row| row.get("running_balance"));

        let running_balance = last.unwrap_or(Decimal::ZERO) + entry.credit - entry.debit;

        let id = Uuid::new_v4();
        let audit = AuditMeta::new(actor);

        let row = sqlx::query(
            r#"
            INSERT INTO ledger_entries (
                id, tenant_id, broker_id, client_id, voucher_number,
                posting_date, value_date, ledger_type, entry_type,
                debit, credit, running_balance,
                reference_type, reference_id, narration,
                reversal, reversal_of,
                created_at, created_by, updated_at, updated_by, deleted
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12,
                $13, $14, $15, $16, $17, $18, $19, $20, $21, $22
            )
            RETURNING sequence
            "#,
        )
        .bind(id)
        .bind(tenant.0)
        .bind(entry.broker_id.0)
        .bind(entry.client_id.0)
        .bind(&entry.voucher_number)
        .bind(entry.posting_date)
        .bind(entry.value_date)
        .bind(entry.ledger_type.as_str())
        .bind(entry.entry_type.as_str())
        .bind(entry.debit)
        .bind(entry.credit)
        .bind(running_balance)
        .bind(entry.reference_type.as_str())
        .bind(entry.reference_id)
        .bind(&entry.narration)
        .bind(false)
        .bind(None::<Uuid>)
        .bind(audit.created_at)
        .bind(audit.created_by.0)
        .bind(audit.updated_at)
        .bind(audit.updated_by.0)
        .bind(audit.deleted)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => LedgerError::Conflict(
                format!("duplicate voucher number: {}", entry.voucher_number),
            ),
            _ => LedgerError::Storage(e.to_string()),
        })?;

        tx.commit()
            .await
            .map_err(|e| LedgerError::Storage(e.to_string()))?;

        let sequence = row.get::<i64, _>("sequence") as u64;
        Ok(LedgerEntry {
            id,
            tenant_id: tenant,
            broker_id: entry.broker_id,
            client_id: entry.client_id,
            voucher_number: entry.voucher_number,
            posting_date: entry.posting_date,
            value_date: entry.value_date,
            ledger_type: entry.ledger_type,
            entry_type: entry.entry_type,
            debit: entry.debit,
            credit: entry.credit,
            running_balance,
            sequence,
            reference_type: entry.reference_type,
            reference_id: entry.reference_id,
            narration: entry.narration,
            reversal: false,
            reversal_of: None,
            audit,
        })
    }

    async fn entries(
        &self,
        tenant: TenantId,
        client: ClientId,
        ledger_type: LedgerType,
    ) -> LedgerResult<Vec<LedgerEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM ledger_entries
            WHERE tenant_id = $1 AND client_id = $2 AND ledger_type = $3 AND deleted = FALSE
            ORDER BY posting_date ASC, sequence ASC
            "#,
        )
        .bind(tenant.0)
        .bind(client.0)
        .bind(ledger_type.as_str())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| LedgerError::Storage(e.to_string()))?;

        rows.iter().map(Self::row_to_entry).collect()
    }

    async fn balance(
        &self,
        tenant: TenantId,
        client: ClientId,
        ledger_type: LedgerType,
    ) -> LedgerResult<Decimal> {
        let row = sqlx::query(
            r#"
            SELECT running_balance FROM ledger_entries
            WHERE tenant_id = $1 AND client_id = $2 AND ledger_type = $3 AND deleted = FALSE
            ORDER BY posting_date DESC, sequence DESC
            LIMIT 1
            "#,
        )
        .bind(tenant.0)
        .bind(client.0)
        .bind(ledger_type.as_str())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| LedgerError::Storage(e.to_string()))?;

        Ok(row
            .map(|r| r.get("running_balance"))
            .unwrap_or(Decimal::ZERO))
    }
}
