//! PostgreSQL trade store implementation

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::postgres::PgPool;
use sqlx::Row;
use uuid::Uuid;

use common::{ActorId, AuditMeta, BrokerId, ClientId, InstrumentId, Side, TenantId};

use crate::error::TradeError;
use crate::store::traits::{TradeResult, TradeStore};
use crate::types::{Trade, TradeCharges};

/// PostgreSQL trade store
pub struct PostgresTradeStore {
    pool: Arc<PgPool>,
}

impl PostgresTradeStore {
    /// Create a new PostgreSQL trade store
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    fn row_to_trade(row: &sqlx::postgres::PgRow) -> TradeResult<Trade> {
        let side: String = row.get("side");
        let status: String = row.get("status");
        let source: String = row.get("source");

        let side = match side.as_str() {
            "buy" => Side::Buy,
            _ => Side::Sell,
        };

        Ok(Trade {
            id: row.get("id"),
            tenant_id: TenantId::from_uuid(row.get("tenant_id")),
            trade_number: row.get("trade_number"),
            broker_id: BrokerId(row.get("broker_id")),
            client_id: ClientId::from_uuid(row.get("client_id")),
            instrument_id: InstrumentId(row.get("instrument_id")),
            side,
            quantity: row.get::<i64, _>("quantity") as u32,
            price: row.get("price"),
            trade_value: row.get("trade_value"),
            traded_at: row.get("traded_at"),
            settlement_number: row.get("settlement_number"),
            status: status.parse().map_err(TradeError::Storage)?,
            source: source.parse().map_err(TradeError::Storage)?,
            exchange_trade_number: row.get("exchange_trade_number"),
            source_reference: row.get("source_reference"),
            rejection_reason: row.get("rejection_reason"),
            charges: TradeCharges {
                brokerage: row.get("brokerage"),
                stt: row.get("stt"),
                exchange_fee: row.get("exchange_fee"),
                gst: row.get("gst"),
                sebi_charge: row.get("sebi_charge"),
                stamp_duty: row.get("stamp_duty"),
            },
            net_amount: row.get("net_amount"),
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
impl TradeStore for PostgresTradeStore {
    async fn create(&self, trade: Trade) -> TradeResult<Trade> {
        sqlx::query(
            r#"
            INSERT INTO trades (
                id, tenant_id, trade_number, broker_id, client_id, instrument_id,
                side, quantity, price, trade_value, traded_at, settlement_number,
                status, source, exchange_trade_number, source_reference, rejection_reason,
                brokerage, stt, exchange_fee, gst, sebi_charge, stamp_duty, net_amount,
                created_at, created_by, updated_at, updated_by, deleted
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
                $15, $16, $17, $18, $19, $20, $21, $22, $23, $24, $25, $26, $27, $28, $29
            )
            "#,
        )
        .bind(trade.id)
        .bind(trade.tenant_id.0)
        .bind(&trade.trade_number)
        .bind(trade.broker_id.0)
        .bind(trade.client_id.0)
        .bind(trade.instrument_id.0)
        .bind(trade.side.to_string())
        .bind(trade.quantity as i64)
        .bind(trade.price)
        .bind(trade.trade_value)
        .bind(trade.traded_at)
        .bind(&trade.settlement_number)
        .bind(trade.status.as_str())
        .bind(trade.source.as_str())
        .bind(&trade.exchange_trade_number)
        .bind(&trade.source_reference)
        .bind(&trade.rejection_reason)
        .bind(trade.charges.brokerage)
        .bind(trade.charges.stt)
        .bind(trade.charges.exchange_fee)
        .bind(trade.charges.gst)
        .bind(trade.charges.sebi_charge)
        .bind(trade.charges.stamp_duty)
        .bind(trade.net_amount)
        .bind(trade.audit.created_at)
        .bind(trade.audit.created_by.0)
        .bind(trade.audit.updated_at)
        .bind(trade.audit.updated_by.0)
        .bind(trade.audit.deleted)
        .execute(&*self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                TradeError::Conflict(format!("duplicate trade number: {}", trade.trade_number))
            }
            _ => TradeError::Storage(e.to_string()),
        })?;

        Ok(trade)
    }

    async fn get(&self, tenant: TenantId, trade_id: Uuid) -> TradeResult<Option<Trade>> {
        let row = sqlx::query(
            "SELECT * FROM trades WHERE tenant_id = $1 AND id = $2 AND deleted = FALSE",
        )
        .bind(tenant.0)
        .bind(trade_id)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| TradeError::Storage(e.to_string()))?;

        match row {
            Some(row) => Ok(Some(Self::row_to_trade(&row)?)),
            None => Ok(None),
        }
    }

    async fn update(&self, trade: &Trade) -> TradeResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE trades SET
                status = $1,
                rejection_reason = $2,
                brokerage = $3,
                stt = $4,
                exchange_fee = $5,
                gst = $6,
                sebi_charge = $7,
                stamp_duty = $8,
                net_amount = $9,
                updated_at = $10,
                updated_by = $11
            WHERE tenant_id = $12 AND id = $13 AND deleted = FALSE
            "#,
        )
        .bind(trade.status.as_str())
        .bind(&trade.rejection_reason)
        .bind(trade.charges.brokerage)
        .bind(trade.charges.stt)
        .bind(trade.charges.exchange_fee)
        .bind(trade.charges.gst)
        .bind(trade.charges.sebi_charge)
        .bind(trade.charges.stamp_duty)
        .bind(trade.net_amount)
        .bind(trade.audit.updated_at)
        .bind(trade.audit.updated_by.0)
        .bind(trade.tenant_id.0)
        .bind(trade.id)
        .execute(&*self.pool)
        .await
        .map_err(|e| TradeError::Storage(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(TradeError::NotFound(trade.id));
        }

        Ok(())
    }
}
