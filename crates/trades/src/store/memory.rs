//! In-memory trade store implementation

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use parking_lot::RwLock;
use uuid::Uuid;

use common::TenantId;

use crate::error::TradeError;
use crate::store::traits::{TradeResult, TradeStore};
use crate::types::Trade;

/// In-memory trade store for testing and development
pub struct InMemoryTradeStore {
    trades: RwLock<HashMap<TenantId, HashMap<Uuid, Trade>>>,
    /// Trade numbers across all tenants
    trade_numbers: RwLock<HashSet<String>>,
}

impl InMemoryTradeStore {
    /// Create a new in-memory trade store
    pub fn new() -> Self {
        Self {
            trades: RwLock::new(HashMap::new()),
            trade_numbers: RwLock::new(HashSet::new()),
        }
    }
}

impl Default for InMemoryTradeStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TradeStore for InMemoryTradeStore {
    async fn create(&self, trade: Trade) -> TradeResult<Trade> {
        {
            let mut numbers = self.trade_numbers.write();
            if !numbers.insert(trade.trade_number.clone()) {
                return Err(TradeError::Conflict(format!(
                    "duplicate trade number: {}",
                    trade.trade_number
                )));
            }
        }

        let mut trades = self.trades.write();
        trades
            .entry(trade.tenant_id)
            .or_default()
            .insert(trade.id, trade.clone());

        Ok(trade)
    }

    async fn get(&self, tenant: TenantId, trade_id: Uuid) -> TradeResult<Option<Trade>> {
        let trades = self.trades.read();
        Ok(trades
            .get(&tenant)
            .and_then(|m| m.get(&trade_id))
            .filter(|t| !t.audit.deleted)
            .cloned())
    }

    async fn update(&self, trade: &Trade) -> TradeResult<()> {
        let mut trades = self.trades.write();
        let tenant_trades = trades.entry(trade.tenant_id).or_default();

        if tenant_trades.contains_key(&trade.id) {
            tenant_trades.insert(trade.id, trade.clone());
            Ok(())
        } else {
            Err(TradeError::NotFound(trade.id))
        }
    }
}
