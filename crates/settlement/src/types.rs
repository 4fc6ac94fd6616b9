//! Settlement domain types
//!
//! Batches and obligations each carry a transition table. `Processing`
//! and `Failed` batch states are modeled for the external batch runner
//! but have no inbound transition from this crate.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use common::{ActorId, AuditMeta, BrokerId, ClientId, ExchangeId, TenantId};

/// Settlement batch status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    /// Created, obligations may still be loading
    Pending,
    /// Picked up by an external runner (reserved)
    Processing,
    /// All obligations settled
    Completed,
    /// Abandoned by an external runner (reserved)
    Failed,
}

impl BatchStatus {
    /// Stable string form, used in storage and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchStatus::Pending => "pending",
            BatchStatus::Processing => "processing",
            BatchStatus::Completed => "completed",
            BatchStatus::Failed => "failed",
        }
    }

    /// Transition table for the batch state machine
    pub fn transition(self, action: BatchAction) -> Option<BatchStatus> {
        match (self, action) {
            (BatchStatus::Pending, BatchAction::Process) => Some(BatchStatus::Completed),
            (
                BatchStatus::Processing | BatchStatus::Completed | BatchStatus::Failed,
                BatchAction::Process,
            ) => None,
        }
    }
}

impl std::fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for BatchStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending" => Ok(BatchStatus::Pending),
            "processing" => Ok(BatchStatus::Processing),
            "completed" => Ok(BatchStatus::Completed),
            "failed" => Ok(BatchStatus::Failed),
            other => Err(format!("unknown batch status: {}", other)),
        }
    }
}

/// Actions that drive the batch state machine from this crate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchAction {
    /// Settle all pending obligations and complete the batch
    Process,
}

/// Settlement obligation status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObligationStatus {
    /// Awaiting settlement
    Pending,
    /// Settled, terminal
    Settled,
}

impl ObligationStatus {
    /// Stable string form, used in storage and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            ObligationStatus::Pending => "pending",
            ObligationStatus::Settled => "settled",
        }
    }

    /// Transition table for the obligation state machine
    pub fn transition(self, action: ObligationAction) -> Option<ObligationStatus> {
        match (self, action) {
            (ObligationStatus::Pending, ObligationAction::Settle) => {
                Some(ObligationStatus::Settled)
            }
            (ObligationStatus::Settled, ObligationAction::Settle) => None,
        }
    }
}

impl std::fmt::Display for ObligationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ObligationStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ObligationStatus::Pending),
            "settled" => Ok(ObligationStatus::Settled),
            other => Err(format!("unknown obligation status: {}", other)),
        }
    }
}

/// Actions that drive the obligation state machine from this crate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObligationAction {
    /// Mark the obligation settled
    Settle,
}

/// Input for creating a settlement batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBatch {
    /// Settlement cycle number, unique per tenant
    pub settlement_number: String,
    /// Date the trades were executed
    pub trade_date: NaiveDate,
    /// Date the cycle settles; never before the trade date
    pub settlement_date: NaiveDate,
    /// Exchange the cycle belongs to
    pub exchange_id: ExchangeId,
    /// Number of trades in the cycle
    pub total_trades: u32,
    /// Total traded value in the cycle
    pub total_turnover: Decimal,
}

/// A settlement cycle batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementBatch {
    /// Unique batch identifier
    pub id: Uuid,
    /// Owning tenant
    pub tenant_id: TenantId,
    /// Settlement cycle number, unique per tenant
    pub settlement_number: String,
    /// Date the trades were executed
    pub trade_date: NaiveDate,
    /// Date the cycle settles
    pub settlement_date: NaiveDate,
    /// Exchange the cycle belongs to
    pub exchange_id: ExchangeId,
    /// Number of trades in the cycle
    pub total_trades: u32,
    /// Total traded value in the cycle
    pub total_turnover: Decimal,
    /// Current lifecycle status
    pub status: BatchStatus,
    /// When the batch was processed
    pub processed_at: Option<DateTime<Utc>>,
    /// Who processed the batch
    pub processed_by: Option<ActorId>,
    /// Audit trail
    pub audit: AuditMeta,
}

impl SettlementBatch {
    /// Create a new pending batch under a tenant
    pub fn create(tenant: TenantId, actor: ActorId, input: NewBatch) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id: tenant,
            settlement_number: input.settlement_number,
            trade_date: input.trade_date,
            settlement_date: input.settlement_date,
            exchange_id: input.exchange_id,
            total_trades: input.total_trades,
            total_turnover: input.total_turnover,
            status: BatchStatus::Pending,
            processed_at: None,
            processed_by: None,
            audit: AuditMeta::new(actor),
        }
    }
}

/// Input for the external clearing step that loads obligations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewObligation {
    /// Batch the obligation belongs to
    pub batch_id: Uuid,
    /// Clearing broker
    pub broker_id: BrokerId,
    /// Client owing or owed the net amounts
    pub client_id: ClientId,
    /// Settlement cycle number (matches the batch)
    pub settlement_number: String,
    /// Funds owed by the client
    pub funds_pay_in: Decimal,
    /// Funds owed to the client
    pub funds_pay_out: Decimal,
    /// Net funds obligation (pay-in minus pay-out, computed upstream)
    pub net_funds_obligation: Decimal,
    /// Securities deliverable by the client
    pub securities_pay_in: Decimal,
    /// Securities receivable by the client
    pub securities_pay_out: Decimal,
    /// Net securities obligation (computed upstream)
    pub net_securities_obligation: Decimal,
}

/// A netted pay-in/pay-out obligation for one client in one cycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementObligation {
    /// Unique obligation identifier
    pub id: Uuid,
    /// Owning tenant
    pub tenant_id: TenantId,
    /// Batch the obligation belongs to
    pub batch_id: Uuid,
    /// Clearing broker
    pub broker_id: BrokerId,
    /// Client owing or owed the net amounts
    pub client_id: ClientId,
    /// Settlement cycle number
    pub settlement_number: String,
    /// Funds owed by the client
    pub funds_pay_in: Decimal,
    /// Funds owed to the client
    pub funds_pay_out: Decimal,
    /// Net funds obligation
    pub net_funds_obligation: Decimal,
    /// Securities deliverable by the client
    pub securities_pay_in: Decimal,
    /// Securities receivable by the client
    pub securities_pay_out: Decimal,
    /// Net securities obligation
    pub net_securities_obligation: Decimal,
    /// Current lifecycle status
    pub status: ObligationStatus,
    /// When the obligation settled
    pub settled_at: Option<DateTime<Utc>>,
    /// Audit trail
    pub audit: AuditMeta,
}

impl SettlementObligation {
    /// Materialize an externally computed obligation under a tenant
    pub fn create(tenant: TenantId, actor: ActorId, input: NewObligation) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id: tenant,
            batch_id: input.batch_id,
            broker_id: input.broker_id,
            client_id: input.client_id,
            settlement_number: input.settlement_number,
            funds_pay_in: input.funds_pay_in,
            funds_pay_out: input.funds_pay_out,
            net_funds_obligation: input.net_funds_obligation,
            securities_pay_in: input.securities_pay_in,
            securities_pay_out: input.securities_pay_out,
            net_securities_obligation: input.net_securities_obligation,
            status: ObligationStatus::Pending,
            settled_at: None,
            audit: AuditMeta::new(actor),
        }
    }

    /// Whether the stored net figures agree with the gross figures
    ///
    /// Nets are computed by the external clearing step and trusted at
    /// write time; reads re-check them as corruption detection.
    pub fn nets_consistent(&self) -> bool {
        self.net_funds_obligation == self.funds_pay_in - self.funds_pay_out
            && self.net_securities_obligation == self.securities_pay_in - self.securities_pay_out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_transition_table_is_exhaustive() {
        let cases = [
            (BatchStatus::Pending, Some(BatchStatus::Completed)),
            (BatchStatus::Processing, None),
            (BatchStatus::Completed, None),
            (BatchStatus::Failed, None),
        ];
        for (status, expected) in cases {
            assert_eq!(status.transition(BatchAction::Process), expected);
        }
    }

    #[test]
    fn test_obligation_transition_table_is_exhaustive() {
        assert_eq!(
            ObligationStatus::Pending.transition(ObligationAction::Settle),
            Some(ObligationStatus::Settled)
        );
        assert_eq!(
            ObligationStatus::Settled.transition(ObligationAction::Settle),
            None
        );
    }

    #[test]
    fn test_status_round_trips() {
        for status in [
            BatchStatus::Pending,
            BatchStatus::Processing,
            BatchStatus::Completed,
            BatchStatus::Failed,
        ] {
            assert_eq!(status.as_str().parse::<BatchStatus>(), Ok(status));
        }
        for status in [ObligationStatus::Pending, ObligationStatus::Settled] {
            assert_eq!(status.as_str().parse::<ObligationStatus>(), Ok(status));
        }
    }

    #[test]
    fn test_nets_consistent() {
        let obligation = SettlementObligation::create(
            TenantId::new(),
            ActorId::new(),
            NewObligation {
                batch_id: Uuid::new_v4(),
                broker_id: BrokerId::new(),
                client_id: ClientId::new(),
                settlement_number: "2026068".to_string(),
                funds_pay_in: Decimal::new(1500, 0),
                funds_pay_out: Decimal::new(400, 0),
                net_funds_obligation: Decimal::new(1100, 0),
                securities_pay_in: Decimal::new(30, 0),
                securities_pay_out: Decimal::ZERO,
                net_securities_obligation: Decimal::new(30, 0),
            },
        );
        assert!(obligation.nets_consistent());

        let mut corrupt = obligation;
        corrupt.net_funds_obligation = Decimal::new(999, 0);
        assert!(!corrupt.nets_consistent());
    }
}
