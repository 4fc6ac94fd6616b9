//! Trade domain types
//!
//! A trade here is a post-trade booking record, not an order: matching and
//! price discovery happen upstream. The status machine is a single
//! transition table; `Settled` and `Amended` are reachable only by
//! processes outside this crate and have no inbound transition here.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use common::{money, ActorId, AuditMeta, BrokerId, ClientId, InstrumentId, Side, TenantId};

/// Trade status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeStatus {
    /// Booked, awaiting validation
    Pending,
    /// Passed validation, awaiting settlement
    Validated,
    /// Settled (driven by an external settlement process)
    Settled,
    /// Cancelled via the cancellation operation
    Cancelled,
    /// Rejected by validation (driven externally)
    Rejected,
    /// Amended by a corporate-action/amendment process (external)
    Amended,
}

impl TradeStatus {
    /// Stable string form, used in storage and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeStatus::Pending => "pending",
            TradeStatus::Validated => "validated",
            TradeStatus::Settled => "settled",
            TradeStatus::Cancelled => "cancelled",
            TradeStatus::Rejected => "rejected",
            TradeStatus::Amended => "amended",
        }
    }

    /// Transition table for the trade state machine
    ///
    /// Returns the successor status, or `None` when the (status, action)
    /// pair is rejected. This is the only place cancellation eligibility
    /// is defined.
    pub fn transition(self, action: TradeAction) -> Option<TradeStatus> {
        match (self, action) {
            (TradeStatus::Pending, TradeAction::Cancel) => Some(TradeStatus::Cancelled),
            (TradeStatus::Validated, TradeAction::Cancel) => Some(TradeStatus::Cancelled),
            (
                TradeStatus::Settled
                | TradeStatus::Cancelled
                | TradeStatus::Rejected
                | TradeStatus::Amended,
                TradeAction::Cancel,
            ) => None,
        }
    }
}

impl std::fmt::Display for TradeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for TradeStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TradeStatus::Pending),
            "validated" => Ok(TradeStatus::Validated),
            "settled" => Ok(TradeStatus::Settled),
            "cancelled" => Ok(TradeStatus::Cancelled),
            "rejected" => Ok(TradeStatus::Rejected),
            "amended" => Ok(TradeStatus::Amended),
            other => Err(format!("unknown trade status: {}", other)),
        }
    }
}

/// Actions that drive the trade state machine from this crate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeAction {
    /// Cancel a not-yet-settled trade
    Cancel,
}

/// Where a trade booking came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeSource {
    /// Real-time exchange drop-copy feed
    ExchangeFeed,
    /// End-of-day clearing file
    ClearingFile,
    /// Manually keyed by back-office staff
    Manual,
}

impl TradeSource {
    /// Stable string form, used in storage and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeSource::ExchangeFeed => "exchange_feed",
            TradeSource::ClearingFile => "clearing_file",
            TradeSource::Manual => "manual",
        }
    }
}

impl std::fmt::Display for TradeSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for TradeSource {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "exchange_feed" => Ok(TradeSource::ExchangeFeed),
            "clearing_file" => Ok(TradeSource::ClearingFile),
            "manual" => Ok(TradeSource::Manual),
            other => Err(format!("unknown trade source: {}", other)),
        }
    }
}

/// Statutory and brokerage charges on a trade
///
/// Populated by an external rate lookup after booking; this crate records
/// the figures it is given and never computes them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeCharges {
    /// Brokerage
    pub brokerage: Decimal,
    /// Securities transaction tax
    pub stt: Decimal,
    /// Exchange transaction fee
    pub exchange_fee: Decimal,
    /// Goods and services tax
    pub gst: Decimal,
    /// SEBI turnover charge
    pub sebi_charge: Decimal,
    /// Stamp duty
    pub stamp_duty: Decimal,
}

/// Input for booking a trade
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTrade {
    /// Executing broker
    pub broker_id: BrokerId,
    /// Client the trade belongs to
    pub client_id: ClientId,
    /// Traded instrument
    pub instrument_id: InstrumentId,
    /// Buy or sell
    pub side: Side,
    /// Quantity (whole units)
    pub quantity: u32,
    /// Execution price
    pub price: Decimal,
    /// Execution date/time
    pub traded_at: DateTime<Utc>,
    /// Settlement cycle the trade clears in
    pub settlement_number: String,
    /// Where the booking came from
    pub source: TradeSource,
    /// Exchange-assigned trade number, when sourced from a feed
    pub exchange_trade_number: Option<String>,
    /// Upstream file/record reference
    pub source_reference: Option<String>,
}

/// A booked trade
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    /// Unique trade identifier
    pub id: Uuid,
    /// Owning tenant
    pub tenant_id: TenantId,
    /// Generated trade number, globally unique and creation-ordered
    pub trade_number: String,
    /// Executing broker
    pub broker_id: BrokerId,
    /// Client the trade belongs to
    pub client_id: ClientId,
    /// Traded instrument
    pub instrument_id: InstrumentId,
    /// Buy or sell
    pub side: Side,
    /// Quantity (whole units)
    pub quantity: u32,
    /// Execution price
    pub price: Decimal,
    /// quantity x price, at storage precision
    pub trade_value: Decimal,
    /// Execution date/time
    pub traded_at: DateTime<Utc>,
    /// Settlement cycle the trade clears in
    pub settlement_number: String,
    /// Current lifecycle status
    pub status: TradeStatus,
    /// Where the booking came from
    pub source: TradeSource,
    /// Exchange-assigned trade number, when sourced from a feed
    pub exchange_trade_number: Option<String>,
    /// Upstream file/record reference
    pub source_reference: Option<String>,
    /// Reason recorded on cancellation or rejection
    pub rejection_reason: Option<String>,
    /// Charges recorded from the external rate lookup
    pub charges: TradeCharges,
    /// Net consideration after charges
    pub net_amount: Decimal,
    /// Audit trail
    pub audit: AuditMeta,
}

impl Trade {
    /// Book a new trade under a tenant
    ///
    /// Computes `trade_value = quantity x price` and initializes the net
    /// amount to the trade value; charges are left at zero for the
    /// external rate step.
    pub fn book(tenant: TenantId, actor: ActorId, trade_number: String, input: NewTrade) -> Self {
        let price = money::quantize(input.price);
        let trade_value = money::quantize(Decimal::from(input.quantity) * price);
        Self {
            id: Uuid::new_v4(),
            tenant_id: tenant,
            trade_number,
            broker_id: input.broker_id,
            client_id: input.client_id,
            instrument_id: input.instrument_id,
            side: input.side,
            quantity: input.quantity,
            price,
            trade_value,
            traded_at: input.traded_at,
            settlement_number: input.settlement_number,
            status: TradeStatus::Pending,
            source: input.source,
            exchange_trade_number: input.exchange_trade_number,
            source_reference: input.source_reference,
            rejection_reason: None,
            charges: TradeCharges::default(),
            net_amount: trade_value,
            audit: AuditMeta::new(actor),
        }
    }
}
