//! Reconciliation domain types
//!
//! A reconciliation is immutable once written; its own resolved-at/by
//! fields are reserved for an external review process. Exceptions are
//! never created directly by a caller, only by a mismatched
//! reconciliation, and carry the resolution lifecycle.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use common::{ActorId, AuditMeta, TenantId};

/// Which figures a reconciliation compares
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconType {
    /// Trade count/value reconciliation
    Trade,
    /// Position reconciliation
    Position,
    /// Funds obligation reconciliation
    Funds,
    /// Charges reconciliation
    Charges,
}

impl ReconType {
    /// Stable string form, used in storage and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            ReconType::Trade => "trade",
            ReconType::Position => "position",
            ReconType::Funds => "funds",
            ReconType::Charges => "charges",
        }
    }
}

impl std::fmt::Display for ReconType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ReconType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "trade" => Ok(ReconType::Trade),
            "position" => Ok(ReconType::Position),
            "funds" => Ok(ReconType::Funds),
            "charges" => Ok(ReconType::Charges),
            other => Err(format!("unknown recon type: {}", other)),
        }
    }
}

/// Outcome of a reconciliation run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconStatus {
    /// Difference within tolerance
    Matched,
    /// Difference beyond tolerance; an exception was opened
    Mismatched,
}

impl ReconStatus {
    /// Stable string form, used in storage and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            ReconStatus::Matched => "matched",
            ReconStatus::Mismatched => "mismatched",
        }
    }
}

impl std::fmt::Display for ReconStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ReconStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "matched" => Ok(ReconStatus::Matched),
            "mismatched" => Ok(ReconStatus::Mismatched),
            other => Err(format!("unknown recon status: {}", other)),
        }
    }
}

/// Exception lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExceptionStatus {
    /// Awaiting investigation
    Open,
    /// Resolved via the resolution operation
    Resolved,
    /// Closed by an external review process (reserved)
    Closed,
}

impl ExceptionStatus {
    /// Stable string form, used in storage and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            ExceptionStatus::Open => "open",
            ExceptionStatus::Resolved => "resolved",
            ExceptionStatus::Closed => "closed",
        }
    }

    /// Transition table for the exception state machine
    pub fn transition(self, action: ExceptionAction) -> Option<ExceptionStatus> {
        match (self, action) {
            (ExceptionStatus::Open, ExceptionAction::Resolve) => Some(ExceptionStatus::Resolved),
            (ExceptionStatus::Resolved | ExceptionStatus::Closed, ExceptionAction::Resolve) => {
                None
            }
        }
    }
}

impl std::fmt::Display for ExceptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ExceptionStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "open" => Ok(ExceptionStatus::Open),
            "resolved" => Ok(ExceptionStatus::Resolved),
            "closed" => Ok(ExceptionStatus::Closed),
            other => Err(format!("unknown exception status: {}", other)),
        }
    }
}

/// Actions that drive the exception state machine from this crate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExceptionAction {
    /// Record a resolution
    Resolve,
}

/// Input for a reconciliation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewReconciliation {
    /// Business date of the comparison
    pub recon_date: NaiveDate,
    /// Settlement cycle being reconciled
    pub settlement_number: String,
    /// Which figures are compared
    pub recon_type: ReconType,
    /// Internally computed figure
    pub system_value: Decimal,
    /// Exchange-reported figure
    pub exchange_value: Decimal,
    /// Maximum acceptable absolute difference
    pub tolerance_limit: Decimal,
    /// Free-text comments
    pub comments: Option<String>,
}

/// A stored reconciliation comparison
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reconciliation {
    /// Unique reconciliation identifier
    pub id: Uuid,
    /// Owning tenant
    pub tenant_id: TenantId,
    /// Business date of the comparison
    pub recon_date: NaiveDate,
    /// Settlement cycle being reconciled
    pub settlement_number: String,
    /// Which figures are compared
    pub recon_type: ReconType,
    /// Internally computed figure
    pub system_value: Decimal,
    /// Exchange-reported figure
    pub exchange_value: Decimal,
    /// Absolute difference, always recomputed here
    pub difference: Decimal,
    /// Maximum acceptable absolute difference
    pub tolerance_limit: Decimal,
    /// Match/mismatch outcome
    pub status: ReconStatus,
    /// Free-text comments
    pub comments: Option<String>,
    /// Reserved for an external review process
    pub resolved_at: Option<DateTime<Utc>>,
    /// Reserved for an external review process
    pub resolved_by: Option<ActorId>,
    /// Audit trail
    pub audit: AuditMeta,
}

impl Reconciliation {
    /// Run the comparison: recompute the difference and classify
    pub fn run(tenant: TenantId, actor: ActorId, input: NewReconciliation) -> Self {
        let difference = (input.system_value - input.exchange_value).abs();
        let status = if difference <= input.tolerance_limit {
            ReconStatus::Matched
        } else {
            ReconStatus::Mismatched
        };

        Self {
            id: Uuid::new_v4(),
            tenant_id: tenant,
            recon_date: input.recon_date,
            settlement_number: input.settlement_number,
            recon_type: input.recon_type,
            system_value: input.system_value,
            exchange_value: input.exchange_value,
            difference,
            tolerance_limit: input.tolerance_limit,
            status,
            comments: input.comments,
            resolved_at: None,
            resolved_by: None,
            audit: AuditMeta::new(actor),
        }
    }
}

/// An automatically opened reconciliation break
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconException {
    /// Unique exception identifier
    pub id: Uuid,
    /// Owning tenant
    pub tenant_id: TenantId,
    /// Reconciliation that opened this exception
    pub reconciliation_id: Uuid,
    /// Dimension that broke
    pub exception_type: ReconType,
    /// Human-readable description of the break
    pub description: String,
    /// Settlement cycle the break belongs to
    pub reference_number: String,
    /// Size of the break (the reconciliation difference)
    pub amount: Decimal,
    /// Current lifecycle status
    pub status: ExceptionStatus,
    /// Resolution text recorded when resolved
    pub resolution: Option<String>,
    /// When the exception was resolved
    pub resolved_at: Option<DateTime<Utc>>,
    /// Audit trail
    pub audit: AuditMeta,
}

impl ReconException {
    /// Open the exception for a mismatched reconciliation
    pub fn open_for(recon: &Reconciliation, actor: ActorId) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id: recon.tenant_id,
            reconciliation_id: recon.id,
            exception_type: recon.recon_type,
            description: format!(
                "{} reconciliation break for settlement {}: system {} vs exchange {}, tolerance {}",
                recon.recon_type,
                recon.settlement_number,
                recon.system_value,
                recon.exchange_value,
                recon.tolerance_limit
            ),
            reference_number: recon.settlement_number.clone(),
            amount: recon.difference,
            status: ExceptionStatus::Open,
            resolution: None,
            resolved_at: None,
            audit: AuditMeta::new(actor),
        }
    }
}

/// Result of a reconciliation run: the comparison plus the exception it
/// opened, if any
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconRun {
    /// The stored comparison
    pub reconciliation: Reconciliation,
    /// Present exactly when the comparison mismatched
    pub exception: Option<ReconException>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(system: i64, exchange: i64, tolerance: Decimal) -> NewReconciliation {
        NewReconciliation {
            recon_date: NaiveDate::from_ymd_opt(2026, 4, 6).unwrap(),
            settlement_number: "2026068".to_string(),
            recon_type: ReconType::Funds,
            system_value: Decimal::new(system, 0),
            exchange_value: Decimal::new(exchange, 0),
            tolerance_limit: tolerance,
            comments: None,
        }
    }

    #[test]
    fn test_matched_within_tolerance() {
        let recon = Reconciliation::run(
            TenantId::new(),
            ActorId::new(),
            input(1_000_000, 1_000_000, Decimal::new(1, 2)),
        );
        assert_eq!(recon.status, ReconStatus::Matched);
        assert_eq!(recon.difference, Decimal::ZERO);
    }

    #[test]
    fn test_mismatched_beyond_tolerance() {
        let recon = Reconciliation::run(
            TenantId::new(),
            ActorId::new(),
            input(1_000_000, 999_000, Decimal::new(1, 2)),
        );
        assert_eq!(recon.status, ReconStatus::Mismatched);
        assert_eq!(recon.difference, Decimal::new(1000, 0));
    }

    #[test]
    fn test_difference_is_absolute() {
        let recon = Reconciliation::run(
            TenantId::new(),
            ActorId::new(),
            input(999_000, 1_000_000, Decimal::ZERO),
        );
        assert_eq!(recon.difference, Decimal::new(1000, 0));
    }

    #[test]
    fn test_boundary_difference_equal_to_tolerance_matches() {
        let recon = Reconciliation::run(
            TenantId::new(),
            ActorId::new(),
            input(1_000_100, 1_000_000, Decimal::new(100, 0)),
        );
        assert_eq!(recon.status, ReconStatus::Matched);
    }

    #[test]
    fn test_exception_carries_difference_and_reference() {
        let recon = Reconciliation::run(
            TenantId::new(),
            ActorId::new(),
            input(1_000_000, 999_000, Decimal::ZERO),
        );
        let exception = ReconException::open_for(&recon, ActorId::new());

        assert_eq!(exception.amount, recon.difference);
        assert_eq!(exception.reference_number, recon.settlement_number);
        assert_eq!(exception.exception_type, recon.recon_type);
        assert_eq!(exception.status, ExceptionStatus::Open);
        assert!(exception.description.contains("funds"));
    }

    #[test]
    fn test_exception_transition_table_is_exhaustive() {
        let cases = [
            (ExceptionStatus::Open, Some(ExceptionStatus::Resolved)),
            (ExceptionStatus::Resolved, None),
            (ExceptionStatus::Closed, None),
        ];
        for (status, expected) in cases {
            assert_eq!(status.transition(ExceptionAction::Resolve), expected);
        }
    }

    #[test]
    fn test_status_round_trips() {
        for recon_type in [
            ReconType::Trade,
            ReconType::Position,
            ReconType::Funds,
            ReconType::Charges,
        ] {
            assert_eq!(recon_type.as_str().parse::<ReconType>(), Ok(recon_type));
        }
        for status in [ExceptionStatus::Open, ExceptionStatus::Resolved, ExceptionStatus::Closed] {
            assert_eq!(status.as_str().parse::<ExceptionStatus>(), Ok(status));
        }
    }
}
