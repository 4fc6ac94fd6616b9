//! Recon Manager - reconciliation runs and exception resolution

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;

use common::{money, TenantContext};

use crate::error::ReconError;
use crate::store::traits::{ReconResult, ReconStore};
use crate::types::{
    NewReconciliation, ReconException, ReconRun, ReconStatus, Reconciliation,
};

/// Recon Manager - compares figures and drives the exception lifecycle
pub struct ReconManager {
    store: Arc<dyn ReconStore>,
}

impl ReconManager {
    /// Create a new ReconManager
    pub fn new(store: Arc<dyn ReconStore>) -> Self {
        Self { store }
    }

    /// Run a reconciliation
    ///
    /// Recomputes the absolute difference, classifies against the
    /// tolerance limit, and on a mismatch opens exactly one exception.
    /// Reconciliation and exception are persisted as one atomic unit.
    pub async fn run_reconciliation(
        &self,
        ctx: &TenantContext,
        mut input: NewReconciliation,
    ) -> ReconResult<ReconRun> {
        self.validate_run(&input)?;

        input.system_value = money::quantize(input.system_value);
        input.exchange_value = money::quantize(input.exchange_value);
        input.tolerance_limit = money::quantize(input.tolerance_limit);

        let reconciliation = Reconciliation::run(ctx.tenant, ctx.actor, input);
        let exception = match reconciliation.status {
            ReconStatus::Matched => None,
            ReconStatus::Mismatched => Some(ReconException::open_for(&reconciliation, ctx.actor)),
        };

        self.store
            .create_run(reconciliation.clone(), exception.clone())
            .await?;

        match reconciliation.status {
            ReconStatus::Matched => tracing::info!(
                settlement_number = %reconciliation.settlement_number,
                recon_type = %reconciliation.recon_type,
                "Reconciliation matched"
            ),
            ReconStatus::Mismatched => tracing::warn!(
                settlement_number = %reconciliation.settlement_number,
                recon_type = %reconciliation.recon_type,
                difference = %reconciliation.difference,
                "Reconciliation mismatched, exception opened"
            ),
        }

        Ok(ReconRun {
            reconciliation,
            exception,
        })
    }

    /// Resolve an open exception
    pub async fn resolve_exception(
        &self,
        ctx: &TenantContext,
        exception_id: Uuid,
        resolution: impl Into<String>,
    ) -> ReconResult<ReconException> {
        let resolution = resolution.into();
        if resolution.trim().is_empty() {
            return Err(ReconError::Validation(
                "Resolution text is required".to_string(),
            ));
        }

        let resolved = self
            .store
            .resolve_exception(ctx.tenant, ctx.actor, exception_id, resolution, Utc::now())
            .await?;

        tracing::info!(
            reference = %resolved.reference_number,
            "Reconciliation exception resolved"
        );

        Ok(resolved)
    }

    /// Get a reconciliation by id
    pub async fn get_reconciliation(
        &self,
        ctx: &TenantContext,
        reconciliation_id: Uuid,
    ) -> ReconResult<Option<Reconciliation>> {
        self.store
            .get_reconciliation(ctx.tenant, reconciliation_id)
            .await
    }

    /// Get an exception by id
    pub async fn get_exception(
        &self,
        ctx: &TenantContext,
        exception_id: Uuid,
    ) -> ReconResult<Option<ReconException>> {
        self.store.get_exception(ctx.tenant, exception_id).await
    }

    /// All open exceptions for the tenant's workqueue, oldest first
    pub async fn open_exceptions(&self, ctx: &TenantContext) -> ReconResult<Vec<ReconException>> {
        self.store.open_exceptions(ctx.tenant).await
    }

    /// Validate reconciliation parameters
    fn validate_run(&self, input: &NewReconciliation) -> ReconResult<()> {
        if input.settlement_number.trim().is_empty() {
            return Err(ReconError::Validation(
                "Settlement number is required".to_string(),
            ));
        }

        if input.system_value < Decimal::ZERO {
            return Err(ReconError::Validation(
                "System value must not be negative".to_string(),
            ));
        }

        if input.exchange_value < Decimal::ZERO {
            return Err(ReconError::Validation(
                "Exchange value must not be negative".to_string(),
            ));
        }

        if input.tolerance_limit < Decimal::ZERO {
            return Err(ReconError::Validation(
                "Tolerance limit must not be negative".to_string(),
            ));
        }

        Ok(())
    }
}
