//! Prometheus metrics infrastructure
//!
//! The host wraps each back-office operation in an [`OperationMetrics`]
//! recording; the domain crates themselves stay metrics-free.

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{counter, gauge, histogram, Counter, Gauge, Histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Initialize the Prometheus metrics exporter
///
/// Starts an HTTP listener on the given port exposing `/metrics`.
pub fn init_metrics(port: u16) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("0.0.0.0:{}", port).parse()?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;

    tracing::info!(%addr, "Metrics server listening");
    Ok(())
}

/// How an operation finished, as recorded in metrics labels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationOutcome {
    /// Operation committed
    Ok,
    /// Rejected before persistence
    Rejected,
    /// Failed in storage
    Failed,
}

impl OperationOutcome {
    fn as_str(&self) -> &'static str {
        match self {
            OperationOutcome::Ok => "ok",
            OperationOutcome::Rejected => "rejected",
            OperationOutcome::Failed => "failed",
        }
    }
}

/// Metric set for one back-office operation
///
/// # Metrics
///
/// * `backoffice_operations_total` - operations by name and outcome
/// * `backoffice_operation_duration_seconds` - duration histogram per operation
/// * `backoffice_open_exceptions` - reconciliation exceptions currently open
#[derive(Clone)]
pub struct OperationMetrics {
    operations_by_outcome: fn(&'static str, OperationOutcome) -> Counter,
    duration: Histogram,
    open_exceptions: Gauge,
    operation: &'static str,
}

impl OperationMetrics {
    /// Create the metric set for a named operation
    ///
    /// # Arguments
    ///
    /// * `operation` - Operation name (e.g. "book_trade", "post_entry")
    pub fn new(operation: &'static str) -> Self {
        Self {
            operations_by_outcome: |operation, outcome| {
                counter!(
                    "backoffice_operations_total",
                    "operation" => operation,
                    "outcome" => outcome.as_str()
                )
            },
            duration: histogram!(
                "backoffice_operation_duration_seconds",
                "operation" => operation
            ),
            open_exceptions: gauge!("backoffice_open_exceptions"),
            operation,
        }
    }

    /// Record a completed call of this operation
    pub fn record(&self, duration: Duration, outcome: OperationOutcome) {
        (self.operations_by_outcome)(self.operation, outcome).increment(1);
        self.duration.record(duration.as_secs_f64());
    }

    /// Update the open-exception gauge after a reconciliation run or
    /// resolution
    pub fn set_open_exceptions(&self, count: u64) {
        self.open_exceptions.set(count as f64);
    }

    /// Get the operation name
    pub fn operation(&self) -> &'static str {
        self.operation
    }
}

/// Guard that records an operation's duration on drop
pub struct OperationGuard<'a> {
    metrics: &'a OperationMetrics,
    start: std::time::Instant,
    outcome: OperationOutcome,
}

impl<'a> OperationGuard<'a> {
    /// Start timing a call; the outcome defaults to `Failed` until set
    pub fn new(metrics: &'a OperationMetrics) -> Self {
        Self {
            metrics,
            start: std::time::Instant::now(),
            outcome: OperationOutcome::Failed,
        }
    }

    /// Set the outcome before the guard drops
    pub fn set_outcome(&mut self, outcome: OperationOutcome) {
        self.outcome = outcome;
    }
}

impl Drop for OperationGuard<'_> {
    fn drop(&mut self) {
        self.metrics.record(self.start.elapsed(), self.outcome);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_metrics_creation() {
        let metrics = OperationMetrics::new("book_trade");
        assert_eq!(metrics.operation(), "book_trade");
        metrics.record(Duration::from_millis(3), OperationOutcome::Ok);
        metrics.set_open_exceptions(2);
    }

    #[test]
    fn test_guard_records_on_drop() {
        let metrics = OperationMetrics::new("post_entry");
        let mut guard = OperationGuard::new(&metrics);
        guard.set_outcome(OperationOutcome::Ok);
    }
}
