//! Observability infrastructure for OpenBackOffice
//!
//! Logging initialization over `tracing` and a Prometheus metrics facade
//! for the back-office operations. Wired by the host process at startup;
//! the domain crates log through `tracing` and stay unaware of the
//! subscriber and exporter behind it.

pub mod logging;
pub mod metrics;

pub use logging::{init_from_config, init_logging, LogFormat};
pub use metrics::{init_metrics, OperationGuard, OperationMetrics, OperationOutcome};
