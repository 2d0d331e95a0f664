//! Metrics collection for scenario replays
//!
//! Prometheus metrics, registered in a private registry so several runners
//! can coexist in one process (tests, benches).
//!
//! # Metrics
//!
//! - `drift_operations_applied_total` - Operations committed
//! - `drift_operations_rejected_total` - Operations rejected
//! - `drift_checkpoints_total` - Invariant checks recorded
//! - `drift_invariant_violations_total` - Checks where the invariant failed
//! - `drift_last_drift_magnitude` - |drift| at the latest check (saturating)

use crate::checker::InvariantReport;
use prometheus::{IntCounter, IntGauge, Registry};
use std::fmt;
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Operations committed
    pub operations_applied: IntCounter,

    /// Operations rejected
    pub operations_rejected: IntCounter,

    /// Invariant checks recorded
    pub checkpoints: IntCounter,

    /// Invariant checks that failed
    pub violations: IntCounter,

    /// Drift magnitude at the latest check
    pub last_drift: IntGauge,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl fmt::Debug for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Metrics")
            .field("operations_applied", &self.operations_applied.get())
            .field("operations_rejected", &self.operations_rejected.get())
            .field("checkpoints", &self.checkpoints.get())
            .field("violations", &self.violations.get())
            .field("last_drift", &self.last_drift.get())
            .finish()
    }
}

impl Metrics {
    /// Create new metrics collector
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let operations_applied = IntCounter::new(
            "drift_operations_applied_total",
            "Operations committed to the ledger",
        )?;
        registry.register(Box::new(operations_applied.clone()))?;

        let operations_rejected = IntCounter::new(
            "drift_operations_rejected_total",
            "Operations rejected by the engine",
        )?;
        registry.register(Box::new(operations_rejected.clone()))?;

        let checkpoints =
            IntCounter::new("drift_checkpoints_total", "Invariant checks recorded")?;
        registry.register(Box::new(checkpoints.clone()))?;

        let violations = IntCounter::new(
            "drift_invariant_violations_total",
            "Invariant checks where aggregate != sum(balances)",
        )?;
        registry.register(Box::new(violations.clone()))?;

        let last_drift = IntGauge::new(
            "drift_last_drift_magnitude",
            "Absolute drift at the latest invariant check",
        )?;
        registry.register(Box::new(last_drift.clone()))?;

        Ok(Self {
            operations_applied,
            operations_rejected,
            checkpoints,
            violations,
            last_drift,
            registry,
        })
    }

    /// Record one operation outcome
    pub fn record_operation(&self, succeeded: bool) {
        if succeeded {
            self.operations_applied.inc();
        } else {
            self.operations_rejected.inc();
        }
    }

    /// Record one invariant check
    pub fn record_check(&self, report: &InvariantReport) {
        self.checkpoints.inc();
        if !report.holds {
            self.violations.inc();
        }
        let magnitude = i64::try_from(report.drift.saturating_magnitude_u64()).unwrap_or(i64::MAX);
        self.last_drift.set(magnitude);
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{checker::check, AccountId, Amount, Ledger};

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new().unwrap();
        assert_eq!(metrics.operations_applied.get(), 0);
        assert_eq!(metrics.violations.get(), 0);
    }

    #[test]
    fn test_independent_registries() {
        let first = Metrics::new().unwrap();
        let second = Metrics::new().unwrap();
        first.record_operation(true);
        assert_eq!(first.operations_applied.get(), 1);
        assert_eq!(second.operations_applied.get(), 0);
    }

    #[test]
    fn test_record_operation() {
        let metrics = Metrics::new().unwrap();
        metrics.record_operation(true);
        metrics.record_operation(false);
        metrics.record_operation(false);
        assert_eq!(metrics.operations_applied.get(), 1);
        assert_eq!(metrics.operations_rejected.get(), 2);
    }

    #[test]
    fn test_record_check() {
        let metrics = Metrics::new().unwrap();
        let ledger = Ledger::seeded([(AccountId::new("a"), Amount::from(90u64))], Amount::from(100u64));

        metrics.record_check(&check(&ledger, &[AccountId::new("a")]));
        assert_eq!(metrics.checkpoints.get(), 1);
        assert_eq!(metrics.violations.get(), 1);
        assert_eq!(metrics.last_drift.get(), 10);
        assert_eq!(metrics.registry().gather().len(), 5);
    }
}
