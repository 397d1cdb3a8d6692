//! Prometheus metrics for the reconcile loop

use anyhow::Result;
use mysql_core::{CoreError, DependentKind};
use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::Arc;
use std::time::Duration;

/// Reconcile counters and latency, registered on a private registry
#[derive(Clone)]
pub struct ControllerMetrics {
    /// Reconciliation passes started
    pub reconcile_total: IntCounter,
    /// Failed passes by error class
    pub reconcile_errors_total: IntCounterVec,
    /// Duration of each pass in seconds
    pub reconcile_duration_seconds: Histogram,
    /// Dependents created by kind
    pub dependents_created_total: IntCounterVec,
    registry: Arc<Registry>,
}

impl ControllerMetrics {
    pub fn new() -> Result<Self> {
        let registry = Arc::new(Registry::new());

        let reconcile_total = IntCounter::new("mysql_reconcile_total", "Total MySQL reconciliations")?;
        let reconcile_errors_total = IntCounterVec::new(
            Opts::new("mysql_reconcile_errors_total", "Failed MySQL reconciliations"),
            &["error"],
        )?;
        let reconcile_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "mysql_reconcile_duration_seconds",
                "MySQL reconciliation latency in seconds",
            )
            .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
        )?;
        let dependents_created_total = IntCounterVec::new(
            Opts::new("mysql_dependents_created_total", "Dependent objects created"),
            &["kind"],
        )?;

        registry.register(Box::new(reconcile_total.clone()))?;
        registry.register(Box::new(reconcile_errors_total.clone()))?;
        registry.register(Box::new(reconcile_duration_seconds.clone()))?;
        registry.register(Box::new(dependents_created_total.clone()))?;

        Ok(Self {
            reconcile_total,
            reconcile_errors_total,
            reconcile_duration_seconds,
            dependents_created_total,
            registry,
        })
    }

    pub fn observe_reconcile(&self, elapsed: Duration) {
        self.reconcile_total.inc();
        self.reconcile_duration_seconds.observe(elapsed.as_secs_f64());
    }

    pub fn observe_created(&self, created: &[DependentKind]) {
        for kind in created {
            self.dependents_created_total
                .with_label_values(&[kind.as_str()])
                .inc();
        }
    }

    pub fn observe_error(&self, error: &CoreError) {
        self.reconcile_errors_total
            .with_label_values(&[error.metric_label()])
            .inc();
    }

    /// Gather all metrics in Prometheus text format
    pub fn gather(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let families = self.registry.gather();
        let mut buffer = vec![];
        encoder.encode(&families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}
