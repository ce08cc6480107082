use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

use crate::error::DaemonError;

/// Prometheus counters/gauges exposed on `/metrics`. Held behind an `Arc`
/// alongside the [`crate::context::Context`] and updated from the
/// reconciler and pulse-handler loops.
pub struct Metrics {
    registry: Registry,
    pub services: IntGauge,
    pub backends: IntGauge,
    pub reconcile_cycles: IntCounter,
    pub reconcile_failures: IntCounter,
    pub pulse_transitions: IntCounterVec,
}

impl Metrics {
    pub fn new() -> Result<Metrics, DaemonError> {
        let registry = Registry::new();

        let services = IntGauge::new("ipvsd_services", "Number of declared virtual services")
            .map_err(metric_err)?;
        let backends = IntGauge::new("ipvsd_backends", "Number of declared backends")
            .map_err(metric_err)?;
        let reconcile_cycles = IntCounter::new(
            "ipvsd_reconcile_cycles_total",
            "Reconcile cycles that completed without fatal error",
        )
        .map_err(metric_err)?;
        let reconcile_failures = IntCounter::new(
            "ipvsd_reconcile_failures_total",
            "Reconcile cycles aborted due to a store or kernel listing failure",
        )
        .map_err(metric_err)?;
        let pulse_transitions = IntCounterVec::new(
            Opts::new(
                "ipvsd_pulse_transitions_total",
                "Pulse status transitions observed, by resulting status",
            ),
            &["status"],
        )
        .map_err(metric_err)?;

        registry.register(Box::new(services.clone())).map_err(metric_err)?;
        registry.register(Box::new(backends.clone())).map_err(metric_err)?;
        registry
            .register(Box::new(reconcile_cycles.clone()))
            .map_err(metric_err)?;
        registry
            .register(Box::new(reconcile_failures.clone()))
            .map_err(metric_err)?;
        registry
            .register(Box::new(pulse_transitions.clone()))
            .map_err(metric_err)?;

        Ok(Metrics {
            registry,
            services,
            backends,
            reconcile_cycles,
            reconcile_failures,
            pulse_transitions,
        })
    }

    /// Renders the registry in Prometheus text exposition format.
    pub fn render(&self) -> String {
        let families = self.registry.gather();
        let mut buf = Vec::new();
        if let Err(e) = TextEncoder::new().encode(&families, &mut buf) {
            tracing::error!(error = %e, "failed to encode metrics");
            return String::new();
        }
        String::from_utf8_lossy(&buf).into_owned()
    }
}

fn metric_err(e: prometheus::Error) -> DaemonError {
    DaemonError::Config(format!("metrics registration failed: {e}"))
}
