use async_trait::async_trait;

use ipvsd_core::PulseMetrics;

/// What the pulse handler needs from the daemon's `Context` to apply the
/// weight stash/restore protocol, kept as a trait so this crate never
/// depends on the daemon crate.
#[async_trait]
pub trait WeightSink: Send + Sync {
    /// `false` once the backend has been removed from the parent service.
    async fn backend_exists(&self, vs_id: &str, rs_id: &str) -> bool;

    /// Sets the backend's kernel weight and returns its weight from
    /// immediately before the update.
    async fn update_backend_weight(
        &self,
        vs_id: &str,
        rs_id: &str,
        weight: u32,
    ) -> Result<u32, WeightSinkError>;

    /// Caches the latest reported health metrics, independent of any
    /// weight change. No-op by default for sinks that don't track it.
    async fn record_metrics(&self, _vs_id: &str, _rs_id: &str, _metrics: PulseMetrics) {}
}

#[derive(Debug, thiserror::Error)]
#[error("failed to update backend weight: {0}")]
pub struct WeightSinkError(pub String);
