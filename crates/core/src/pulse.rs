use serde::{Deserialize, Serialize};

/// Identifies a running prober: the service and backend it watches.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PulseId {
    pub vs_id: String,
    pub rs_id: String,
}

/// Status of a single probe outcome stream, as seen by the handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PulseStatus {
    Up,
    Down,
    /// The prober has stopped; this is always the last update for a
    /// [`PulseId`].
    Removed,
}

/// Cached health snapshot for one backend.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PulseMetrics {
    pub status: PulseStatus,
    /// Clamped to `[0.0, 1.0]`; `1.0` means no recorded failures in the
    /// rolling window.
    pub health: f64,
    pub uptime: std::time::Duration,
}

impl PulseMetrics {
    pub fn healthy() -> Self {
        PulseMetrics {
            status: PulseStatus::Up,
            health: 1.0,
            uptime: std::time::Duration::ZERO,
        }
    }
}

/// One emission from a prober to the handler's shared channel.
#[derive(Debug, Clone)]
pub struct PulseUpdate {
    pub source: PulseId,
    pub metrics: PulseMetrics,
}

/// What kind of probe a prober runs against its backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ProbeKind {
    None,
    TcpConnect,
    HttpGet { path: String },
}

impl Default for ProbeKind {
    fn default() -> Self {
        ProbeKind::None
    }
}

/// Per-backend prober configuration, carried alongside a [`crate::Backend`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PulseOptions {
    #[serde(flatten)]
    pub kind: ProbeKind,
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    #[serde(default = "default_recovery_threshold")]
    pub recovery_threshold: u32,
    #[serde(default = "default_window")]
    pub window: u32,
}

fn default_interval_ms() -> u64 {
    2_000
}

fn default_failure_threshold() -> u32 {
    3
}

fn default_recovery_threshold() -> u32 {
    2
}

fn default_window() -> u32 {
    10
}

impl Default for PulseOptions {
    fn default() -> Self {
        PulseOptions {
            kind: ProbeKind::None,
            interval_ms: default_interval_ms(),
            failure_threshold: default_failure_threshold(),
            recovery_threshold: default_recovery_threshold(),
            window: default_window(),
        }
    }
}
