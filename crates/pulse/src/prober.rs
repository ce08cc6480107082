use std::collections::VecDeque;
use std::net::SocketAddr;
use std::time::Duration;

use ipvsd_core::{PulseId, PulseMetrics, PulseOptions, PulseStatus, PulseUpdate};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::probe;

/// Running tally of consecutive outcomes feeding the `Up`/`Down` gate.
struct Trend {
    status: PulseStatus,
    consecutive_failures: u32,
    consecutive_successes: u32,
}

impl Trend {
    fn new() -> Self {
        Trend {
            status: PulseStatus::Up,
            consecutive_failures: 0,
            consecutive_successes: 0,
        }
    }

    /// Folds one probe outcome in. `Down` requires `failure_threshold`
    /// consecutive failures; recovering to `Up` requires
    /// `recovery_threshold` consecutive successes. Neither counter crosses
    /// zero into the other: a single opposite outcome resets it.
    fn record(&mut self, ok: bool, failure_threshold: u32, recovery_threshold: u32) -> PulseStatus {
        if ok {
            self.consecutive_failures = 0;
            self.consecutive_successes += 1;
            if self.consecutive_successes >= recovery_threshold.max(1) {
                self.status = PulseStatus::Up;
            }
        } else {
            self.consecutive_successes = 0;
            self.consecutive_failures += 1;
            if self.consecutive_failures >= failure_threshold.max(1) {
                self.status = PulseStatus::Down;
            }
        }
        self.status
    }
}

/// Runs one backend's health probe loop until `token` is cancelled or the
/// update channel is gone, then emits a final `Removed` update and exits.
/// `tx` is expected to be bounded and non-blocking from the handler's
/// perspective: a full channel means the handler is behind, and it is
/// the handler's job to keep up, not the prober's job to block.
pub async fn run(
    id: PulseId,
    addr: SocketAddr,
    opts: PulseOptions,
    tx: mpsc::Sender<PulseUpdate>,
    token: CancellationToken,
) {
    let mut window: VecDeque<bool> = VecDeque::with_capacity(opts.window as usize);
    let mut trend = Trend::new();
    let start = tokio::time::Instant::now();
    let deadline = Duration::from_millis(opts.interval_ms);

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = tokio::time::sleep(deadline) => {}
        }
        if token.is_cancelled() {
            break;
        }

        let ok = probe::run_once(&opts.kind, addr, deadline).await;

        if window.len() == opts.window.max(1) as usize {
            window.pop_front();
        }
        window.push_back(ok);

        let status = trend.record(ok, opts.failure_threshold, opts.recovery_threshold);

        let failures = window.iter().filter(|ok| !**ok).count() as f64;
        let health = (1.0 - failures / window.len().max(1) as f64).clamp(0.0, 1.0);

        let update = PulseUpdate {
            source: id.clone(),
            metrics: PulseMetrics {
                status,
                health,
                uptime: start.elapsed(),
            },
        };

        if tx.try_send(update).is_err() {
            tracing::debug!(vs_id = %id.vs_id, rs_id = %id.rs_id, "pulse channel full, dropping update");
        }
    }

    let _ = tx
        .send(PulseUpdate {
            source: id,
            metrics: PulseMetrics {
                status: PulseStatus::Removed,
                health: 0.0,
                uptime: start.elapsed(),
            },
        })
        .await;
}

#[cfg(test)]
#[path = "prober_tests.rs"]
mod tests;
