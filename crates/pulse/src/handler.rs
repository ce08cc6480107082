use std::collections::HashMap;
use std::sync::Arc;

use ipvsd_core::{PulseId, PulseMetrics, PulseStatus, PulseUpdate};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::sink::WeightSink;

/// Consumes pulse updates off the shared channel and applies the weight
/// stash/restore protocol: a backend reported `Down` has its kernel
/// weight zeroed and the original weight stashed aside; as it recovers,
/// the stashed weight is proportionally restored and the stash entry is
/// dropped once health reaches 1.0.
pub struct PulseHandler<S: WeightSink> {
    sink: Arc<S>,
    stash: HashMap<PulseId, u32>,
}

impl<S: WeightSink> PulseHandler<S> {
    pub fn new(sink: Arc<S>) -> Self {
        PulseHandler {
            sink,
            stash: HashMap::new(),
        }
    }

    /// Drains `rx` until the channel closes or `token` is cancelled and
    /// the channel is empty, applying each update in order.
    pub async fn run(&mut self, mut rx: mpsc::Receiver<PulseUpdate>, token: CancellationToken) {
        loop {
            tokio::select! {
                biased;
                update = rx.recv() => match update {
                    Some(update) => self.apply(update).await,
                    None => break,
                },
                _ = token.cancelled(), if rx.is_empty() => break,
            }
        }
    }

    async fn apply(&mut self, update: PulseUpdate) {
        let PulseUpdate { source, metrics } = update;

        let exists = self
            .sink
            .backend_exists(&source.vs_id, &source.rs_id)
            .await;
        if !exists || matches!(metrics.status, PulseStatus::Removed) {
            if self.stash.remove(&source).is_some() {
                tracing::debug!(vs_id = %source.vs_id, rs_id = %source.rs_id, "backend gone, dropping stash entry");
            }
            return;
        }

        self.sink
            .record_metrics(&source.vs_id, &source.rs_id, metrics)
            .await;
        self.apply_weight_change(&source, &metrics).await;
    }

    async fn apply_weight_change(&mut self, source: &PulseId, metrics: &PulseMetrics) {
        match metrics.status {
            PulseStatus::Up => {
                let Some(&stashed) = self.stash.get(source) else {
                    return;
                };
                let restored = (stashed as f64 * metrics.health).floor() as u32;
                match self
                    .sink
                    .update_backend_weight(&source.vs_id, &source.rs_id, restored)
                    .await
                {
                    Ok(_) if restored == stashed => {
                        self.stash.remove(source);
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::error!(vs_id = %source.vs_id, rs_id = %source.rs_id, error = %e, "failed to restore backend weight");
                    }
                }
            }
            PulseStatus::Down => {
                if self.stash.contains_key(source) {
                    return;
                }
                match self
                    .sink
                    .update_backend_weight(&source.vs_id, &source.rs_id, 0)
                    .await
                {
                    Ok(prev_weight) => {
                        self.stash.insert(source.clone(), prev_weight);
                    }
                    Err(e) => {
                        tracing::error!(vs_id = %source.vs_id, rs_id = %source.rs_id, error = %e, "failed to stash backend weight");
                    }
                }
            }
            PulseStatus::Removed => unreachable!("handled before dispatch"),
        }
    }
}

#[cfg(test)]
#[path = "handler_tests.rs"]
mod tests;
