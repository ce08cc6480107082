use std::sync::Arc;
use std::time::Duration;

use ipvsd_core::{Backend, Service};
use ipvsd_kernel::Kernel;
use ipvsd_store::Store;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

/// Periodic + on-demand desired-vs-actual convergence loop. The reconciler
/// is the only component that ever writes to the kernel table; the
/// [`crate::context::Context`] only ever writes to the store and its own
/// in-memory maps, relying on this loop to carry those writes into the
/// kernel on the next cycle.
pub struct Reconciler {
    store: Arc<dyn Store>,
    kernel: Arc<dyn Kernel>,
    period: Duration,
    /// Serializes cycles so at most one reconcile runs at a time; also
    /// used as the target of an immediate follow-up when a sync request
    /// arrives mid-cycle.
    run_lock: Mutex<()>,
}

impl Reconciler {
    pub fn new(store: Arc<dyn Store>, kernel: Arc<dyn Kernel>, period: Duration) -> Self {
        Reconciler {
            store,
            kernel,
            period,
            run_lock: Mutex::new(()),
        }
    }

    /// Runs until `token` is cancelled, waking on the configured period or
    /// on a `sync_rx` signal, whichever comes first. A signal that arrives
    /// while a cycle is in flight is coalesced into exactly one follow-up
    /// cycle rather than queued.
    pub async fn run(
        &self,
        mut sync_rx: mpsc::Receiver<()>,
        token: CancellationToken,
    ) {
        let mut pending_followup = false;
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = tokio::time::sleep(self.period) => {}
                signal = sync_rx.recv() => {
                    if signal.is_none() {
                        break;
                    }
                }
            }

            self.run_cycle().await;

            while pending_followup {
                pending_followup = false;
                self.run_cycle().await;
            }

            // Drain any sync requests that piled up during the cycle into a
            // single follow-up rather than running once per request.
            while sync_rx.try_recv().is_ok() {
                pending_followup = true;
            }
        }
    }

    /// Runs one desired-vs-actual convergence pass. Best-effort: a single
    /// failed kernel or store call is logged and the procedure continues
    /// with the next item.
    pub async fn run_cycle(&self) {
        let _guard = self.run_lock.lock().await;

        let desired_services = match self.store.list_services().await {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(error = %e, "reconcile: failed to list desired services, aborting cycle");
                return;
            }
        };
        let actual_services = match self.kernel.list_services().await {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(error = %e, "reconcile: failed to list actual services, aborting cycle");
                return;
            }
        };

        for desired in &desired_services {
            let actual = actual_services.iter().find(|a| a.key == desired.key);
            match actual {
                None => {
                    if let Err(e) = self.kernel.add_service(desired).await {
                        tracing::warn!(error = %e, vip = %desired.key.vip, port = desired.key.port, "reconcile: add_service failed");
                    }
                }
                Some(a) if !desired.equal(a) => {
                    if let Err(e) = self.kernel.update_service(desired).await {
                        tracing::warn!(error = %e, vip = %desired.key.vip, port = desired.key.port, "reconcile: update_service failed");
                    }
                }
                Some(_) => {}
            }

            self.reconcile_backends(desired).await;
        }

        for actual in &actual_services {
            if !desired_services.iter().any(|d| d.key == actual.key) {
                if let Err(e) = self.kernel.delete_service(&actual.key).await {
                    tracing::warn!(error = %e, vip = %actual.key.vip, port = actual.key.port, "reconcile: delete_service failed");
                }
            }
        }
    }

    async fn reconcile_backends(&self, desired_service: &Service) {
        let desired_backends = match self.store.list_backends(&desired_service.store_id).await {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!(error = %e, vs_id = %desired_service.store_id, "reconcile: failed to list desired backends");
                return;
            }
        };
        let actual_backends = match self.kernel.list_backends(&desired_service.key).await {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!(error = %e, vs_id = %desired_service.store_id, "reconcile: failed to list actual backends");
                return;
            }
        };

        for desired in &desired_backends {
            let actual: Option<&Backend> = actual_backends.iter().find(|a| a.key == desired.key);
            match actual {
                None => {
                    if let Err(e) = self.kernel.add_backend(&desired_service.key, desired).await {
                        tracing::warn!(error = %e, rs_id = %desired.store_id, "reconcile: add_backend failed");
                    }
                }
                Some(a) if !desired.equal(a) => {
                    if let Err(e) = self
                        .kernel
                        .update_backend(&desired_service.key, desired)
                        .await
                    {
                        tracing::warn!(error = %e, rs_id = %desired.store_id, "reconcile: update_backend failed");
                    }
                }
                Some(_) => {}
            }
        }

        for actual in &actual_backends {
            if !desired_backends.iter().any(|d| d.key == actual.key) {
                if let Err(e) = self
                    .kernel
                    .delete_backend(&desired_service.key, &actual.key)
                    .await
                {
                    tracing::warn!(error = %e, "reconcile: delete_backend failed");
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "reconciler_tests.rs"]
mod tests;
