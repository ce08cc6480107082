use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use ipvsd_core::{Backend, BackendOptions, CoreError, PulseMetrics, PulseUpdate, Service, ServiceOptions};
use ipvsd_pulse::{WeightSink, WeightSinkError};
use ipvsd_store::Store;
use serde::Serialize;
use tokio::sync::{mpsc, RwLock};
use tokio_util::sync::CancellationToken;

use crate::error::DaemonError;

struct ServiceEntry {
    service: Service,
    backend_ids: Vec<String>,
}

struct BackendEntry {
    backend: Backend,
    vs_id: String,
    metrics: PulseMetrics,
}

/// Everything `Context` guards behind its one lock. Split into a struct of
/// its own so every operation takes a single guard for its whole duration,
/// including the store write in the middle of it, rather than acquiring
/// the services and backends tables as two independently-lockable halves.
#[derive(Default)]
struct ContextState {
    services: HashMap<String, ServiceEntry>,
    backends: HashMap<String, BackendEntry>,
    prober_tokens: HashMap<String, CancellationToken>,
}

/// View returned by `get_service`: the stored options plus the aggregate
/// health of its backends.
#[derive(Debug, Serialize)]
pub struct ServiceView {
    pub service: Service,
    pub health: f64,
    pub backends: Vec<String>,
}

/// View returned by `get_backend`: the stored options plus its last known
/// pulse metrics.
#[derive(Debug, Serialize)]
pub struct BackendView {
    pub backend: Backend,
    pub metrics: PulseMetrics,
}

/// Owns the in-memory service/backend tables and is the single entry point
/// through which REST handlers and the pulse handler mutate declared
/// state. Every mutation writes to the store before it is reflected here;
/// the kernel table itself is brought into line by the reconciler, never
/// by the Context directly (see `reconciler`). `state` is a single lock
/// held for the whole of an operation, store write included, so two
/// concurrent calls touching the same `rs_id`/`vs_id` can't both pass a
/// presence check before either one commits.
pub struct Context {
    store: Arc<dyn Store>,
    state: RwLock<ContextState>,
    pulse_tx: mpsc::Sender<PulseUpdate>,
    sync_tx: mpsc::Sender<()>,
    shutdown: CancellationToken,
}

impl Context {
    pub fn new(
        store: Arc<dyn Store>,
        pulse_tx: mpsc::Sender<PulseUpdate>,
        sync_tx: mpsc::Sender<()>,
        shutdown: CancellationToken,
    ) -> Self {
        Context {
            store,
            state: RwLock::new(ContextState::default()),
            pulse_tx,
            sync_tx,
            shutdown,
        }
    }

    /// Loads every service and backend known to the store into memory and
    /// starts a prober for each live backend. Called once at daemon
    /// startup, before the HTTP surface and reconciler begin running.
    pub async fn start(&self) -> Result<(), DaemonError> {
        let services = self.store.list_services().await?;
        let mut state = self.state.write().await;
        for svc in services {
            state.services.insert(
                svc.store_id.clone(),
                ServiceEntry {
                    service: svc,
                    backend_ids: Vec::new(),
                },
            );
        }

        let vs_ids: Vec<String> = state.services.keys().cloned().collect();

        for vs_id in vs_ids {
            let backends = self.store.list_backends(&vs_id).await?;
            for backend in backends {
                let rs_id = backend.store_id.clone();
                self.spawn_prober(&mut state, &vs_id, &rs_id, &backend);
                state.backends.insert(
                    rs_id.clone(),
                    BackendEntry {
                        backend,
                        vs_id: vs_id.clone(),
                        metrics: PulseMetrics::healthy(),
                    },
                );
                if let Some(entry) = state.services.get_mut(&vs_id) {
                    entry.backend_ids.push(rs_id);
                }
            }
        }

        Ok(())
    }

    /// Cancels every running prober (fire-and-forget: their final `Removed`
    /// emission is not awaited) and closes the store.
    pub async fn close(&self) {
        let state = self.state.read().await;
        for token in state.prober_tokens.values() {
            token.cancel();
        }
        drop(state);
        self.store.close().await;
    }

    pub async fn create_service(&self, vs_id: &str, opts: &ServiceOptions) -> Result<Service, DaemonError> {
        let mut state = self.state.write().await;
        if state.services.contains_key(vs_id) {
            return Err(DaemonError::ObjectExists(vs_id.to_owned()));
        }
        let service = opts.fill(vs_id)?;
        self.store.create_service(vs_id, &service).await?;
        state.services.insert(
            vs_id.to_owned(),
            ServiceEntry {
                service: service.clone(),
                backend_ids: Vec::new(),
            },
        );
        drop(state);
        self.trigger_sync();
        Ok(service)
    }

    /// Falls through to `create_service` when `vs_id` is unknown.
    pub async fn update_service(&self, vs_id: &str, opts: &ServiceOptions) -> Result<Service, DaemonError> {
        let mut state = self.state.write().await;
        let Some(existing_key) = state.services.get(vs_id).map(|e| e.service.key) else {
            drop(state);
            return self.create_service(vs_id, opts).await;
        };

        let service = opts.fill(vs_id)?;
        if service.key != existing_key {
            return Err(CoreError::Rekey.into());
        }

        self.store.update_service(vs_id, &service).await?;
        if let Some(entry) = state.services.get_mut(vs_id) {
            entry.service = service.clone();
        }
        drop(state);
        self.trigger_sync();
        Ok(service)
    }

    /// Stops every owned backend's prober, deletes each from the store and
    /// the in-memory map, then deletes the service itself.
    pub async fn remove_service(&self, vs_id: &str) -> Result<Service, DaemonError> {
        let mut state = self.state.write().await;
        let entry = state
            .services
            .remove(vs_id)
            .ok_or_else(|| DaemonError::ObjectNotFound(vs_id.to_owned()))?;

        for rs_id in &entry.backend_ids {
            Self::stop_prober(&mut state, rs_id);
            if let Err(e) = self.store.remove_backend(rs_id).await {
                tracing::warn!(vs_id, rs_id, error = %e, "failed to remove backend during service cascade");
            }
            state.backends.remove(rs_id);
        }

        self.store.remove_service(vs_id).await?;
        drop(state);
        self.trigger_sync();
        Ok(entry.service)
    }

    pub async fn get_service(&self, vs_id: &str) -> Result<ServiceView, DaemonError> {
        let state = self.state.read().await;
        let entry = state
            .services
            .get(vs_id)
            .ok_or_else(|| DaemonError::ObjectNotFound(vs_id.to_owned()))?;

        let health = if entry.backend_ids.is_empty() {
            1.0
        } else {
            let sum: f64 = entry
                .backend_ids
                .iter()
                .filter_map(|id| state.backends.get(id))
                .map(|b| b.metrics.health)
                .sum();
            sum / entry.backend_ids.len() as f64
        };

        Ok(ServiceView {
            service: entry.service.clone(),
            health,
            backends: entry.backend_ids.clone(),
        })
    }

    pub async fn list_services(&self) -> Vec<String> {
        self.state.read().await.services.keys().cloned().collect()
    }

    pub async fn create_backend(
        &self,
        vs_id: &str,
        rs_id: &str,
        opts: &BackendOptions,
    ) -> Result<Backend, DaemonError> {
        let mut state = self.state.write().await;
        if state.backends.contains_key(rs_id) {
            return Err(DaemonError::ObjectExists(rs_id.to_owned()));
        }
        let parent_key = state
            .services
            .get(vs_id)
            .map(|e| e.service.key)
            .ok_or_else(|| DaemonError::ObjectNotFound(vs_id.to_owned()))?;

        let backend = opts.fill(rs_id, &parent_key)?;
        self.store.create_backend(vs_id, rs_id, &backend).await?;

        state.backends.insert(
            rs_id.to_owned(),
            BackendEntry {
                backend: backend.clone(),
                vs_id: vs_id.to_owned(),
                metrics: PulseMetrics::healthy(),
            },
        );
        if let Some(entry) = state.services.get_mut(vs_id) {
            entry.backend_ids.push(rs_id.to_owned());
        }

        self.spawn_prober(&mut state, vs_id, rs_id, &backend);
        drop(state);
        self.trigger_sync();
        Ok(backend)
    }

    /// Creates the backend if `rs_id` is unknown, updates it in place if
    /// it's already owned by `vs_id`, and otherwise rejects the request:
    /// an `rs_id` already owned by a *different* service is a 409, not a
    /// silent reparent. Mirrors `update_service`'s create-on-missing
    /// fallthrough and backs the REST `PUT /service/{vsID}/{rsID}`
    /// endpoint.
    pub async fn put_backend(
        &self,
        vs_id: &str,
        rs_id: &str,
        opts: &BackendOptions,
    ) -> Result<Backend, DaemonError> {
        let state = self.state.read().await;
        match state.backends.get(rs_id) {
            Some(entry) if entry.vs_id == vs_id => {
                drop(state);
                self.update_backend(vs_id, rs_id, opts).await
            }
            Some(_) => Err(DaemonError::ObjectExists(rs_id.to_owned())),
            None => {
                drop(state);
                self.create_backend(vs_id, rs_id, opts).await
            }
        }
    }

    /// Full replace of a backend's options, used by REST and the
    /// reconciler's desired-state path. Rejects `rs_id` if it belongs to a
    /// different service; reparenting a backend is not supported. Restarts
    /// the prober with the (possibly changed) pulse configuration.
    pub async fn update_backend(
        &self,
        vs_id: &str,
        rs_id: &str,
        opts: &BackendOptions,
    ) -> Result<Backend, DaemonError> {
        let mut state = self.state.write().await;
        let parent_key = state
            .services
            .get(vs_id)
            .map(|e| e.service.key)
            .ok_or_else(|| DaemonError::ObjectNotFound(vs_id.to_owned()))?;
        match state.backends.get(rs_id) {
            Some(entry) if entry.vs_id == vs_id => {}
            _ => return Err(DaemonError::ObjectNotFound(rs_id.to_owned())),
        }

        let backend = opts.fill(rs_id, &parent_key)?;
        self.store.update_backend(vs_id, rs_id, &backend).await?;

        if let Some(entry) = state.backends.get_mut(rs_id) {
            entry.backend = backend.clone();
        }

        Self::stop_prober(&mut state, rs_id);
        self.spawn_prober(&mut state, vs_id, rs_id, &backend);
        drop(state);
        self.trigger_sync();
        Ok(backend)
    }

    pub async fn remove_backend(&self, vs_id: &str, rs_id: &str) -> Result<Backend, DaemonError> {
        let mut state = self.state.write().await;
        let entry = state
            .backends
            .remove(rs_id)
            .ok_or_else(|| DaemonError::ObjectNotFound(rs_id.to_owned()))?;

        self.store.remove_backend(rs_id).await?;
        Self::stop_prober(&mut state, rs_id);
        if let Some(svc) = state.services.get_mut(vs_id) {
            svc.backend_ids.retain(|id| id != rs_id);
        }
        drop(state);
        self.trigger_sync();
        Ok(entry.backend)
    }

    pub async fn get_backend(&self, rs_id: &str) -> Result<BackendView, DaemonError> {
        let state = self.state.read().await;
        let entry = state
            .backends
            .get(rs_id)
            .ok_or_else(|| DaemonError::ObjectNotFound(rs_id.to_owned()))?;
        Ok(BackendView {
            backend: entry.backend.clone(),
            metrics: entry.metrics,
        })
    }

    /// Spawns a prober and records its cancellation token. Takes the
    /// already-held state guard rather than locking itself, since every
    /// caller holds it for the duration of a larger operation.
    fn spawn_prober(&self, state: &mut ContextState, vs_id: &str, rs_id: &str, backend: &Backend) {
        let addr = SocketAddr::new(backend.key.ip, backend.key.port);
        let id = ipvsd_core::PulseId {
            vs_id: vs_id.to_owned(),
            rs_id: rs_id.to_owned(),
        };
        let token = self.shutdown.child_token();
        state.prober_tokens.insert(rs_id.to_owned(), token.clone());
        let opts = backend.pulse.clone();
        let tx = self.pulse_tx.clone();
        tokio::spawn(ipvsd_pulse::run_prober(id, addr, opts, tx, token));
    }

    fn stop_prober(state: &mut ContextState, rs_id: &str) {
        if let Some(token) = state.prober_tokens.remove(rs_id) {
            token.cancel();
        }
    }

    fn trigger_sync(&self) {
        let _ = self.sync_tx.try_send(());
    }
}

/// Lets the pulse handler mutate backend weights and check liveness
/// without depending on the daemon crate's concrete types.
#[async_trait]
impl WeightSink for Context {
    async fn backend_exists(&self, _vs_id: &str, rs_id: &str) -> bool {
        self.state.read().await.backends.contains_key(rs_id)
    }

    async fn update_backend_weight(
        &self,
        _vs_id: &str,
        rs_id: &str,
        weight: u32,
    ) -> Result<u32, WeightSinkError> {
        let mut state = self.state.write().await;
        let entry = state
            .backends
            .get_mut(rs_id)
            .ok_or_else(|| WeightSinkError(format!("backend `{rs_id}` not found")))?;
        let vs_id = entry.vs_id.clone();
        let mut updated = entry.backend.clone();
        updated.weight = weight;

        self.store
            .update_backend(&vs_id, rs_id, &updated)
            .await
            .map_err(|e| WeightSinkError(e.to_string()))?;

        let prev = entry.backend.weight;
        entry.backend = updated;
        drop(state);
        self.trigger_sync();
        Ok(prev)
    }

    async fn record_metrics(&self, _vs_id: &str, rs_id: &str, metrics: PulseMetrics) {
        if let Some(entry) = self.state.write().await.backends.get_mut(rs_id) {
            entry.metrics = metrics;
        }
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
