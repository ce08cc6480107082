use std::collections::HashMap;

use async_trait::async_trait;
use ipvsd_core::{Backend, Service};
use tokio::sync::RwLock;

use crate::{Store, StoreResult};

/// In-memory [`Store`] for tests and single-node deployments that don't
/// want an external dependency. Never persists across restarts.
#[derive(Default)]
pub struct MemStore {
    services: RwLock<HashMap<String, Service>>,
    /// Keyed by rsID; the stored `vsID` is kept alongside since `Backend`
    /// itself carries no parent back-pointer.
    backends: RwLock<HashMap<String, (String, Backend)>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemStore {
    async fn list_services(&self) -> StoreResult<Vec<Service>> {
        Ok(self.services.read().await.values().cloned().collect())
    }

    async fn list_backends(&self, vs_id: &str) -> StoreResult<Vec<Backend>> {
        Ok(self
            .backends
            .read()
            .await
            .values()
            .filter(|(owner, _)| owner == vs_id)
            .map(|(_, backend)| backend.clone())
            .collect())
    }

    async fn create_service(&self, vs_id: &str, svc: &Service) -> StoreResult<()> {
        let mut services = self.services.write().await;
        services.entry(vs_id.to_owned()).or_insert_with(|| svc.clone());
        Ok(())
    }

    async fn update_service(&self, vs_id: &str, svc: &Service) -> StoreResult<()> {
        self.services.write().await.insert(vs_id.to_owned(), svc.clone());
        Ok(())
    }

    async fn create_backend(
        &self,
        vs_id: &str,
        rs_id: &str,
        backend: &Backend,
    ) -> StoreResult<()> {
        let mut backends = self.backends.write().await;
        backends
            .entry(rs_id.to_owned())
            .or_insert_with(|| (vs_id.to_owned(), backend.clone()));
        Ok(())
    }

    async fn update_backend(
        &self,
        vs_id: &str,
        rs_id: &str,
        backend: &Backend,
    ) -> StoreResult<()> {
        self.backends
            .write()
            .await
            .insert(rs_id.to_owned(), (vs_id.to_owned(), backend.clone()));
        Ok(())
    }

    async fn remove_service(&self, vs_id: &str) -> StoreResult<()> {
        self.services.write().await.remove(vs_id);
        Ok(())
    }

    async fn remove_backend(&self, rs_id: &str) -> StoreResult<()> {
        self.backends.write().await.remove(rs_id);
        Ok(())
    }

    async fn close(&self) {}
}

#[cfg(test)]
#[path = "mem_tests.rs"]
mod tests;
