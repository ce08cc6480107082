use std::collections::HashMap;

use async_trait::async_trait;
use ipvsd_core::{Backend, BackendKey, Service, ServiceKey};
use parking_lot::Mutex;

use crate::error::KernelError;
use crate::Kernel;

/// In-memory stand-in for the kernel table, used by reconciler and
/// pulse-handler tests so they never touch the real netlink transport.
#[derive(Default)]
pub struct MockKernel {
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    services: HashMap<ServiceKey, Service>,
    backends: HashMap<ServiceKey, HashMap<BackendKey, Backend>>,
}

impl MockKernel {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Kernel for MockKernel {
    async fn init(&self) -> Result<(), KernelError> {
        Ok(())
    }

    async fn flush(&self) -> Result<(), KernelError> {
        let mut state = self.state.lock();
        state.services.clear();
        state.backends.clear();
        Ok(())
    }

    async fn add_service(&self, svc: &Service) -> Result<(), KernelError> {
        let mut state = self.state.lock();
        if state.services.contains_key(&svc.key) {
            return Err(KernelError::ServiceExists(svc.key));
        }
        state.services.insert(svc.key, svc.clone());
        state.backends.entry(svc.key).or_default();
        Ok(())
    }

    async fn update_service(&self, svc: &Service) -> Result<(), KernelError> {
        let mut state = self.state.lock();
        if !state.services.contains_key(&svc.key) {
            return Err(KernelError::ServiceNotFound(svc.key));
        }
        state.services.insert(svc.key, svc.clone());
        Ok(())
    }

    async fn delete_service(&self, key: &ServiceKey) -> Result<(), KernelError> {
        let mut state = self.state.lock();
        state
            .services
            .remove(key)
            .ok_or(KernelError::ServiceNotFound(*key))?;
        state.backends.remove(key);
        Ok(())
    }

    async fn list_services(&self) -> Result<Vec<Service>, KernelError> {
        Ok(self.state.lock().services.values().cloned().collect())
    }

    async fn add_backend(&self, svc: &ServiceKey, backend: &Backend) -> Result<(), KernelError> {
        let mut state = self.state.lock();
        if !state.services.contains_key(svc) {
            return Err(KernelError::ServiceNotFound(*svc));
        }
        state
            .backends
            .entry(*svc)
            .or_default()
            .insert(backend.key, backend.clone());
        Ok(())
    }

    async fn update_backend(
        &self,
        svc: &ServiceKey,
        backend: &Backend,
    ) -> Result<(), KernelError> {
        let mut state = self.state.lock();
        let pool = state
            .backends
            .get_mut(svc)
            .ok_or(KernelError::ServiceNotFound(*svc))?;
        if !pool.contains_key(&backend.key) {
            return Err(KernelError::BackendNotFound(backend.key, *svc));
        }
        pool.insert(backend.key, backend.clone());
        Ok(())
    }

    async fn delete_backend(&self, svc: &ServiceKey, key: &BackendKey) -> Result<(), KernelError> {
        let mut state = self.state.lock();
        let pool = state
            .backends
            .get_mut(svc)
            .ok_or(KernelError::ServiceNotFound(*svc))?;
        pool.remove(key)
            .ok_or(KernelError::BackendNotFound(*key, *svc))?;
        Ok(())
    }

    async fn list_backends(&self, svc: &ServiceKey) -> Result<Vec<Backend>, KernelError> {
        let state = self.state.lock();
        let pool = state
            .backends
            .get(svc)
            .ok_or(KernelError::ServiceNotFound(*svc))?;
        Ok(pool.values().cloned().collect())
    }
}

#[cfg(test)]
#[path = "mock_tests.rs"]
mod tests;
