//! Adapter trait over the in-kernel IPVS table, plus a netlink-backed
//! implementation and an in-memory mock used throughout the test suite.

mod error;
mod flags;
mod forward;
mod mock;
mod netlink;

pub use error::KernelError;
pub use mock::MockKernel;
pub use netlink::NetlinkKernel;

use async_trait::async_trait;
use ipvsd_core::{Backend, BackendKey, Service, ServiceKey};

/// Translates between the daemon's service/backend model and the kernel's
/// IPVS table. One call per kernel object; batching is the caller's
/// responsibility.
#[async_trait]
pub trait Kernel: Send + Sync {
    async fn init(&self) -> Result<(), KernelError>;

    /// Removes every service and backend the kernel currently holds.
    async fn flush(&self) -> Result<(), KernelError>;

    async fn add_service(&self, svc: &Service) -> Result<(), KernelError>;

    async fn update_service(&self, svc: &Service) -> Result<(), KernelError>;

    async fn delete_service(&self, key: &ServiceKey) -> Result<(), KernelError>;

    async fn list_services(&self) -> Result<Vec<Service>, KernelError>;

    async fn add_backend(&self, svc: &ServiceKey, backend: &Backend) -> Result<(), KernelError>;

    async fn update_backend(&self, svc: &ServiceKey, backend: &Backend)
        -> Result<(), KernelError>;

    async fn delete_backend(&self, svc: &ServiceKey, key: &BackendKey) -> Result<(), KernelError>;

    async fn list_backends(&self, svc: &ServiceKey) -> Result<Vec<Backend>, KernelError>;
}
