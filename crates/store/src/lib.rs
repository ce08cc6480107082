//! Durable storage for declared desired state: services keyed by vsID,
//! backends keyed by rsID, both JSON-encoded. Two implementations share
//! the [`Store`] trait so the rest of the daemon is backend-agnostic.

mod error;
mod etcd;
mod mem;

pub use error::StoreError;
pub use etcd::EtcdStore;
pub use mem::MemStore;

use std::sync::Arc;

use async_trait::async_trait;
use ipvsd_core::{Backend, Service};

pub type StoreResult<T> = Result<T, StoreError>;

/// Durable desired-state store. Every mutation is immediately visible to
/// subsequent reads on the same store instance; cross-process visibility
/// depends on the backend (immediate for etcd, trivial for `MemStore`).
#[async_trait]
pub trait Store: Send + Sync {
    async fn list_services(&self) -> StoreResult<Vec<Service>>;
    async fn list_backends(&self, vs_id: &str) -> StoreResult<Vec<Backend>>;
    async fn create_service(&self, vs_id: &str, svc: &Service) -> StoreResult<()>;
    async fn update_service(&self, vs_id: &str, svc: &Service) -> StoreResult<()>;
    async fn create_backend(&self, vs_id: &str, rs_id: &str, backend: &Backend) -> StoreResult<()>;
    async fn update_backend(&self, vs_id: &str, rs_id: &str, backend: &Backend) -> StoreResult<()>;
    async fn remove_service(&self, vs_id: &str) -> StoreResult<()>;
    async fn remove_backend(&self, rs_id: &str) -> StoreResult<()>;
    async fn close(&self);
}

/// Selects and constructs a [`Store`] implementation from one or more
/// endpoint URLs. All URLs must share scheme and path; the scheme picks
/// the backend (`etcd://` for [`EtcdStore`], `mem://` for [`MemStore`]).
pub async fn create_store(
    urls: &[String],
    service_prefix: &str,
    backend_prefix: &str,
) -> StoreResult<Arc<dyn Store>> {
    if urls.is_empty() {
        return Err(StoreError::NoEndpoints);
    }

    let mut common: Option<(String, String)> = None;
    let mut endpoints = Vec::with_capacity(urls.len());
    for raw in urls {
        let parsed = url::Url::parse(raw).map_err(|e| StoreError::Connection(e.to_string()))?;
        match &common {
            None => common = Some((parsed.scheme().to_owned(), parsed.path().to_owned())),
            Some((scheme, path)) => {
                if scheme != parsed.scheme() || path != parsed.path() {
                    return Err(StoreError::InconsistentEndpoints(
                        format!("{scheme}{path}"),
                        format!("{}{}", parsed.scheme(), parsed.path()),
                    ));
                }
            }
        }
        endpoints.push(parsed);
    }

    let (scheme, path) = common.ok_or(StoreError::NoEndpoints)?;

    match scheme.as_str() {
        "etcd" => {
            let store = EtcdStore::connect(&endpoints, &path, service_prefix, backend_prefix)
                .await?;
            Ok(Arc::new(store))
        }
        "mem" => Ok(Arc::new(MemStore::new())),
        other => Err(StoreError::UnsupportedScheme(other.to_owned())),
    }
}
