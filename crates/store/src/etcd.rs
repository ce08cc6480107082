use std::time::Duration;

use async_trait::async_trait;
use etcd_client::{Client, Compare, CompareOp, ConnectOptions, GetOptions, Txn, TxnOp};
use ipvsd_core::{Backend, Service};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use url::Url;

use crate::error::StoreError;
use crate::{Store, StoreResult};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// On-the-wire envelope for a backend record: `Backend` itself carries no
/// parent back-pointer, so the store wraps it with the owning vsID for
/// filtering in `list_backends`.
#[derive(Serialize, Deserialize)]
struct StoredBackend {
    vs_id: String,
    backend: Backend,
}

/// [`Store`] backed by a real etcd v3 cluster. Services live under
/// `<prefix>/<service_prefix>/<vsID>`, backends under
/// `<prefix>/<backend_prefix>/<rsID>`, both JSON-encoded.
pub struct EtcdStore {
    client: Mutex<Client>,
    service_prefix: String,
    backend_prefix: String,
}

impl EtcdStore {
    pub async fn connect(
        endpoints: &[Url],
        path_prefix: &str,
        service_prefix: &str,
        backend_prefix: &str,
    ) -> StoreResult<Self> {
        let hosts: Vec<String> = endpoints
            .iter()
            .map(|u| {
                format!(
                    "{}:{}",
                    u.host_str().unwrap_or("localhost"),
                    u.port().unwrap_or(2379)
                )
            })
            .collect();

        let options = ConnectOptions::new().with_connect_timeout(CONNECT_TIMEOUT);
        let client = Client::connect(&hosts, Some(options))
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        let join = |rest: &str| format!("{}/{}", path_prefix.trim_end_matches('/'), rest);

        Ok(EtcdStore {
            client: Mutex::new(client),
            service_prefix: join(service_prefix.trim_matches('/')),
            backend_prefix: join(backend_prefix.trim_matches('/')),
        })
    }

    fn service_key(&self, vs_id: &str) -> String {
        format!("{}/{}", self.service_prefix, vs_id)
    }

    fn backend_key(&self, rs_id: &str) -> String {
        format!("{}/{}", self.backend_prefix, rs_id)
    }

    async fn put(&self, key: &str, value: &[u8], create_only: bool) -> StoreResult<()> {
        let mut client = self.client.lock().await;
        if create_only {
            let txn = Txn::new()
                .when(vec![Compare::create_revision(
                    key,
                    CompareOp::Equal,
                    0,
                )])
                .and_then(vec![TxnOp::put(key, value.to_vec(), None)]);
            client
                .txn(txn)
                .await
                .map_err(|e| StoreError::Backend(e.to_string()))?;
        } else {
            client
                .put(key, value.to_vec(), None)
                .await
                .map_err(|e| StoreError::Backend(e.to_string()))?;
        }
        Ok(())
    }

    async fn list_prefix<T: serde::de::DeserializeOwned>(
        &self,
        prefix: &str,
    ) -> StoreResult<Vec<T>> {
        let mut client = self.client.lock().await;
        let resp = client
            .get(prefix, Some(GetOptions::new().with_prefix()))
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        resp.kvs()
            .iter()
            .map(|kv| {
                serde_json::from_slice(kv.value())
                    .map_err(|e| StoreError::Decode(kv.key_str().unwrap_or("?").to_owned(), e))
            })
            .collect()
    }
}

#[async_trait]
impl Store for EtcdStore {
    async fn list_services(&self) -> StoreResult<Vec<Service>> {
        self.list_prefix(&self.service_prefix).await
    }

    async fn list_backends(&self, vs_id: &str) -> StoreResult<Vec<Backend>> {
        let stored: Vec<StoredBackend> = self.list_prefix(&self.backend_prefix).await?;
        Ok(stored
            .into_iter()
            .filter(|s| s.vs_id == vs_id)
            .map(|s| s.backend)
            .collect())
    }

    async fn create_service(&self, vs_id: &str, svc: &Service) -> StoreResult<()> {
        let key = self.service_key(vs_id);
        let value = serde_json::to_vec(svc).map_err(|e| StoreError::Encode(key.clone(), e))?;
        self.put(&key, &value, true).await
    }

    async fn update_service(&self, vs_id: &str, svc: &Service) -> StoreResult<()> {
        let key = self.service_key(vs_id);
        let value = serde_json::to_vec(svc).map_err(|e| StoreError::Encode(key.clone(), e))?;
        self.put(&key, &value, false).await
    }

    async fn create_backend(
        &self,
        vs_id: &str,
        rs_id: &str,
        backend: &Backend,
    ) -> StoreResult<()> {
        let key = self.backend_key(rs_id);
        let stored = StoredBackend {
            vs_id: vs_id.to_owned(),
            backend: backend.clone(),
        };
        let value = serde_json::to_vec(&stored).map_err(|e| StoreError::Encode(key.clone(), e))?;
        self.put(&key, &value, true).await
    }

    async fn update_backend(
        &self,
        vs_id: &str,
        rs_id: &str,
        backend: &Backend,
    ) -> StoreResult<()> {
        let key = self.backend_key(rs_id);
        let stored = StoredBackend {
            vs_id: vs_id.to_owned(),
            backend: backend.clone(),
        };
        let value = serde_json::to_vec(&stored).map_err(|e| StoreError::Encode(key.clone(), e))?;
        self.put(&key, &value, false).await
    }

    async fn remove_service(&self, vs_id: &str) -> StoreResult<()> {
        let mut client = self.client.lock().await;
        client
            .delete(
                self.service_key(vs_id),
                Some(etcd_client::DeleteOptions::new().with_prefix()),
            )
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(())
    }

    async fn remove_backend(&self, rs_id: &str) -> StoreResult<()> {
        let mut client = self.client.lock().await;
        client
            .delete(self.backend_key(rs_id), None)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(())
    }

    async fn close(&self) {}
}
