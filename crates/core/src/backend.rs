use std::net::{IpAddr, ToSocketAddrs};

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::key::{BackendKey, ServiceKey};
use crate::pulse::PulseOptions;
use crate::vocab::Forward;

/// A real server behind a virtual service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Backend {
    pub key: BackendKey,
    pub weight: u32,
    pub forward: Forward,
    pub store_id: String,
    pub pulse: PulseOptions,
}

impl Backend {
    /// Structural equality used by the reconciler; store ID and pulse
    /// configuration are local bookkeeping and do not participate.
    pub fn equal(&self, other: &Backend) -> bool {
        self.key == other.key && self.weight == other.weight && self.forward == other.forward
    }

    /// `true` when this backend's IP family matches the service VIP's.
    pub fn matches_family(&self, svc: &ServiceKey) -> bool {
        matches!(
            (self.key.ip, svc.vip),
            (IpAddr::V4(_), IpAddr::V4(_)) | (IpAddr::V6(_), IpAddr::V6(_))
        )
    }
}

/// Wire shape of a backend as accepted over REST or read back from the
/// store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendOptions {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub weight: u32,
    #[serde(default, rename = "method")]
    pub forward: String,
    #[serde(default)]
    pub pulse: PulseOptions,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub vs_id: String,
}

impl BackendOptions {
    /// Fills missing fields with defaults (`weight` -> 100, `forward` ->
    /// `nat`), validates against the closed vocabularies, resolves `host`,
    /// and checks the result against the parent service's address family.
    pub fn fill(&self, store_id: &str, parent: &ServiceKey) -> Result<Backend, CoreError> {
        if self.host.is_empty() || self.port == 0 {
            return Err(CoreError::MalformedRequest(
                "host and port are required".to_owned(),
            ));
        }
        let ip = resolve_host(&self.host)?;

        let weight = if self.weight == 0 { 100 } else { self.weight };

        let forward_str = if self.forward.is_empty() {
            "nat"
        } else {
            &self.forward
        };
        let forward: Forward = forward_str
            .parse()
            .map_err(|_| CoreError::UnknownMethod(forward_str.to_owned()))?;

        let backend = Backend {
            key: BackendKey { ip, port: self.port },
            weight,
            forward,
            store_id: store_id.to_owned(),
            pulse: self.pulse.clone(),
        };

        if !backend.matches_family(parent) {
            return Err(CoreError::IncompatibleAddressFamily(store_id.to_owned()));
        }

        Ok(backend)
    }
}

fn resolve_host(host: &str) -> Result<IpAddr, CoreError> {
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(ip);
    }
    (host, 0u16)
        .to_socket_addrs()
        .map_err(|_| CoreError::MalformedRequest(format!("host `{host}` does not resolve")))?
        .next()
        .map(|addr| addr.ip())
        .ok_or_else(|| CoreError::MalformedRequest(format!("host `{host}` does not resolve")))
}

#[cfg(test)]
#[path = "backend_tests.rs"]
mod tests;
