use std::net::{IpAddr, ToSocketAddrs};

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::key::ServiceKey;
use crate::vocab::{self, Flag, Protocol};

/// A virtual service as held in memory and in the kernel: its identity
/// plus the scheduler and flag set the kernel uses to pick a backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub key: ServiceKey,
    pub scheduler: String,
    pub flags: Vec<Flag>,
    pub store_id: String,
}

impl Service {
    /// Structural equality used by the reconciler to decide whether a
    /// desired service differs from its actual counterpart. Store ID is
    /// external bookkeeping and does not participate.
    pub fn equal(&self, other: &Service) -> bool {
        self.key == other.key
            && self.scheduler == other.scheduler
            && same_flag_set(&self.flags, &other.flags)
    }
}

fn same_flag_set(a: &[Flag], b: &[Flag]) -> bool {
    let mut a = a.to_vec();
    let mut b = b.to_vec();
    a.sort_by_key(|f| f.bit());
    b.sort_by_key(|f| f.bit());
    a == b
}

/// Wire shape of a service as accepted over REST or read back from the
/// store. `Fill` resolves and validates it into a [`Service`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceOptions {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub protocol: String,
    #[serde(default)]
    pub scheduler: String,
    #[serde(default)]
    pub flags: String,
}

impl ServiceOptions {
    /// Fills missing fields with defaults (`protocol` -> `tcp`, `scheduler`
    /// -> `wrr`) and validates against the closed vocabularies, resolving
    /// `host` to an IP address.
    pub fn fill(&self, store_id: &str) -> Result<Service, CoreError> {
        if self.port == 0 {
            return Err(CoreError::MalformedRequest("port is missing".to_owned()));
        }
        if self.host.is_empty() {
            return Err(CoreError::MalformedRequest("host is missing".to_owned()));
        }
        let vip = resolve_host(&self.host)?;

        let protocol_str = if self.protocol.is_empty() {
            "tcp"
        } else {
            &self.protocol
        };
        let protocol: Protocol = protocol_str
            .parse()
            .map_err(|_| CoreError::UnknownProtocol(protocol_str.to_owned()))?;

        let scheduler = if self.scheduler.is_empty() {
            "wrr".to_owned()
        } else {
            self.scheduler.to_ascii_lowercase()
        };
        vocab::validate_scheduler(&scheduler)
            .map_err(|e| CoreError::UnknownMethod(e.0))?;

        let flags = vocab::parse_flags(&self.flags).map_err(|e| CoreError::UnknownFlag(e.0))?;

        Ok(Service {
            key: ServiceKey {
                vip,
                port: self.port,
                protocol,
            },
            scheduler,
            flags,
            store_id: store_id.to_owned(),
        })
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
#[path = "service_tests.rs"]
mod tests;
