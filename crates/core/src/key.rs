use std::net::IpAddr;

use serde::{Deserialize, Serialize};

use crate::vocab::Protocol;

/// Identity of a virtual service inside the kernel: VIP, port, and
/// transport protocol. Two services with the same key are the same
/// kernel object regardless of scheduler or flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServiceKey {
    pub vip: IpAddr,
    pub port: u16,
    pub protocol: Protocol,
}

/// Identity of a backend inside a service: real-server IP and port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BackendKey {
    pub ip: IpAddr,
    pub port: u16,
}
