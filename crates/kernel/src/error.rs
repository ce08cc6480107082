use thiserror::Error;

/// Failures talking to the in-kernel IPVS table, whether over the real
/// netlink transport or the in-memory mock used by tests.
#[derive(Debug, Error)]
pub enum KernelError {
    #[error("netlink transport error: {0}")]
    Transport(String),

    #[error("IPVS generic netlink family is not registered with this kernel")]
    FamilyNotFound,

    #[error("kernel rejected the request: {0}")]
    Rejected(String),

    #[error("service {0:?} not found in the kernel table")]
    ServiceNotFound(ipvsd_core::ServiceKey),

    #[error("backend {0:?} not found in service {1:?}")]
    BackendNotFound(ipvsd_core::BackendKey, ipvsd_core::ServiceKey),

    #[error("service {0:?} already exists in the kernel table")]
    ServiceExists(ipvsd_core::ServiceKey),
}
