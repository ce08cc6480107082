use thiserror::Error;

/// Validation and lookup failures raised while filling in or comparing
/// [`crate::Service`]/[`crate::Backend`] options. Every variant maps to a
/// fixed HTTP status at the REST boundary; callers outside the daemon only
/// need the enum.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("malformed request: {0}")]
    MalformedRequest(String),

    #[error("specified protocol `{0}` is unknown")]
    UnknownProtocol(String),

    #[error("specified forwarding method `{0}` is unknown")]
    UnknownMethod(String),

    #[error("specified flag `{0}` is unknown")]
    UnknownFlag(String),

    #[error("object `{0}` already exists")]
    ObjectExists(String),

    #[error("object `{0}` not found")]
    ObjectNotFound(String),

    #[error("service key is immutable: cannot change host/port/protocol on update")]
    Rekey,

    #[error("backend address family does not match service `{0}`")]
    IncompatibleAddressFamily(String),
}
