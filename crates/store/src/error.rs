use thiserror::Error;

/// Failures reading or writing the durable desired-state store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store endpoints must share a scheme and path prefix, got `{0}` and `{1}`")]
    InconsistentEndpoints(String, String),

    #[error("no store endpoints configured")]
    NoEndpoints,

    #[error("unsupported store URL scheme `{0}`")]
    UnsupportedScheme(String),

    #[error("store connection failed: {0}")]
    Connection(String),

    #[error("failed to encode value for key `{0}`: {1}")]
    Encode(String, serde_json::Error),

    #[error("failed to decode value for key `{0}`: {1}")]
    Decode(String, serde_json::Error),

    #[error("backend call failed: {0}")]
    Backend(String),
}
