use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use ipvsd_core::CoreError;
use ipvsd_kernel::KernelError;
use ipvsd_store::StoreError;

/// Daemon-level error wrapping the three crate-local error enums,
/// mapped to an HTTP status at the REST boundary.
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("object `{0}` already exists")]
    ObjectExists(String),

    #[error("object `{0}` not found")]
    ObjectNotFound(String),

    #[error("kernel call failed: {0}")]
    Kernel(#[from] KernelError),

    #[error("store call failed: {0}")]
    Store(#[from] StoreError),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl DaemonError {
    fn status(&self) -> StatusCode {
        match self {
            DaemonError::Core(CoreError::MalformedRequest(_))
            | DaemonError::Core(CoreError::UnknownProtocol(_))
            | DaemonError::Core(CoreError::UnknownMethod(_))
            | DaemonError::Core(CoreError::UnknownFlag(_))
            | DaemonError::Core(CoreError::IncompatibleAddressFamily(_)) => StatusCode::BAD_REQUEST,
            DaemonError::Core(CoreError::Rekey) => StatusCode::CONFLICT,
            DaemonError::Core(CoreError::ObjectExists(_)) | DaemonError::ObjectExists(_) => {
                StatusCode::CONFLICT
            }
            DaemonError::Core(CoreError::ObjectNotFound(_)) | DaemonError::ObjectNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            DaemonError::Kernel(_) | DaemonError::Store(_) | DaemonError::Config(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for DaemonError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "request failed");
        }
        (
            status,
            Json(ErrorBody {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}
