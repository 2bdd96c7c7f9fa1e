use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;
use thiserror::Error;

use state_pipeline::{AllocationError, ConfigError, PipelineError};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ConfigError> for ServerError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e.to_string())
    }
}

impl ServerError {
    /// HTTP status the error is reported with.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Pipeline(e) => match e {
                PipelineError::Parse(_) => StatusCode::BAD_REQUEST,
                PipelineError::NotFound(_) => StatusCode::NOT_FOUND,
                PipelineError::Store(s) | PipelineError::Allocation(AllocationError::Store(s))
                    if s.is_timeout() =>
                {
                    StatusCode::GATEWAY_TIMEOUT
                }
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Config(_) | Self::Io(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, %status, "request failed");
        } else {
            tracing::debug!(error = %self, %status, "request rejected");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

pub type ServerResult<T> = Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;
    use state_store::StoreError;
    use state_types::TypeError;
    use std::time::Duration;

    #[test]
    fn status_mapping() {
        let parse = ServerError::from(PipelineError::Parse(TypeError::NotAnObject("array")));
        assert_eq!(parse.status_code(), StatusCode::BAD_REQUEST);

        let missing = ServerError::from(PipelineError::NotFound("1".into()));
        assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);

        let timeout = ServerError::from(PipelineError::Store(StoreError::Timeout {
            operation: "get",
            bucket: "b".into(),
            key: "k".into(),
            elapsed: Duration::from_secs(5),
        }));
        assert_eq!(timeout.status_code(), StatusCode::GATEWAY_TIMEOUT);

        let exhausted =
            ServerError::from(PipelineError::Allocation(AllocationError::Exhausted { attempts: 3 }));
        assert_eq!(exhausted.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
