//! Errors surfaced by the HTTP layer

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::io;
use thiserror::Error;

use crate::websocket::HubError;

#[derive(Error, Debug)]
pub enum ApiError {
    /// The hub actor has exited; no viewer can be served
    #[error(transparent)]
    Hub(#[from] HubError),

    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("Server terminated: {0}")]
    Serve(#[source] io::Error),
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Hub(HubError::Closed) => (StatusCode::SERVICE_UNAVAILABLE, "hub_stopped"),
            ApiError::Bind { .. } | ApiError::Serve(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "server_error")
            }
        }
    }
}

/// JSON body of a failed request: `{"error": "hub_stopped", "message": "..."}`
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        if status.is_server_error() && status != StatusCode::SERVICE_UNAVAILABLE {
            tracing::error!(error_code = code, error = %self, "Request failed");
        } else {
            tracing::warn!(error_code = code, error = %self, "Request rejected");
        }

        let body = ErrorBody {
            error: code,
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stopped_hub_is_unavailable() {
        let response = ApiError::from(HubError::Closed).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "hub_stopped");
        assert_eq!(json["message"], "Connection hub is not running");
    }

    #[test]
    fn test_bind_failure_names_address() {
        let err = ApiError::Bind {
            addr: "0.0.0.0:8080".to_string(),
            source: io::Error::new(io::ErrorKind::AddrInUse, "address in use"),
        };
        assert_eq!(err.to_string(), "Failed to bind 0.0.0.0:8080: address in use");
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
