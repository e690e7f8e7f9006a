//! Error-to-HTTP response conversion.
//!
//! Handlers return `Result<_, AppError>`; every failure leaves the server as a
//! JSON body of the form `{"detail": .., "code": .., "request_id": ..}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use stillcast_common::Error;

/// Wrapper so we can implement `IntoResponse` for the shared error type.
#[derive(Debug)]
pub struct AppError {
    inner: Error,
    request_id: Option<String>,
}

impl AppError {
    pub fn new(inner: Error) -> Self {
        Self {
            inner,
            request_id: None,
        }
    }

    pub fn with_request_id(mut self, id: String) -> Self {
        self.request_id = Some(id);
        self
    }
}

impl From<Error> for AppError {
    fn from(e: Error) -> Self {
        Self::new(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.inner.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!(
                status = %status,
                error = %self.inner,
                "Server error in API handler"
            );
        } else {
            tracing::debug!(status = %status, error = %self.inner, "Request rejected");
        }

        // Transcoder failures are reported the way the tool printed them;
        // everything else carries the full error text.
        let detail = match &self.inner {
            Error::Validation(msg) | Error::PayloadTooLarge(msg) => msg.clone(),
            other => other.to_string(),
        };

        let body = json!({
            "detail": detail,
            "code": self.inner.code(),
            "request_id": self.request_id,
        });

        (status, axum::Json(body)).into_response()
    }
}
