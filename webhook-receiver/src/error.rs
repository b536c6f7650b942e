use axum::{
    extract::rejection::BytesRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Request-level failures reported back to the webhook sender.
#[derive(Debug, Error)]
pub enum ReceiverError {
    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("{0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("{message}")]
    Body { status: StatusCode, message: String },
}

impl ReceiverError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ReceiverError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ReceiverError::InvalidJson(_) => StatusCode::BAD_REQUEST,
            ReceiverError::Body { status, .. } => *status,
        }
    }
}

impl From<BytesRejection> for ReceiverError {
    fn from(rejection: BytesRejection) -> Self {
        ReceiverError::Body {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ReceiverError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorBody {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
