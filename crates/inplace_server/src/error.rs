//! HTTP error mapping for the save endpoint.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HttpError {
    /// The edit was refused; answered as an application-level `error` body.
    #[error("{title}: {message}")]
    Rejected { title: String, message: String },

    #[error("Not found")]
    NotFound,

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Internal server error")]
    Internal,
}

impl HttpError {
    pub fn rejected(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Rejected {
            title: title.into(),
            message: message.into(),
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        match self {
            HttpError::Rejected { title, message } => {
                tracing::info!("Rejected edit: {}: {}", title, message);
                let body = Json(json!({
                    "status": "error",
                    "title": title,
                    "message": message,
                }));
                (StatusCode::OK, body).into_response()
            }
            HttpError::NotFound => {
                (StatusCode::NOT_FOUND, Json(json!({ "error": "Not found" }))).into_response()
            }
            HttpError::MethodNotAllowed => {
                let body = Json(json!({
                    "status": "error",
                    "title": "Method Not Allowed",
                    "message": "Only POST requests are accepted",
                }));
                (StatusCode::METHOD_NOT_ALLOWED, body).into_response()
            }
            HttpError::Storage(ref err) => {
                tracing::error!("Storage error: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Storage error" })),
                )
                    .into_response()
            }
            HttpError::Internal => {
                tracing::error!("Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Internal server error" })),
                )
                    .into_response()
            }
        }
    }
}
