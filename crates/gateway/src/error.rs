//! API error mapping.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// Handler-level error: everything unexpected becomes a JSON 500; handlers
/// that can 404 return `Result<_, ApiError>` and use [`ApiError::not_found`].
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: what.into(),
        }
    }
}

impl<E: Into<anyhow::Error>> From<E> for ApiError {
    fn from(err: E) -> Self {
        let err: anyhow::Error = err.into();
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(serde_json::json!({ "error": self.message })),
        )
            .into_response()
    }
}
