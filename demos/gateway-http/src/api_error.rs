//! Maps `filegate::Error` to the `{code, message}` envelope specification §7
//! assigns the outer HTTP layer ("The outer HTTP layer maps every exception
//! to `{code, message}`").

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

/// Wraps a [`filegate::Error`] so it can be returned directly from an Axum
/// handler and rendered as the `{code, message}` envelope.
pub struct ApiError(pub filegate::Error);

impl From<filegate::Error> for ApiError {
    fn from(err: filegate::Error) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = self.0.code();
        let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if !self.0.is_user_error() {
            tracing::error!(error = %self.0, code, "backend operation failed");
        }
        (status, Json(json!({ "code": code, "message": self.0.to_string() }))).into_response()
    }
}
