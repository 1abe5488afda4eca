//! JSON response envelope.
//!
//! Every response body, success or error, has the same shape:
//!
//! ```json
//! { "code": 0, "message": "ok", "data": { ... } }
//! ```
//!
//! `code` is 0 on success and the HTTP status code otherwise.

use axum::{
    Json,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// Success code.
pub const CODE_OK: i32 = 0;

/// Unified API response body.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub code: i32,
    pub message: String,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// A successful response carrying `data`.
    pub fn ok(data: T) -> Self {
        Self {
            code: CODE_OK,
            message: "ok".to_string(),
            data: Some(data),
        }
    }

    /// A successful response with a custom message.
    pub fn ok_with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            code: CODE_OK,
            message: message.into(),
            data: Some(data),
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}
