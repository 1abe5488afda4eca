//! Caller identity extractor.
//!
//! Authentication happens upstream. The gateway forwards the authenticated
//! user's numeric ID in `x-user-id`; requests without a valid ID are
//! rejected with 401.

use axum::{extract::FromRequestParts, http::request::Parts};
use tracing::Span;

use cartwright_core::UserId;

use crate::error::{AppError, set_sentry_user};

/// The HTTP header carrying the authenticated user ID.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Extractor that requires an authenticated caller.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(CurrentUser(user_id): CurrentUser) -> impl IntoResponse {
///     format!("Hello, user {user_id}!")
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser(pub UserId);

fn parse_user_id(raw: &str) -> Option<UserId> {
    raw.trim()
        .parse::<i32>()
        .ok()
        .filter(|id| *id > 0)
        .map(UserId::new)
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(USER_ID_HEADER)
            .ok_or_else(|| AppError::Unauthorized(format!("missing {USER_ID_HEADER} header")))?;

        let user_id = header
            .to_str()
            .ok()
            .and_then(parse_user_id)
            .ok_or_else(|| AppError::Unauthorized(format!("invalid {USER_ID_HEADER} header")))?;

        Span::current().record("user_id", user_id.as_i32());
        set_sentry_user(user_id);

        Ok(Self(user_id))
    }
}
