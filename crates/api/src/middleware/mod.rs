//! HTTP middleware and extractors.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, HTTP transaction)
//! 2. `TraceLayer` (`http_request` span with `request_id` and `user_id` fields)
//! 3. Request ID (propagate or generate `x-request-id`)
//! 4. `TimeoutLayer` (request deadline, 408 on expiry)
//!
//! Caller identity is an extractor rather than a layer: handlers that need
//! it take a [`CurrentUser`] argument.

pub mod identity;
pub mod request_id;

pub use identity::{CurrentUser, USER_ID_HEADER};
pub use request_id::{REQUEST_ID_HEADER, RequestId, request_id_middleware};
