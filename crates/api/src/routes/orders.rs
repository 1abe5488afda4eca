//! Order and checkout route handlers.

use axum::{
    Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
};
use serde::Deserialize;
use tracing::instrument;

use cartwright_core::{AddressId, OrderId};

use super::response::ApiResponse;
use crate::error::{Result, add_breadcrumb};
use crate::middleware::CurrentUser;
use crate::models::{Order, OrderDetails, OrderPatch, PlacedOrder};
use crate::services::LineRequest;
use crate::state::AppState;

/// Request body for creating an order or checking out.
#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub address_id: AddressId,
    pub items: Vec<LineRequest>,
}

/// Create an order from an explicit line list, in a single attempt.
///
/// POST /api/v1/orders
#[instrument(skip(state, payload))]
pub async fn create(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    payload: std::result::Result<Json<CreateOrderRequest>, JsonRejection>,
) -> Result<(StatusCode, ApiResponse<PlacedOrder>)> {
    let Json(body) = payload?;
    let placed = state
        .orders()
        .create_order(user_id, body.address_id, &body.items)
        .await?;
    Ok((StatusCode::CREATED, ApiResponse::ok(placed)))
}

/// Create an order, retrying on concurrent-update conflicts.
///
/// POST /api/v1/checkout
#[instrument(skip(state, payload))]
pub async fn checkout(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    payload: std::result::Result<Json<CreateOrderRequest>, JsonRejection>,
) -> Result<(StatusCode, ApiResponse<PlacedOrder>)> {
    let Json(body) = payload?;
    let placed = state
        .orders()
        .checkout(user_id, body.address_id, &body.items)
        .await?;

    add_breadcrumb(
        "checkout",
        "Order placed",
        Some(&[("order_id", &placed.order_id.to_string())]),
    );
    Ok((StatusCode::CREATED, ApiResponse::ok(placed)))
}

/// Fetch one of the caller's orders.
///
/// GET /api/v1/orders/{order_id}
#[instrument(skip(state, path))]
pub async fn show(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    path: std::result::Result<Path<OrderId>, PathRejection>,
) -> Result<ApiResponse<OrderDetails>> {
    let Path(order_id) = path?;
    let details = state.orders().get_order(user_id, order_id).await?;
    Ok(ApiResponse::ok(details))
}

/// Update shipping fields or status of one of the caller's orders.
///
/// PATCH /api/v1/orders/{order_id}
#[instrument(skip(state, path, payload))]
pub async fn update(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    path: std::result::Result<Path<OrderId>, PathRejection>,
    payload: std::result::Result<Json<OrderPatch>, JsonRejection>,
) -> Result<ApiResponse<Order>> {
    let Path(order_id) = path?;
    let Json(patch) = payload?;
    let order = state
        .orders()
        .update_order(user_id, order_id, patch)
        .await?;
    Ok(ApiResponse::ok(order))
}
