//! Cart route handlers.
//!
//! Adding an item reserves stock immediately. Removing a single item returns
//! its units to stock; emptying the whole cart does not.

use axum::{
    Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use cartwright_core::ProductId;

use super::response::ApiResponse;
use crate::error::{Result, add_breadcrumb};
use crate::middleware::CurrentUser;
use crate::models::CartLine;
use crate::state::AppState;

/// Request body for adding to the cart.
#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub product_id: ProductId,
    pub quantity: i64,
}

/// Response body for emptying the cart.
#[derive(Debug, Serialize)]
pub struct EmptiedCart {
    pub removed: u64,
}

/// Establish the caller's cart.
///
/// POST /api/v1/cart
#[instrument(skip(state))]
pub async fn create(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> ApiResponse<()> {
    state.cart().create_cart(user_id);
    ApiResponse::ok_with_message((), "cart ready")
}

/// List the caller's cart lines.
///
/// GET /api/v1/cart
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<ApiResponse<Vec<CartLine>>> {
    let lines = state.cart().get_cart(user_id).await?;
    Ok(ApiResponse::ok(lines))
}

/// Delete every line in the caller's cart.
///
/// DELETE /api/v1/cart
#[instrument(skip(state))]
pub async fn empty(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<ApiResponse<EmptiedCart>> {
    let removed = state.cart().empty_cart(user_id).await?;
    Ok(ApiResponse::ok(EmptiedCart { removed }))
}

/// Add units of a product to the caller's cart.
///
/// POST /api/v1/cart/items
#[instrument(skip(state, payload))]
pub async fn add_item(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    payload: std::result::Result<Json<AddItemRequest>, JsonRejection>,
) -> Result<ApiResponse<CartLine>> {
    let Json(body) = payload?;

    let line = state
        .cart()
        .add_item(user_id, body.product_id, body.quantity)
        .await?;

    add_breadcrumb(
        "cart",
        "Added item",
        Some(&[("product_id", &body.product_id.to_string())]),
    );
    Ok(ApiResponse::ok(line))
}

/// Remove a product from the caller's cart and release its units.
///
/// DELETE /api/v1/cart/items/{product_id}
#[instrument(skip(state, path))]
pub async fn remove_item(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    path: std::result::Result<Path<ProductId>, PathRejection>,
) -> Result<ApiResponse<CartLine>> {
    let Path(product_id) = path?;
    let line = state.cart().remove_item(user_id, product_id).await?;
    Ok(ApiResponse::ok(line))
}
