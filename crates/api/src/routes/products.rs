//! Catalog route handlers, served through the product cache.

use axum::extract::{
    Path, Query, State,
    rejection::{PathRejection, QueryRejection},
};
use serde::Deserialize;
use tracing::instrument;

use cartwright_core::ProductId;

use super::response::ApiResponse;
use crate::error::Result;
use crate::models::{Page, Product};
use crate::state::AppState;

/// Query parameters for product listings.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<u32>,
    pub size: Option<u32>,
}

impl ListQuery {
    fn page(&self) -> Page {
        let default = Page::default();
        Page::new(
            self.page.unwrap_or(default.page),
            self.size.unwrap_or(default.size),
        )
    }
}

/// List products by ID.
///
/// GET /api/v1/products?page=&size=
#[instrument(skip(state, query))]
pub async fn index(
    State(state): State<AppState>,
    query: std::result::Result<Query<ListQuery>, QueryRejection>,
) -> Result<ApiResponse<Vec<Product>>> {
    let Query(query) = query?;
    let products = state.catalog().products(query.page()).await?;
    Ok(ApiResponse::ok(products))
}

/// Show a single product.
///
/// GET /api/v1/products/{product_id}
#[instrument(skip(state, path))]
pub async fn show(
    State(state): State<AppState>,
    path: std::result::Result<Path<ProductId>, PathRejection>,
) -> Result<ApiResponse<Product>> {
    let Path(product_id) = path?;
    let product = state.catalog().product(product_id).await?;
    Ok(ApiResponse::ok(product))
}
