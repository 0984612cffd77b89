use axum::{
    Json,
    extract::{Path, State},
};
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::models::Product;

use crate::api::run_blocking;
use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::utils::{ApiResponse, AppResult};

#[derive(Debug, Deserialize)]
pub struct ProductInput {
    pub name: String,
    pub price: Decimal,
    pub stock: i64,
    #[serde(default)]
    pub image: Option<String>,
}

/// Create or replace a product
pub async fn upsert(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(payload): Json<ProductInput>,
) -> AppResult<ApiResponse<Product>> {
    let mut product = Product::new(id, payload.name, payload.price, payload.stock);
    product.image = payload.image;
    let product = run_blocking(&state, move |m| m.upsert_product(product, &user)).await?;
    Ok(ApiResponse::success(product))
}
