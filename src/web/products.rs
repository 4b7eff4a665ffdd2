//! Product API

use super::AppState;
use crate::{
    core::{
        Page,
        product::{self, ProductDetails, ProductInput},
    },
    entities::product::Model as Product,
    errors::{Error, Result},
};
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
};
use serde::Deserialize;

/// `?search=&page=`
#[derive(Debug, Default, Deserialize)]
struct ProductQuery {
    search: Option<String>,
    page: Option<u64>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/products", get(list).post(create))
        .route(
            "/api/products/{id}",
            get(get_by_id).put(update).delete(delete),
        )
}

/// GET /api/products - one page of the catalog, optionally filtered
async fn list(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> Result<Json<Page<ProductDetails>>> {
    let page = product::list_products(
        &state.db,
        query.search.as_deref(),
        query.page.unwrap_or(1),
        state.page_size,
    )
    .await?;
    Ok(Json(page))
}

/// POST /api/products
async fn create(
    State(state): State<AppState>,
    Json(input): Json<ProductInput>,
) -> Result<(StatusCode, Json<Product>)> {
    let created = product::create_product(&state.db, input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /api/products/{id} - product with its category
async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ProductDetails>> {
    product::get_product_details(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| Error::not_found("Product", id))
}

/// PUT /api/products/{id}
async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<ProductInput>,
) -> Result<Json<Product>> {
    Ok(Json(product::update_product(&state.db, id, input).await?))
}

/// DELETE /api/products/{id}
async fn delete(State(state): State<AppState>, Path(id): Path<i64>) -> Result<StatusCode> {
    product::delete_product(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
