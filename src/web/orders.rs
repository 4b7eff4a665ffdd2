//! Order API

use super::{AppState, PageQuery};
use crate::{
    core::{
        Page,
        order::{self, NewOrder, OrderDetails, OrderSummary},
        order_edit::{self, OrderEdit},
    },
    entities::order::Model as Order,
    errors::{Error, Result},
};
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
struct Created {
    id: i64,
}

#[derive(Debug, Default, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    term: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/orders", get(list).post(create))
        .route("/api/orders/search", get(search))
        .route(
            "/api/orders/{id}",
            get(get_by_id).put(edit).delete(delete),
        )
}

/// GET /api/orders - newest first
async fn list(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Page<OrderSummary>>> {
    let page = order::list_orders(&state.db, query.page.unwrap_or(1), state.page_size).await?;
    Ok(Json(page))
}

/// POST /api/orders - prices come from the catalog, never from the body
async fn create(
    State(state): State<AppState>,
    Json(request): Json<NewOrder>,
) -> Result<(StatusCode, Json<Created>)> {
    let id = order::create_order(&state.db, request).await?;
    Ok((StatusCode::CREATED, Json(Created { id })))
}

/// GET /api/orders/search?term=
async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<OrderSummary>>> {
    Ok(Json(order::search_orders(&state.db, &query.term).await?))
}

/// GET /api/orders/{id}
async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<OrderDetails>> {
    order::get_order_details(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| Error::not_found("Order", id))
}

/// PUT /api/orders/{id} - 409 when `version` is stale
async fn edit(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(changes): Json<OrderEdit>,
) -> Result<Json<Order>> {
    Ok(Json(order_edit::edit_order(&state.db, id, changes).await?))
}

/// DELETE /api/orders/{id}
async fn delete(State(state): State<AppState>, Path(id): Path<i64>) -> Result<StatusCode> {
    order::delete_order(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
