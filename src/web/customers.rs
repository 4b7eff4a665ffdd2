//! Customer API

use super::AppState;
use crate::{
    core::customer::{self, CustomerInput},
    entities::customer::Model as Customer,
    errors::{Error, Result},
};
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/customers", get(list).post(create))
        .route(
            "/api/customers/{id}",
            get(get_by_id).put(update).delete(delete),
        )
}

/// GET /api/customers
async fn list(State(state): State<AppState>) -> Result<Json<Vec<Customer>>> {
    Ok(Json(customer::list_customers(&state.db).await?))
}

/// POST /api/customers
async fn create(
    State(state): State<AppState>,
    Json(input): Json<CustomerInput>,
) -> Result<(StatusCode, Json<Customer>)> {
    let created = customer::create_customer(&state.db, input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /api/customers/{id}
async fn get_by_id(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<Customer>> {
    customer::get_customer_by_id(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| Error::not_found("Customer", id))
}

/// PUT /api/customers/{id}
async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<CustomerInput>,
) -> Result<Json<Customer>> {
    Ok(Json(customer::update_customer(&state.db, id, input).await?))
}

/// DELETE /api/customers/{id}
async fn delete(State(state): State<AppState>, Path(id): Path<i64>) -> Result<StatusCode> {
    customer::delete_customer(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
