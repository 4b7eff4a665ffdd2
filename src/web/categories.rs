//! Category API

use super::AppState;
use crate::{core::category, entities::category::Model as Category, errors::Result};
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct CategoryName {
    name: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/categories", get(list).post(create))
        .route("/api/categories/{id}", put(rename).delete(delete))
}

async fn list(State(state): State<AppState>) -> Result<Json<Vec<Category>>> {
    Ok(Json(category::list_categories(&state.db).await?))
}

async fn create(
    State(state): State<AppState>,
    Json(body): Json<CategoryName>,
) -> Result<(StatusCode, Json<Category>)> {
    let created = category::create_category(&state.db, &body.name).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn rename(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<CategoryName>,
) -> Result<Json<Category>> {
    Ok(Json(category::rename_category(&state.db, id, &body.name).await?))
}

/// Products in the category are kept and detached.
async fn delete(State(state): State<AppState>, Path(id): Path<i64>) -> Result<StatusCode> {
    category::delete_category(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
