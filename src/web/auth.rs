//! Operator registration, login and listing

use super::AppState;
use crate::{
    core::user::{self, NewUser, UserAccount},
    errors::Result,
};
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct Credentials {
    name: String,
    password: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/users", get(list))
        .route("/api/users/{id}", delete(remove))
}

/// POST /api/auth/register
async fn register(
    State(state): State<AppState>,
    Json(new_user): Json<NewUser>,
) -> Result<(StatusCode, Json<UserAccount>)> {
    let account = user::register_user(&state.db, new_user).await?;
    Ok((StatusCode::CREATED, Json(account)))
}

/// POST /api/auth/login - answers with the account on success, 401 otherwise
async fn login(
    State(state): State<AppState>,
    Json(credentials): Json<Credentials>,
) -> Result<Json<UserAccount>> {
    let account = user::login(&state.db, &credentials.name, &credentials.password).await?;
    Ok(Json(account))
}

/// GET /api/users
async fn list(State(state): State<AppState>) -> Result<Json<Vec<UserAccount>>> {
    Ok(Json(user::list_users(&state.db).await?))
}

/// DELETE /api/users/{id} - refused while the operator has orders
async fn remove(State(state): State<AppState>, Path(id): Path<i64>) -> Result<StatusCode> {
    user::delete_user(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
