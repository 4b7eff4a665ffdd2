//! Report API

use super::AppState;
use crate::{
    core::report::{self, Granularity},
    errors::{Error, Result},
};
use axum::{
    Json, Router,
    extract::{Query, State},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;

/// `?period=day|month&format=json|text`
#[derive(Debug, Default, Deserialize)]
struct SalesVolumeQuery {
    period: Option<String>,
    format: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/api/reports/sales-volume", get(sales_volume))
}

/// GET /api/reports/sales-volume
async fn sales_volume(
    State(state): State<AppState>,
    Query(query): Query<SalesVolumeQuery>,
) -> Result<Response> {
    let granularity = match query.period.as_deref() {
        Some(period) => period.parse()?,
        None => Granularity::default(),
    };
    let rows = report::sales_volume(&state.db, granularity).await?;

    match query.format.as_deref().map(str::trim) {
        None | Some("" | "json") => Ok(Json(rows).into_response()),
        Some("text") => Ok(report::format_sales_volume(&rows, granularity).into_response()),
        Some(other) => Err(Error::validation(format!(
            "Unknown report format '{other}', expected 'json' or 'text'"
        ))),
    }
}
