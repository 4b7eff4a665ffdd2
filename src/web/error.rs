//! HTTP mapping for [`Error`].
//!
//! Every error leaves the service as
//!
//! ```json
//! { "code": "concurrency_conflict", "message": "Order 7 was modified by someone else; reload and retry" }
//! ```
//!
//! | Status | Codes |
//! |--------|-------|
//! | 400 | `validation`, `invalid_amount`, `invalid_product` |
//! | 401 | `invalid_credentials` |
//! | 404 | `not_found` |
//! | 409 | `concurrency_conflict`, `in_use`, `duplicate` |
//! | 422 | `order_save_failed` |
//! | 500 | `internal` (cause is logged, never returned) |

use crate::errors::Error;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tracing::error;

/// JSON error body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Stable machine-readable code
    pub code: String,
    /// Human-readable message
    pub message: String,
}

impl Error {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Validation { .. } | Self::InvalidAmount { .. } | Self::InvalidProduct { .. } => {
                StatusCode::BAD_REQUEST
            }
            Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::ConcurrencyConflict { .. } | Self::InUse { .. } | Self::Duplicate { .. } => {
                StatusCode::CONFLICT
            }
            Self::OrderSaveFailed => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Config { .. }
            | Self::PasswordHash { .. }
            | Self::Database(_)
            | Self::Io(_)
            | Self::EnvVar(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable code sent in the error body.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation",
            Self::InvalidAmount { .. } => "invalid_amount",
            Self::InvalidProduct { .. } => "invalid_product",
            Self::InvalidCredentials => "invalid_credentials",
            Self::NotFound { .. } => "not_found",
            Self::ConcurrencyConflict { .. } => "concurrency_conflict",
            Self::InUse { .. } => "in_use",
            Self::Duplicate { .. } => "duplicate",
            Self::OrderSaveFailed => "order_save_failed",
            Self::Config { .. }
            | Self::PasswordHash { .. }
            | Self::Database(_)
            | Self::Io(_)
            | Self::EnvVar(_) => "internal",
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            error!(error = %self, "Request failed with internal error");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = ErrorBody {
            code: self.code().to_string(),
            message,
        };
        (status, Json(body)).into_response()
    }
}
