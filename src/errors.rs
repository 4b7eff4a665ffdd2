//! Unified error type for the pastry shop service.
//!
//! Every core operation returns [`Result`]. Variants are split the way callers
//! need to react to them: validation problems are reported before anything is
//! written, `ConcurrencyConflict` means "reload and retry", and
//! `OrderSaveFailed` hides the storage cause from the caller (it is logged).

use rust_decimal::Decimal;
use sea_orm::DbErr;
use thiserror::Error;

/// Application error type
#[derive(Debug, Error)]
pub enum Error {
    /// Settings file or environment could not be loaded
    #[error("Configuration error: {message}")]
    Config {
        /// What went wrong
        message: String,
    },

    /// Input rejected before any persistence attempt
    #[error("Validation error: {message}")]
    Validation {
        /// Human-readable reason
        message: String,
    },

    /// Amount that is negative, finer than a cent, too large or overflowing
    #[error("Invalid amount: {amount}")]
    InvalidAmount {
        /// The rejected amount
        amount: Decimal,
    },

    /// An order referenced a product that does not exist in the catalog
    #[error("Invalid product in order: {product_id}")]
    InvalidProduct {
        /// The unknown product id
        product_id: i64,
    },

    /// A row looked up by id does not exist
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Entity kind, e.g. "Order"
        entity: &'static str,
        /// The id that was looked up
        id: String,
    },

    /// The order changed between the caller's read and this write
    #[error("Order {order_id} was modified by someone else; reload and retry")]
    ConcurrencyConflict {
        /// The contested order
        order_id: i64,
    },

    /// The order could not be stored; nothing was written
    #[error("An error occurred while saving the order")]
    OrderSaveFailed,

    /// Row cannot be deleted while other rows reference it
    #[error("{entity} {id} is still referenced and cannot be deleted")]
    InUse {
        /// Entity kind
        entity: &'static str,
        /// The referenced id
        id: i64,
    },

    /// Unique value already taken
    #[error("Duplicate: {message}")]
    Duplicate {
        /// What collided
        message: String,
    },

    /// Name/password pair did not match an operator
    #[error("Invalid user name or password")]
    InvalidCredentials,

    /// Password hashing backend failure
    #[error("Password hashing error: {message}")]
    PasswordHash {
        /// Backend message
        message: String,
    },

    /// Database error from `SeaORM`
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Environment variable error
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),
}

impl Error {
    /// Shorthand for [`Error::NotFound`].
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Shorthand for [`Error::Validation`].
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
