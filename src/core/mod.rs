//! Core business logic - framework-agnostic operations over the shop's data.
//!
//! Every function takes its database handle (connection or transaction) as an
//! explicit parameter and returns plain models or DTOs with related data
//! already resolved.

use serde::Serialize;

/// Authoritative product price lookup
pub mod catalog;
/// Product category operations
pub mod category;
/// Customer operations
pub mod customer;
/// Money bounds and checked arithmetic
pub mod money;
/// Order creation, queries and deletion
pub mod order;
/// Order edit reconciliation
pub mod order_edit;
/// Product catalog operations
pub mod product;
/// Sales volume reporting
pub mod report;
/// Operator accounts, roles and credentials
pub mod user;

/// One page of a paginated listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    /// Rows on this page
    pub items: Vec<T>,
    /// 1-based page number
    pub page: u64,
    /// Requested page size
    pub page_size: u64,
    /// Rows across all pages
    pub total_items: u64,
    /// Number of pages
    pub total_pages: u64,
}

/// Normalises an optional free-text field: trims it and turns blanks into `None`.
#[must_use]
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Builds a `LIKE` pattern matching `term` anywhere.
#[must_use]
pub fn like_pattern(term: &str) -> String {
    format!("%{}%", term.trim())
}
