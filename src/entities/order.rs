//! Order entity - A customer purchase with its status, money totals and dates.
//!
//! The order header exclusively owns its [`super::order_line`] rows. `total`
//! is derived from the lines and `version` is bumped by every edit so that
//! concurrent edits can be detected.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Order status. Any status may be set from any other.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Taken, not started
    #[default]
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Being prepared
    #[sea_orm(string_value = "in_progress")]
    InProgress,
    /// Delivered to the customer
    #[sea_orm(string_value = "finished")]
    Finished,
    /// Voided
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl OrderStatus {
    /// Stable identifier, identical to the stored value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Finished => "finished",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
            "pending" => Ok(Self::Pending),
            "in_progress" => Ok(Self::InProgress),
            "finished" => Ok(Self::Finished),
            "cancelled" | "canceled" => Ok(Self::Cancelled),
            other => Err(format!("unknown order status '{other}'")),
        }
    }
}

/// Order database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    /// Unique identifier for the order
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Day the order was placed
    pub date: Date,
    /// Current status
    pub status: OrderStatus,
    /// Sum of all line subtotals
    #[sea_orm(column_type = "Double")]
    pub total: Decimal,
    /// Amount paid up front, if any
    #[sea_orm(column_type = "Double", nullable)]
    pub deposit: Option<Decimal>,
    /// Promised delivery day
    pub estimated_date: Option<Date>,
    /// Customer who placed the order
    pub customer_id: i64,
    /// Operator who took the order
    pub user_id: i64,
    /// Optimistic concurrency counter, incremented by every edit
    pub version: i32,
}

/// Defines relationships between Order and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each order belongs to one customer
    #[sea_orm(
        belongs_to = "super::customer::Entity",
        from = "Column::CustomerId",
        to = "super::customer::Column::Id"
    )]
    Customer,
    /// Each order was taken by one operator
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
    /// One order owns many lines
    #[sea_orm(has_many = "super::order_line::Entity")]
    OrderLines,
}

impl Related<super::customer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Customer.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::order_line::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderLines.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use sea_orm::Iterable;

    #[test]
    fn test_status_parses_loose_spellings() {
        assert_eq!("Pending".parse::<OrderStatus>().unwrap(), OrderStatus::Pending);
        assert_eq!(
            "in progress".parse::<OrderStatus>().unwrap(),
            OrderStatus::InProgress
        );
        assert_eq!(
            "In-Progress".parse::<OrderStatus>().unwrap(),
            OrderStatus::InProgress
        );
        assert_eq!(
            " finished ".parse::<OrderStatus>().unwrap(),
            OrderStatus::Finished
        );
        assert_eq!(
            "canceled".parse::<OrderStatus>().unwrap(),
            OrderStatus::Cancelled
        );
        assert!("shipped".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_status_display_matches_stored_value() {
        for status in OrderStatus::iter() {
            assert_eq!(status.to_string(), status.to_value());
        }
    }
}
