//! Product entity - The shop catalog.
//!
//! A product is the single source of truth for its unit price. Order lines
//! copy the price when they are created and never follow later changes.
//! `stock` is informational only; orders do not reserve or decrement it.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Product database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    /// Unique identifier for the product
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Name of the product (e.g., "Tres leches cake")
    #[sea_orm(column_type = "String(StringLen::N(100))")]
    pub name: String,
    /// Current unit price
    #[sea_orm(column_type = "Double")]
    pub price: Decimal,
    /// Units on hand
    pub stock: i32,
    /// Reference to the product picture in the file store (e.g. `/images/x.png`)
    #[sea_orm(column_type = "String(StringLen::N(200))", nullable)]
    pub image_url: Option<String>,
    /// Optional category
    pub category_id: Option<i64>,
}

/// Defines relationships between Product and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each product optionally belongs to one category
    #[sea_orm(
        belongs_to = "super::category::Entity",
        from = "Column::CategoryId",
        to = "super::category::Column::Id",
        on_delete = "SetNull"
    )]
    Category,
    /// One product appears in many order lines
    #[sea_orm(has_many = "super::order_line::Entity")]
    OrderLines,
}

impl Related<super::category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl Related<super::order_line::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderLines.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
