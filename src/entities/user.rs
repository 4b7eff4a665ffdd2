//! User entity - Staff accounts (operators) that create and manage orders.

use sea_orm::entity::prelude::*;
use serde::Deserialize;

/// Operator database model.
///
/// Not `Serialize`: the password hash must never leave the service. Use
/// [`crate::core::user::UserAccount`] for anything sent to a client.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// Unique identifier for the operator
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Login name, unique
    #[sea_orm(unique, column_type = "String(StringLen::N(100))")]
    pub name: String,
    /// Argon2 PHC-format password hash
    #[sea_orm(column_type = "String(StringLen::N(200))")]
    pub password_hash: String,
    /// Role this operator belongs to
    pub role_id: i64,
}

/// Defines relationships between User and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each user holds one role
    #[sea_orm(
        belongs_to = "super::role::Entity",
        from = "Column::RoleId",
        to = "super::role::Column::Id"
    )]
    Role,
    /// One user creates many orders
    #[sea_orm(has_many = "super::order::Entity")]
    Orders,
}

impl Related<super::role::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Role.def()
    }
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Orders.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
