//! Shared test utilities for the pastry shop.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test entities with sensible defaults.

use crate::{
    config::settings::{EMPLOYEE_ROLE, Settings},
    core::{
        customer::{self, CustomerInput},
        order::{self, LineRequest, NewOrder},
        product::{self, ProductInput},
        user::{self, UserAccount},
    },
    entities,
    errors::{Error, Result},
};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};

/// Creates an in-memory `SQLite` database with all tables initialized and
/// the default roles seeded.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    user::seed_roles(&db, &Settings::default().roles).await?;
    Ok(db)
}

/// Creates a customer with only a name.
pub async fn create_test_customer(
    db: &DatabaseConnection,
    name: &str,
) -> Result<entities::customer::Model> {
    customer::create_customer(
        db,
        CustomerInput {
            name: name.to_string(),
            ..Default::default()
        },
    )
    .await
}

/// Creates a product with a custom price.
///
/// # Defaults
/// * `stock`: 10
/// * `category_id`: None
pub async fn create_custom_product(
    db: &DatabaseConnection,
    name: &str,
    price: Decimal,
) -> Result<entities::product::Model> {
    product::create_product(
        db,
        ProductInput {
            name: name.to_string(),
            price,
            stock: 10,
            category_id: None,
            image_url: None,
        },
    )
    .await
}

/// Inserts an employee operator directly, skipping password hashing.
pub async fn create_test_user(db: &DatabaseConnection, name: &str) -> Result<UserAccount> {
    let role = user::find_role_by_name(db, EMPLOYEE_ROLE)
        .await?
        .ok_or_else(|| Error::not_found("Role", EMPLOYEE_ROLE))?;
    let model = entities::user::ActiveModel {
        name: Set(name.to_string()),
        password_hash: Set("not-a-real-hash".to_string()),
        role_id: Set(role.id),
        ..Default::default()
    }
    .insert(db)
    .await?;
    user::get_user_account(db, model.id)
        .await?
        .ok_or_else(|| Error::not_found("User", model.id))
}

/// Everything an order needs: one customer, one operator, two products.
pub struct OrderFixture {
    /// In-memory database
    pub db: DatabaseConnection,
    /// "Ana Torres"
    pub customer: entities::customer::Model,
    /// "maria", employee
    pub user: UserAccount,
    /// "Cake" at 12.50
    pub cake: entities::product::Model,
    /// "Bread" at 3.75
    pub bread: entities::product::Model,
}

impl OrderFixture {
    /// A request from the fixture customer and operator for `lines`.
    pub fn new_order(&self, lines: &[(i64, i32)]) -> NewOrder {
        NewOrder {
            customer_id: self.customer.id,
            user_id: self.user.id,
            date: None,
            deposit: None,
            estimated_date: None,
            status: None,
            lines: lines
                .iter()
                .map(|&(product_id, quantity)| LineRequest {
                    product_id,
                    quantity,
                })
                .collect(),
        }
    }
}

/// Sets up a database with a customer, an operator and two products.
pub async fn setup_order_fixture() -> Result<OrderFixture> {
    let db = setup_test_db().await?;
    let customer = create_test_customer(&db, "Ana Torres").await?;
    let user = create_test_user(&db, "maria").await?;
    let cake = create_custom_product(&db, "Cake", Decimal::new(1250, 2)).await?;
    let bread = create_custom_product(&db, "Bread", Decimal::new(375, 2)).await?;
    Ok(OrderFixture {
        db,
        customer,
        user,
        cake,
        bread,
    })
}

/// Creates an order for the fixture customer with `(product_id, quantity)` lines.
pub async fn create_test_order(fixture: &OrderFixture, lines: &[(i64, i32)]) -> Result<i64> {
    order::create_order(&fixture.db, fixture.new_order(lines)).await
}
