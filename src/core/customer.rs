//! Customer business logic - create, read, update and delete customers.

use crate::{
    core::non_blank,
    entities::{Customer, Order, customer, order},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*};
use serde::Deserialize;

/// Fields accepted when creating or updating a customer.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CustomerInput {
    /// Full name, required
    pub name: String,
    /// Optional phone number
    pub phone: Option<String>,
    /// Optional email address
    pub email: Option<String>,
}

impl CustomerInput {
    fn normalized(self) -> Result<(String, Option<String>, Option<String>)> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(Error::validation("Customer name cannot be empty"));
        }
        Ok((name, non_blank(self.phone), non_blank(self.email)))
    }
}

/// Creates a customer after trimming its fields; blank optional fields are stored as null.
pub async fn create_customer(db: &DatabaseConnection, input: CustomerInput) -> Result<customer::Model> {
    let (name, phone, email) = input.normalized()?;

    let customer = customer::ActiveModel {
        name: Set(name),
        phone: Set(phone),
        email: Set(email),
        ..Default::default()
    };
    customer.insert(db).await.map_err(Into::into)
}

/// Retrieves a customer by id.
pub async fn get_customer_by_id<C>(db: &C, customer_id: i64) -> Result<Option<customer::Model>>
where
    C: ConnectionTrait,
{
    Customer::find_by_id(customer_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Lists all customers alphabetically.
pub async fn list_customers(db: &DatabaseConnection) -> Result<Vec<customer::Model>> {
    Customer::find()
        .order_by_asc(customer::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Replaces a customer's contact data.
pub async fn update_customer(
    db: &DatabaseConnection,
    customer_id: i64,
    input: CustomerInput,
) -> Result<customer::Model> {
    let (name, phone, email) = input.normalized()?;

    let mut customer: customer::ActiveModel = get_customer_by_id(db, customer_id)
        .await?
        .ok_or_else(|| Error::not_found("Customer", customer_id))?
        .into();

    customer.name = Set(name);
    customer.phone = Set(phone);
    customer.email = Set(email);
    customer.update(db).await.map_err(Into::into)
}

/// Deletes a customer that has no orders.
pub async fn delete_customer(db: &DatabaseConnection, customer_id: i64) -> Result<()> {
    let customer = get_customer_by_id(db, customer_id)
        .await?
        .ok_or_else(|| Error::not_found("Customer", customer_id))?;

    let orders = Order::find()
        .filter(order::Column::CustomerId.eq(customer_id))
        .count(db)
        .await?;
    if orders > 0 {
        return Err(Error::InUse {
            entity: "Customer",
            id: customer_id,
        });
    }

    customer.delete(db).await?;
    Ok(())
}
