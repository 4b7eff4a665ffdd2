//! Order business logic - building, persisting, reading and deleting orders.
//!
//! Creating an order is a three step workflow:
//! 1. [`build_order`] turns a [`NewOrder`] into a [`BuiltOrder`] using catalog
//!    prices only. Client requests carry no price at all.
//! 2. [`persist_order`] writes the header and every line in one transaction.
//! 3. [`create_order`] ties both together after checking the customer and
//!    operator exist.
//!
//! Reads return explicit DTOs ([`OrderDetails`], [`OrderSummary`]) with the
//! related rows already loaded.

use crate::{
    core::{
        Page,
        catalog::{self, PriceList},
        like_pattern, money,
        user::{UserAccount, get_user_account},
    },
    entities::{
        Customer, Order, OrderLine, OrderStatus, Product, User, customer, order, order_line,
        user,
    },
    errors::{Error, Result},
};
use sea_orm::{
    Condition, DatabaseTransaction, QueryOrder, QuerySelect, Set, TransactionTrait, prelude::*,
    sea_query::Expr,
};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use tracing::{error, info, instrument, warn};

/// One requested `(product, quantity)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct LineRequest {
    /// Product to sell
    pub product_id: i64,
    /// Units requested; entries with zero or negative quantity are ignored
    pub quantity: i32,
}

/// Desired shape of a new order.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewOrder {
    /// Customer placing the order
    pub customer_id: i64,
    /// Operator taking the order
    pub user_id: i64,
    /// Order day; today when absent
    #[serde(default)]
    pub date: Option<Date>,
    /// Amount paid up front
    #[serde(default)]
    pub deposit: Option<Decimal>,
    /// Promised delivery day
    #[serde(default)]
    pub estimated_date: Option<Date>,
    /// Initial status; `Pending` when absent or blank
    #[serde(default, deserialize_with = "deserialize_optional_status")]
    pub status: Option<OrderStatus>,
    /// Requested products
    pub lines: Vec<LineRequest>,
}

/// An order computed in memory, ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltOrder {
    /// Customer placing the order
    pub customer_id: i64,
    /// Operator taking the order
    pub user_id: i64,
    /// Order day
    pub date: Date,
    /// Initial status
    pub status: OrderStatus,
    /// Amount paid up front
    pub deposit: Option<Decimal>,
    /// Promised delivery day
    pub estimated_date: Option<Date>,
    /// Sum of the line subtotals
    pub total: Decimal,
    /// Lines in request order
    pub lines: Vec<BuiltLine>,
}

/// A line with its captured price and subtotal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuiltLine {
    /// Product sold
    pub product_id: i64,
    /// Units, at least 1
    pub quantity: i32,
    /// Catalog price at build time
    pub unit_price: Decimal,
    /// `quantity * unit_price`
    pub subtotal: Decimal,
}

/// A line together with the name of its product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderLineDetails {
    /// The stored line
    #[serde(flatten)]
    pub line: order_line::Model,
    /// Product name at read time
    pub product_name: String,
}

/// An order with customer, operator and lines resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderDetails {
    /// The order header
    #[serde(flatten)]
    pub order: order::Model,
    /// Who placed it
    pub customer: customer::Model,
    /// Who took it
    pub user: UserAccount,
    /// Its lines, oldest first
    pub lines: Vec<OrderLineDetails>,
}

/// Compact row for order listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderSummary {
    /// The order header
    #[serde(flatten)]
    pub order: order::Model,
    /// Customer name
    pub customer_name: String,
    /// Operator name
    pub user_name: String,
    /// Number of lines
    pub line_count: u64,
}

/// Accepts a missing, null or blank status as "not given".
pub(crate) fn deserialize_optional_status<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<OrderStatus>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

/// Today's date in local time, the default order date.
#[must_use]
pub fn today() -> Date {
    chrono::Local::now().date_naive()
}

/// Keeps the requests with a positive quantity.
///
/// # Errors
/// `Validation` when nothing is left.
pub fn requested_lines(lines: &[LineRequest]) -> Result<Vec<LineRequest>> {
    let kept: Vec<LineRequest> = lines.iter().copied().filter(|l| l.quantity > 0).collect();
    if kept.is_empty() {
        return Err(Error::validation("At least one product is required"));
    }
    Ok(kept)
}

/// Rejects deposits that are negative, finer than a cent or above
/// [`money::MAX_AMOUNT`].
pub fn validate_deposit(deposit: Option<Decimal>) -> Result<()> {
    deposit.map_or(Ok(()), money::validate_amount)
}

/// Builds the in-memory order graph from a request and catalog prices.
///
/// Prices come exclusively from `prices`; a requested product missing from it
/// aborts the whole build with `InvalidProduct`.
pub fn build_order(request: &NewOrder, prices: &PriceList, today: Date) -> Result<BuiltOrder> {
    validate_deposit(request.deposit)?;
    let requested = requested_lines(&request.lines)?;

    let lines = requested
        .iter()
        .map(|line| {
            let unit_price = catalog::price_of(prices, line.product_id)?;
            Ok(BuiltLine {
                product_id: line.product_id,
                quantity: line.quantity,
                unit_price,
                subtotal: money::line_subtotal(unit_price, line.quantity)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let total = money::sum_amounts(lines.iter().map(|l| l.subtotal))?;

    Ok(BuiltOrder {
        customer_id: request.customer_id,
        user_id: request.user_id,
        date: request.date.unwrap_or(today),
        status: request.status.unwrap_or_default(),
        deposit: request.deposit,
        estimated_date: request.estimated_date,
        total,
        lines,
    })
}

/// Checks that the customer and operator referenced by an order exist.
pub async fn ensure_parties_exist<C>(db: &C, customer_id: i64, user_id: i64) -> Result<()>
where
    C: ConnectionTrait,
{
    if Customer::find_by_id(customer_id).one(db).await?.is_none() {
        return Err(Error::validation(format!(
            "Customer {customer_id} does not exist"
        )));
    }
    if User::find_by_id(user_id).one(db).await?.is_none() {
        return Err(Error::validation(format!("User {user_id} does not exist")));
    }
    Ok(())
}

/// Validates, prices, builds and persists a new order. Returns its id.
#[instrument(skip(db, request), fields(customer_id = request.customer_id, user_id = request.user_id))]
pub async fn create_order(db: &DatabaseConnection, request: NewOrder) -> Result<i64> {
    let requested = requested_lines(&request.lines)?;
    validate_deposit(request.deposit)?;
    ensure_parties_exist(db, request.customer_id, request.user_id).await?;

    let product_ids: Vec<i64> = requested.iter().map(|l| l.product_id).collect();
    let prices = catalog::fetch_unit_prices(db, &product_ids).await?;
    let built = build_order(&request, &prices, today())?;

    persist_order(db, built).await
}

pub(crate) fn save_failed(cause: &DbErr) -> Error {
    error!(error = %cause, "Order save failed, transaction rolled back");
    Error::OrderSaveFailed
}

async fn write_order(txn: &DatabaseTransaction, built: &BuiltOrder) -> std::result::Result<i64, DbErr> {
    let header = order::ActiveModel {
        date: Set(built.date),
        status: Set(built.status),
        total: Set(built.total),
        deposit: Set(built.deposit),
        estimated_date: Set(built.estimated_date),
        customer_id: Set(built.customer_id),
        user_id: Set(built.user_id),
        version: Set(0),
        ..Default::default()
    }
    .insert(txn)
    .await?;

    let lines = built.lines.iter().map(|line| order_line::ActiveModel {
        order_id: Set(header.id),
        product_id: Set(line.product_id),
        quantity: Set(line.quantity),
        unit_price: Set(line.unit_price),
        subtotal: Set(line.subtotal),
        ..Default::default()
    });
    OrderLine::insert_many(lines).exec(txn).await?;

    Ok(header.id)
}

/// Writes a built order atomically and returns the new order id.
///
/// Either the header and all of its lines become visible together, or
/// nothing does. Any storage failure is logged and reported as
/// [`Error::OrderSaveFailed`].
pub async fn persist_order(db: &DatabaseConnection, built: BuiltOrder) -> Result<i64> {
    let txn = db.begin().await.map_err(|e| save_failed(&e))?;

    match write_order(&txn, &built).await {
        Ok(order_id) => {
            txn.commit().await.map_err(|e| save_failed(&e))?;
            info!(
                order_id,
                lines = built.lines.len(),
                total = %built.total,
                "Order created"
            );
            Ok(order_id)
        }
        Err(e) => {
            if let Err(rollback) = txn.rollback().await {
                warn!(error = %rollback, "Rollback after failed order save also failed");
            }
            Err(save_failed(&e))
        }
    }
}

/// Loads an order with its customer, operator and lines.
pub async fn get_order_details<C>(db: &C, order_id: i64) -> Result<Option<OrderDetails>>
where
    C: ConnectionTrait,
{
    let Some(order) = Order::find_by_id(order_id).one(db).await? else {
        return Ok(None);
    };

    let customer = Customer::find_by_id(order.customer_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Customer", order.customer_id))?;
    let user = get_user_account(db, order.user_id)
        .await?
        .ok_or_else(|| Error::not_found("User", order.user_id))?;

    let lines = OrderLine::find()
        .filter(order_line::Column::OrderId.eq(order_id))
        .order_by_asc(order_line::Column::Id)
        .find_also_related(Product)
        .all(db)
        .await?
        .into_iter()
        .map(|(line, product)| OrderLineDetails {
            line,
            product_name: product.map(|p| p.name).unwrap_or_default(),
        })
        .collect();

    Ok(Some(OrderDetails {
        order,
        customer,
        user,
        lines,
    }))
}

async fn summarize(db: &DatabaseConnection, orders: Vec<order::Model>) -> Result<Vec<OrderSummary>> {
    if orders.is_empty() {
        return Ok(Vec::new());
    }

    let order_ids: Vec<i64> = orders.iter().map(|o| o.id).collect();
    let customer_ids: Vec<i64> = orders.iter().map(|o| o.customer_id).collect();
    let user_ids: Vec<i64> = orders.iter().map(|o| o.user_id).collect();

    let customers: HashMap<i64, String> = Customer::find()
        .filter(customer::Column::Id.is_in(customer_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|c| (c.id, c.name))
        .collect();
    let users: HashMap<i64, String> = User::find()
        .filter(user::Column::Id.is_in(user_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|u| (u.id, u.name))
        .collect();
    let line_counts: HashMap<i64, i64> = OrderLine::find()
        .select_only()
        .column(order_line::Column::OrderId)
        .column_as(Expr::col(order_line::Column::Id).count(), "line_count")
        .filter(order_line::Column::OrderId.is_in(order_ids))
        .group_by(order_line::Column::OrderId)
        .into_tuple::<(i64, i64)>()
        .all(db)
        .await?
        .into_iter()
        .collect();

    Ok(orders
        .into_iter()
        .map(|order| OrderSummary {
            customer_name: customers.get(&order.customer_id).cloned().unwrap_or_default(),
            user_name: users.get(&order.user_id).cloned().unwrap_or_default(),
            line_count: line_counts
                .get(&order.id)
                .map_or(0, |&n| u64::try_from(n).unwrap_or_default()),
            order,
        })
        .collect())
}

/// Lists orders newest first, one page at a time. `page` is 1-based.
pub async fn list_orders(
    db: &DatabaseConnection,
    page: u64,
    page_size: u64,
) -> Result<Page<OrderSummary>> {
    let page = page.max(1);
    let paginator = Order::find()
        .order_by_desc(order::Column::Date)
        .order_by_desc(order::Column::Id)
        .paginate(db, page_size);

    let totals = paginator.num_items_and_pages().await?;
    let orders = paginator.fetch_page(page - 1).await?;

    Ok(Page {
        items: summarize(db, orders).await?,
        page,
        page_size,
        total_items: totals.number_of_items,
        total_pages: totals.number_of_pages,
    })
}

/// Finds orders whose customer name, operator name or status contains `term`.
///
/// Oldest first. A blank term returns every order.
pub async fn search_orders(db: &DatabaseConnection, term: &str) -> Result<Vec<OrderSummary>> {
    let mut query = Order::find()
        .inner_join(Customer)
        .inner_join(User)
        .order_by_asc(order::Column::Date)
        .order_by_asc(order::Column::Id);

    if !term.trim().is_empty() {
        let pattern = like_pattern(term);
        query = query.filter(
            Condition::any()
                .add(customer::Column::Name.like(pattern.as_str()))
                .add(user::Column::Name.like(pattern.as_str()))
                .add(order::Column::Status.like(pattern.as_str())),
        );
    }

    let orders = query.all(db).await?;
    summarize(db, orders).await
}

/// Deletes an order and all of its lines in one transaction.
#[instrument(skip(db))]
pub async fn delete_order(db: &DatabaseConnection, order_id: i64) -> Result<()> {
    let txn = db.begin().await.map_err(|e| save_failed(&e))?;

    if Order::find_by_id(order_id).one(&txn).await?.is_none() {
        return Err(Error::not_found("Order", order_id));
    }

    let lines = OrderLine::delete_many()
        .filter(order_line::Column::OrderId.eq(order_id))
        .exec(&txn)
        .await?;
    Order::delete_by_id(order_id).exec(&txn).await?;

    txn.commit().await.map_err(|e| save_failed(&e))?;
    info!(order_id, lines = lines.rows_affected, "Order deleted");
    Ok(())
}
