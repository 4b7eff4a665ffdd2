//! Order edits - reconciling an order's persisted lines with a desired set.
//!
//! An edit carries the `version` the caller last saw. The whole edit runs in
//! one transaction and the header is written with a conditional update on
//! that version, so two operators editing the same order cannot silently
//! overwrite each other: the loser gets [`Error::ConcurrencyConflict`].

use crate::{
    core::{
        catalog::{self, PriceList},
        money,
        order::{deserialize_optional_status, ensure_parties_exist, save_failed, validate_deposit},
    },
    entities::{Order, OrderLine, OrderStatus, order, order_line},
    errors::{Error, Result},
};
use sea_orm::{DatabaseTransaction, QueryOrder, Set, TransactionTrait, prelude::*};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use tracing::{error, info, instrument, warn};

/// A line as the caller wants it after the edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct DesiredLine {
    /// Existing line id, or `None` for a new line
    #[serde(default)]
    pub id: Option<i64>,
    /// Product to sell
    pub product_id: i64,
    /// Units, at least 1
    pub quantity: i32,
}

/// Requested changes to an order.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OrderEdit {
    /// Version the caller loaded
    pub version: i32,
    /// Customer placing the order
    pub customer_id: i64,
    /// Operator responsible for the order
    pub user_id: i64,
    /// New status; keeps the current one when absent
    #[serde(default, deserialize_with = "deserialize_optional_status")]
    pub status: Option<OrderStatus>,
    /// New order day; keeps the current one when absent
    #[serde(default)]
    pub date: Option<Date>,
    /// New deposit; keeps the current one when absent
    #[serde(default)]
    pub deposit: Option<Decimal>,
    /// New delivery day; keeps the current one when absent
    #[serde(default)]
    pub estimated_date: Option<Date>,
    /// The complete desired line set
    pub lines: Vec<DesiredLine>,
}

/// An existing line to rewrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineUpdate {
    /// Persisted line id
    pub line_id: i64,
    /// Product after the edit
    pub product_id: i64,
    /// Units after the edit
    pub quantity: i32,
    /// Captured price to keep; `None` when the product changed
    pub kept_price: Option<Decimal>,
}

/// What has to happen to the persisted lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinePlan {
    /// Line ids to remove
    pub delete: Vec<i64>,
    /// Lines to rewrite in place
    pub update: Vec<LineUpdate>,
    /// `(product_id, quantity)` pairs to add
    pub insert: Vec<(i64, i32)>,
}

impl LinePlan {
    /// Products whose current catalog price is needed to apply this plan.
    #[must_use]
    pub fn products_needing_price(&self) -> Vec<i64> {
        self.update
            .iter()
            .filter(|u| u.kept_price.is_none())
            .map(|u| u.product_id)
            .chain(self.insert.iter().map(|&(product_id, _)| product_id))
            .collect()
    }
}

/// Rejects empty line sets, non-positive quantities and repeated line ids.
pub fn validate_desired_lines(lines: &[DesiredLine]) -> Result<()> {
    if lines.is_empty() {
        return Err(Error::validation("At least one product is required"));
    }

    let mut seen = HashSet::new();
    for line in lines {
        if line.quantity <= 0 {
            return Err(Error::validation(format!(
                "Quantity must be at least 1 (product {})",
                line.product_id
            )));
        }
        if let Some(id) = line.id
            && !seen.insert(id)
        {
            return Err(Error::validation(format!("Line {id} appears more than once")));
        }
    }
    Ok(())
}

/// Diffs persisted lines against the desired set.
///
/// Persisted lines missing from `desired` are deleted. A desired line whose
/// id matches a persisted line updates it; any other desired line is
/// inserted, including one carrying an id from a different order.
#[must_use]
pub fn plan_reconciliation(persisted: &[order_line::Model], desired: &[DesiredLine]) -> LinePlan {
    let by_id: HashMap<i64, &order_line::Model> = persisted.iter().map(|l| (l.id, l)).collect();
    let mut plan = LinePlan::default();
    let mut kept = HashSet::new();

    for line in desired {
        match line.id.and_then(|id| by_id.get(&id)) {
            Some(existing) => {
                kept.insert(existing.id);
                plan.update.push(LineUpdate {
                    line_id: existing.id,
                    product_id: line.product_id,
                    quantity: line.quantity,
                    kept_price: (existing.product_id == line.product_id)
                        .then_some(existing.unit_price),
                });
            }
            None => plan.insert.push((line.product_id, line.quantity)),
        }
    }

    plan.delete = persisted
        .iter()
        .map(|l| l.id)
        .filter(|id| !kept.contains(id))
        .collect();
    plan
}

async fn apply_plan(
    txn: &DatabaseTransaction,
    order_id: i64,
    plan: &LinePlan,
    prices: &PriceList,
) -> Result<()> {
    // Resolve every price and subtotal before the first write
    let updates = plan
        .update
        .iter()
        .map(|u| {
            let price = match u.kept_price {
                Some(price) => price,
                None => catalog::price_of(prices, u.product_id)?,
            };
            Ok((u, price, money::line_subtotal(price, u.quantity)?))
        })
        .collect::<Result<Vec<_>>>()?;
    let inserts = plan
        .insert
        .iter()
        .map(|&(product_id, quantity)| {
            let price = catalog::price_of(prices, product_id)?;
            Ok((product_id, quantity, price, money::line_subtotal(price, quantity)?))
        })
        .collect::<Result<Vec<_>>>()?;

    if !plan.delete.is_empty() {
        OrderLine::delete_many()
            .filter(order_line::Column::Id.is_in(plan.delete.clone()))
            .exec(txn)
            .await?;
    }

    for (update, unit_price, subtotal) in updates {
        order_line::ActiveModel {
            id: Set(update.line_id),
            product_id: Set(update.product_id),
            quantity: Set(update.quantity),
            unit_price: Set(unit_price),
            subtotal: Set(subtotal),
            ..Default::default()
        }
        .update(txn)
        .await?;
    }

    if !inserts.is_empty() {
        let rows = inserts
            .into_iter()
            .map(|(product_id, quantity, unit_price, subtotal)| order_line::ActiveModel {
                order_id: Set(order_id),
                product_id: Set(product_id),
                quantity: Set(quantity),
                unit_price: Set(unit_price),
                subtotal: Set(subtotal),
                ..Default::default()
            });
        OrderLine::insert_many(rows).exec(txn).await?;
    }
    Ok(())
}

async fn apply_edit(
    txn: &DatabaseTransaction,
    order_id: i64,
    edit: &OrderEdit,
) -> Result<order::Model> {
    let current = Order::find_by_id(order_id)
        .one(txn)
        .await?
        .ok_or_else(|| Error::not_found("Order", order_id))?;
    if current.version != edit.version {
        return Err(Error::ConcurrencyConflict { order_id });
    }

    validate_desired_lines(&edit.lines)?;
    validate_deposit(edit.deposit)?;
    ensure_parties_exist(txn, edit.customer_id, edit.user_id).await?;

    let persisted = OrderLine::find()
        .filter(order_line::Column::OrderId.eq(order_id))
        .order_by_asc(order_line::Column::Id)
        .all(txn)
        .await?;
    let plan = plan_reconciliation(&persisted, &edit.lines);
    let prices = catalog::fetch_unit_prices(txn, &plan.products_needing_price()).await?;
    apply_plan(txn, order_id, &plan, &prices).await?;

    let lines = OrderLine::find()
        .filter(order_line::Column::OrderId.eq(order_id))
        .all(txn)
        .await?;
    let total = money::sum_amounts(lines.iter().map(|l| l.subtotal))?;

    let header = order::ActiveModel {
        date: Set(edit.date.unwrap_or(current.date)),
        status: Set(edit.status.unwrap_or(current.status)),
        total: Set(total),
        deposit: Set(edit.deposit.or(current.deposit)),
        estimated_date: Set(edit.estimated_date.or(current.estimated_date)),
        customer_id: Set(edit.customer_id),
        user_id: Set(edit.user_id),
        version: Set(current.version + 1),
        ..Default::default()
    };
    let written = Order::update_many()
        .set(header)
        .filter(order::Column::Id.eq(order_id))
        .filter(order::Column::Version.eq(edit.version))
        .exec(txn)
        .await?;
    if written.rows_affected == 0 {
        return match Order::find_by_id(order_id).one(txn).await? {
            Some(_) => Err(Error::ConcurrencyConflict { order_id }),
            None => Err(Error::not_found("Order", order_id)),
        };
    }

    info!(
        order_id,
        deleted = plan.delete.len(),
        updated = plan.update.len(),
        inserted = plan.insert.len(),
        total = %total,
        "Order lines reconciled"
    );

    Order::find_by_id(order_id)
        .one(txn)
        .await?
        .ok_or_else(|| Error::not_found("Order", order_id))
}

/// Applies an edit to an order and returns the updated header.
///
/// Runs in a single transaction. Validation, `NotFound`, `InvalidProduct`
/// and `ConcurrencyConflict` come back unchanged with nothing written; any
/// storage failure is logged and reported as [`Error::OrderSaveFailed`].
#[instrument(skip(db, edit), fields(version = edit.version))]
pub async fn edit_order(db: &DatabaseConnection, order_id: i64, edit: OrderEdit) -> Result<order::Model> {
    let txn = db.begin().await.map_err(|e| save_failed(&e))?;

    match apply_edit(&txn, order_id, &edit).await {
        Ok(updated) => {
            txn.commit().await.map_err(|e| save_failed(&e))?;
            Ok(updated)
        }
        Err(e) => {
            if let Err(rollback) = txn.rollback().await {
                warn!(error = %rollback, "Rollback after failed order edit also failed");
            }
            match e {
                Error::Database(cause) => {
                    error!(error = %cause, "Order edit failed, transaction rolled back");
                    Err(Error::OrderSaveFailed)
                }
                other => Err(other),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::order::get_order_details;
    use crate::test_utils::*;
    use chrono::NaiveDate;

    fn line(id: i64, product_id: i64, quantity: i32, unit_price: Decimal) -> order_line::Model {
        order_line::Model {
            id,
            order_id: 1,
            product_id,
            quantity,
            unit_price,
            subtotal: money::line_subtotal(unit_price, quantity).unwrap(),
        }
    }

    fn desired(id: Option<i64>, product_id: i64, quantity: i32) -> DesiredLine {
        DesiredLine {
            id,
            product_id,
            quantity,
        }
    }

    fn edit_for(fixture: &OrderFixture, version: i32, lines: Vec<DesiredLine>) -> OrderEdit {
        OrderEdit {
            version,
            customer_id: fixture.customer.id,
            user_id: fixture.user.id,
            status: None,
            date: None,
            deposit: None,
            estimated_date: None,
            lines,
        }
    }

    #[test]
    fn test_plan_reconciliation() {
        let persisted = vec![
            line(10, 1, 1, Decimal::new(500, 2)),
            line(11, 2, 2, Decimal::new(300, 2)),
            line(12, 3, 1, Decimal::new(100, 2)),
        ];
        let plan = plan_reconciliation(
            &persisted,
            &[
                desired(Some(10), 1, 4),
                desired(Some(12), 5, 1),
                desired(None, 6, 2),
                desired(Some(99), 7, 1),
            ],
        );

        assert_eq!(plan.delete, vec![11]);
        assert_eq!(
            plan.update,
            vec![
                LineUpdate {
                    line_id: 10,
                    product_id: 1,
                    quantity: 4,
                    kept_price: Some(Decimal::new(500, 2)),
                },
                LineUpdate {
                    line_id: 12,
                    product_id: 5,
                    quantity: 1,
                    kept_price: None,
                },
            ]
        );
        assert_eq!(plan.insert, vec![(6, 2), (7, 1)]);
        assert_eq!(plan.products_needing_price(), vec![5, 6, 7]);
    }

    #[test]
    fn test_validate_desired_lines() {
        assert!(validate_desired_lines(&[desired(None, 1, 1)]).is_ok());
        assert!(matches!(
            validate_desired_lines(&[]).unwrap_err(),
            Error::Validation { .. }
        ));
        assert!(matches!(
            validate_desired_lines(&[desired(None, 1, 0)]).unwrap_err(),
            Error::Validation { .. }
        ));
        assert!(matches!(
            validate_desired_lines(&[desired(Some(3), 1, 1), desired(Some(3), 2, 1)])
                .unwrap_err(),
            Error::Validation { .. }
        ));
        // Two new lines for the same product are fine
        assert!(validate_desired_lines(&[desired(None, 1, 1), desired(None, 1, 2)]).is_ok());
    }

    #[tokio::test]
    async fn test_edit_reconciles_lines_and_total() -> Result<()> {
        let fixture = setup_order_fixture().await?;
        let croissant = create_custom_product(&fixture.db, "Croissant", Decimal::new(225, 2)).await?;
        let order_id =
            create_test_order(&fixture, &[(fixture.cake.id, 1), (fixture.bread.id, 2)]).await?;
        let before = get_order_details(&fixture.db, order_id).await?.unwrap();
        let line_a = before.lines[0].line.id;
        let line_b = before.lines[1].line.id;

        let updated = edit_order(
            &fixture.db,
            order_id,
            edit_for(
                &fixture,
                0,
                vec![
                    desired(Some(line_a), fixture.cake.id, 3),
                    desired(None, croissant.id, 2),
                ],
            ),
        )
        .await?;

        assert_eq!(updated.version, 1);
        // 3 x 12.50 + 2 x 2.25
        assert_eq!(updated.total, Decimal::new(4200, 2));

        let after = get_order_details(&fixture.db, order_id).await?.unwrap();
        assert_eq!(after.lines.len(), 2);
        assert!(after.lines.iter().all(|l| l.line.id != line_b));
        assert_eq!(after.lines[0].line.id, line_a);
        assert_eq!(after.lines[0].line.quantity, 3);
        assert_eq!(after.lines[0].line.subtotal, Decimal::new(3750, 2));
        assert_eq!(after.lines[1].line.product_id, croissant.id);
        assert_eq!(after.lines[1].line.unit_price, Decimal::new(225, 2));
        let sum: Decimal = after.lines.iter().map(|l| l.line.subtotal).sum();
        assert_eq!(after.order.total, sum);
        Ok(())
    }

    #[tokio::test]
    async fn test_edit_keeps_captured_price_unless_product_changes() -> Result<()> {
        let fixture = setup_order_fixture().await?;
        let order_id =
            create_test_order(&fixture, &[(fixture.cake.id, 1), (fixture.bread.id, 1)]).await?;
        let lines = get_order_details(&fixture.db, order_id).await?.unwrap().lines;

        // Both products get more expensive after the order was taken
        for (product, cents) in [(&fixture.cake, 2000), (&fixture.bread, 500)] {
            let mut active: crate::entities::product::ActiveModel = product.clone().into();
            active.price = Set(Decimal::new(cents, 2));
            active.update(&fixture.db).await?;
        }

        let updated = edit_order(
            &fixture.db,
            order_id,
            edit_for(
                &fixture,
                0,
                vec![
                    desired(Some(lines[0].line.id), fixture.cake.id, 2),
                    desired(Some(lines[1].line.id), fixture.cake.id, 1),
                ],
            ),
        )
        .await?;

        let after = get_order_details(&fixture.db, order_id).await?.unwrap();
        // Same product keeps 12.50, switched product captures the new 20.00
        assert_eq!(after.lines[0].line.unit_price, Decimal::new(1250, 2));
        assert_eq!(after.lines[1].line.unit_price, Decimal::new(2000, 2));
        assert_eq!(updated.total, Decimal::new(4500, 2));
        Ok(())
    }

    #[tokio::test]
    async fn test_stale_edit_is_a_conflict() -> Result<()> {
        let fixture = setup_order_fixture().await?;
        let order_id = create_test_order(&fixture, &[(fixture.cake.id, 1)]).await?;
        let line_id = get_order_details(&fixture.db, order_id).await?.unwrap().lines[0]
            .line
            .id;

        // First operator wins
        edit_order(
            &fixture.db,
            order_id,
            edit_for(&fixture, 0, vec![desired(Some(line_id), fixture.cake.id, 2)]),
        )
        .await?;

        // Second operator still holds version 0
        let result = edit_order(
            &fixture.db,
            order_id,
            edit_for(&fixture, 0, vec![desired(Some(line_id), fixture.cake.id, 9)]),
        )
        .await;
        assert!(matches!(
            result.unwrap_err(),
            Error::ConcurrencyConflict { order_id: id } if id == order_id
        ));

        let after = get_order_details(&fixture.db, order_id).await?.unwrap();
        assert_eq!(after.order.version, 1);
        assert_eq!(after.lines[0].line.quantity, 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_edit_changes_nothing() -> Result<()> {
        let fixture = setup_order_fixture().await?;
        let order_id =
            create_test_order(&fixture, &[(fixture.cake.id, 1), (fixture.bread.id, 1)]).await?;
        let before = get_order_details(&fixture.db, order_id).await?.unwrap();

        let unknown_product = edit_order(
            &fixture.db,
            order_id,
            edit_for(&fixture, 0, vec![desired(None, 999, 1)]),
        )
        .await;
        assert!(matches!(
            unknown_product.unwrap_err(),
            Error::InvalidProduct { product_id: 999 }
        ));

        let zero_quantity = edit_order(
            &fixture.db,
            order_id,
            edit_for(&fixture, 0, vec![desired(None, fixture.cake.id, 0)]),
        )
        .await;
        assert!(matches!(zero_quantity.unwrap_err(), Error::Validation { .. }));

        let mut missing_customer = edit_for(&fixture, 0, vec![desired(None, fixture.cake.id, 1)]);
        missing_customer.customer_id = 999;
        let result = edit_order(&fixture.db, order_id, missing_customer).await;
        assert!(matches!(result.unwrap_err(), Error::Validation { .. }));

        let missing_order = edit_order(
            &fixture.db,
            999,
            edit_for(&fixture, 0, vec![desired(None, fixture.cake.id, 1)]),
        )
        .await;
        assert!(matches!(missing_order.unwrap_err(), Error::NotFound { .. }));

        assert_eq!(get_order_details(&fixture.db, order_id).await?.unwrap(), before);
        Ok(())
    }

    #[tokio::test]
    async fn test_edit_rejects_oversized_totals() -> Result<()> {
        let fixture = setup_order_fixture().await?;
        let order_id = create_test_order(&fixture, &[(fixture.cake.id, 1)]).await?;
        let before = get_order_details(&fixture.db, order_id).await?.unwrap();
        let legacy = crate::entities::product::ActiveModel {
            name: Set("Wedding tower".to_string()),
            price: Set(Decimal::from(i64::MAX)),
            stock: Set(1),
            ..Default::default()
        }
        .insert(&fixture.db)
        .await?;

        let result = edit_order(
            &fixture.db,
            order_id,
            edit_for(&fixture, 0, vec![desired(None, legacy.id, 1)]),
        )
        .await;
        assert!(matches!(result.unwrap_err(), Error::InvalidAmount { .. }));

        let mut fine_deposit = edit_for(&fixture, 0, vec![desired(None, fixture.cake.id, 1)]);
        fine_deposit.deposit = Some("1.999".parse().unwrap());
        let result = edit_order(&fixture.db, order_id, fine_deposit).await;
        assert!(matches!(result.unwrap_err(), Error::InvalidAmount { .. }));

        assert_eq!(get_order_details(&fixture.db, order_id).await?.unwrap(), before);
        Ok(())
    }

    #[tokio::test]
    async fn test_edit_on_closed_connection_is_save_failure() -> Result<()> {
        let fixture = setup_order_fixture().await?;
        let order_id = create_test_order(&fixture, &[(fixture.cake.id, 1)]).await?;

        fixture.db.clone().close().await?;

        let result = edit_order(
            &fixture.db,
            order_id,
            edit_for(&fixture, 0, vec![desired(None, fixture.cake.id, 2)]),
        )
        .await;
        assert!(matches!(result.unwrap_err(), Error::OrderSaveFailed));
        Ok(())
    }

    #[tokio::test]
    async fn test_edit_header_fields() -> Result<()> {
        let fixture = setup_order_fixture().await?;
        let other = create_test_customer(&fixture.db, "Luis Prado").await?;
        let order_id = create_test_order(&fixture, &[(fixture.bread.id, 1)]).await?;
        let line_id = get_order_details(&fixture.db, order_id).await?.unwrap().lines[0]
            .line
            .id;
        let delivery = NaiveDate::from_ymd_opt(2024, 12, 24).unwrap();

        let mut edit = edit_for(&fixture, 0, vec![desired(Some(line_id), fixture.bread.id, 1)]);
        edit.customer_id = other.id;
        edit.status = Some(OrderStatus::Finished);
        edit.deposit = Some(Decimal::new(100, 2));
        edit.estimated_date = Some(delivery);
        let first = edit_order(&fixture.db, order_id, edit).await?;

        assert_eq!(first.customer_id, other.id);
        assert_eq!(first.status, OrderStatus::Finished);
        assert_eq!(first.deposit, Some(Decimal::new(100, 2)));
        assert_eq!(first.estimated_date, Some(delivery));

        // Absent header fields keep their values; status may move backwards
        let mut edit = edit_for(&fixture, 1, vec![desired(Some(line_id), fixture.bread.id, 1)]);
        edit.customer_id = other.id;
        edit.status = Some(OrderStatus::Pending);
        let second = edit_order(&fixture.db, order_id, edit).await?;

        assert_eq!(second.version, 2);
        assert_eq!(second.status, OrderStatus::Pending);
        assert_eq!(second.deposit, Some(Decimal::new(100, 2)));
        assert_eq!(second.estimated_date, Some(delivery));
        assert_eq!(second.date, first.date);
        Ok(())
    }
}
