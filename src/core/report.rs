//! Report generation business logic.
//!
//! This module groups orders into sales volume rows and renders them as a
//! plain text table. Row data is framework-agnostic; the web layer decides
//! whether to send JSON or the rendered text.

use crate::{
    entities::{Order, order},
    errors::{Error, Result},
};
use chrono::Datelike;
use rust_decimal::RoundingStrategy;
use sea_orm::{QuerySelect, prelude::*};
use serde::Serialize;
use std::{collections::BTreeMap, fmt, str::FromStr};

/// How orders are bucketed in a sales volume report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    /// One row per order date
    #[default]
    Day,
    /// One row per calendar month
    Month,
}

impl Granularity {
    /// First day of the bucket containing `date`.
    #[must_use]
    pub fn period_start(self, date: Date) -> Date {
        match self {
            Self::Day => date,
            Self::Month => date.with_day(1).unwrap_or(date),
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Day => f.write_str("DAY"),
            Self::Month => f.write_str("MONTH"),
        }
    }
}

impl FromStr for Granularity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "day" | "daily" => Ok(Self::Day),
            "month" | "monthly" => Ok(Self::Month),
            other => Err(Error::validation(format!(
                "Unknown report period '{other}', expected 'day' or 'month'"
            ))),
        }
    }
}

/// One bucket of a sales volume report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SalesVolumeRow {
    /// Order date, or the first day of the month
    pub period_start: Date,
    /// Orders placed in the bucket
    pub order_count: u64,
    /// Sum of their totals
    pub total_sales: Decimal,
}

/// Groups every order by day or month, newest period first.
pub async fn sales_volume<C>(db: &C, granularity: Granularity) -> Result<Vec<SalesVolumeRow>>
where
    C: ConnectionTrait,
{
    let orders: Vec<(Date, Decimal)> = Order::find()
        .select_only()
        .column(order::Column::Date)
        .column(order::Column::Total)
        .into_tuple()
        .all(db)
        .await?;

    group_sales(granularity, orders)
}

/// Buckets `(date, total)` pairs. Newest period first.
///
/// # Errors
/// `InvalidAmount` if a bucket's sum overflows.
pub fn group_sales(
    granularity: Granularity,
    orders: impl IntoIterator<Item = (Date, Decimal)>,
) -> Result<Vec<SalesVolumeRow>> {
    let mut buckets: BTreeMap<Date, (u64, Decimal)> = BTreeMap::new();
    for (date, total) in orders {
        let entry = buckets
            .entry(granularity.period_start(date))
            .or_insert((0, Decimal::ZERO));
        entry.0 += 1;
        entry.1 = entry
            .1
            .checked_add(total)
            .ok_or(Error::InvalidAmount { amount: total })?;
    }

    Ok(buckets
        .into_iter()
        .rev()
        .map(|(period_start, (order_count, total_sales))| SalesVolumeRow {
            period_start,
            order_count,
            total_sales,
        })
        .collect())
}

/// Formats a money amount as `$1234.50`, rounding half-cents away from zero.
#[must_use]
pub fn format_money(amount: Decimal) -> String {
    let cents = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    format!("${cents:.2}")
}

/// Renders report rows as a fixed-width text table.
#[must_use]
pub fn format_sales_volume(rows: &[SalesVolumeRow], granularity: Granularity) -> String {
    let mut out = format!("Sales volume by {granularity}\n\n");
    out.push_str(&format!("{:<12} {:>8} {:>14}\n", "Date", "Orders", "Total sold"));
    out.push_str(&format!("{}\n", "-".repeat(36)));

    if rows.is_empty() {
        out.push_str("No orders recorded\n");
        return out;
    }

    for row in rows {
        out.push_str(&format!(
            "{:<12} {:>8} {:>14}\n",
            row.period_start.format("%d/%m/%Y"),
            row.order_count,
            format_money(row.total_sales)
        ));
    }

    let orders: u64 = rows.iter().map(|r| r.order_count).sum();
    let total = rows
        .iter()
        .fold(Decimal::ZERO, |sum, r| sum.saturating_add(r.total_sales));
    out.push_str(&format!("{}\n", "-".repeat(36)));
    out.push_str(&format!("{:<12} {:>8} {:>14}\n", "Total", orders, format_money(total)));
    out
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;
    use chrono::NaiveDate;

    fn day(y: i32, m: u32, d: u32) -> Date {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_granularity_parsing() {
        assert_eq!("day".parse::<Granularity>().unwrap(), Granularity::Day);
        assert_eq!(" Monthly ".parse::<Granularity>().unwrap(), Granularity::Month);
        assert!(matches!(
            "year".parse::<Granularity>().unwrap_err(),
            Error::Validation { .. }
        ));
    }

    #[test]
    fn test_group_sales_by_day_and_month() {
        let orders = vec![
            (day(2024, 3, 1), Decimal::new(1000, 2)),
            (day(2024, 3, 1), Decimal::new(550, 2)),
            (day(2024, 3, 20), Decimal::new(200, 2)),
            (day(2024, 4, 2), Decimal::new(375, 2)),
        ];

        let daily = group_sales(Granularity::Day, orders.clone()).unwrap();
        assert_eq!(daily.len(), 3);
        assert_eq!(daily[0].period_start, day(2024, 4, 2));
        assert_eq!(daily[2].period_start, day(2024, 3, 1));
        assert_eq!(daily[2].order_count, 2);
        assert_eq!(daily[2].total_sales, Decimal::new(1550, 2));

        let monthly = group_sales(Granularity::Month, orders).unwrap();
        assert_eq!(
            monthly,
            vec![
                SalesVolumeRow {
                    period_start: day(2024, 4, 1),
                    order_count: 1,
                    total_sales: Decimal::new(375, 2),
                },
                SalesVolumeRow {
                    period_start: day(2024, 3, 1),
                    order_count: 3,
                    total_sales: Decimal::new(1750, 2),
                },
            ]
        );
    }

    #[test]
    fn test_format_sales_volume() {
        let rows = vec![SalesVolumeRow {
            period_start: day(2024, 3, 5),
            order_count: 2,
            total_sales: Decimal::new(2550, 2),
        }];
        let text = format_sales_volume(&rows, Granularity::Day);

        assert!(text.starts_with("Sales volume by DAY\n"));
        assert!(text.contains("05/03/2024"));
        assert!(text.contains("$25.50"));
        assert!(text.lines().last().unwrap().starts_with("Total"));

        let empty = format_sales_volume(&[], Granularity::Month);
        assert!(empty.starts_with("Sales volume by MONTH"));
        assert!(empty.contains("No orders recorded"));
    }

    #[test]
    fn test_format_money() {
        assert_eq!(format_money(Decimal::new(5, 0)), "$5.00");
        assert_eq!(format_money(Decimal::new(12345, 3)), "$12.35");
        assert_eq!(format_money(Decimal::new(1005, 3)), "$1.01");
        assert_eq!(format_money(Decimal::new(2675, 3)), "$2.68");
        assert_eq!(format_money(Decimal::new(-1005, 3)), "$-1.01");
    }

    #[test]
    fn test_group_sales_rejects_overflow() {
        let orders = vec![(day(2024, 3, 1), Decimal::MAX), (day(2024, 3, 2), Decimal::MAX)];
        assert!(matches!(
            group_sales(Granularity::Month, orders.clone()),
            Err(Error::InvalidAmount { .. })
        ));

        // Separate buckets never add up, only the footer does
        let daily = group_sales(Granularity::Day, orders).unwrap();
        let text = format_sales_volume(&daily, Granularity::Day);
        assert!(text.lines().last().unwrap().starts_with("Total"));
    }

    #[tokio::test]
    async fn test_sales_volume_from_orders() -> Result<()> {
        let fixture = setup_order_fixture().await?;
        for (date, cakes) in [(day(2024, 5, 2), 1), (day(2024, 5, 2), 2), (day(2024, 6, 1), 1)] {
            let mut request = fixture.new_order(&[(fixture.cake.id, cakes)]);
            request.date = Some(date);
            crate::core::order::create_order(&fixture.db, request).await?;
        }

        let daily = sales_volume(&fixture.db, Granularity::Day).await?;
        assert_eq!(daily.len(), 2);
        assert_eq!(daily[0].period_start, day(2024, 6, 1));
        assert_eq!(daily[1].order_count, 2);
        assert_eq!(daily[1].total_sales, Decimal::new(3750, 2));

        let monthly = sales_volume(&fixture.db, Granularity::Month).await?;
        assert_eq!(monthly[1].period_start, day(2024, 5, 1));
        assert_eq!(monthly[1].total_sales, Decimal::new(3750, 2));
        Ok(())
    }
}
