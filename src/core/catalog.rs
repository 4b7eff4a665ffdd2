//! Catalog reader - read-only lookup of authoritative unit prices.
//!
//! Order building never trusts a price coming from a client; it always asks
//! this module. Unknown ids are simply missing from the result and it is up
//! to the caller to reject the order.

use crate::{
    entities::{Product, product},
    errors::{Error, Result},
};
use sea_orm::{QuerySelect, prelude::*};
use std::collections::{BTreeSet, HashMap};

/// Current unit prices keyed by product id.
pub type PriceList = HashMap<i64, Decimal>;

/// Fetches `(id, price)` for every existing product among `product_ids`.
///
/// Duplicates in the input are collapsed. An empty input returns an empty map
/// without touching the database. Accepts a connection or an open transaction.
pub async fn fetch_unit_prices<C>(db: &C, product_ids: &[i64]) -> Result<PriceList>
where
    C: ConnectionTrait,
{
    let ids: BTreeSet<i64> = product_ids.iter().copied().collect();
    if ids.is_empty() {
        return Ok(PriceList::new());
    }

    let rows: Vec<(i64, Decimal)> = Product::find()
        .select_only()
        .column(product::Column::Id)
        .column(product::Column::Price)
        .filter(product::Column::Id.is_in(ids))
        .into_tuple()
        .all(db)
        .await?;

    Ok(rows.into_iter().collect())
}

/// Looks up one product's price, failing with [`Error::InvalidProduct`] when it is unknown.
pub fn price_of(prices: &PriceList, product_id: i64) -> Result<Decimal> {
    prices
        .get(&product_id)
        .copied()
        .ok_or(Error::InvalidProduct { product_id })
}
