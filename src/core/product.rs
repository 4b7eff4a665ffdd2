//! Product business logic - Handles all catalog operations.
//!
//! Products carry the authoritative unit price used when orders are built.
//! Changing a price here never touches existing order lines; they keep the
//! price captured when they were written.

use crate::{
    core::{Page, like_pattern, money, non_blank},
    entities::{Category, OrderLine, Product, category, order_line, product},
    errors::{Error, Result},
};
use sea_orm::{Condition, QueryOrder, Set, prelude::*};
use serde::{Deserialize, Serialize};

/// Fields accepted when creating or updating a product.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductInput {
    /// Product name, required
    pub name: String,
    /// Unit price, not negative, at most two decimal places
    pub price: Decimal,
    /// Units on hand, not negative
    #[serde(default)]
    pub stock: i32,
    /// Optional category
    #[serde(default)]
    pub category_id: Option<i64>,
    /// Image reference from the file store. On update, `None` keeps the current one.
    #[serde(default)]
    pub image_url: Option<String>,
}

/// A product with its category resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductDetails {
    /// The product row
    #[serde(flatten)]
    pub product: product::Model,
    /// Its category, if any
    pub category: Option<category::Model>,
}

async fn validate_input(db: &DatabaseConnection, input: &ProductInput) -> Result<String> {
    let name = input.name.trim();
    if name.is_empty() {
        return Err(Error::validation("Product name cannot be empty"));
    }
    money::validate_amount(input.price)?;
    if input.stock < 0 {
        return Err(Error::validation("Stock cannot be negative"));
    }
    if let Some(category_id) = input.category_id {
        Category::find_by_id(category_id)
            .one(db)
            .await?
            .ok_or_else(|| Error::validation(format!("Category {category_id} does not exist")))?;
    }
    Ok(name.to_string())
}

/// Creates a new product, performing input validation.
///
/// # Errors
/// Returns an error if:
/// - The product name is empty or whitespace-only
/// - The stock is negative
/// - The price is negative, finer than a cent or above [`money::MAX_AMOUNT`]
/// - The category does not exist
/// - The database insert operation fails
pub async fn create_product(db: &DatabaseConnection, input: ProductInput) -> Result<product::Model> {
    let name = validate_input(db, &input).await?;

    let product = product::ActiveModel {
        name: Set(name),
        price: Set(input.price),
        stock: Set(input.stock),
        image_url: Set(non_blank(input.image_url)),
        category_id: Set(input.category_id),
        ..Default::default()
    };
    product.insert(db).await.map_err(Into::into)
}

/// Retrieves a specific product by its unique ID.
pub async fn get_product_by_id(
    db: &DatabaseConnection,
    product_id: i64,
) -> Result<Option<product::Model>> {
    Product::find_by_id(product_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Retrieves a product together with its category.
pub async fn get_product_details(
    db: &DatabaseConnection,
    product_id: i64,
) -> Result<Option<ProductDetails>> {
    let row = Product::find_by_id(product_id)
        .find_also_related(Category)
        .one(db)
        .await?;
    Ok(row.map(|(product, category)| ProductDetails { product, category }))
}

/// Lists products by name, one page at a time.
///
/// When `search` is non-blank only products whose name or category name
/// contains it are returned. `page` is 1-based; 0 is treated as 1.
pub async fn list_products(
    db: &DatabaseConnection,
    search: Option<&str>,
    page: u64,
    page_size: u64,
) -> Result<Page<ProductDetails>> {
    let mut query = Product::find()
        .find_also_related(Category)
        .order_by_asc(product::Column::Name);

    if let Some(term) = search.filter(|t| !t.trim().is_empty()) {
        let pattern = like_pattern(term);
        query = query.filter(
            Condition::any()
                .add(product::Column::Name.like(pattern.as_str()))
                .add(category::Column::Name.like(pattern.as_str())),
        );
    }

    let page = page.max(1);
    let paginator = query.paginate(db, page_size);
    let totals = paginator.num_items_and_pages().await?;
    let items = paginator
        .fetch_page(page - 1)
        .await?
        .into_iter()
        .map(|(product, category)| ProductDetails { product, category })
        .collect();

    Ok(Page {
        items,
        page,
        page_size,
        total_items: totals.number_of_items,
        total_pages: totals.number_of_pages,
    })
}

/// Updates an existing product's name, price, stock and category.
///
/// The image reference is only replaced when the input carries a new one.
/// Existing order lines are not affected by a price change.
pub async fn update_product(
    db: &DatabaseConnection,
    product_id: i64,
    input: ProductInput,
) -> Result<product::Model> {
    let name = validate_input(db, &input).await?;

    let mut product: product::ActiveModel = get_product_by_id(db, product_id)
        .await?
        .ok_or_else(|| Error::not_found("Product", product_id))?
        .into();

    product.name = Set(name);
    product.price = Set(input.price);
    product.stock = Set(input.stock);
    product.category_id = Set(input.category_id);
    if let Some(image_url) = non_blank(input.image_url) {
        product.image_url = Set(Some(image_url));
    }

    product.update(db).await.map_err(Into::into)
}

/// Deletes a product that no order line references.
pub async fn delete_product(db: &DatabaseConnection, product_id: i64) -> Result<()> {
    let product = get_product_by_id(db, product_id)
        .await?
        .ok_or_else(|| Error::not_found("Product", product_id))?;

    let lines = OrderLine::find()
        .filter(order_line::Column::ProductId.eq(product_id))
        .count(db)
        .await?;
    if lines > 0 {
        return Err(Error::InUse {
            entity: "Product",
            id: product_id,
        });
    }

    product.delete(db).await?;
    Ok(())
}
