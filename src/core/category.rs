//! Category business logic - manage the optional product groupings.

use crate::{
    config::settings::CategorySeed,
    entities::{Category, Product, category, product},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*, sea_query::Expr};
use tracing::info;

fn validated_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::validation("Category name cannot be empty"));
    }
    Ok(name.to_string())
}

async fn ensure_name_free<C>(db: &C, name: &str, except: Option<i64>) -> Result<()>
where
    C: ConnectionTrait,
{
    let mut query = Category::find().filter(category::Column::Name.eq(name));
    if let Some(id) = except {
        query = query.filter(category::Column::Id.ne(id));
    }
    if query.one(db).await?.is_some() {
        return Err(Error::Duplicate {
            message: format!("category '{name}' already exists"),
        });
    }
    Ok(())
}

/// Creates a category with a unique, non-blank name.
pub async fn create_category(db: &DatabaseConnection, name: &str) -> Result<category::Model> {
    let name = validated_name(name)?;
    ensure_name_free(db, &name, None).await?;

    category::ActiveModel {
        name: Set(name),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Lists all categories alphabetically.
pub async fn list_categories(db: &DatabaseConnection) -> Result<Vec<category::Model>> {
    Category::find()
        .order_by_asc(category::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Renames a category.
pub async fn rename_category(
    db: &DatabaseConnection,
    category_id: i64,
    new_name: &str,
) -> Result<category::Model> {
    let name = validated_name(new_name)?;
    let mut category: category::ActiveModel = Category::find_by_id(category_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Category", category_id))?
        .into();
    ensure_name_free(db, &name, Some(category_id)).await?;

    category.name = Set(name);
    category.update(db).await.map_err(Into::into)
}

/// Deletes a category. Its products stay in the catalog without a category.
pub async fn delete_category(db: &DatabaseConnection, category_id: i64) -> Result<()> {
    let txn = db.begin().await?;

    let category = Category::find_by_id(category_id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("Category", category_id))?;

    Product::update_many()
        .col_expr(product::Column::CategoryId, Expr::value(Option::<i64>::None))
        .filter(product::Column::CategoryId.eq(category_id))
        .exec(&txn)
        .await?;
    category.delete(&txn).await?;

    txn.commit().await?;
    Ok(())
}

/// Inserts every configured category that does not exist yet.
pub async fn seed_categories(db: &DatabaseConnection, seeds: &[CategorySeed]) -> Result<()> {
    for seed in seeds {
        let name = validated_name(&seed.name)?;
        let exists = Category::find()
            .filter(category::Column::Name.eq(name.as_str()))
            .one(db)
            .await?
            .is_some();
        if !exists {
            create_category(db, &name).await?;
            info!("Seeded category '{name}'");
        }
    }
    Ok(())
}
