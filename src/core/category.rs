//! Category business logic.
//!
//! Categories are plain labels; deleting one detaches its items rather than
//! deleting them.

use crate::{
    entities::{Category, Item, category, item},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*, sea_query::Expr};
use tracing::{debug, info};

/// Retrieves all categories ordered by name.
pub async fn get_all_categories(db: &DatabaseConnection) -> Result<Vec<category::Model>> {
    Category::find()
        .order_by_asc(category::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Finds a category by its exact name.
pub async fn get_category_by_name(
    db: &DatabaseConnection,
    name: &str,
) -> Result<Option<category::Model>> {
    Category::find()
        .filter(category::Column::Name.eq(name))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Fails with [`Error::NotFound`] unless the category exists.
pub async fn ensure_category_exists(db: &DatabaseConnection, category_id: i64) -> Result<()> {
    Category::find_by_id(category_id)
        .one(db)
        .await?
        .map(|_| ())
        .ok_or_else(|| Error::not_found("category", category_id))
}

fn clean_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::validation("Category name cannot be empty"));
    }
    Ok(name.to_string())
}

/// Creates a category with a unique name.
pub async fn create_category(db: &DatabaseConnection, name: &str) -> Result<category::Model> {
    let name = clean_name(name)?;
    if get_category_by_name(db, &name).await?.is_some() {
        return Err(Error::conflict(format!("Category '{name}' already exists")));
    }

    category::ActiveModel {
        name: Set(name),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Renames a category.
pub async fn rename_category(
    db: &DatabaseConnection,
    category_id: i64,
    name: &str,
) -> Result<category::Model> {
    let name = clean_name(name)?;
    if let Some(other) = get_category_by_name(db, &name).await? {
        if other.id != category_id {
            return Err(Error::conflict(format!("Category '{name}' already exists")));
        }
    }

    let mut category: category::ActiveModel = Category::find_by_id(category_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("category", category_id))?
        .into();
    category.name = Set(name);
    category.update(db).await.map_err(Into::into)
}

/// Deletes a category, detaching its items in the same transaction.
pub async fn delete_category(db: &DatabaseConnection, category_id: i64) -> Result<()> {
    let txn = db.begin().await?;

    let category = Category::find_by_id(category_id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("category", category_id))?;

    let detached = Item::update_many()
        .col_expr(item::Column::CategoryId, Expr::value(Option::<i64>::None))
        .filter(item::Column::CategoryId.eq(category_id))
        .exec(&txn)
        .await?;
    category.delete(&txn).await?;

    txn.commit().await?;
    debug!(
        category_id,
        detached = detached.rows_affected,
        "Category deleted"
    );
    Ok(())
}

/// Creates any configured category that does not exist yet.
pub async fn seed_categories(db: &DatabaseConnection, names: &[String]) -> Result<usize> {
    let mut created = 0;
    for name in names {
        let Ok(name) = clean_name(name) else {
            continue;
        };
        if get_category_by_name(db, &name).await?.is_none() {
            create_category(db, &name).await?;
            created += 1;
        }
    }
    if created > 0 {
        info!(created, "Seeded categories from config");
    }
    Ok(created)
}
