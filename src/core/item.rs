//! Item business logic - catalog entries and their stock.
//!
//! This module provides functions for creating, listing, updating and
//! soft-deleting items, and for moving stock. It enforces the unit/stock-mode
//! rule on every write: weighed (`KG`) items are never stock-tracked, so a
//! tracked item is always counted in whole pieces.

use crate::{
    core::{
        category, pricing,
        query::{Page, Paginated, clean_search},
        reconcile::Catalog,
    },
    entities::{Item, StockMode, Unit, item},
    errors::{Error, Result},
};
use sea_orm::{ConnectionTrait, PaginatorTrait, QueryOrder, Set, prelude::*, sea_query::Expr};
use serde::Deserialize;
use tracing::{info, instrument};

/// Fields accepted when creating or replacing an item
#[derive(Debug, Clone, Deserialize)]
pub struct ItemInput {
    /// Display name
    pub name: String,
    /// Selling price per unit
    pub price: f64,
    /// Purchase price per unit
    #[serde(default)]
    pub cost_price: f64,
    /// Unit sold in
    #[serde(default)]
    pub unit: Unit,
    /// Requested stock mode; coerced to `RESELL` for `KG` items
    #[serde(default)]
    pub stock_mode: StockMode,
    /// Stock on hand; `None` keeps the current value on update
    #[serde(default)]
    pub stock: Option<i64>,
    /// Optional category
    #[serde(default)]
    pub category_id: Option<i64>,
}

/// Filters for the item list
#[derive(Debug, Clone, Default)]
pub struct ItemFilter {
    /// Matches against the item name
    pub search: Option<String>,
    /// Only items in this category
    pub category_id: Option<i64>,
}

/// Resolves the stock mode and stock an item may actually have.
///
/// `KG` items are forced to `RESELL`; `RESELL` items carry no stock.
#[must_use]
pub fn resolve_stock(unit: Unit, requested_mode: StockMode, stock: i64) -> (StockMode, i64) {
    let mode = match unit {
        Unit::Kg => StockMode::Resell,
        Unit::Pcs => requested_mode,
    };
    let stock = match mode {
        StockMode::Track => stock,
        StockMode::Resell => 0,
    };
    (mode, stock)
}

fn validate_input(input: &ItemInput) -> Result<()> {
    if input.name.trim().is_empty() {
        return Err(Error::validation("Item name cannot be empty"));
    }
    pricing::validate_amount(input.price)?;
    pricing::validate_amount(input.cost_price)?;
    if input.stock.is_some_and(|stock| stock < 0) {
        return Err(Error::validation("Stock cannot be negative"));
    }
    Ok(())
}

/// Lists active items, alphabetically, one page at a time.
pub async fn list_items(
    db: &DatabaseConnection,
    filter: &ItemFilter,
    page: Page,
) -> Result<Paginated<item::Model>> {
    let mut query = Item::find().filter(item::Column::IsDeleted.eq(false));
    if let Some(search) = clean_search(filter.search.as_deref()) {
        query = query.filter(item::Column::Name.contains(search));
    }
    if let Some(category_id) = filter.category_id {
        query = query.filter(item::Column::CategoryId.eq(category_id));
    }

    let paginator = query
        .order_by_asc(item::Column::Name)
        .paginate(db, page.limit);
    let total = paginator.num_items().await?;
    let data = paginator.fetch_page(page.index()).await?;
    Ok(Paginated::new(data, page, total))
}

/// Retrieves all active items, ordered by name.
pub async fn get_all_active_items(db: &DatabaseConnection) -> Result<Vec<item::Model>> {
    Item::find()
        .filter(item::Column::IsDeleted.eq(false))
        .order_by_asc(item::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Retrieves an item by id, including soft-deleted ones.
pub async fn get_item_by_id(db: &DatabaseConnection, item_id: i64) -> Result<Option<item::Model>> {
    Item::find_by_id(item_id).one(db).await.map_err(Into::into)
}

/// Creates an item after validating prices and applying the stock-mode rule.
#[instrument(skip(db, input), fields(name = %input.name))]
pub async fn create_item(db: &DatabaseConnection, input: ItemInput) -> Result<item::Model> {
    validate_input(&input)?;
    if let Some(category_id) = input.category_id {
        category::ensure_category_exists(db, category_id).await?;
    }

    let (stock_mode, stock) =
        resolve_stock(input.unit, input.stock_mode, input.stock.unwrap_or_default());
    let now = chrono::Utc::now();

    let item = item::ActiveModel {
        name: Set(input.name.trim().to_string()),
        price: Set(input.price),
        cost_price: Set(input.cost_price),
        unit: Set(input.unit),
        stock_mode: Set(stock_mode),
        stock: Set(stock),
        category_id: Set(input.category_id),
        is_deleted: Set(false),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!(item_id = item.id, "Item created");
    Ok(item)
}

/// Replaces an item's fields. Existing order lines keep their snapshots.
#[instrument(skip(db, input))]
pub async fn update_item(
    db: &DatabaseConnection,
    item_id: i64,
    input: ItemInput,
) -> Result<item::Model> {
    validate_input(&input)?;
    if let Some(category_id) = input.category_id {
        category::ensure_category_exists(db, category_id).await?;
    }

    let existing = find_active(db, item_id).await?;
    let (stock_mode, stock) = resolve_stock(
        input.unit,
        input.stock_mode,
        input.stock.unwrap_or(existing.stock),
    );

    let mut item: item::ActiveModel = existing.into();
    item.name = Set(input.name.trim().to_string());
    item.price = Set(input.price);
    item.cost_price = Set(input.cost_price);
    item.unit = Set(input.unit);
    item.stock_mode = Set(stock_mode);
    item.stock = Set(stock);
    item.category_id = Set(input.category_id);
    item.updated_at = Set(chrono::Utc::now());

    item.update(db).await.map_err(Into::into)
}

/// Soft deletes an item so historical order lines can still resolve it.
#[instrument(skip(db))]
pub async fn delete_item(db: &DatabaseConnection, item_id: i64) -> Result<item::Model> {
    let mut item: item::ActiveModel = find_active(db, item_id).await?.into();
    item.is_deleted = Set(true);
    item.updated_at = Set(chrono::Utc::now());

    item.update(db).await.map_err(Into::into)
}

/// Manually corrects stock for a tracked item (stock take, spoilage, ...).
pub async fn adjust_stock(
    db: &DatabaseConnection,
    item_id: i64,
    delta: i64,
) -> Result<item::Model> {
    let item = find_active(db, item_id).await?;
    if item.stock_mode != StockMode::Track {
        return Err(Error::validation(format!(
            "Item '{}' does not track stock",
            item.name
        )));
    }
    update_stock_atomic(db, item_id, delta).await
}

/// Adds `delta` to an item's stock with a single `UPDATE`.
///
/// `RESELL` items are left untouched. A change that would take stock below
/// zero fails with [`Error::InsufficientStock`].
///
/// # Arguments
/// * `db` - Database connection or transaction
/// * `item_id` - ID of the item to update
/// * `delta` - Pieces to add (negative to remove)
pub async fn update_stock_atomic<C>(db: &C, item_id: i64, delta: i64) -> Result<item::Model>
where
    C: ConnectionTrait,
{
    let item = Item::find_by_id(item_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("item", item_id))?;

    if item.stock_mode != StockMode::Track || delta == 0 {
        return Ok(item);
    }
    if item.stock + delta < 0 {
        return Err(Error::InsufficientStock {
            item: item.name,
            available: item.stock,
            required: -delta,
        });
    }

    Item::update_many()
        .col_expr(item::Column::Stock, Expr::col(item::Column::Stock).add(delta))
        .col_expr(item::Column::UpdatedAt, Expr::value(chrono::Utc::now()))
        .filter(item::Column::Id.eq(item_id))
        .exec(db)
        .await?;

    Item::find_by_id(item_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("item", item_id))
}

/// Applies a list of `(item_id, delta)` stock changes in order.
pub async fn apply_stock_deltas<C>(db: &C, deltas: &[(i64, i64)]) -> Result<()>
where
    C: ConnectionTrait,
{
    for &(item_id, delta) in deltas {
        update_stock_atomic(db, item_id, delta).await?;
    }
    Ok(())
}

/// Loads the items referenced by an order write, deleted ones included.
pub async fn load_catalog<C, I>(db: &C, item_ids: I) -> Result<Catalog>
where
    C: ConnectionTrait,
    I: IntoIterator<Item = i64>,
{
    let mut ids: Vec<i64> = item_ids.into_iter().collect();
    ids.sort_unstable();
    ids.dedup();
    if ids.is_empty() {
        return Ok(Catalog::new());
    }

    let items = Item::find()
        .filter(item::Column::Id.is_in(ids))
        .all(db)
        .await?;
    Ok(items.into_iter().map(|item| (item.id, item)).collect())
}

/// Tracked items with stock at or below `threshold`, lowest first.
pub async fn get_low_stock_items(
    db: &DatabaseConnection,
    threshold: i64,
) -> Result<Vec<item::Model>> {
    Item::find()
        .filter(item::Column::IsDeleted.eq(false))
        .filter(item::Column::StockMode.eq(StockMode::Track))
        .filter(item::Column::Stock.lte(threshold))
        .order_by_asc(item::Column::Stock)
        .order_by_asc(item::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

async fn find_active(db: &DatabaseConnection, item_id: i64) -> Result<item::Model> {
    Item::find_by_id(item_id)
        .one(db)
        .await?
        .filter(|item| !item.is_deleted)
        .ok_or_else(|| Error::not_found("item", item_id))
}
