//! Shared test utilities for Fruit POS.
//!
//! This module provides helpers for setting up test databases and creating
//! catalog items with sensible defaults.

use crate::{
    core::item::{self, ItemInput},
    entities::{
        self,
        item::{StockMode, Unit},
    },
    errors::Result,
};
use sea_orm::DatabaseConnection;

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Creates a piece item whose stock is tracked.
///
/// # Defaults
/// * `cost_price`: half of `price`
/// * `category_id`: None
pub async fn create_tracked_item(
    db: &DatabaseConnection,
    name: &str,
    price: f64,
    stock: i64,
) -> Result<entities::item::Model> {
    item::create_item(
        db,
        ItemInput {
            name: name.to_string(),
            price,
            cost_price: price / 2.0,
            unit: Unit::Pcs,
            stock_mode: StockMode::Track,
            stock: Some(stock),
            category_id: None,
        },
    )
    .await
}

/// Creates an item sold by weight (always `RESELL`).
pub async fn create_weighed_item(
    db: &DatabaseConnection,
    name: &str,
    price: f64,
) -> Result<entities::item::Model> {
    item::create_item(
        db,
        ItemInput {
            name: name.to_string(),
            price,
            cost_price: price / 2.0,
            unit: Unit::Kg,
            stock_mode: StockMode::Resell,
            stock: None,
            category_id: None,
        },
    )
    .await
}
