//! Item entity - a sellable catalog entry.
//!
//! Items are sold either per piece (`PCS`) or by weight (`KG`). Only piece
//! items can have their stock tracked; weighed items are always resold
//! without a stock count.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Unit an item is sold in
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(8))")]
#[serde(rename_all = "UPPERCASE")]
pub enum Unit {
    /// Whole pieces
    #[default]
    #[sea_orm(string_value = "PCS")]
    Pcs,
    /// Kilograms, fractional quantities allowed
    #[sea_orm(string_value = "KG")]
    Kg,
}

/// Whether stock is counted for an item
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(8))")]
#[serde(rename_all = "UPPERCASE")]
pub enum StockMode {
    /// Stock is counted and moves with deliveries
    #[sea_orm(string_value = "TRACK")]
    Track,
    /// Bought and sold on demand; no stock count
    #[default]
    #[sea_orm(string_value = "RESELL")]
    Resell,
}

impl Unit {
    /// Wire name used in CSV exports
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pcs => "PCS",
            Self::Kg => "KG",
        }
    }
}

impl StockMode {
    /// Wire name used in CSV exports
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Track => "TRACK",
            Self::Resell => "RESELL",
        }
    }
}

/// Item database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "items")]
pub struct Model {
    /// Unique identifier for the item
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Name shown on orders (e.g., "Mango Harum Manis")
    pub name: String,
    /// Selling price per unit
    pub price: f64,
    /// Purchase price per unit
    pub cost_price: f64,
    /// Unit the item is sold in
    pub unit: Unit,
    /// Stock tracking mode
    pub stock_mode: StockMode,
    /// Pieces on hand; always 0 for `RESELL` items
    pub stock: i64,
    /// Optional category
    pub category_id: Option<i64>,
    /// Soft delete flag - historical order lines keep pointing at the item
    pub is_deleted: bool,
    /// When the item was created
    pub created_at: DateTimeUtc,
    /// When the item was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Item and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each item optionally belongs to one category
    #[sea_orm(
        belongs_to = "super::category::Entity",
        from = "Column::CategoryId",
        to = "super::category::Column::Id",
        on_delete = "SetNull"
    )]
    Category,
    /// Customer order lines referencing this item
    #[sea_orm(has_many = "super::order_item::Entity")]
    OrderItems,
    /// Seller order lines referencing this item
    #[sea_orm(has_many = "super::seller_order_item::Entity")]
    SellerOrderItems,
}

impl Related<super::category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItems.def()
    }
}

impl Related<super::seller_order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SellerOrderItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
