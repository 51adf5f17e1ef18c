//! Order line entity.
//!
//! `price` and `cost_price` are snapshots taken when the line was first
//! added, so later catalog edits never change historical orders.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Order line database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "order_items")]
pub struct Model {
    /// Unique identifier for the line
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning order
    pub order_id: i64,
    /// Catalog item sold
    pub item_id: i64,
    /// Quantity, normalized for the item's unit
    pub quantity: f64,
    /// Unit selling price at the time the line was added
    pub price: f64,
    /// Unit cost price at the time the line was added
    pub cost_price: f64,
    /// `quantity * price`, rounded
    pub line_total: f64,
    /// Whether this line's quantity has been taken out of stock
    pub stock_applied: bool,
}

/// Defines relationships between order lines and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each line belongs to one order
    #[sea_orm(
        belongs_to = "super::order::Entity",
        from = "Column::OrderId",
        to = "super::order::Column::Id",
        on_delete = "Cascade"
    )]
    Order,
    /// Each line references one catalog item
    #[sea_orm(
        belongs_to = "super::item::Entity",
        from = "Column::ItemId",
        to = "super::item::Column::Id"
    )]
    Item,
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Order.def()
    }
}

impl Related<super::item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Item.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
