//! Seller order line entity. `price` snapshots the item's cost price.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Seller order line database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "seller_order_items")]
pub struct Model {
    /// Unique identifier for the line
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning purchase order
    pub seller_order_id: i64,
    /// Catalog item bought
    pub item_id: i64,
    /// Quantity, normalized for the item's unit
    pub quantity: f64,
    /// Unit cost at the time the line was added
    pub price: f64,
    /// `quantity * price`, rounded
    pub line_total: f64,
    /// Whether this line's quantity has been added to stock
    pub stock_applied: bool,
}

/// Defines relationships between seller order lines and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each line belongs to one seller order
    #[sea_orm(
        belongs_to = "super::seller_order::Entity",
        from = "Column::SellerOrderId",
        to = "super::seller_order::Column::Id",
        on_delete = "Cascade"
    )]
    SellerOrder,
    /// Each line references one catalog item
    #[sea_orm(
        belongs_to = "super::item::Entity",
        from = "Column::ItemId",
        to = "super::item::Column::Id"
    )]
    Item,
}

impl Related<super::seller_order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SellerOrder.def()
    }
}

impl Related<super::item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Item.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
