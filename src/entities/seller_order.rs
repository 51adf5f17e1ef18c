//! Seller order entity - a purchase order recording stock bought from a seller.
//!
//! `total = max(0, subtotal - discount + delivery_fee)`.

use super::status::{DeliveryStatus, PaymentStatus};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Seller order database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "seller_orders")]
pub struct Model {
    /// Unique identifier for the purchase order
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Seller the stock is bought from, if known
    pub seller_id: Option<i64>,
    /// Payment state
    pub payment_status: PaymentStatus,
    /// Receiving state
    pub delivery_status: DeliveryStatus,
    /// Set when the order became `paid`
    pub paid_at: Option<DateTimeUtc>,
    /// Set when the goods were received
    pub delivered_at: Option<DateTimeUtc>,
    /// Sum of rounded line totals
    pub subtotal: f64,
    /// Flat discount granted by the seller
    pub discount: f64,
    /// Shipping charged by the seller
    pub delivery_fee: f64,
    /// Amount owed
    pub total: f64,
    /// Free-form notes
    pub notes: Option<String>,
    /// When the order was created
    pub created_at: DateTimeUtc,
    /// When the order was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between seller orders and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// The seller the goods come from
    #[sea_orm(
        belongs_to = "super::seller::Entity",
        from = "Column::SellerId",
        to = "super::seller::Column::Id"
    )]
    Seller,
    /// Purchased lines
    #[sea_orm(has_many = "super::seller_order_item::Entity")]
    SellerOrderItems,
}

impl Related<super::seller::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Seller.def()
    }
}

impl Related<super::seller_order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SellerOrderItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
