//! Order entity - a customer sales order header.
//!
//! Monetary fields are derived from the lines whenever the order is written:
//! `total = max(0, subtotal - discount)`.

use super::status::{DeliveryStatus, PaymentStatus};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Order database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    /// Unique identifier for the order
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Customer who placed the order, if known
    pub customer_id: Option<i64>,
    /// Payment state
    pub payment_status: PaymentStatus,
    /// Fulfilment state
    pub delivery_status: DeliveryStatus,
    /// Set when the order became `paid`
    pub paid_at: Option<DateTimeUtc>,
    /// Set when the order became `delivered`
    pub delivered_at: Option<DateTimeUtc>,
    /// Sum of rounded line totals
    pub subtotal: f64,
    /// Flat discount
    pub discount: f64,
    /// Amount due
    pub total: f64,
    /// Free-form notes
    pub notes: Option<String>,
    /// When the order was created
    pub created_at: DateTimeUtc,
    /// When the order was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Order and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each order optionally belongs to one customer
    #[sea_orm(
        belongs_to = "super::customer::Entity",
        from = "Column::CustomerId",
        to = "super::customer::Column::Id"
    )]
    Customer,
    /// One order owns many lines
    #[sea_orm(has_many = "super::order_item::Entity")]
    OrderItems,
}

impl Related<super::customer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Customer.def()
    }
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
