//! Seller entity - suppliers the shop buys stock from.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Seller database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sellers")]
pub struct Model {
    /// Unique identifier for the seller
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display name
    pub name: String,
    /// WhatsApp number, digits only with `62` country code
    #[sea_orm(unique)]
    pub whatsapp: Option<String>,
    /// Pickup or office address
    pub address: Option<String>,
    /// Free-form notes
    pub notes: Option<String>,
    /// When the seller was created
    pub created_at: DateTimeUtc,
    /// When the seller was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between sellers and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// A seller supplies many purchase orders
    #[sea_orm(has_many = "super::seller_order::Entity")]
    SellerOrders,
}

impl Related<super::seller_order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SellerOrders.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
