//! Customer entity - people who buy from the shop.
//!
//! The normalized WhatsApp number doubles as the natural key used when
//! orders or CSV imports upsert a customer.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Customer database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "customers")]
pub struct Model {
    /// Unique identifier for the customer
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display name
    pub name: String,
    /// WhatsApp number, digits only with `62` country code
    #[sea_orm(unique)]
    pub whatsapp: Option<String>,
    /// Delivery address
    pub address: Option<String>,
    /// Free-form notes
    pub notes: Option<String>,
    /// When the customer was created
    pub created_at: DateTimeUtc,
    /// When the customer was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Customer and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One customer places many orders
    #[sea_orm(has_many = "super::order::Entity")]
    Orders,
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Orders.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
