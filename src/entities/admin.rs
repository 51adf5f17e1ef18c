//! Admin entity - the single shared credential guarding the API.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Admin database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "admins")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Argon2 PHC string of the admin PIN
    #[serde(skip_serializing)]
    pub pin_hash: String,
    /// When the PIN was last changed
    pub updated_at: DateTimeUtc,
}

/// `Admin` has no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
