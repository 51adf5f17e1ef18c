//! Payment and delivery status enums shared by customer and seller orders.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Whether an order has been settled
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
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// Not paid yet
    #[default]
    #[sea_orm(string_value = "unpaid")]
    Unpaid,
    /// Fully paid
    #[sea_orm(string_value = "paid")]
    Paid,
    /// Money returned to the customer
    #[sea_orm(string_value = "refunded")]
    Refunded,
}

/// Where an order is in fulfilment
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
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    /// Waiting to be delivered
    #[default]
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Handed over; stock has moved
    #[sea_orm(string_value = "delivered")]
    Delivered,
    /// Delivery attempt failed
    #[sea_orm(string_value = "failed")]
    Failed,
}

impl PaymentStatus {
    /// Lowercase wire name, as used in CSV exports
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unpaid => "unpaid",
            Self::Paid => "paid",
            Self::Refunded => "refunded",
        }
    }
}

impl DeliveryStatus {
    /// Lowercase wire name, as used in CSV exports
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Delivered => "delivered",
            Self::Failed => "failed",
        }
    }

    /// Whether the order's stock effect is currently applied
    #[must_use]
    pub fn is_delivered(self) -> bool {
        self == Self::Delivered
    }
}
