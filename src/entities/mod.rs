//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod admin;
pub mod category;
pub mod customer;
pub mod item;
pub mod order;
pub mod order_item;
pub mod seller;
pub mod seller_order;
pub mod seller_order_item;
pub mod status;

// Re-export specific types to avoid conflicts
pub use admin::{Entity as Admin, Model as AdminModel};
pub use category::{Column as CategoryColumn, Entity as Category, Model as CategoryModel};
pub use customer::{Column as CustomerColumn, Entity as Customer, Model as CustomerModel};
pub use item::{Column as ItemColumn, Entity as Item, Model as ItemModel, StockMode, Unit};
pub use order::{Column as OrderColumn, Entity as Order, Model as OrderModel};
pub use order_item::{Column as OrderItemColumn, Entity as OrderItem, Model as OrderItemModel};
pub use seller::{Column as SellerColumn, Entity as Seller, Model as SellerModel};
pub use seller_order::{
    Column as SellerOrderColumn, Entity as SellerOrder, Model as SellerOrderModel,
};
pub use seller_order_item::{
    Column as SellerOrderItemColumn, Entity as SellerOrderItem, Model as SellerOrderItemModel,
};
pub use status::{DeliveryStatus, PaymentStatus};
