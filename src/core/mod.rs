//! Core business logic - framework-agnostic catalog, order and reporting operations.
//!
//! Every function takes a database connection (or transaction) and returns
//! [`crate::errors::Result`]; nothing in here knows about HTTP.

/// Accounting summary and ledger export
pub mod accounting;
/// Admin PIN and session tokens
pub mod auth;
/// Category management
pub mod category;
/// Contact fields shared by customers and sellers
pub mod contact;
/// CSV reading and writing
pub mod csv;
/// Customer management
pub mod customer;
/// Dashboard figures
pub mod dashboard;
/// CSV exports
pub mod export;
/// CSV imports
pub mod import;
/// Catalog items and stock
pub mod item;
/// Line storage shared by both kinds of order
pub mod lines;
/// Customer orders
pub mod order;
/// Quantity normalization and money rounding
pub mod pricing;
/// Pagination and date filters
pub mod query;
/// Line and stock reconciliation for order edits
pub mod reconcile;
/// Seller management
pub mod seller;
/// Seller (purchase) orders
pub mod seller_order;
