//! Accounting summary and ledger export.
//!
//! Revenue is recognised on paid orders only. Cost of goods sold uses the
//! cost snapshot stored on each order line, so later catalog cost changes
//! never rewrite historical margins.

use crate::{
    core::{csv::CsvWriter, order, pricing, query::DateRange, seller_order},
    entities::{
        PaymentStatus, order as order_entity, order_item, seller_order as seller_order_entity,
    },
    errors::Result,
};
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, DatabaseConnection};
use serde::Serialize;
use std::collections::HashSet;

/// Money figures for a date range
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct AccountingSummary {
    /// Totals of paid orders
    pub sales_revenue: f64,
    /// Totals of unpaid orders
    pub receivables: f64,
    /// Totals of refunded orders
    pub refunds: f64,
    /// `quantity * cost snapshot` over paid orders
    pub cost_of_goods_sold: f64,
    /// `sales_revenue - cost_of_goods_sold`
    pub gross_profit: f64,
    /// Totals of paid seller orders, delivery fees included
    pub purchases: f64,
    /// Totals of unpaid seller orders
    pub payables: f64,
    /// Orders created in the range, any status
    pub order_count: u64,
    /// Seller orders created in the range, any status
    pub seller_order_count: u64,
}

#[derive(Default)]
struct Sums {
    sales_revenue: Decimal,
    receivables: Decimal,
    refunds: Decimal,
    cost_of_goods_sold: Decimal,
    purchases: Decimal,
    payables: Decimal,
}

fn add(sum: &mut Decimal, amount: f64) {
    *sum = sum.saturating_add(pricing::to_decimal(amount));
}

/// Aggregates orders, their lines and seller orders into a summary.
///
/// `lines` may contain lines of any order; only those belonging to paid
/// orders in `orders` count towards cost of goods sold.
#[must_use]
pub fn summarize(
    orders: &[order_entity::Model],
    lines: &[order_item::Model],
    seller_orders: &[seller_order_entity::Model],
) -> AccountingSummary {
    let mut summary = AccountingSummary::default();
    let mut sums = Sums::default();

    let mut paid = HashSet::new();
    for order in orders {
        summary.order_count += 1;
        match order.payment_status {
            PaymentStatus::Paid => {
                add(&mut sums.sales_revenue, order.total);
                paid.insert(order.id);
            }
            PaymentStatus::Unpaid => add(&mut sums.receivables, order.total),
            PaymentStatus::Refunded => add(&mut sums.refunds, order.total),
        }
    }

    for line in lines.iter().filter(|line| paid.contains(&line.order_id)) {
        add(
            &mut sums.cost_of_goods_sold,
            pricing::line_total(line.quantity, line.cost_price),
        );
    }

    for order in seller_orders {
        summary.seller_order_count += 1;
        match order.payment_status {
            PaymentStatus::Paid => add(&mut sums.purchases, order.total),
            PaymentStatus::Unpaid => add(&mut sums.payables, order.total),
            PaymentStatus::Refunded => {}
        }
    }

    summary.sales_revenue = pricing::to_f64(sums.sales_revenue);
    summary.receivables = pricing::to_f64(sums.receivables);
    summary.refunds = pricing::to_f64(sums.refunds);
    summary.cost_of_goods_sold = pricing::to_f64(sums.cost_of_goods_sold);
    summary.gross_profit =
        pricing::to_f64(sums.sales_revenue.saturating_sub(sums.cost_of_goods_sold));
    summary.purchases = pricing::to_f64(sums.purchases);
    summary.payables = pricing::to_f64(sums.payables);
    summary
}

/// Computes the accounting summary for orders created in `range`.
pub async fn generate_summary(
    db: &DatabaseConnection,
    range: &DateRange,
) -> Result<AccountingSummary> {
    let orders: Vec<order_entity::Model> = order::get_orders_in_range(db, range)
        .await?
        .into_iter()
        .map(|(order, _)| order)
        .collect();
    let paid = range
        .condition(order_entity::Column::CreatedAt)
        .add(order_entity::Column::PaymentStatus.eq(PaymentStatus::Paid));
    let lines = order::get_lines_for_orders(db, paid).await?;
    let seller_orders: Vec<seller_order_entity::Model> =
        seller_order::get_seller_orders_in_range(db, range)
            .await?
            .into_iter()
            .map(|(order, _)| order)
            .collect();

    Ok(summarize(&orders, &lines, &seller_orders))
}

/// Ledger columns, one row per order and seller order
const LEDGER_HEADER: &[&str] = &[
    "date",
    "type",
    "reference",
    "party",
    "payment_status",
    "delivery_status",
    "subtotal",
    "discount",
    "delivery_fee",
    "total",
];

/// Renders the ledger for `range` as CSV, in chronological order.
pub async fn export_ledger(db: &DatabaseConnection, range: &DateRange) -> Result<String> {
    let orders = order::get_orders_in_range(db, range).await?;
    let seller_orders = seller_order::get_seller_orders_in_range(db, range).await?;

    let mut rows: Vec<(chrono::DateTime<chrono::Utc>, [String; 10])> =
        Vec::with_capacity(orders.len() + seller_orders.len());
    for (order, customer) in orders {
        rows.push((
            order.created_at,
            [
                order.created_at.format("%Y-%m-%d %H:%M").to_string(),
                "sale".to_string(),
                format!("ORD-{}", order.id),
                customer.map(|c| c.name).unwrap_or_default(),
                order.payment_status.as_str().to_string(),
                order.delivery_status.as_str().to_string(),
                order.subtotal.to_string(),
                order.discount.to_string(),
                "0".to_string(),
                order.total.to_string(),
            ],
        ));
    }
    for (order, seller) in seller_orders {
        rows.push((
            order.created_at,
            [
                order.created_at.format("%Y-%m-%d %H:%M").to_string(),
                "purchase".to_string(),
                format!("PO-{}", order.id),
                seller.map(|s| s.name).unwrap_or_default(),
                order.payment_status.as_str().to_string(),
                order.delivery_status.as_str().to_string(),
                order.subtotal.to_string(),
                order.discount.to_string(),
                order.delivery_fee.to_string(),
                order.total.to_string(),
            ],
        ));
    }
    rows.sort_by_key(|(at, _)| *at);

    let mut writer = CsvWriter::with_header(LEDGER_HEADER);
    for (_, row) in rows {
        writer.write_row(row);
    }
    Ok(writer.finish())
}
