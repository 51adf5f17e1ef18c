//! Dashboard figures.
//!
//! Everything is computed from the orders created inside the requested date
//! range, except the low-stock list which always reflects current stock.

use crate::{
    core::{
        item,
        order::{self, OrderFilter, OrderSummary},
        pricing,
        query::{DateRange, Page},
        seller_order,
    },
    entities::{DeliveryStatus, PaymentStatus, Unit, order as order_entity, order_item},
    errors::Result,
};
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, DatabaseConnection};
use serde::Serialize;
use std::collections::HashMap;

/// How many best sellers the dashboard shows
pub const TOP_ITEMS: usize = 5;
/// How many recent orders the dashboard shows
pub const RECENT_ORDERS: u64 = 5;

/// Headline numbers over a set of orders
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct OrderFigures {
    /// Orders created in the range
    pub order_count: u64,
    /// Sum of totals of paid orders
    pub paid_revenue: f64,
    /// Sum of totals of unpaid orders
    pub outstanding: f64,
    /// Orders still waiting for delivery
    pub pending_deliveries: u64,
}

/// Quantity and revenue of one item across the range
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopItem {
    /// Catalog item id
    pub item_id: i64,
    /// Item name, or a placeholder when the item is gone
    pub name: String,
    /// Unit the quantity is counted in
    pub unit: Unit,
    /// Quantity sold across the range
    pub quantity: f64,
    /// Sum of line totals
    pub revenue: f64,
}

/// Everything the dashboard page renders
#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    /// The range the figures cover
    pub range: DateRange,
    /// Headline numbers, flattened into the response
    #[serde(flatten)]
    pub figures: OrderFigures,
    /// Sum of seller order totals, refunds excluded
    pub purchase_spend: f64,
    /// Tracked items at or below the threshold, lowest first
    pub low_stock: Vec<crate::entities::item::Model>,
    /// Best sellers of non-refunded orders, at most [`TOP_ITEMS`]
    pub top_items: Vec<TopItem>,
    /// Newest orders in the range, at most [`RECENT_ORDERS`]
    pub recent_orders: Vec<OrderSummary>,
}

/// Computes headline figures for a set of orders.
#[must_use]
pub fn summarize_orders(orders: &[order_entity::Model]) -> OrderFigures {
    let mut figures = OrderFigures::default();
    let (mut paid, mut unpaid) = (Decimal::ZERO, Decimal::ZERO);
    for order in orders {
        figures.order_count += 1;
        let total = pricing::to_decimal(order.total);
        match order.payment_status {
            PaymentStatus::Paid => paid = paid.saturating_add(total),
            PaymentStatus::Unpaid => unpaid = unpaid.saturating_add(total),
            PaymentStatus::Refunded => {}
        }
        if order.delivery_status == DeliveryStatus::Pending {
            figures.pending_deliveries += 1;
        }
    }
    figures.paid_revenue = pricing::to_f64(paid);
    figures.outstanding = pricing::to_f64(unpaid);
    figures
}

/// Ranks items by quantity sold, then revenue.
///
/// `names` maps item ids to display name and unit; lines for unknown items
/// are still counted under a placeholder name.
#[must_use]
pub fn rank_top_items(
    lines: &[order_item::Model],
    names: &HashMap<i64, (String, Unit)>,
    limit: usize,
) -> Vec<TopItem> {
    let mut totals: HashMap<i64, (Decimal, Decimal)> = HashMap::new();
    for line in lines {
        let entry = totals.entry(line.item_id).or_default();
        entry.0 = entry.0.saturating_add(pricing::to_decimal(line.quantity));
        entry.1 = entry.1.saturating_add(pricing::to_decimal(line.line_total));
    }

    let mut ranked: Vec<TopItem> = totals
        .into_iter()
        .map(|(item_id, (quantity, revenue))| {
            let (name, unit) = names
                .get(&item_id)
                .cloned()
                .unwrap_or_else(|| (format!("Item #{item_id}"), Unit::default()));
            TopItem {
                item_id,
                name,
                unit,
                quantity: pricing::to_f64(quantity),
                revenue: pricing::to_f64(revenue),
            }
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.quantity
            .total_cmp(&a.quantity)
            .then(b.revenue.total_cmp(&a.revenue))
            .then(a.item_id.cmp(&b.item_id))
    });
    ranked.truncate(limit);
    ranked
}

/// Builds the dashboard for `range`.
///
/// # Arguments
/// * `db` - Database connection
/// * `range` - Creation date range; open ends are unbounded
/// * `low_stock_threshold` - Tracked items at or below this stock are listed
pub async fn generate_dashboard(
    db: &DatabaseConnection,
    range: &DateRange,
    low_stock_threshold: i64,
) -> Result<Dashboard> {
    let orders: Vec<order_entity::Model> = order::get_orders_in_range(db, range)
        .await?
        .into_iter()
        .map(|(order, _)| order)
        .collect();
    let figures = summarize_orders(&orders);

    let counted = range
        .condition(order_entity::Column::CreatedAt)
        .add(order_entity::Column::PaymentStatus.ne(PaymentStatus::Refunded));
    let lines = order::get_lines_for_orders(db, counted).await?;
    let names: HashMap<i64, (String, Unit)> =
        item::load_catalog(db, lines.iter().map(|line| line.item_id))
            .await?
            .into_values()
            .map(|item| (item.id, (item.name, item.unit)))
            .collect();
    let top_items = rank_top_items(&lines, &names, TOP_ITEMS);

    let purchase_spend = pricing::sum(
        seller_order::get_seller_orders_in_range(db, range)
            .await?
            .iter()
            .filter(|(order, _)| order.payment_status != PaymentStatus::Refunded)
            .map(|(order, _)| order.total),
    );

    let recent_filter = OrderFilter {
        range: *range,
        ..Default::default()
    };
    let recent_page = Page::new(Some(1), Some(RECENT_ORDERS));
    let recent_orders = order::list_orders(db, &recent_filter, recent_page)
        .await?
        .data;

    Ok(Dashboard {
        range: *range,
        figures,
        purchase_spend,
        low_stock: item::get_low_stock_items(db, low_stock_threshold).await?,
        top_items,
        recent_orders,
    })
}
