//! Customer order business logic.
//!
//! Every write runs inside one database transaction: lines are reconciled
//! against what is stored (see [`crate::core::reconcile`]), the stock
//! difference is applied, and the header totals are recomputed from the
//! lines. A failure at any step rolls the whole request back.

use crate::{
    core::{
        contact::{ContactInput, clean_text},
        customer, item,
        lines::{self, DetailLine, OrderLines},
        pricing,
        query::{DateRange, Page, Paginated, clean_search},
        reconcile::{
            self, ExistingLine, LinePlan, LineRequest, PlannedLine, PriceSource, StockDirection,
        },
    },
    entities::{
        Customer, DeliveryStatus, Order, OrderItem, PaymentStatus, customer as customer_entity,
        order, order_item,
    },
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{
    Condition, ConnectionTrait, PaginatorTrait, QueryOrder, QuerySelect, QueryTrait, Set,
    TransactionTrait, prelude::*,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

/// Body accepted when creating an order
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewOrder {
    /// Existing customer to attach
    #[serde(default)]
    pub customer_id: Option<i64>,
    /// Inline customer, upserted by WhatsApp number when no id is given
    #[serde(default)]
    pub customer: Option<ContactInput>,
    /// Requested lines
    pub items: Vec<LineRequest>,
    /// Flat discount
    #[serde(default)]
    pub discount: f64,
    /// Initial payment state, `unpaid` unless given
    #[serde(default)]
    pub payment_status: PaymentStatus,
    /// Initial delivery state, `pending` unless given
    #[serde(default)]
    pub delivery_status: DeliveryStatus,
    /// Free-form notes
    #[serde(default)]
    pub notes: Option<String>,
}

/// Partial update; absent fields keep their stored value
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderPatch {
    /// Existing customer to attach instead
    #[serde(default)]
    pub customer_id: Option<i64>,
    /// Inline customer to upsert and attach instead
    #[serde(default)]
    pub customer: Option<ContactInput>,
    /// Replacement line list; `None` leaves the lines alone
    #[serde(default)]
    pub items: Option<Vec<LineRequest>>,
    /// New flat discount
    #[serde(default)]
    pub discount: Option<f64>,
    /// New payment state
    #[serde(default)]
    pub payment_status: Option<PaymentStatus>,
    /// New delivery state
    #[serde(default)]
    pub delivery_status: Option<DeliveryStatus>,
    /// Blank text clears the notes
    #[serde(default)]
    pub notes: Option<String>,
}

/// An order line with the item's display fields
pub type OrderLine = DetailLine<order_item::Model>;

/// An order with its customer and lines
#[derive(Debug, Clone, Serialize)]
pub struct OrderDetail {
    /// Header fields
    #[serde(flatten)]
    pub order: order::Model,
    /// Attached customer, if any
    pub customer: Option<customer_entity::Model>,
    /// Lines in insertion order
    pub items: Vec<OrderLine>,
}

/// One row of the order list
#[derive(Debug, Clone, Serialize)]
pub struct OrderSummary {
    /// Header fields
    #[serde(flatten)]
    pub order: order::Model,
    /// Customer name, if a customer is attached
    pub customer_name: Option<String>,
    /// Customer WhatsApp number, if known
    pub customer_whatsapp: Option<String>,
}

/// Filters for the order list
#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    /// Matches customer name, WhatsApp number, notes or the order id
    pub search: Option<String>,
    /// Only orders in this payment state
    pub payment_status: Option<PaymentStatus>,
    /// Only orders in this delivery state
    pub delivery_status: Option<DeliveryStatus>,
    /// Creation date range
    pub range: DateRange,
}

impl OrderLines for OrderItem {
    const ID: order_item::Column = order_item::Column::Id;
    const ORDER_ID: order_item::Column = order_item::Column::OrderId;
    const QUANTITY: order_item::Column = order_item::Column::Quantity;
    const LINE_TOTAL: order_item::Column = order_item::Column::LineTotal;
    const STOCK_APPLIED: order_item::Column = order_item::Column::StockApplied;

    fn existing(line: &order_item::Model) -> ExistingLine {
        ExistingLine {
            id: line.id,
            item_id: line.item_id,
            quantity: line.quantity,
            price: line.price,
            cost_price: line.cost_price,
            stock_applied: line.stock_applied,
        }
    }

    fn new_row(order_id: i64, line: &PlannedLine) -> order_item::ActiveModel {
        order_item::ActiveModel {
            order_id: Set(order_id),
            item_id: Set(line.item_id),
            quantity: Set(line.quantity),
            price: Set(line.price),
            cost_price: Set(line.cost_price),
            line_total: Set(line.line_total),
            stock_applied: Set(line.stock_applied),
            ..Default::default()
        }
    }
}

/// Creates an order, snapshotting current sale prices and consuming stock
/// right away when it is created as delivered.
#[instrument(skip(db, input))]
pub async fn create_order(db: &DatabaseConnection, input: NewOrder) -> Result<OrderDetail> {
    let discount = pricing::validate_amount(input.discount)?;
    let txn = db.begin().await?;

    let customer_id = resolve_customer(&txn, input.customer_id, input.customer).await?;
    let catalog = item::load_catalog(&txn, input.items.iter().map(|line| line.item_id)).await?;
    let requested = reconcile::merge_requests(&input.items, &catalog)?;
    let mut plan = reconcile::plan_lines(&[], &requested, &catalog, PriceSource::Sale)?;
    plan.ensure_not_empty()?;

    plan.mark_stock(false, input.delivery_status, &catalog);
    lines::apply_stock(&txn, &[], &plan, StockDirection::Consume).await?;

    let totals = pricing::compute_totals(plan.subtotal(), discount, 0.0);
    let now = Utc::now();
    let order = order::ActiveModel {
        customer_id: Set(customer_id),
        payment_status: Set(input.payment_status),
        delivery_status: Set(input.delivery_status),
        paid_at: Set(reconcile::stamp_transition(
            None,
            false,
            input.payment_status == PaymentStatus::Paid,
            now,
        )),
        delivered_at: Set(reconcile::stamp_transition(
            None,
            false,
            input.delivery_status.is_delivered(),
            now,
        )),
        subtotal: Set(totals.subtotal),
        discount: Set(totals.discount),
        total: Set(totals.total),
        notes: Set(clean_text(input.notes)),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    lines::sync_lines::<OrderItem, _>(&txn, order.id, &plan).await?;
    txn.commit().await?;

    info!(order_id = order.id, total = order.total, "Order created");
    get_order(db, order.id).await
}

/// Applies a partial update to an order.
///
/// Lines that stay keep their price snapshot; stock moves only by the
/// difference between the order's stock effect before and after the edit.
#[instrument(skip(db, patch))]
pub async fn update_order(
    db: &DatabaseConnection,
    order_id: i64,
    patch: OrderPatch,
) -> Result<OrderDetail> {
    if let Some(discount) = patch.discount {
        pricing::validate_amount(discount)?;
    }
    let txn = db.begin().await?;

    let existing = Order::find_by_id(order_id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("order", order_id))?;
    let stored_lines: Vec<ExistingLine> = lines::lines_of::<OrderItem, _>(&txn, order_id)
        .await?
        .iter()
        .map(OrderItem::existing)
        .collect();

    let requested_ids = patch.items.iter().flatten().map(|line| line.item_id);
    let catalog = item::load_catalog(
        &txn,
        stored_lines.iter().map(|line| line.item_id).chain(requested_ids),
    )
    .await?;

    let mut plan = match &patch.items {
        Some(items) => {
            let requested = reconcile::merge_requests(items, &catalog)?;
            reconcile::plan_lines(&stored_lines, &requested, &catalog, PriceSource::Sale)?
        }
        None => reconcile::keep_existing(&stored_lines),
    };
    plan.ensure_not_empty()?;

    let payment_status = patch.payment_status.unwrap_or(existing.payment_status);
    let delivery_status = patch.delivery_status.unwrap_or(existing.delivery_status);

    plan.mark_stock(
        existing.delivery_status.is_delivered(),
        delivery_status,
        &catalog,
    );
    let stock_changes =
        lines::apply_stock(&txn, &stored_lines, &plan, StockDirection::Consume).await?;

    let customer_id = if patch.customer_id.is_some() || patch.customer.is_some() {
        resolve_customer(&txn, patch.customer_id, patch.customer).await?
    } else {
        existing.customer_id
    };

    let totals = pricing::compute_totals(
        plan.subtotal(),
        patch.discount.unwrap_or(existing.discount),
        0.0,
    );
    let now = Utc::now();
    let paid_at = reconcile::stamp_transition(
        existing.paid_at,
        existing.payment_status == PaymentStatus::Paid,
        payment_status == PaymentStatus::Paid,
        now,
    );
    let delivered_at = reconcile::stamp_transition(
        existing.delivered_at,
        existing.delivery_status.is_delivered(),
        delivery_status.is_delivered(),
        now,
    );

    let mut order: order::ActiveModel = existing.into();
    order.customer_id = Set(customer_id);
    order.payment_status = Set(payment_status);
    order.delivery_status = Set(delivery_status);
    order.paid_at = Set(paid_at);
    order.delivered_at = Set(delivered_at);
    order.subtotal = Set(totals.subtotal);
    order.discount = Set(totals.discount);
    order.total = Set(totals.total);
    if patch.notes.is_some() {
        order.notes = Set(clean_text(patch.notes));
    }
    order.updated_at = Set(now);
    order.update(&txn).await?;

    lines::sync_lines::<OrderItem, _>(&txn, order_id, &plan).await?;
    txn.commit().await?;

    info!(order_id, stock_changes, "Order updated");
    get_order(db, order_id).await
}

/// Deletes an order and its lines, giving back stock if it was delivered.
#[instrument(skip(db))]
pub async fn delete_order(db: &DatabaseConnection, order_id: i64) -> Result<()> {
    let txn = db.begin().await?;

    let order = Order::find_by_id(order_id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("order", order_id))?;
    let stored_lines: Vec<ExistingLine> = lines::lines_of::<OrderItem, _>(&txn, order_id)
        .await?
        .iter()
        .map(OrderItem::existing)
        .collect();
    lines::apply_stock(
        &txn,
        &stored_lines,
        &LinePlan::default(),
        StockDirection::Consume,
    )
    .await?;

    lines::delete_lines::<OrderItem, _>(&txn, order_id).await?;
    order.delete(&txn).await?;

    txn.commit().await?;
    info!(order_id, "Order deleted");
    Ok(())
}

/// Loads an order with its customer and lines.
pub async fn get_order<C>(db: &C, order_id: i64) -> Result<OrderDetail>
where
    C: ConnectionTrait,
{
    let (order, customer) = Order::find_by_id(order_id)
        .find_also_related(Customer)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("order", order_id))?;

    let items = lines::detail_lines::<OrderItem, _>(db, order_id).await?;

    Ok(OrderDetail {
        order,
        customer,
        items,
    })
}

/// Lists orders newest first, one page at a time.
pub async fn list_orders(
    db: &DatabaseConnection,
    filter: &OrderFilter,
    page: Page,
) -> Result<Paginated<OrderSummary>> {
    let mut query = Order::find().find_also_related(Customer);

    if let Some(search) = clean_search(filter.search.as_deref()) {
        let mut any = Condition::any()
            .add(customer_entity::Column::Name.contains(search))
            .add(customer_entity::Column::Whatsapp.contains(search))
            .add(order::Column::Notes.contains(search));
        if let Ok(id) = search.trim_start_matches('#').parse::<i64>() {
            any = any.add(order::Column::Id.eq(id));
        }
        query = query.filter(any);
    }
    if let Some(status) = filter.payment_status {
        query = query.filter(order::Column::PaymentStatus.eq(status));
    }
    if let Some(status) = filter.delivery_status {
        query = query.filter(order::Column::DeliveryStatus.eq(status));
    }

    let paginator = query
        .filter(filter.range.condition(order::Column::CreatedAt))
        .order_by_desc(order::Column::CreatedAt)
        .order_by_desc(order::Column::Id)
        .paginate(db, page.limit);
    let total = paginator.num_items().await?;
    let data = paginator
        .fetch_page(page.index())
        .await?
        .into_iter()
        .map(|(order, customer)| OrderSummary {
            order,
            customer_name: customer.as_ref().map(|c| c.name.clone()),
            customer_whatsapp: customer.and_then(|c| c.whatsapp),
        })
        .collect();

    Ok(Paginated::new(data, page, total))
}

/// Orders created inside `range`, oldest first, with their customers.
pub async fn get_orders_in_range(
    db: &DatabaseConnection,
    range: &DateRange,
) -> Result<Vec<(order::Model, Option<customer_entity::Model>)>> {
    Order::find()
        .find_also_related(Customer)
        .filter(range.condition(order::Column::CreatedAt))
        .order_by_asc(order::Column::CreatedAt)
        .order_by_asc(order::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// All lines of the orders matching `orders`.
///
/// # Example
/// ```ignore
/// let paid = range
///     .condition(order::Column::CreatedAt)
///     .add(order::Column::PaymentStatus.eq(PaymentStatus::Paid));
/// let lines = get_lines_for_orders(db, paid).await?;
/// ```
pub async fn get_lines_for_orders(
    db: &DatabaseConnection,
    orders: Condition,
) -> Result<Vec<order_item::Model>> {
    let order_ids = Order::find()
        .select_only()
        .column(order::Column::Id)
        .filter(orders)
        .into_query();
    lines::lines_matching::<OrderItem, _>(db, order_ids).await
}

/// Picks the customer for an order: an explicit id must exist, otherwise an
/// inline contact is upserted by WhatsApp number.
async fn resolve_customer<C>(
    db: &C,
    customer_id: Option<i64>,
    inline: Option<ContactInput>,
) -> Result<Option<i64>>
where
    C: ConnectionTrait,
{
    if let Some(customer_id) = customer_id {
        customer::get_customer_by_id(db, customer_id)
            .await?
            .ok_or_else(|| Error::not_found("customer", customer_id))?;
        return Ok(Some(customer_id));
    }
    match inline {
        Some(contact) => {
            let (customer, _) = customer::upsert_customer(db, contact).await?;
            Ok(Some(customer.id))
        }
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::{
        core::item::{ItemInput, create_item, update_item},
        entities::{StockMode, Unit},
        test_utils::*,
    };
    use chrono::Duration;

    fn line(item_id: i64, quantity: f64) -> LineRequest {
        LineRequest { item_id, quantity }
    }

    fn new_order(items: Vec<LineRequest>, delivery_status: DeliveryStatus) -> NewOrder {
        NewOrder {
            items,
            delivery_status,
            ..Default::default()
        }
    }

    async fn stock_of(db: &DatabaseConnection, item_id: i64) -> i64 {
        item::get_item_by_id(db, item_id).await.unwrap().unwrap().stock
    }

    fn set_delivery(status: DeliveryStatus) -> OrderPatch {
        OrderPatch {
            delivery_status: Some(status),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_order_computes_totals() -> Result<()> {
        let db = setup_test_db().await?;
        let apel = create_tracked_item(&db, "Apel Fuji", 5_000.0, 10).await?;
        let anggur = create_weighed_item(&db, "Anggur Hijau", 30_000.0).await?;

        let mut input = new_order(
            vec![line(apel.id, 2.0), line(anggur.id, 0.5)],
            DeliveryStatus::Pending,
        );
        input.discount = 1_000.0;
        let order = create_order(&db, input).await?;

        assert_eq!(order.order.subtotal, 25_000.0);
        assert_eq!(order.order.total, 24_000.0);
        assert_eq!(order.items.len(), 2);
        assert_eq!(order.items[1].unit, Unit::Kg);
        // Pending orders hold no stock
        assert_eq!(stock_of(&db, apel.id).await, 10);
        Ok(())
    }

    #[tokio::test]
    async fn test_total_never_goes_negative() -> Result<()> {
        let db = setup_test_db().await?;
        let salak = create_tracked_item(&db, "Salak", 2_000.0, 5).await?;

        let mut input = new_order(vec![line(salak.id, 1.0)], DeliveryStatus::Pending);
        input.discount = 10_000.0;
        let order = create_order(&db, input).await?;

        assert_eq!(order.order.subtotal, 2_000.0);
        assert_eq!(order.order.total, 0.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_empty_order_is_rejected() -> Result<()> {
        let db = setup_test_db().await?;
        let apel = create_tracked_item(&db, "Apel", 5_000.0, 10).await?;

        let result = create_order(&db, new_order(vec![], DeliveryStatus::Pending)).await;
        assert!(matches!(result, Err(Error::Validation { message: _ })));

        // A PCS quantity below one piece normalizes to nothing
        let input = new_order(vec![line(apel.id, 0.4)], DeliveryStatus::Pending);
        let result = create_order(&db, input).await;
        assert!(matches!(result, Err(Error::Validation { message: _ })));
        Ok(())
    }

    #[tokio::test]
    async fn test_delivered_order_consumes_stock() -> Result<()> {
        let db = setup_test_db().await?;
        let jeruk = create_tracked_item(&db, "Jeruk", 3_000.0, 10).await?;

        let input = new_order(vec![line(jeruk.id, 3.0)], DeliveryStatus::Delivered);
        let order = create_order(&db, input).await?;

        assert_eq!(stock_of(&db, jeruk.id).await, 7);
        assert!(order.order.delivered_at.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn test_edit_keeps_existing_snapshot() -> Result<()> {
        let db = setup_test_db().await?;
        let mangga = create_tracked_item(&db, "Mangga", 10_000.0, 20).await?;
        let pisang = create_tracked_item(&db, "Pisang", 2_000.0, 20).await?;
        let input = new_order(vec![line(mangga.id, 1.0)], DeliveryStatus::Pending);
        let order = create_order(&db, input).await?;

        let repriced = ItemInput {
            name: "Mangga".to_string(),
            price: 15_000.0,
            cost_price: 8_000.0,
            unit: Unit::Pcs,
            stock_mode: StockMode::Track,
            stock: None,
            category_id: None,
        };
        update_item(&db, mangga.id, repriced.clone()).await?;
        update_item(
            &db,
            pisang.id,
            ItemInput {
                name: "Pisang".to_string(),
                price: 2_500.0,
                ..repriced
            },
        )
        .await?;

        let patch = OrderPatch {
            items: Some(vec![line(mangga.id, 3.0), line(pisang.id, 2.0)]),
            ..Default::default()
        };
        let updated = update_order(&db, order.order.id, patch).await?;

        let kept = updated
            .items
            .iter()
            .find(|l| l.line.item_id == mangga.id)
            .unwrap();
        assert_eq!(kept.line.id, order.items[0].line.id);
        assert_eq!(kept.line.price, 10_000.0);
        assert_eq!(kept.line.quantity, 3.0);

        let added = updated
            .items
            .iter()
            .find(|l| l.line.item_id == pisang.id)
            .unwrap();
        assert_eq!(added.line.price, 2_500.0);
        assert_eq!(updated.order.subtotal, 35_000.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_removed_lines_are_deleted() -> Result<()> {
        let db = setup_test_db().await?;
        let a = create_tracked_item(&db, "Alpukat", 8_000.0, 5).await?;
        let b = create_tracked_item(&db, "Belimbing", 4_000.0, 5).await?;
        let order = create_order(
            &db,
            new_order(vec![line(a.id, 1.0), line(b.id, 1.0)], DeliveryStatus::Delivered),
        )
        .await?;
        assert_eq!(stock_of(&db, b.id).await, 4);

        let patch = OrderPatch {
            items: Some(vec![line(a.id, 1.0)]),
            ..Default::default()
        };
        let updated = update_order(&db, order.order.id, patch).await?;

        assert_eq!(updated.items.len(), 1);
        assert_eq!(updated.order.total, 8_000.0);
        // The removed line's stock comes back
        assert_eq!(stock_of(&db, b.id).await, 5);
        assert_eq!(stock_of(&db, a.id).await, 4);
        Ok(())
    }

    #[tokio::test]
    async fn test_delivery_toggle_is_idempotent() -> Result<()> {
        let db = setup_test_db().await?;
        let melon = create_tracked_item(&db, "Melon", 25_000.0, 10).await?;
        let input = new_order(vec![line(melon.id, 4.0)], DeliveryStatus::Pending);
        let order = create_order(&db, input).await?;
        let id = order.order.id;

        update_order(&db, id, set_delivery(DeliveryStatus::Delivered)).await?;
        assert_eq!(stock_of(&db, melon.id).await, 6);

        for _ in 0..2 {
            update_order(&db, id, set_delivery(DeliveryStatus::Pending)).await?;
            assert_eq!(stock_of(&db, melon.id).await, 10);
            update_order(&db, id, set_delivery(DeliveryStatus::Delivered)).await?;
            assert_eq!(stock_of(&db, melon.id).await, 6);
        }

        // Re-saving a delivered order moves nothing
        update_order(&db, id, set_delivery(DeliveryStatus::Delivered)).await?;
        assert_eq!(stock_of(&db, melon.id).await, 6);
        Ok(())
    }

    #[tokio::test]
    async fn test_insufficient_stock_rolls_back() -> Result<()> {
        let db = setup_test_db().await?;
        let durian = create_tracked_item(&db, "Durian", 80_000.0, 2).await?;

        let input = new_order(vec![line(durian.id, 3.0)], DeliveryStatus::Delivered);
        let result = create_order(&db, input).await;
        assert!(matches!(
            result,
            Err(Error::InsufficientStock {
                item: _,
                available: 2,
                required: 3
            })
        ));
        assert_eq!(Order::find().count(&db).await?, 0);
        assert_eq!(OrderItem::find().count(&db).await?, 0);

        let input = new_order(vec![line(durian.id, 3.0)], DeliveryStatus::Pending);
        let order = create_order(&db, input).await?;
        let patch = set_delivery(DeliveryStatus::Delivered);
        let result = update_order(&db, order.order.id, patch).await;
        assert!(result.is_err());

        let stored = get_order(&db, order.order.id).await?;
        assert_eq!(stored.order.delivery_status, DeliveryStatus::Pending);
        assert_eq!(stock_of(&db, durian.id).await, 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_delivered_order_restores_stock() -> Result<()> {
        let db = setup_test_db().await?;
        let nanas = create_tracked_item(&db, "Nanas", 12_000.0, 6).await?;
        let input = new_order(vec![line(nanas.id, 5.0)], DeliveryStatus::Delivered);
        let order = create_order(&db, input).await?;
        assert_eq!(stock_of(&db, nanas.id).await, 1);

        delete_order(&db, order.order.id).await?;

        assert_eq!(stock_of(&db, nanas.id).await, 6);
        assert!(matches!(
            get_order(&db, order.order.id).await,
            Err(Error::NotFound {
                entity: "order",
                id: _
            })
        ));
        assert_eq!(OrderItem::find().count(&db).await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_payment_stamps_paid_at() -> Result<()> {
        let db = setup_test_db().await?;
        let kiwi = create_tracked_item(&db, "Kiwi", 4_000.0, 5).await?;
        let input = new_order(vec![line(kiwi.id, 1.0)], DeliveryStatus::Pending);
        let order = create_order(&db, input).await?;
        assert!(order.order.paid_at.is_none());

        let paid = update_order(
            &db,
            order.order.id,
            OrderPatch {
                payment_status: Some(PaymentStatus::Paid),
                ..Default::default()
            },
        )
        .await?;
        let paid_at = paid.order.paid_at;
        assert!(paid_at.is_some());

        // Staying paid keeps the original stamp
        let again = update_order(
            &db,
            order.order.id,
            OrderPatch {
                notes: Some("diantar sore".to_string()),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(again.order.paid_at, paid_at);
        assert_eq!(again.order.notes.as_deref(), Some("diantar sore"));

        let refunded = update_order(
            &db,
            order.order.id,
            OrderPatch {
                payment_status: Some(PaymentStatus::Refunded),
                ..Default::default()
            },
        )
        .await?;
        assert!(refunded.order.paid_at.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_inline_customer_is_upserted() -> Result<()> {
        let db = setup_test_db().await?;
        let apel = create_tracked_item(&db, "Apel", 5_000.0, 10).await?;

        let mut input = new_order(vec![line(apel.id, 1.0)], DeliveryStatus::Pending);
        input.customer = Some(ContactInput {
            name: "Bu Sari".to_string(),
            whatsapp: Some("0812 3456 7890".to_string()),
            ..Default::default()
        });
        let first = create_order(&db, input.clone()).await?;
        let second = create_order(&db, input).await?;

        let customer = first.customer.unwrap();
        assert_eq!(customer.whatsapp.as_deref(), Some("6281234567890"));
        assert_eq!(second.order.customer_id, Some(customer.id));

        let result = create_order(
            &db,
            NewOrder {
                customer_id: Some(999),
                ..new_order(vec![line(apel.id, 1.0)], DeliveryStatus::Pending)
            },
        )
        .await;
        assert!(matches!(
            result,
            Err(Error::NotFound {
                entity: "customer",
                id: _
            })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_list_orders_filters() -> Result<()> {
        let db = setup_test_db().await?;
        let apel = create_tracked_item(&db, "Apel", 5_000.0, 10).await?;

        let mut input = new_order(vec![line(apel.id, 1.0)], DeliveryStatus::Pending);
        input.customer = Some(ContactInput {
            name: "Pak Budi".to_string(),
            ..Default::default()
        });
        input.payment_status = PaymentStatus::Paid;
        create_order(&db, input).await?;
        let input = new_order(vec![line(apel.id, 2.0)], DeliveryStatus::Delivered);
        create_order(&db, input).await?;

        let all = list_orders(&db, &OrderFilter::default(), Page::default()).await?;
        assert_eq!(all.total, 2);

        let by_name = OrderFilter {
            search: Some("budi".to_string()),
            ..Default::default()
        };
        let page = list_orders(&db, &by_name, Page::default()).await?;
        assert_eq!(page.total, 1);
        assert_eq!(page.data[0].customer_name.as_deref(), Some("Pak Budi"));

        let delivered = OrderFilter {
            delivery_status: Some(DeliveryStatus::Delivered),
            ..Default::default()
        };
        let page = list_orders(&db, &delivered, Page::default()).await?;
        assert_eq!(page.total, 1);
        assert!(page.data[0].customer_name.is_none());

        let unpaid = OrderFilter {
            payment_status: Some(PaymentStatus::Unpaid),
            ..Default::default()
        };
        assert_eq!(list_orders(&db, &unpaid, Page::default()).await?.total, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_stock_is_returned_only_if_it_was_taken() -> Result<()> {
        let db = setup_test_db().await?;
        let input = ItemInput {
            name: "Semangka".to_string(),
            price: 20_000.0,
            cost_price: 12_000.0,
            unit: Unit::Pcs,
            stock_mode: StockMode::Resell,
            stock: None,
            category_id: None,
        };
        let semangka = create_item(&db, input.clone()).await?;

        let order = create_order(
            &db,
            new_order(vec![line(semangka.id, 3.0)], DeliveryStatus::Delivered),
        )
        .await?;
        assert!(!order.items[0].line.stock_applied);

        // The item starts tracking stock after the order was delivered
        update_item(
            &db,
            semangka.id,
            ItemInput {
                stock_mode: StockMode::Track,
                stock: Some(5),
                ..input
            },
        )
        .await?;

        let pending =
            update_order(&db, order.order.id, set_delivery(DeliveryStatus::Pending)).await?;
        assert_eq!(stock_of(&db, semangka.id).await, 5);
        assert!(!pending.items[0].line.stock_applied);

        let delivered =
            update_order(&db, order.order.id, set_delivery(DeliveryStatus::Delivered)).await?;
        assert_eq!(stock_of(&db, semangka.id).await, 2);
        assert!(delivered.items[0].line.stock_applied);

        delete_order(&db, order.order.id).await?;
        assert_eq!(stock_of(&db, semangka.id).await, 5);
        Ok(())
    }

    #[tokio::test]
    async fn test_tracked_item_turned_resell_keeps_nothing_back() -> Result<()> {
        let db = setup_test_db().await?;
        let jambu = create_tracked_item(&db, "Jambu", 6_000.0, 10).await?;
        let order = create_order(
            &db,
            new_order(vec![line(jambu.id, 4.0)], DeliveryStatus::Delivered),
        )
        .await?;
        assert_eq!(stock_of(&db, jambu.id).await, 6);

        let resell = ItemInput {
            name: "Jambu".to_string(),
            price: 6_000.0,
            cost_price: 3_000.0,
            unit: Unit::Pcs,
            stock_mode: StockMode::Resell,
            stock: None,
            category_id: None,
        };
        update_item(&db, jambu.id, resell.clone()).await?;
        update_item(
            &db,
            jambu.id,
            ItemInput {
                stock_mode: StockMode::Track,
                stock: Some(6),
                ..resell
            },
        )
        .await?;

        // The line still holds the four pieces it took
        delete_order(&db, order.order.id).await?;
        assert_eq!(stock_of(&db, jambu.id).await, 10);
        Ok(())
    }

    #[tokio::test]
    async fn test_lines_follow_the_order_condition() -> Result<()> {
        let db = setup_test_db().await?;
        let apel = create_tracked_item(&db, "Apel", 5_000.0, 10).await?;

        let mut paid = new_order(vec![line(apel.id, 1.0)], DeliveryStatus::Pending);
        paid.payment_status = PaymentStatus::Paid;
        let paid = create_order(&db, paid).await?;
        let unpaid = create_order(
            &db,
            new_order(vec![line(apel.id, 2.0)], DeliveryStatus::Pending),
        )
        .await?;

        let today = Utc::now().date_naive();
        let range = DateRange {
            from: Some(today),
            to: Some(today),
        };
        let all = get_lines_for_orders(&db, range.condition(order::Column::CreatedAt)).await?;
        assert_eq!(all.len(), 2);

        let only_paid = range
            .condition(order::Column::CreatedAt)
            .add(order::Column::PaymentStatus.eq(PaymentStatus::Paid));
        let lines = get_lines_for_orders(&db, only_paid).await?;
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].order_id, paid.order.id);

        let by_id = Condition::all().add(order::Column::Id.eq(unpaid.order.id));
        let lines = get_lines_for_orders(&db, by_id).await?;
        assert_eq!(lines[0].quantity, 2.0);

        let yesterday = today - Duration::days(1);
        let past = DateRange {
            from: Some(yesterday),
            to: Some(yesterday),
        };
        let lines = get_lines_for_orders(&db, past.condition(order::Column::CreatedAt)).await?;
        assert!(lines.is_empty());
        Ok(())
    }
}
