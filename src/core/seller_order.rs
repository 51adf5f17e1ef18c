//! Seller (purchase) order business logic.
//!
//! Seller orders run through the same reconciliation as customer orders with
//! two differences: new lines are priced at the item's cost price, and a
//! delivered seller order adds stock instead of consuming it.

use crate::{
    core::{
        contact::{ContactInput, clean_text},
        item,
        lines::{self, DetailLine, OrderLines},
        pricing,
        query::{DateRange, Page, Paginated, clean_search},
        reconcile::{
            self, ExistingLine, LinePlan, LineRequest, PlannedLine, PriceSource, StockDirection,
        },
        seller,
    },
    entities::{
        DeliveryStatus, PaymentStatus, Seller, SellerOrder, SellerOrderItem,
        seller as seller_entity, seller_order, seller_order_item,
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

/// Body accepted when creating a seller order
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewSellerOrder {
    /// Existing seller to attach
    #[serde(default)]
    pub seller_id: Option<i64>,
    /// Inline seller, upserted by WhatsApp number when no id is given
    #[serde(default)]
    pub seller: Option<ContactInput>,
    /// Requested lines; duplicates are merged
    pub items: Vec<LineRequest>,
    /// Flat discount
    #[serde(default)]
    pub discount: f64,
    /// Shipping charged by the seller
    #[serde(default)]
    pub delivery_fee: f64,
    /// Initial payment state, `unpaid` unless given
    #[serde(default)]
    pub payment_status: PaymentStatus,
    /// `delivered` adds tracked quantities to stock
    #[serde(default)]
    pub delivery_status: DeliveryStatus,
    /// Free-form notes
    #[serde(default)]
    pub notes: Option<String>,
}

/// Partial update; absent fields keep their stored value
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SellerOrderPatch {
    /// Existing seller to attach instead
    #[serde(default)]
    pub seller_id: Option<i64>,
    /// Inline seller to upsert and attach instead
    #[serde(default)]
    pub seller: Option<ContactInput>,
    /// Full replacement of the lines; kept items keep their cost snapshot
    #[serde(default)]
    pub items: Option<Vec<LineRequest>>,
    /// New flat discount
    #[serde(default)]
    pub discount: Option<f64>,
    /// New shipping charge
    #[serde(default)]
    pub delivery_fee: Option<f64>,
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

/// A purchase line with the item's display fields
pub type SellerOrderLine = DetailLine<seller_order_item::Model>;

/// A seller order with its seller and lines
#[derive(Debug, Clone, Serialize)]
pub struct SellerOrderDetail {
    /// Header fields
    #[serde(flatten)]
    pub order: seller_order::Model,
    /// Attached seller, if any
    pub seller: Option<seller_entity::Model>,
    /// Lines in insertion order
    pub items: Vec<SellerOrderLine>,
}

/// One row of the seller order list
#[derive(Debug, Clone, Serialize)]
pub struct SellerOrderSummary {
    /// Header fields
    #[serde(flatten)]
    pub order: seller_order::Model,
    /// Seller name, if a seller is attached
    pub seller_name: Option<String>,
    /// Seller WhatsApp number, if known
    pub seller_whatsapp: Option<String>,
}

/// Filters for the seller order list
#[derive(Debug, Clone, Default)]
pub struct SellerOrderFilter {
    /// Matches seller name, WhatsApp number, notes or the order id
    pub search: Option<String>,
    /// Only orders in this payment state
    pub payment_status: Option<PaymentStatus>,
    /// Only orders in this delivery state
    pub delivery_status: Option<DeliveryStatus>,
    /// Creation date range
    pub range: DateRange,
}

impl OrderLines for SellerOrderItem {
    const ID: seller_order_item::Column = seller_order_item::Column::Id;
    const ORDER_ID: seller_order_item::Column = seller_order_item::Column::SellerOrderId;
    const QUANTITY: seller_order_item::Column = seller_order_item::Column::Quantity;
    const LINE_TOTAL: seller_order_item::Column = seller_order_item::Column::LineTotal;
    const STOCK_APPLIED: seller_order_item::Column = seller_order_item::Column::StockApplied;

    fn existing(line: &seller_order_item::Model) -> ExistingLine {
        // Purchase lines are priced at cost, so price is the cost snapshot.
        ExistingLine {
            id: line.id,
            item_id: line.item_id,
            quantity: line.quantity,
            price: line.price,
            cost_price: line.price,
            stock_applied: line.stock_applied,
        }
    }

    fn new_row(seller_order_id: i64, line: &PlannedLine) -> seller_order_item::ActiveModel {
        seller_order_item::ActiveModel {
            seller_order_id: Set(seller_order_id),
            item_id: Set(line.item_id),
            quantity: Set(line.quantity),
            price: Set(line.price),
            line_total: Set(line.line_total),
            stock_applied: Set(line.stock_applied),
            ..Default::default()
        }
    }
}

/// Creates a seller order priced at current cost prices; a delivered
/// seller order adds its tracked quantities to stock.
#[instrument(skip(db, input))]
pub async fn create_seller_order(
    db: &DatabaseConnection,
    input: NewSellerOrder,
) -> Result<SellerOrderDetail> {
    let discount = pricing::validate_amount(input.discount)?;
    let delivery_fee = pricing::validate_amount(input.delivery_fee)?;
    let txn = db.begin().await?;

    let seller_id = resolve_seller(&txn, input.seller_id, input.seller).await?;
    let catalog = item::load_catalog(&txn, input.items.iter().map(|line| line.item_id)).await?;
    let requested = reconcile::merge_requests(&input.items, &catalog)?;
    let mut plan = reconcile::plan_lines(&[], &requested, &catalog, PriceSource::Cost)?;
    plan.ensure_not_empty()?;

    plan.mark_stock(false, input.delivery_status, &catalog);
    lines::apply_stock(&txn, &[], &plan, StockDirection::Acquire).await?;

    let totals = pricing::compute_totals(plan.subtotal(), discount, delivery_fee);
    let now = Utc::now();
    let order = seller_order::ActiveModel {
        seller_id: Set(seller_id),
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
        delivery_fee: Set(totals.delivery_fee),
        total: Set(totals.total),
        notes: Set(clean_text(input.notes)),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    lines::sync_lines::<SellerOrderItem, _>(&txn, order.id, &plan).await?;
    txn.commit().await?;

    info!(
        seller_order_id = order.id,
        total = order.total,
        "Seller order created"
    );
    get_seller_order(db, order.id).await
}

/// Applies a partial update to a seller order.
#[instrument(skip(db, patch))]
pub async fn update_seller_order(
    db: &DatabaseConnection,
    seller_order_id: i64,
    patch: SellerOrderPatch,
) -> Result<SellerOrderDetail> {
    if let Some(discount) = patch.discount {
        pricing::validate_amount(discount)?;
    }
    if let Some(fee) = patch.delivery_fee {
        pricing::validate_amount(fee)?;
    }
    let txn = db.begin().await?;

    let existing = SellerOrder::find_by_id(seller_order_id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("seller order", seller_order_id))?;
    let stored_lines = load_stored_lines(&txn, seller_order_id).await?;

    let requested_ids = patch.items.iter().flatten().map(|line| line.item_id);
    let catalog = item::load_catalog(
        &txn,
        stored_lines.iter().map(|line| line.item_id).chain(requested_ids),
    )
    .await?;

    let mut plan = match &patch.items {
        Some(items) => {
            let requested = reconcile::merge_requests(items, &catalog)?;
            reconcile::plan_lines(&stored_lines, &requested, &catalog, PriceSource::Cost)?
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
        lines::apply_stock(&txn, &stored_lines, &plan, StockDirection::Acquire).await?;

    let seller_id = if patch.seller_id.is_some() || patch.seller.is_some() {
        resolve_seller(&txn, patch.seller_id, patch.seller).await?
    } else {
        existing.seller_id
    };

    let totals = pricing::compute_totals(
        plan.subtotal(),
        patch.discount.unwrap_or(existing.discount),
        patch.delivery_fee.unwrap_or(existing.delivery_fee),
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

    let mut order: seller_order::ActiveModel = existing.into();
    order.seller_id = Set(seller_id);
    order.payment_status = Set(payment_status);
    order.delivery_status = Set(delivery_status);
    order.paid_at = Set(paid_at);
    order.delivered_at = Set(delivered_at);
    order.subtotal = Set(totals.subtotal);
    order.discount = Set(totals.discount);
    order.delivery_fee = Set(totals.delivery_fee);
    order.total = Set(totals.total);
    if patch.notes.is_some() {
        order.notes = Set(clean_text(patch.notes));
    }
    order.updated_at = Set(now);
    order.update(&txn).await?;

    lines::sync_lines::<SellerOrderItem, _>(&txn, seller_order_id, &plan).await?;
    txn.commit().await?;

    info!(seller_order_id, stock_changes, "Seller order updated");
    get_seller_order(db, seller_order_id).await
}

/// Deletes a seller order; received stock is taken back out.
#[instrument(skip(db))]
pub async fn delete_seller_order(db: &DatabaseConnection, seller_order_id: i64) -> Result<()> {
    let txn = db.begin().await?;

    let order = SellerOrder::find_by_id(seller_order_id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("seller order", seller_order_id))?;
    let stored_lines = load_stored_lines(&txn, seller_order_id).await?;
    lines::apply_stock(
        &txn,
        &stored_lines,
        &LinePlan::default(),
        StockDirection::Acquire,
    )
    .await?;

    lines::delete_lines::<SellerOrderItem, _>(&txn, seller_order_id).await?;
    order.delete(&txn).await?;

    txn.commit().await?;
    info!(seller_order_id, "Seller order deleted");
    Ok(())
}

/// Loads a seller order with its seller and lines.
pub async fn get_seller_order<C>(db: &C, seller_order_id: i64) -> Result<SellerOrderDetail>
where
    C: ConnectionTrait,
{
    let (order, seller) = SellerOrder::find_by_id(seller_order_id)
        .find_also_related(Seller)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("seller order", seller_order_id))?;

    let items = lines::detail_lines::<SellerOrderItem, _>(db, seller_order_id).await?;

    Ok(SellerOrderDetail {
        order,
        seller,
        items,
    })
}

/// Lists seller orders newest first.
pub async fn list_seller_orders(
    db: &DatabaseConnection,
    filter: &SellerOrderFilter,
    page: Page,
) -> Result<Paginated<SellerOrderSummary>> {
    let mut query = SellerOrder::find().find_also_related(Seller);

    if let Some(search) = clean_search(filter.search.as_deref()) {
        let mut any = Condition::any()
            .add(seller_entity::Column::Name.contains(search))
            .add(seller_entity::Column::Whatsapp.contains(search))
            .add(seller_order::Column::Notes.contains(search));
        if let Ok(id) = search.trim_start_matches('#').parse::<i64>() {
            any = any.add(seller_order::Column::Id.eq(id));
        }
        query = query.filter(any);
    }
    if let Some(status) = filter.payment_status {
        query = query.filter(seller_order::Column::PaymentStatus.eq(status));
    }
    if let Some(status) = filter.delivery_status {
        query = query.filter(seller_order::Column::DeliveryStatus.eq(status));
    }

    let paginator = query
        .filter(filter.range.condition(seller_order::Column::CreatedAt))
        .order_by_desc(seller_order::Column::CreatedAt)
        .order_by_desc(seller_order::Column::Id)
        .paginate(db, page.limit);
    let total = paginator.num_items().await?;
    let data = paginator
        .fetch_page(page.index())
        .await?
        .into_iter()
        .map(|(order, seller)| SellerOrderSummary {
            order,
            seller_name: seller.as_ref().map(|s| s.name.clone()),
            seller_whatsapp: seller.and_then(|s| s.whatsapp),
        })
        .collect();

    Ok(Paginated::new(data, page, total))
}

/// Seller orders created inside `range`, oldest first, with their sellers.
pub async fn get_seller_orders_in_range(
    db: &DatabaseConnection,
    range: &DateRange,
) -> Result<Vec<(seller_order::Model, Option<seller_entity::Model>)>> {
    SellerOrder::find()
        .find_also_related(Seller)
        .filter(range.condition(seller_order::Column::CreatedAt))
        .order_by_asc(seller_order::Column::CreatedAt)
        .order_by_asc(seller_order::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// All lines of the seller orders matching `orders`.
pub async fn get_lines_for_seller_orders(
    db: &DatabaseConnection,
    orders: Condition,
) -> Result<Vec<seller_order_item::Model>> {
    let order_ids = SellerOrder::find()
        .select_only()
        .column(seller_order::Column::Id)
        .filter(orders)
        .into_query();
    lines::lines_matching::<SellerOrderItem, _>(db, order_ids).await
}

async fn load_stored_lines<C>(db: &C, seller_order_id: i64) -> Result<Vec<ExistingLine>>
where
    C: ConnectionTrait,
{
    Ok(lines::lines_of::<SellerOrderItem, _>(db, seller_order_id)
        .await?
        .iter()
        .map(SellerOrderItem::existing)
        .collect())
}

async fn resolve_seller<C>(
    db: &C,
    seller_id: Option<i64>,
    inline: Option<ContactInput>,
) -> Result<Option<i64>>
where
    C: ConnectionTrait,
{
    if let Some(seller_id) = seller_id {
        seller::get_seller_by_id(db, seller_id)
            .await?
            .ok_or_else(|| Error::not_found("seller", seller_id))?;
        return Ok(Some(seller_id));
    }
    match inline {
        Some(contact) => Ok(Some(seller::upsert_seller(db, contact).await?.0.id)),
        None => Ok(None),
    }
}
