//! Line storage shared by customer and seller orders.
//!
//! Both kinds of order keep their lines in a table of the same shape.
//! [`OrderLines`] names the columns of one such table; the functions here
//! load, persist and stock-reconcile lines for either of them.

use crate::{
    core::{
        item,
        reconcile::{self, ExistingLine, LinePlan, PlannedLine, StockDirection},
    },
    entities::{Item, Unit},
    errors::Result,
};
use sea_orm::{
    ConnectionTrait, QueryOrder, prelude::*,
    sea_query::{Expr, SelectStatement},
};
use serde::Serialize;

/// A line table owned by an order header
pub trait OrderLines: EntityTrait + Related<Item> {
    /// Primary key
    const ID: Self::Column;
    /// Id of the owning order
    const ORDER_ID: Self::Column;
    /// Normalized quantity
    const QUANTITY: Self::Column;
    /// Rounded line total
    const LINE_TOTAL: Self::Column;
    /// Whether the quantity moved stock
    const STOCK_APPLIED: Self::Column;

    /// A stored row as the reconciler sees it.
    fn existing(line: &Self::Model) -> ExistingLine;

    /// The row to insert for a newly planned line.
    fn new_row(order_id: i64, line: &PlannedLine) -> Self::ActiveModel;
}

/// A stored line with the item's display fields
#[derive(Debug, Clone, Serialize)]
pub struct DetailLine<M> {
    /// The stored row
    #[serde(flatten)]
    pub line: M,
    /// Item name, or a placeholder when the item is gone
    pub item_name: String,
    /// Unit the item is sold in
    pub unit: Unit,
}

/// Lines of one order, oldest first.
pub async fn lines_of<E, C>(db: &C, order_id: i64) -> Result<Vec<E::Model>>
where
    E: OrderLines,
    C: ConnectionTrait,
{
    E::find()
        .filter(E::ORDER_ID.eq(order_id))
        .order_by_asc(E::ID)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Lines of one order joined with their items.
pub async fn detail_lines<E, C>(db: &C, order_id: i64) -> Result<Vec<DetailLine<E::Model>>>
where
    E: OrderLines,
    C: ConnectionTrait,
{
    let rows = E::find()
        .filter(E::ORDER_ID.eq(order_id))
        .find_also_related(Item)
        .order_by_asc(E::ID)
        .all(db)
        .await?;

    Ok(rows
        .into_iter()
        .map(|(line, item)| DetailLine {
            item_name: item.as_ref().map_or_else(
                || format!("Item #{}", E::existing(&line).item_id),
                |i| i.name.clone(),
            ),
            unit: item.map(|i| i.unit).unwrap_or_default(),
            line,
        })
        .collect())
}

/// Lines of every order whose id the `order_ids` query selects.
///
/// The ids stay inside the database as a subquery, so the number of orders
/// is not limited by how many values one statement may bind.
pub async fn lines_matching<E, C>(db: &C, order_ids: SelectStatement) -> Result<Vec<E::Model>>
where
    E: OrderLines,
    C: ConnectionTrait,
{
    E::find()
        .filter(E::ORDER_ID.in_subquery(order_ids))
        .order_by_asc(E::ID)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Persists a line plan: removed rows go, kept rows get their new quantity
/// and stock flag, new rows are inserted.
pub async fn sync_lines<E, C>(db: &C, order_id: i64, plan: &LinePlan) -> Result<()>
where
    E: OrderLines,
    C: ConnectionTrait,
{
    if !plan.removed.is_empty() {
        E::delete_many()
            .filter(E::ID.is_in(plan.removed.clone()))
            .exec(db)
            .await?;
    }

    for line in &plan.lines {
        match line.id {
            Some(line_id) => {
                E::update_many()
                    .col_expr(E::QUANTITY, Expr::value(line.quantity))
                    .col_expr(E::LINE_TOTAL, Expr::value(line.line_total))
                    .col_expr(E::STOCK_APPLIED, Expr::value(line.stock_applied))
                    .filter(E::ID.eq(line_id))
                    .exec(db)
                    .await?;
            }
            None => {
                E::insert(E::new_row(order_id, line)).exec(db).await?;
            }
        }
    }
    Ok(())
}

/// Removes every line of an order.
pub async fn delete_lines<E, C>(db: &C, order_id: i64) -> Result<()>
where
    E: OrderLines,
    C: ConnectionTrait,
{
    E::delete_many()
        .filter(E::ORDER_ID.eq(order_id))
        .exec(db)
        .await?;
    Ok(())
}

/// Moves stock from what `stored` holds to what `plan` holds.
///
/// Returns how many items changed.
pub async fn apply_stock<C>(
    db: &C,
    stored: &[ExistingLine],
    plan: &LinePlan,
    direction: StockDirection,
) -> Result<usize>
where
    C: ConnectionTrait,
{
    let deltas = reconcile::stock_deltas(
        &reconcile::held_stock(stored),
        &plan.stock_effect(),
        direction,
    );
    item::apply_stock_deltas(db, &deltas).await?;
    Ok(deltas.len())
}
