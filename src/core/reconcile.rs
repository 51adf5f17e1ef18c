//! Line and stock reconciliation for order writes.
//!
//! Creating, editing and deleting an order all go through the same steps:
//!
//! 1. merge the requested lines per item and normalize their quantities,
//! 2. match them against the lines already stored, keeping the stored price
//!    snapshot for items that stay and snapshotting the catalog price for
//!    items that are new,
//! 3. compare the stock held by the order before and after the write and
//!    apply only the difference.
//!
//! Each stored line remembers whether its quantity has moved stock
//! (`stock_applied`). The "before" side is built from those flags rather
//! than from the item's current stock mode, so switching an item between
//! `TRACK` and `RESELL` never gives back stock that was not taken.
//!
//! Everything here is pure; the order modules run it inside a database
//! transaction and persist the result.

use crate::{
    core::pricing,
    entities::{DeliveryStatus, StockMode, item},
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Items referenced by an order write, keyed by id
pub type Catalog = HashMap<i64, item::Model>;

/// Net stock effect per tracked item
pub type StockEffect = BTreeMap<i64, i64>;

/// One requested line: which item and how much
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct LineRequest {
    /// Catalog item id
    pub item_id: i64,
    /// Requested quantity before normalization
    pub quantity: f64,
}

/// A line as currently stored
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExistingLine {
    /// Line row id
    pub id: i64,
    /// Catalog item id
    pub item_id: i64,
    /// Stored quantity
    pub quantity: f64,
    /// Stored price snapshot
    pub price: f64,
    /// Stored cost snapshot
    pub cost_price: f64,
    /// Whether the quantity currently sits in the stock count
    pub stock_applied: bool,
}

/// A line as it should be after the write
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlannedLine {
    /// Row id for kept lines, `None` for lines to insert
    pub id: Option<i64>,
    /// Catalog item id
    pub item_id: i64,
    /// Normalized quantity
    pub quantity: f64,
    /// Price snapshot
    pub price: f64,
    /// Cost snapshot
    pub cost_price: f64,
    /// `quantity * price`, rounded
    pub line_total: f64,
    /// Whether the quantity sits in the stock count after the write
    pub stock_applied: bool,
}

/// The complete set of line changes for one write
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinePlan {
    /// Lines present after the write, kept and new
    pub lines: Vec<PlannedLine>,
    /// Row ids of lines to delete
    pub removed: Vec<i64>,
}

impl LinePlan {
    /// Sum of rounded line totals
    #[must_use]
    pub fn subtotal(&self) -> f64 {
        pricing::sum(self.lines.iter().map(|line| line.line_total))
    }

    /// Decides which lines hold stock once the order is in `status`.
    ///
    /// Nothing holds stock unless the order ends up delivered. While an
    /// order stays delivered, kept lines keep the flag they had; lines that
    /// enter the delivered state hold stock when their item is `TRACK`.
    pub fn mark_stock(
        &mut self,
        was_delivered: bool,
        status: DeliveryStatus,
        catalog: &Catalog,
    ) {
        for line in &mut self.lines {
            line.stock_applied = if !status.is_delivered() {
                false
            } else if was_delivered && line.id.is_some() {
                line.stock_applied
            } else {
                catalog
                    .get(&line.item_id)
                    .is_some_and(|item| item.stock_mode == StockMode::Track)
            };
        }
    }

    /// Stock held by the planned lines, per item.
    #[must_use]
    pub fn stock_effect(&self) -> StockEffect {
        collect_effect(
            self.lines
                .iter()
                .filter(|line| line.stock_applied)
                .map(|line| (line.item_id, line.quantity)),
        )
    }

    /// Fails when the write would leave the order without lines.
    pub fn ensure_not_empty(&self) -> Result<()> {
        if self.lines.is_empty() {
            return Err(Error::validation("Order must contain at least one item"));
        }
        Ok(())
    }
}

/// Which catalog price a new line snapshots
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceSource {
    /// Selling price, for customer orders
    Sale,
    /// Cost price, for seller (purchase) orders
    Cost,
}

impl PriceSource {
    fn price_of(self, item: &item::Model) -> f64 {
        match self {
            Self::Sale => item.price,
            Self::Cost => item.cost_price,
        }
    }
}

/// How a delivered order moves stock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockDirection {
    /// Customer orders take stock out
    Consume,
    /// Seller orders bring stock in
    Acquire,
}

/// Merges requested lines per item and normalizes quantities by unit.
///
/// Duplicate item ids are summed before normalizing. Lines that normalize
/// to zero are dropped.
///
/// # Errors
/// - [`Error::Validation`] for a non-finite quantity
/// - [`Error::NotFound`] for an item missing from the catalog
pub fn merge_requests(requests: &[LineRequest], catalog: &Catalog) -> Result<BTreeMap<i64, f64>> {
    let mut raw: BTreeMap<i64, Decimal> = BTreeMap::new();
    for request in requests {
        if !request.quantity.is_finite() {
            return Err(Error::validation(format!(
                "Invalid quantity for item {}",
                request.item_id
            )));
        }
        let total = raw.entry(request.item_id).or_default();
        *total = total.saturating_add(pricing::to_decimal(request.quantity));
    }

    let mut merged = BTreeMap::new();
    for (item_id, quantity) in raw {
        let item = catalog
            .get(&item_id)
            .ok_or_else(|| Error::not_found("item", item_id))?;
        let quantity = pricing::normalize_quantity(item.unit, pricing::to_f64(quantity));
        if quantity > 0.0 {
            merged.insert(item_id, quantity);
        }
    }
    Ok(merged)
}

/// Matches requested lines against stored lines.
///
/// Kept lines retain their stored snapshots and only change quantity; new
/// lines snapshot the current catalog price picked by `source`; stored lines
/// whose item is no longer requested are marked for removal.
///
/// # Errors
/// [`Error::Validation`] when a new line references a deleted item.
pub fn plan_lines(
    existing: &[ExistingLine],
    requested: &BTreeMap<i64, f64>,
    catalog: &Catalog,
    source: PriceSource,
) -> Result<LinePlan> {
    let mut stored: HashMap<i64, ExistingLine> = HashMap::new();
    let mut removed = Vec::new();
    for line in existing {
        // Duplicate rows for one item collapse onto the first.
        if stored.contains_key(&line.item_id) {
            removed.push(line.id);
        } else {
            stored.insert(line.item_id, *line);
        }
    }

    let mut lines = Vec::with_capacity(requested.len());
    for (&item_id, &quantity) in requested {
        let planned = if let Some(old) = stored.remove(&item_id) {
            PlannedLine {
                id: Some(old.id),
                item_id,
                quantity,
                price: old.price,
                cost_price: old.cost_price,
                line_total: pricing::line_total(quantity, old.price),
                stock_applied: old.stock_applied,
            }
        } else {
            let item = catalog
                .get(&item_id)
                .ok_or_else(|| Error::not_found("item", item_id))?;
            if item.is_deleted {
                return Err(Error::validation(format!(
                    "Item '{}' is no longer available",
                    item.name
                )));
            }
            let price = source.price_of(item);
            PlannedLine {
                id: None,
                item_id,
                quantity,
                price,
                cost_price: item.cost_price,
                line_total: pricing::line_total(quantity, price),
                stock_applied: false,
            }
        };
        lines.push(planned);
    }

    removed.extend(stored.into_values().map(|line| line.id));
    removed.sort_unstable();

    Ok(LinePlan { lines, removed })
}

/// Plan for a write that leaves the lines untouched.
#[must_use]
pub fn keep_existing(existing: &[ExistingLine]) -> LinePlan {
    LinePlan {
        lines: existing
            .iter()
            .map(|line| PlannedLine {
                id: Some(line.id),
                item_id: line.item_id,
                quantity: line.quantity,
                price: line.price,
                cost_price: line.cost_price,
                line_total: pricing::line_total(line.quantity, line.price),
                stock_applied: line.stock_applied,
            })
            .collect(),
        removed: Vec::new(),
    }
}

/// Stock held by stored lines, per item.
#[must_use]
pub fn held_stock(lines: &[ExistingLine]) -> StockEffect {
    collect_effect(
        lines
            .iter()
            .filter(|line| line.stock_applied)
            .map(|line| (line.item_id, line.quantity)),
    )
}

fn collect_effect<I>(lines: I) -> StockEffect
where
    I: IntoIterator<Item = (i64, f64)>,
{
    let mut effect = StockEffect::new();
    for (item_id, quantity) in lines {
        *effect.entry(item_id).or_default() += whole_pieces(quantity);
    }
    effect
}

/// Stock changes that turn the `before` effect into the `after` effect.
///
/// Returned as `(item_id, delta)` with increases first, so restocking from
/// one line happens before another line draws from the same shelf.
#[must_use]
pub fn stock_deltas(
    before: &StockEffect,
    after: &StockEffect,
    direction: StockDirection,
) -> Vec<(i64, i64)> {
    let items: BTreeSet<i64> = before.keys().chain(after.keys()).copied().collect();

    let mut deltas: Vec<(i64, i64)> = items
        .into_iter()
        .filter_map(|item_id| {
            let held_before = before.get(&item_id).copied().unwrap_or_default();
            let held_after = after.get(&item_id).copied().unwrap_or_default();
            let change = held_after - held_before;
            let delta = match direction {
                StockDirection::Consume => -change,
                StockDirection::Acquire => change,
            };
            (delta != 0).then_some((item_id, delta))
        })
        .collect();

    deltas.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    deltas
}

/// Timestamp for a status flag after a transition: stamped on entry,
/// cleared on exit, preserved while the flag stays set.
#[must_use]
pub fn stamp_transition(
    previous: Option<DateTime<Utc>>,
    was_set: bool,
    is_set: bool,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    match (was_set, is_set) {
        (_, false) => None,
        (false, true) => Some(now),
        (true, true) => previous.or(Some(now)),
    }
}

// Stock is only applied for PCS items, so quantities are whole numbers.
#[allow(clippy::cast_possible_truncation)]
fn whole_pieces(quantity: f64) -> i64 {
    quantity.trunc() as i64
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::entities::Unit;

    fn item(id: i64, unit: Unit, mode: StockMode, price: f64) -> item::Model {
        let now = Utc::now();
        item::Model {
            id,
            name: format!("Item {id}"),
            price,
            cost_price: price / 2.0,
            unit,
            stock_mode: mode,
            stock: 10,
            category_id: None,
            is_deleted: false,
            created_at: now,
            updated_at: now,
        }
    }

    fn catalog() -> Catalog {
        [
            item(1, Unit::Pcs, StockMode::Track, 5_000.0),
            item(2, Unit::Kg, StockMode::Resell, 30_000.0),
            item(3, Unit::Pcs, StockMode::Track, 12_000.0),
        ]
        .into_iter()
        .map(|item| (item.id, item))
        .collect()
    }

    fn request(item_id: i64, quantity: f64) -> LineRequest {
        LineRequest { item_id, quantity }
    }

    fn stored(id: i64, item_id: i64, quantity: f64, stock_applied: bool) -> ExistingLine {
        ExistingLine {
            id,
            item_id,
            quantity,
            price: 5_000.0,
            cost_price: 2_500.0,
            stock_applied,
        }
    }

    #[test]
    fn test_merge_sums_duplicates_and_normalizes() {
        let merged = merge_requests(
            &[request(1, 1.7), request(1, 1.0), request(2, 0.2504)],
            &catalog(),
        )
        .unwrap();

        assert_eq!(merged.get(&1), Some(&2.0));
        assert_eq!(merged.get(&2), Some(&0.25));
    }

    #[test]
    fn test_merge_sums_weights_exactly() {
        let merged = merge_requests(
            &[request(2, 0.1), request(2, 0.2), request(2, 0.2005)],
            &catalog(),
        )
        .unwrap();
        assert_eq!(merged.get(&2), Some(&0.501));
    }

    #[test]
    fn test_merge_drops_zero_lines() {
        let merged = merge_requests(&[request(1, 0.4), request(3, -2.0)], &catalog()).unwrap();
        assert!(merged.is_empty());
    }

    #[test]
    fn test_merge_rejects_unknown_item() {
        let result = merge_requests(&[request(99, 1.0)], &catalog());
        assert!(matches!(
            result,
            Err(Error::NotFound {
                entity: "item",
                id: _
            })
        ));
    }

    #[test]
    fn test_merge_rejects_non_finite_quantity() {
        let result = merge_requests(&[request(1, f64::NAN)], &catalog());
        assert!(matches!(result, Err(Error::Validation { message: _ })));
    }

    #[test]
    fn test_new_lines_snapshot_catalog_price() {
        let catalog = catalog();
        let requested = merge_requests(&[request(1, 3.0)], &catalog).unwrap();

        let sale = plan_lines(&[], &requested, &catalog, PriceSource::Sale).unwrap();
        assert_eq!(sale.lines[0].price, 5_000.0);
        assert_eq!(sale.lines[0].line_total, 15_000.0);
        assert_eq!(sale.lines[0].id, None);

        let cost = plan_lines(&[], &requested, &catalog, PriceSource::Cost).unwrap();
        assert_eq!(cost.lines[0].price, 2_500.0);
    }

    #[test]
    fn test_kept_lines_keep_their_snapshot() {
        let mut catalog = catalog();
        let existing = [ExistingLine {
            id: 7,
            item_id: 1,
            quantity: 2.0,
            price: 4_000.0,
            cost_price: 1_000.0,
            stock_applied: true,
        }];
        // Catalog price changed since the line was created
        catalog.get_mut(&1).unwrap().price = 9_999.0;

        let requested = merge_requests(&[request(1, 5.0)], &catalog).unwrap();
        let plan = plan_lines(&existing, &requested, &catalog, PriceSource::Sale).unwrap();

        assert_eq!(plan.lines.len(), 1);
        assert_eq!(plan.lines[0].id, Some(7));
        assert_eq!(plan.lines[0].price, 4_000.0);
        assert_eq!(plan.lines[0].cost_price, 1_000.0);
        assert_eq!(plan.lines[0].quantity, 5.0);
        assert!(plan.lines[0].stock_applied);
        assert_eq!(plan.subtotal(), 20_000.0);
        assert!(plan.removed.is_empty());
    }

    #[test]
    fn test_missing_lines_are_removed() {
        let catalog = catalog();
        let existing = [stored(1, 1, 1.0, false), stored(2, 3, 1.0, false)];
        let requested = merge_requests(&[request(3, 2.0)], &catalog).unwrap();
        let plan = plan_lines(&existing, &requested, &catalog, PriceSource::Sale).unwrap();

        assert_eq!(plan.removed, vec![1]);
        assert_eq!(plan.lines[0].id, Some(2));
    }

    #[test]
    fn test_new_line_for_deleted_item_is_rejected() {
        let mut catalog = catalog();
        catalog.get_mut(&3).unwrap().is_deleted = true;
        let requested = merge_requests(&[request(3, 1.0)], &catalog).unwrap();

        let result = plan_lines(&[], &requested, &catalog, PriceSource::Sale);
        assert!(matches!(result, Err(Error::Validation { message: _ })));
    }

    #[test]
    fn test_empty_plan_is_rejected() {
        assert!(LinePlan::default().ensure_not_empty().is_err());
    }

    #[test]
    fn test_delivering_marks_tracked_items() {
        let catalog = catalog();
        let requested = merge_requests(
            &[request(1, 2.0), request(2, 1.5), request(3, 4.0)],
            &catalog,
        )
        .unwrap();
        let mut plan = plan_lines(&[], &requested, &catalog, PriceSource::Sale).unwrap();

        plan.mark_stock(false, DeliveryStatus::Delivered, &catalog);
        assert_eq!(plan.stock_effect(), StockEffect::from([(1, 2), (3, 4)]));

        plan.mark_stock(true, DeliveryStatus::Pending, &catalog);
        assert!(plan.stock_effect().is_empty());
    }

    #[test]
    fn test_held_stock_counts_applied_lines_only() {
        let lines = [stored(1, 1, 2.0, true), stored(2, 3, 4.0, false)];
        assert_eq!(held_stock(&lines), StockEffect::from([(1, 2)]));
    }

    #[test]
    fn test_kept_lines_keep_their_flag_while_delivered() {
        // Item 1 is TRACK now, but the line was delivered while it was not
        let catalog = catalog();
        let existing = [stored(4, 1, 3.0, false)];
        let requested = merge_requests(&[request(1, 3.0), request(3, 1.0)], &catalog).unwrap();
        let mut plan = plan_lines(&existing, &requested, &catalog, PriceSource::Sale).unwrap();

        plan.mark_stock(true, DeliveryStatus::Delivered, &catalog);

        // Only the newly added line draws stock
        assert_eq!(plan.stock_effect(), StockEffect::from([(3, 1)]));
        let deltas = stock_deltas(
            &held_stock(&existing),
            &plan.stock_effect(),
            StockDirection::Consume,
        );
        assert_eq!(deltas, vec![(3, -1)]);
    }

    #[test]
    fn test_undelivering_returns_only_what_was_taken() {
        let catalog = catalog();
        let existing = [stored(4, 1, 3.0, false), stored(5, 3, 2.0, true)];
        let mut plan = keep_existing(&existing);

        plan.mark_stock(true, DeliveryStatus::Pending, &catalog);

        let deltas = stock_deltas(
            &held_stock(&existing),
            &plan.stock_effect(),
            StockDirection::Consume,
        );
        assert_eq!(deltas, vec![(3, 2)]);
    }

    #[test]
    fn test_delivering_consumes_stock() {
        let after = StockEffect::from([(1, 2), (3, 4)]);
        let deltas = stock_deltas(&StockEffect::new(), &after, StockDirection::Consume);
        assert_eq!(deltas, vec![(1, -2), (3, -4)]);
    }

    #[test]
    fn test_undelivering_restores_prior_quantities() {
        let before = StockEffect::from([(1, 2)]);
        let deltas = stock_deltas(&before, &StockEffect::new(), StockDirection::Consume);
        assert_eq!(deltas, vec![(1, 2)]);
    }

    #[test]
    fn test_edit_while_delivered_applies_only_the_difference() {
        let before = StockEffect::from([(1, 2), (3, 4)]);
        let after = StockEffect::from([(1, 5), (3, 1)]);
        let deltas = stock_deltas(&before, &after, StockDirection::Consume);
        // restock first, then draw
        assert_eq!(deltas, vec![(3, 3), (1, -3)]);
    }

    #[test]
    fn test_acquire_direction_adds_stock() {
        let after = StockEffect::from([(1, 6)]);
        let deltas = stock_deltas(&StockEffect::new(), &after, StockDirection::Acquire);
        assert_eq!(deltas, vec![(1, 6)]);
    }

    #[test]
    fn test_unchanged_effect_has_no_deltas() {
        let effect = StockEffect::from([(1, 2)]);
        assert!(stock_deltas(&effect, &effect, StockDirection::Consume).is_empty());
    }

    #[test]
    fn test_stamp_transition() {
        let earlier = Utc::now() - chrono::Duration::hours(1);
        let now = Utc::now();

        assert_eq!(stamp_transition(None, false, true, now), Some(now));
        assert_eq!(stamp_transition(Some(earlier), true, true, now), Some(earlier));
        assert_eq!(stamp_transition(Some(earlier), true, false, now), None);
        assert_eq!(stamp_transition(None, false, false, now), None);
    }
}
