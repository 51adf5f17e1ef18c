//! CSV exports for customers, sellers, items and orders.

use crate::{
    core::{
        csv::{CsvWriter, excel_text},
        customer, item, order,
        query::DateRange,
        seller, seller_order,
    },
    entities::{
        Category, Item, Unit, item as item_entity, order as order_entity,
        seller_order as seller_order_entity,
    },
    errors::Result,
};
use sea_orm::{DatabaseConnection, QueryOrder, prelude::*};
use serde::Deserialize;
use std::collections::HashMap;

/// Column layout for customer and seller exports
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContactCsvFormat {
    /// `name,whatsapp,address`; the format the importer reads
    #[default]
    Simple,
    /// Adds id, notes, order count, total and creation date
    Full,
}

const SIMPLE_HEADER: &[&str] = &["name", "whatsapp", "address"];

fn phone_cell(whatsapp: Option<&str>) -> String {
    whatsapp.map(excel_text).unwrap_or_default()
}

fn date_cell(at: Option<chrono::DateTime<chrono::Utc>>) -> String {
    at.map(|at| at.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default()
}

/// Exports all customers.
pub async fn export_customers(db: &DatabaseConnection, format: ContactCsvFormat) -> Result<String> {
    let customers = customer::get_all_customers(db).await?;

    let mut writer = match format {
        ContactCsvFormat::Simple => CsvWriter::with_header(SIMPLE_HEADER),
        ContactCsvFormat::Full => CsvWriter::with_header(&[
            "id",
            "name",
            "whatsapp",
            "address",
            "notes",
            "order_count",
            "total_spent",
            "created_at",
        ]),
    };

    if format == ContactCsvFormat::Simple {
        for c in &customers {
            writer.write_row([
                c.name.clone(),
                phone_cell(c.whatsapp.as_deref()),
                c.address.clone().unwrap_or_default(),
            ]);
        }
        return Ok(writer.finish());
    }

    let stats = customer::get_customer_stats(db).await?;
    for c in &customers {
        let stat = stats.get(&c.id).copied().unwrap_or_default();
        writer.write_row([
            c.id.to_string(),
            c.name.clone(),
            phone_cell(c.whatsapp.as_deref()),
            c.address.clone().unwrap_or_default(),
            c.notes.clone().unwrap_or_default(),
            stat.order_count.to_string(),
            stat.total_spent.to_string(),
            date_cell(Some(c.created_at)),
        ]);
    }
    Ok(writer.finish())
}

/// Exports all sellers.
pub async fn export_sellers(db: &DatabaseConnection, format: ContactCsvFormat) -> Result<String> {
    let sellers = seller::get_all_sellers(db).await?;

    if format == ContactCsvFormat::Simple {
        let mut writer = CsvWriter::with_header(SIMPLE_HEADER);
        for s in &sellers {
            writer.write_row([
                s.name.clone(),
                phone_cell(s.whatsapp.as_deref()),
                s.address.clone().unwrap_or_default(),
            ]);
        }
        return Ok(writer.finish());
    }

    let stats = seller::get_seller_stats(db).await?;
    let mut writer = CsvWriter::with_header(&[
        "id",
        "name",
        "whatsapp",
        "address",
        "notes",
        "order_count",
        "total_purchased",
        "created_at",
    ]);
    for s in &sellers {
        let stat = stats.get(&s.id).copied().unwrap_or_default();
        writer.write_row([
            s.id.to_string(),
            s.name.clone(),
            phone_cell(s.whatsapp.as_deref()),
            s.address.clone().unwrap_or_default(),
            s.notes.clone().unwrap_or_default(),
            stat.order_count.to_string(),
            stat.total_purchased.to_string(),
            date_cell(Some(s.created_at)),
        ]);
    }
    Ok(writer.finish())
}

/// Exports active items with their category name.
pub async fn export_items(db: &DatabaseConnection) -> Result<String> {
    let items = Item::find()
        .filter(item_entity::Column::IsDeleted.eq(false))
        .find_also_related(Category)
        .order_by_asc(item_entity::Column::Name)
        .all(db)
        .await?;

    let mut writer = CsvWriter::with_header(&[
        "id",
        "name",
        "category",
        "unit",
        "stock_mode",
        "stock",
        "price",
        "cost_price",
    ]);
    for (item, category) in items {
        writer.write_row([
            item.id.to_string(),
            item.name,
            category.map(|c| c.name).unwrap_or_default(),
            item.unit.as_str().to_string(),
            item.stock_mode.as_str().to_string(),
            item.stock.to_string(),
            item.price.to_string(),
            item.cost_price.to_string(),
        ]);
    }
    Ok(writer.finish())
}

/// `"Apel x2; Anggur x0.5 KG"` for a set of lines.
fn describe_lines<I>(lines: I, names: &HashMap<i64, (String, Unit)>) -> String
where
    I: IntoIterator<Item = (i64, f64)>,
{
    lines
        .into_iter()
        .map(|(item_id, quantity)| match names.get(&item_id) {
            Some((name, Unit::Kg)) => format!("{name} x{quantity} KG"),
            Some((name, Unit::Pcs)) => format!("{name} x{quantity}"),
            None => format!("Item #{item_id} x{quantity}"),
        })
        .collect::<Vec<_>>()
        .join("; ")
}

async fn item_names<I>(db: &DatabaseConnection, ids: I) -> Result<HashMap<i64, (String, Unit)>>
where
    I: IntoIterator<Item = i64>,
{
    Ok(item::load_catalog(db, ids)
        .await?
        .into_values()
        .map(|item| (item.id, (item.name, item.unit)))
        .collect())
}

/// Exports orders created in `range`, one row per order.
pub async fn export_orders(db: &DatabaseConnection, range: &DateRange) -> Result<String> {
    let orders = order::get_orders_in_range(db, range).await?;
    let lines =
        order::get_lines_for_orders(db, range.condition(order_entity::Column::CreatedAt)).await?;
    let names = item_names(db, lines.iter().map(|line| line.item_id)).await?;

    let mut by_order: HashMap<i64, Vec<(i64, f64)>> = HashMap::new();
    for line in &lines {
        by_order
            .entry(line.order_id)
            .or_default()
            .push((line.item_id, line.quantity));
    }

    let mut writer = CsvWriter::with_header(&[
        "id",
        "created_at",
        "customer",
        "whatsapp",
        "items",
        "subtotal",
        "discount",
        "total",
        "payment_status",
        "delivery_status",
        "paid_at",
        "delivered_at",
        "notes",
    ]);
    for (order, customer) in orders {
        let items = describe_lines(by_order.remove(&order.id).unwrap_or_default(), &names);
        let (name, whatsapp) = customer.map_or((String::new(), None), |c| (c.name, c.whatsapp));
        writer.write_row([
            order.id.to_string(),
            date_cell(Some(order.created_at)),
            name,
            phone_cell(whatsapp.as_deref()),
            items,
            order.subtotal.to_string(),
            order.discount.to_string(),
            order.total.to_string(),
            order.payment_status.as_str().to_string(),
            order.delivery_status.as_str().to_string(),
            date_cell(order.paid_at),
            date_cell(order.delivered_at),
            order.notes.unwrap_or_default(),
        ]);
    }
    Ok(writer.finish())
}

/// Exports seller orders created in `range`, one row per order.
pub async fn export_seller_orders(db: &DatabaseConnection, range: &DateRange) -> Result<String> {
    let orders = seller_order::get_seller_orders_in_range(db, range).await?;
    let lines = seller_order::get_lines_for_seller_orders(
        db,
        range.condition(seller_order_entity::Column::CreatedAt),
    )
    .await?;
    let names = item_names(db, lines.iter().map(|line| line.item_id)).await?;

    let mut by_order: HashMap<i64, Vec<(i64, f64)>> = HashMap::new();
    for line in &lines {
        by_order
            .entry(line.seller_order_id)
            .or_default()
            .push((line.item_id, line.quantity));
    }

    let mut writer = CsvWriter::with_header(&[
        "id",
        "created_at",
        "seller",
        "whatsapp",
        "items",
        "subtotal",
        "discount",
        "delivery_fee",
        "total",
        "payment_status",
        "delivery_status",
        "paid_at",
        "delivered_at",
        "notes",
    ]);
    for (order, seller) in orders {
        let items = describe_lines(by_order.remove(&order.id).unwrap_or_default(), &names);
        let (name, whatsapp) = seller.map_or((String::new(), None), |s| (s.name, s.whatsapp));
        writer.write_row([
            order.id.to_string(),
            date_cell(Some(order.created_at)),
            name,
            phone_cell(whatsapp.as_deref()),
            items,
            order.subtotal.to_string(),
            order.discount.to_string(),
            order.delivery_fee.to_string(),
            order.total.to_string(),
            order.payment_status.as_str().to_string(),
            order.delivery_status.as_str().to_string(),
            date_cell(order.paid_at),
            date_cell(order.delivered_at),
            order.notes.unwrap_or_default(),
        ]);
    }
    Ok(writer.finish())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::{
        core::{
            contact::ContactInput,
            csv::parse,
            order::{NewOrder, create_order},
            reconcile::LineRequest,
        },
        test_utils::*,
    };

    #[tokio::test]
    async fn test_export_customers_simple_and_full() -> Result<()> {
        let db = setup_test_db().await?;
        customer::create_customer(
            &db,
            ContactInput {
                name: "Bu Wati".to_string(),
                whatsapp: Some("0812 000 111".to_string()),
                address: Some("Jl. Melati 3, Bandung".to_string()),
                notes: None,
            },
        )
        .await?;

        let simple = export_customers(&db, ContactCsvFormat::Simple).await?;
        assert!(simple.starts_with('\u{feff}'));
        let rows = parse(&simple)?;
        assert_eq!(rows[0], vec!["name", "whatsapp", "address"]);
        assert_eq!(
            rows[1],
            vec!["Bu Wati", "=\"62812000111\"", "Jl. Melati 3, Bandung"]
        );

        let full = parse(&export_customers(&db, ContactCsvFormat::Full).await?)?;
        assert_eq!(full[0].len(), 8);
        assert_eq!(full[1][5], "0");
        Ok(())
    }

    #[tokio::test]
    async fn test_export_items_and_orders() -> Result<()> {
        let db = setup_test_db().await?;
        let apel = create_tracked_item(&db, "Apel", 5_000.0, 9).await?;
        let anggur = create_weighed_item(&db, "Anggur", 40_000.0).await?;
        create_order(
            &db,
            NewOrder {
                items: vec![
                    LineRequest {
                        item_id: apel.id,
                        quantity: 2.0,
                    },
                    LineRequest {
                        item_id: anggur.id,
                        quantity: 0.5,
                    },
                ],
                ..Default::default()
            },
        )
        .await?;

        let items = parse(&export_items(&db).await?)?;
        assert_eq!(items.len(), 3);
        assert_eq!(items[1][1], "Anggur");
        assert_eq!(items[1][3], "KG");
        assert_eq!(items[1][4], "RESELL");

        let orders = parse(&export_orders(&db, &DateRange::default()).await?)?;
        assert_eq!(orders.len(), 2);
        assert_eq!(orders[1][4], "Apel x2; Anggur x0.5 KG");
        assert_eq!(orders[1][7], "30000");
        Ok(())
    }
}
