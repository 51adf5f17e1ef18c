//! Seller business logic. Sellers mirror customers: same contact fields,
//! same WhatsApp-keyed upsert, but they are referenced by seller orders.

use crate::{
    core::{
        contact::{Contact, ContactInput},
        pricing,
        query::{Page, Paginated, clean_search},
    },
    entities::{Seller, SellerOrder, seller, seller_order},
    errors::{Error, Result},
};
use rust_decimal::Decimal;
use sea_orm::{Condition, ConnectionTrait, PaginatorTrait, QueryOrder, Set, prelude::*};
use std::collections::HashMap;

/// Purchase count and spend for one seller
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SellerStats {
    /// Seller orders placed
    pub order_count: u64,
    /// Sum of seller order totals
    pub total_purchased: f64,
}

/// Lists sellers by name, optionally filtered by name, number or address.
pub async fn list_sellers(
    db: &DatabaseConnection,
    search: Option<&str>,
    page: Page,
) -> Result<Paginated<seller::Model>> {
    let mut query = Seller::find();
    if let Some(search) = clean_search(search) {
        query = query.filter(
            Condition::any()
                .add(seller::Column::Name.contains(search))
                .add(seller::Column::Whatsapp.contains(search))
                .add(seller::Column::Address.contains(search)),
        );
    }

    let paginator = query
        .order_by_asc(seller::Column::Name)
        .paginate(db, page.limit);
    let total = paginator.num_items().await?;
    let data = paginator.fetch_page(page.index()).await?;
    Ok(Paginated::new(data, page, total))
}

/// Retrieves all sellers ordered by name.
pub async fn get_all_sellers(db: &DatabaseConnection) -> Result<Vec<seller::Model>> {
    Seller::find()
        .order_by_asc(seller::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Retrieves a seller by id.
pub async fn get_seller_by_id<C>(db: &C, seller_id: i64) -> Result<Option<seller::Model>>
where
    C: ConnectionTrait,
{
    Seller::find_by_id(seller_id).one(db).await.map_err(Into::into)
}

/// Retrieves a seller by normalized WhatsApp number.
pub async fn get_seller_by_whatsapp<C>(db: &C, whatsapp: &str) -> Result<Option<seller::Model>>
where
    C: ConnectionTrait,
{
    Seller::find()
        .filter(seller::Column::Whatsapp.eq(whatsapp))
        .one(db)
        .await
        .map_err(Into::into)
}

async fn ensure_number_free<C>(db: &C, contact: &Contact, owner: Option<i64>) -> Result<()>
where
    C: ConnectionTrait,
{
    let Some(whatsapp) = contact.whatsapp.as_deref() else {
        return Ok(());
    };
    match get_seller_by_whatsapp(db, whatsapp).await? {
        Some(other) if Some(other.id) != owner => Err(Error::conflict(format!(
            "WhatsApp number {whatsapp} already belongs to seller '{}'",
            other.name
        ))),
        _ => Ok(()),
    }
}

/// Creates a seller. The WhatsApp number, when given, must be unused.
pub async fn create_seller<C>(db: &C, input: ContactInput) -> Result<seller::Model>
where
    C: ConnectionTrait,
{
    let contact = input.validate()?;
    ensure_number_free(db, &contact, None).await?;
    insert_seller(db, contact).await
}

async fn insert_seller<C>(db: &C, contact: Contact) -> Result<seller::Model>
where
    C: ConnectionTrait,
{
    let now = chrono::Utc::now();
    seller::ActiveModel {
        name: Set(contact.name),
        whatsapp: Set(contact.whatsapp),
        address: Set(contact.address),
        notes: Set(contact.notes),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Replaces a seller's contact fields.
pub async fn update_seller(
    db: &DatabaseConnection,
    seller_id: i64,
    input: ContactInput,
) -> Result<seller::Model> {
    let contact = input.validate()?;
    ensure_number_free(db, &contact, Some(seller_id)).await?;

    let mut seller: seller::ActiveModel = get_seller_by_id(db, seller_id)
        .await?
        .ok_or_else(|| Error::not_found("seller", seller_id))?
        .into();
    seller.name = Set(contact.name);
    seller.whatsapp = Set(contact.whatsapp);
    seller.address = Set(contact.address);
    seller.notes = Set(contact.notes);
    seller.updated_at = Set(chrono::Utc::now());

    seller.update(db).await.map_err(Into::into)
}

/// Deletes a seller with no seller orders.
pub async fn delete_seller(db: &DatabaseConnection, seller_id: i64) -> Result<()> {
    let seller = get_seller_by_id(db, seller_id)
        .await?
        .ok_or_else(|| Error::not_found("seller", seller_id))?;

    let orders = SellerOrder::find()
        .filter(seller_order::Column::SellerId.eq(seller_id))
        .count(db)
        .await?;
    if orders > 0 {
        return Err(Error::conflict(format!(
            "Seller '{}' has {orders} order(s) and cannot be deleted",
            seller.name
        )));
    }

    seller.delete(db).await?;
    Ok(())
}

/// Creates or updates a seller keyed by WhatsApp number.
/// Returns the stored seller and whether it was newly created.
pub async fn upsert_seller<C>(db: &C, input: ContactInput) -> Result<(seller::Model, bool)>
where
    C: ConnectionTrait,
{
    let contact = input.validate()?;
    let existing = match contact.whatsapp.as_deref() {
        Some(whatsapp) => get_seller_by_whatsapp(db, whatsapp).await?,
        None => None,
    };

    let Some(existing) = existing else {
        return Ok((insert_seller(db, contact).await?, true));
    };

    let mut seller: seller::ActiveModel = existing.into();
    seller.name = Set(contact.name);
    if contact.address.is_some() {
        seller.address = Set(contact.address);
    }
    if contact.notes.is_some() {
        seller.notes = Set(contact.notes);
    }
    seller.updated_at = Set(chrono::Utc::now());

    Ok((seller.update(db).await?, false))
}

/// Purchase count and spend per seller id.
pub async fn get_seller_stats(db: &DatabaseConnection) -> Result<HashMap<i64, SellerStats>> {
    let orders = SellerOrder::find()
        .filter(seller_order::Column::SellerId.is_not_null())
        .all(db)
        .await?;

    let mut sums: HashMap<i64, (u64, Decimal)> = HashMap::new();
    for order in orders {
        if let Some(seller_id) = order.seller_id {
            let entry = sums.entry(seller_id).or_default();
            entry.0 += 1;
            entry.1 = entry.1.saturating_add(pricing::to_decimal(order.total));
        }
    }
    Ok(sums
        .into_iter()
        .map(|(seller_id, (order_count, purchased))| {
            let stats = SellerStats {
                order_count,
                total_purchased: pricing::to_f64(purchased),
            };
            (seller_id, stats)
        })
        .collect())
}
