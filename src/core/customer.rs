//! Customer business logic.
//!
//! Customers are deduplicated by normalized WhatsApp number: orders and CSV
//! imports upsert through [`upsert_customer`] instead of blindly inserting.

use crate::{
    core::{
        contact::{Contact, ContactInput},
        pricing,
        query::{Page, Paginated, clean_search},
    },
    entities::{Customer, Order, PaymentStatus, customer, order},
    errors::{Error, Result},
};
use rust_decimal::Decimal;
use sea_orm::{Condition, ConnectionTrait, PaginatorTrait, QueryOrder, Set, prelude::*};
use std::collections::HashMap;
use tracing::{debug, instrument};

/// Order count and lifetime spend for one customer
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CustomerStats {
    /// Orders placed
    pub order_count: u64,
    /// Sum of order totals, refunded orders excluded
    pub total_spent: f64,
}

/// Lists customers by name, optionally filtered by name, number or address.
pub async fn list_customers(
    db: &DatabaseConnection,
    search: Option<&str>,
    page: Page,
) -> Result<Paginated<customer::Model>> {
    let mut query = Customer::find();
    if let Some(search) = clean_search(search) {
        query = query.filter(
            Condition::any()
                .add(customer::Column::Name.contains(search))
                .add(customer::Column::Whatsapp.contains(search))
                .add(customer::Column::Address.contains(search)),
        );
    }

    let paginator = query
        .order_by_asc(customer::Column::Name)
        .paginate(db, page.limit);
    let total = paginator.num_items().await?;
    let data = paginator.fetch_page(page.index()).await?;
    Ok(Paginated::new(data, page, total))
}

/// Retrieves all customers ordered by name.
pub async fn get_all_customers(db: &DatabaseConnection) -> Result<Vec<customer::Model>> {
    Customer::find()
        .order_by_asc(customer::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Retrieves a customer by id.
pub async fn get_customer_by_id<C>(db: &C, customer_id: i64) -> Result<Option<customer::Model>>
where
    C: ConnectionTrait,
{
    Customer::find_by_id(customer_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds a customer by an already-normalized WhatsApp number.
pub async fn get_customer_by_whatsapp<C>(db: &C, whatsapp: &str) -> Result<Option<customer::Model>>
where
    C: ConnectionTrait,
{
    Customer::find()
        .filter(customer::Column::Whatsapp.eq(whatsapp))
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
    match get_customer_by_whatsapp(db, whatsapp).await? {
        Some(other) if Some(other.id) != owner => Err(Error::conflict(format!(
            "WhatsApp number {whatsapp} already belongs to customer '{}'",
            other.name
        ))),
        _ => Ok(()),
    }
}

/// Creates a customer. The WhatsApp number, when given, must be unused.
pub async fn create_customer<C>(db: &C, input: ContactInput) -> Result<customer::Model>
where
    C: ConnectionTrait,
{
    let contact = input.validate()?;
    ensure_number_free(db, &contact, None).await?;
    insert_customer(db, contact).await
}

async fn insert_customer<C>(db: &C, contact: Contact) -> Result<customer::Model>
where
    C: ConnectionTrait,
{
    let now = chrono::Utc::now();
    customer::ActiveModel {
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

/// Replaces a customer's contact fields.
pub async fn update_customer(
    db: &DatabaseConnection,
    customer_id: i64,
    input: ContactInput,
) -> Result<customer::Model> {
    let contact = input.validate()?;
    ensure_number_free(db, &contact, Some(customer_id)).await?;

    let mut customer: customer::ActiveModel = get_customer_by_id(db, customer_id)
        .await?
        .ok_or_else(|| Error::not_found("customer", customer_id))?
        .into();
    customer.name = Set(contact.name);
    customer.whatsapp = Set(contact.whatsapp);
    customer.address = Set(contact.address);
    customer.notes = Set(contact.notes);
    customer.updated_at = Set(chrono::Utc::now());

    customer.update(db).await.map_err(Into::into)
}

/// Deletes a customer who has no orders.
#[instrument(skip(db))]
pub async fn delete_customer(db: &DatabaseConnection, customer_id: i64) -> Result<()> {
    let customer = get_customer_by_id(db, customer_id)
        .await?
        .ok_or_else(|| Error::not_found("customer", customer_id))?;

    let orders = Order::find()
        .filter(order::Column::CustomerId.eq(customer_id))
        .count(db)
        .await?;
    if orders > 0 {
        return Err(Error::conflict(format!(
            "Customer '{}' has {orders} order(s) and cannot be deleted",
            customer.name
        )));
    }

    customer.delete(db).await?;
    Ok(())
}

/// Creates or updates a customer keyed by WhatsApp number.
///
/// An existing customer gets the new name; address and notes are only
/// overwritten when the input carries them. Input without a number always
/// creates a new customer.
///
/// # Returns
/// The stored customer and `true` when it was newly created.
pub async fn upsert_customer<C>(db: &C, input: ContactInput) -> Result<(customer::Model, bool)>
where
    C: ConnectionTrait,
{
    let contact = input.validate()?;
    let existing = match contact.whatsapp.as_deref() {
        Some(whatsapp) => get_customer_by_whatsapp(db, whatsapp).await?,
        None => None,
    };

    let Some(existing) = existing else {
        let created = insert_customer(db, contact).await?;
        debug!(customer_id = created.id, "Customer created by upsert");
        return Ok((created, true));
    };

    let mut customer: customer::ActiveModel = existing.into();
    customer.name = Set(contact.name);
    if contact.address.is_some() {
        customer.address = Set(contact.address);
    }
    if contact.notes.is_some() {
        customer.notes = Set(contact.notes);
    }
    customer.updated_at = Set(chrono::Utc::now());

    Ok((customer.update(db).await?, false))
}

/// Order count and spend per customer id.
pub async fn get_customer_stats(db: &DatabaseConnection) -> Result<HashMap<i64, CustomerStats>> {
    let orders = Order::find()
        .filter(order::Column::CustomerId.is_not_null())
        .all(db)
        .await?;

    let mut sums: HashMap<i64, (u64, Decimal)> = HashMap::new();
    for order in orders {
        let Some(customer_id) = order.customer_id else {
            continue;
        };
        let entry = sums.entry(customer_id).or_default();
        entry.0 += 1;
        if order.payment_status != PaymentStatus::Refunded {
            entry.1 = entry.1.saturating_add(pricing::to_decimal(order.total));
        }
    }
    Ok(sums
        .into_iter()
        .map(|(customer_id, (order_count, spent))| {
            let stats = CustomerStats {
                order_count,
                total_spent: pricing::to_f64(spent),
            };
            (customer_id, stats)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::test_utils::*;

    fn input(name: &str, whatsapp: Option<&str>, address: Option<&str>) -> ContactInput {
        ContactInput {
            name: name.to_string(),
            whatsapp: whatsapp.map(str::to_string),
            address: address.map(str::to_string),
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_create_customer_validation() -> Result<()> {
        let db = setup_test_db().await?;
        let result = create_customer(&db, input(" ", None, None)).await;
        assert!(matches!(result, Err(Error::Validation { message: _ })));
        assert_eq!(Customer::find().count(&db).await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_create_customer_normalizes_number() -> Result<()> {
        let db = setup_test_db().await?;
        let customer = create_customer(&db, input("Bu Rina", Some("0812-1111-2222"), None)).await?;

        assert_eq!(customer.whatsapp.as_deref(), Some("6281211112222"));
        let found = get_customer_by_whatsapp(&db, "6281211112222").await?.unwrap();
        assert_eq!(found.id, customer.id);
        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_number_is_conflict() -> Result<()> {
        let db = setup_test_db().await?;
        create_customer(&db, input("Bu Rina", Some("081211112222"), None)).await?;

        let result = create_customer(&db, input("Rina", Some("+62 812 1111 2222"), None)).await;
        assert!(matches!(result, Err(Error::Conflict { message: _ })));
        Ok(())
    }

    #[tokio::test]
    async fn test_upsert_updates_existing_customer() -> Result<()> {
        let db = setup_test_db().await?;
        let pak_joko = input("Pak Joko", Some("0813 5555"), Some("Jl. Kenanga 1"));
        let (first, created) = upsert_customer(&db, pak_joko).await?;
        assert!(created);

        let (second, created) =
            upsert_customer(&db, input("Joko W", Some("62813 5555"), None)).await?;
        assert!(!created);
        assert_eq!(second.id, first.id);
        assert_eq!(second.name, "Joko W");
        assert_eq!(second.address.as_deref(), Some("Jl. Kenanga 1"));
        Ok(())
    }

    #[tokio::test]
    async fn test_upsert_without_number_always_creates() -> Result<()> {
        let db = setup_test_db().await?;
        let (a, _) = upsert_customer(&db, input("Walk-in", None, None)).await?;
        let (b, created) = upsert_customer(&db, input("Walk-in", None, None)).await?;
        assert!(created);
        assert_ne!(a.id, b.id);
        Ok(())
    }

    #[tokio::test]
    async fn test_list_customers_search_and_paging() -> Result<()> {
        let db = setup_test_db().await?;
        create_customer(&db, input("Ani", Some("0811000001"), Some("Bandung"))).await?;
        create_customer(&db, input("Budi", Some("0811000002"), Some("Jakarta"))).await?;
        create_customer(&db, input("Citra", Some("0811000003"), Some("Bandung"))).await?;

        let page = list_customers(&db, Some("bandung"), Page::new(Some(1), Some(1))).await?;
        assert_eq!(page.total, 2);
        assert_eq!(page.data.len(), 1);
        assert_eq!(page.data[0].name, "Ani");

        let page = list_customers(&db, Some("000002"), Page::default()).await?;
        assert_eq!(page.data[0].name, "Budi");
        Ok(())
    }

    #[tokio::test]
    async fn test_update_and_delete_customer() -> Result<()> {
        let db = setup_test_db().await?;
        let customer = create_customer(&db, input("Dewi", None, None)).await?;

        let renamed = input("Dewi S", Some("0899"), Some("Bogor"));
        let updated = update_customer(&db, customer.id, renamed).await?;
        assert_eq!(updated.whatsapp.as_deref(), Some("62899"));
        assert_eq!(updated.address.as_deref(), Some("Bogor"));

        delete_customer(&db, customer.id).await?;
        assert!(get_customer_by_id(&db, customer.id).await?.is_none());

        let result = delete_customer(&db, customer.id).await;
        assert!(matches!(result, Err(Error::NotFound { entity: "customer", id: _ })));
        Ok(())
    }

    #[tokio::test]
    async fn test_customer_stats_skip_refunds() -> Result<()> {
        use crate::core::{
            order::{NewOrder, create_order},
            reconcile::LineRequest,
        };

        let db = setup_test_db().await?;
        let customer = create_customer(&db, input("Bu Tini", Some("0812777"), None)).await?;
        let jeruk = create_tracked_item(&db, "Jeruk", 2_500.0, 0).await?;

        for payment_status in [
            PaymentStatus::Paid,
            PaymentStatus::Unpaid,
            PaymentStatus::Refunded,
        ] {
            create_order(
                &db,
                NewOrder {
                    customer_id: Some(customer.id),
                    items: vec![LineRequest {
                        item_id: jeruk.id,
                        quantity: 2.0,
                    }],
                    payment_status,
                    ..Default::default()
                },
            )
            .await?;
        }

        let stats = get_customer_stats(&db).await?;
        let stat = stats[&customer.id];
        assert_eq!(stat.order_count, 3);
        assert_eq!(stat.total_spent, 10_000.0);
        Ok(())
    }
}
