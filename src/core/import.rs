//! CSV imports for customers and sellers.
//!
//! Reads the simple export layout (`name,whatsapp,address`). A header row is
//! recognised case-insensitively and may list the columns in any order;
//! without one the columns are taken positionally. Rows are upserted by
//! WhatsApp number inside one transaction.

use crate::{
    core::{
        contact::{ContactInput, normalize_whatsapp},
        csv::{parse, strip_excel_text},
        customer, seller,
    },
    errors::{Error, Result},
};
use sea_orm::{DatabaseConnection, TransactionTrait};
use serde::Serialize;
use tracing::info;

/// Outcome of an import
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    /// New parties inserted
    pub created: usize,
    /// Existing parties matched by number and updated
    pub updated: usize,
    /// Rows without a name or a usable WhatsApp number
    pub skipped: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Columns {
    name: usize,
    whatsapp: usize,
    address: Option<usize>,
}

impl Columns {
    const POSITIONAL: Self = Self {
        name: 0,
        whatsapp: 1,
        address: Some(2),
    };

    /// Reads column positions from a header row, if it is one.
    fn from_header(row: &[String]) -> Option<Self> {
        let find = |names: &[&str]| {
            row.iter()
                .position(|cell| names.contains(&cell.trim().to_lowercase().as_str()))
        };
        let name = find(&["name", "nama"])?;
        let whatsapp = find(&["whatsapp", "wa", "phone", "no_wa"])?;
        Some(Self {
            name,
            whatsapp,
            address: find(&["address", "alamat"]),
        })
    }
}

/// Turns CSV text into contacts to upsert, counting rows that can't be used.
fn read_contacts(input: &str) -> Result<(Vec<ContactInput>, usize)> {
    let rows = parse(input)?;
    let mut rows = rows.into_iter().peekable();

    let columns = match rows.peek().and_then(|first| Columns::from_header(first)) {
        Some(columns) => {
            rows.next();
            columns
        }
        None => Columns::POSITIONAL,
    };

    let mut contacts = Vec::new();
    let mut skipped = 0;
    for row in rows {
        let cell = |index: usize| row.get(index).map_or("", |value| value.trim());
        let name = cell(columns.name);
        let whatsapp = strip_excel_text(cell(columns.whatsapp));

        if name.is_empty() || normalize_whatsapp(whatsapp).is_none() {
            skipped += 1;
            continue;
        }
        contacts.push(ContactInput {
            name: name.to_string(),
            whatsapp: Some(whatsapp.to_string()),
            address: columns.address.map(|index| cell(index).to_string()),
            notes: None,
        });
    }

    if contacts.is_empty() && skipped == 0 {
        return Err(Error::validation("CSV contains no rows"));
    }
    Ok((contacts, skipped))
}

/// Imports customers from CSV.
pub async fn import_customers(db: &DatabaseConnection, input: &str) -> Result<ImportReport> {
    let (contacts, skipped) = read_contacts(input)?;
    let mut report = ImportReport {
        skipped,
        ..Default::default()
    };

    let txn = db.begin().await?;
    for contact in contacts {
        let (_, created) = customer::upsert_customer(&txn, contact).await?;
        if created {
            report.created += 1;
        } else {
            report.updated += 1;
        }
    }
    txn.commit().await?;

    info!(
        created = report.created,
        updated = report.updated,
        skipped = report.skipped,
        "Customers imported"
    );
    Ok(report)
}

/// Imports sellers from CSV.
pub async fn import_sellers(db: &DatabaseConnection, input: &str) -> Result<ImportReport> {
    let (contacts, skipped) = read_contacts(input)?;
    let mut report = ImportReport {
        skipped,
        ..Default::default()
    };

    let txn = db.begin().await?;
    for contact in contacts {
        let (_, created) = seller::upsert_seller(&txn, contact).await?;
        if created {
            report.created += 1;
        } else {
            report.updated += 1;
        }
    }
    txn.commit().await?;

    info!(
        created = report.created,
        updated = report.updated,
        skipped = report.skipped,
        "Sellers imported"
    );
    Ok(report)
}
