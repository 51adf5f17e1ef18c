//! HTTP API - axum routers, handlers and middleware over [`crate::core`].
//!
//! Handlers only parse input, call a core function and serialize the result;
//! errors travel back as [`crate::errors::Error`] and are rendered by
//! [`error`].

mod accounting;
mod auth;
mod categories;
mod customers;
mod dashboard;
pub mod error;
pub mod extract;
mod items;
pub mod middleware;
mod orders;
mod seller_orders;
mod sellers;

use crate::{
    config::AppConfig,
    core::{
        auth::SessionKeys,
        export::ContactCsvFormat,
        query::{DateRange, Page},
    },
    entities::{DeliveryStatus, PaymentStatus},
};
use axum::{
    Json, Router,
    http::header,
    middleware as axum_middleware,
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::NaiveDate;
use sea_orm::DatabaseConnection;
use serde::Deserialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: DatabaseConnection,
    /// Settings from config.toml
    pub config: Arc<AppConfig>,
    /// Session token signer
    pub sessions: Arc<SessionKeys>,
}

/// Builds the application router with all routes and middleware.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(auth::router())
        .merge(customers::router())
        .merge(sellers::router())
        .merge(categories::router())
        .merge(items::router())
        .merge(orders::router())
        .merge(seller_orders::router())
        .merge(dashboard::router())
        .merge(accounting::router())
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_session,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "fruit-pos",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// `?page&limit&q` (or `search`) accepted by list endpoints
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuery {
    /// 1-based page number
    pub page: Option<u64>,
    /// Rows per page
    pub limit: Option<u64>,
    /// Search text
    pub q: Option<String>,
    /// Alias of `q`
    pub search: Option<String>,
}

impl ListQuery {
    fn page(&self) -> Page {
        Page::new(self.page, self.limit)
    }

    fn search(&self) -> Option<&str> {
        self.q.as_deref().or(self.search.as_deref())
    }
}

/// `?format=simple|full` for customer and seller exports
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ContactExportQuery {
    /// Column layout, `simple` unless given
    #[serde(default)]
    pub format: ContactCsvFormat,
}

/// `?from&to` plus the list parameters, for order lists
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderQuery {
    /// 1-based page number
    pub page: Option<u64>,
    /// Rows per page
    pub limit: Option<u64>,
    /// Search text
    pub q: Option<String>,
    /// Alias of `q`
    pub search: Option<String>,
    /// Only orders in this payment state
    pub payment_status: Option<PaymentStatus>,
    /// Only orders in this delivery state
    pub delivery_status: Option<DeliveryStatus>,
    /// First creation day included
    pub from: Option<NaiveDate>,
    /// Last creation day included
    pub to: Option<NaiveDate>,
}

impl OrderQuery {
    fn page(&self) -> Page {
        Page::new(self.page, self.limit)
    }

    fn search(&self) -> Option<String> {
        self.q.clone().or_else(|| self.search.clone())
    }

    const fn range(&self) -> DateRange {
        DateRange {
            from: self.from,
            to: self.to,
        }
    }
}

/// Wraps CSV text as a download.
fn csv_response(filename: &str, body: String) -> Response {
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        body,
    )
        .into_response()
}
