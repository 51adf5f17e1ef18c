//! Accounting API

use super::{AppState, csv_response, extract::ApiQuery};
use crate::{
    core::{
        accounting::{self, AccountingSummary},
        query::DateRange,
    },
    errors::Result,
};
use axum::{
    Json, Router,
    extract::State,
    response::Response,
    routing::get,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/accounting", get(summary))
        .route("/api/accounting/export", get(export_csv))
}

/// GET /api/accounting
async fn summary(
    State(state): State<AppState>,
    ApiQuery(range): ApiQuery<DateRange>,
) -> Result<Json<AccountingSummary>> {
    Ok(Json(accounting::generate_summary(&state.db, &range).await?))
}

/// GET /api/accounting/export
async fn export_csv(
    State(state): State<AppState>,
    ApiQuery(range): ApiQuery<DateRange>,
) -> Result<Response> {
    let body = accounting::export_ledger(&state.db, &range).await?;
    Ok(csv_response("ledger.csv", body))
}
