//! Dashboard API

use super::{AppState, extract::ApiQuery};
use crate::{
    core::{
        dashboard::{self, Dashboard},
        query::DateRange,
    },
    errors::Result,
};
use axum::{
    Json, Router,
    extract::State,
    routing::get,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/api/dashboard", get(show))
}

/// GET /api/dashboard
async fn show(
    State(state): State<AppState>,
    ApiQuery(range): ApiQuery<DateRange>,
) -> Result<Json<Dashboard>> {
    let threshold = state.config.inventory.low_stock_threshold;
    Ok(Json(
        dashboard::generate_dashboard(&state.db, &range, threshold).await?,
    ))
}
