//! Category API

use super::{AppState, extract::{ApiJson, ApiPath}};
use crate::{core::category, entities::category::Model as Category, errors::Result};
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, put},
};
use serde::Deserialize;

pub fn router() -> Router<AppState> {
    Router::new().nest("/api/categories", routes())
}

fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", put(rename).delete(delete))
}

#[derive(Debug, Deserialize)]
struct CategoryPayload {
    name: String,
}

/// GET /api/categories
async fn list(State(state): State<AppState>) -> Result<Json<Vec<Category>>> {
    Ok(Json(category::get_all_categories(&state.db).await?))
}

/// POST /api/categories
async fn create(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CategoryPayload>,
) -> Result<(StatusCode, Json<Category>)> {
    let created = category::create_category(&state.db, &payload.name).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// PUT /api/categories/{id}
async fn rename(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(payload): ApiJson<CategoryPayload>,
) -> Result<Json<Category>> {
    Ok(Json(
        category::rename_category(&state.db, id, &payload.name).await?,
    ))
}

/// DELETE /api/categories/{id}
async fn delete(State(state): State<AppState>, ApiPath(id): ApiPath<i64>) -> Result<StatusCode> {
    category::delete_category(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
