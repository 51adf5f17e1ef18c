//! Item API

use super::{AppState, csv_response, extract::{ApiJson, ApiPath, ApiQuery}};
use crate::{
    core::{
        export,
        item::{self, ItemFilter, ItemInput},
        query::{Page, Paginated},
    },
    entities::item::Model as Item,
    errors::{Error, Result},
};
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::Response,
    routing::{get, post},
};
use serde::Deserialize;

pub fn router() -> Router<AppState> {
    Router::new().nest("/api/items", routes())
}

fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/export", get(export_csv))
        .route("/{id}", get(get_by_id).put(update).delete(delete))
        .route("/{id}/stock", post(adjust_stock))
}

#[derive(Debug, Deserialize)]
struct ItemQuery {
    page: Option<u64>,
    limit: Option<u64>,
    q: Option<String>,
    search: Option<String>,
    category_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct StockAdjustment {
    delta: i64,
}

/// GET /api/items
async fn list(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ItemQuery>,
) -> Result<Json<Paginated<Item>>> {
    let page = Page::new(query.page, query.limit);
    let filter = ItemFilter {
        search: query.q.or(query.search),
        category_id: query.category_id,
    };
    Ok(Json(item::list_items(&state.db, &filter, page).await?))
}

/// GET /api/items/{id}
async fn get_by_id(State(state): State<AppState>, ApiPath(id): ApiPath<i64>) -> Result<Json<Item>> {
    item::get_item_by_id(&state.db, id)
        .await?
        .filter(|item| !item.is_deleted)
        .map(Json)
        .ok_or_else(|| Error::not_found("item", id))
}

/// POST /api/items
async fn create(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<ItemInput>,
) -> Result<(StatusCode, Json<Item>)> {
    let created = item::create_item(&state.db, payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// PUT /api/items/{id}
async fn update(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(payload): ApiJson<ItemInput>,
) -> Result<Json<Item>> {
    Ok(Json(item::update_item(&state.db, id, payload).await?))
}

/// DELETE /api/items/{id}
async fn delete(State(state): State<AppState>, ApiPath(id): ApiPath<i64>) -> Result<StatusCode> {
    item::delete_item(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/items/{id}/stock
async fn adjust_stock(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(payload): ApiJson<StockAdjustment>,
) -> Result<Json<Item>> {
    Ok(Json(item::adjust_stock(&state.db, id, payload.delta).await?))
}

/// GET /api/items/export
async fn export_csv(State(state): State<AppState>) -> Result<Response> {
    let body = export::export_items(&state.db).await?;
    Ok(csv_response("items.csv", body))
}
