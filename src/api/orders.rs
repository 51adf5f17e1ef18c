//! Customer order API

use super::{AppState, OrderQuery, csv_response, extract::{ApiJson, ApiPath, ApiQuery}};
use crate::{
    core::{
        export,
        order::{self, NewOrder, OrderDetail, OrderFilter, OrderPatch, OrderSummary},
        query::Paginated,
    },
    errors::Result,
};
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::Response,
    routing::get,
};

pub fn router() -> Router<AppState> {
    Router::new().nest("/api/orders", routes())
}

fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/export", get(export_csv))
        .route("/{id}", get(get_by_id).put(update).delete(delete))
}

/// GET /api/orders
async fn list(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<OrderQuery>,
) -> Result<Json<Paginated<OrderSummary>>> {
    let filter = OrderFilter {
        search: query.search(),
        payment_status: query.payment_status,
        delivery_status: query.delivery_status,
        range: query.range(),
    };
    Ok(Json(
        order::list_orders(&state.db, &filter, query.page()).await?,
    ))
}

/// GET /api/orders/{id}
async fn get_by_id(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<OrderDetail>> {
    Ok(Json(order::get_order(&state.db, id).await?))
}

/// POST /api/orders
async fn create(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<NewOrder>,
) -> Result<(StatusCode, Json<OrderDetail>)> {
    let created = order::create_order(&state.db, payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// PUT /api/orders/{id}
async fn update(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(payload): ApiJson<OrderPatch>,
) -> Result<Json<OrderDetail>> {
    Ok(Json(order::update_order(&state.db, id, payload).await?))
}

/// DELETE /api/orders/{id}
async fn delete(State(state): State<AppState>, ApiPath(id): ApiPath<i64>) -> Result<StatusCode> {
    order::delete_order(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/orders/export
async fn export_csv(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<OrderQuery>,
) -> Result<Response> {
    let body = export::export_orders(&state.db, &query.range()).await?;
    Ok(csv_response("orders.csv", body))
}
