//! Seller (purchase) order API

use super::{AppState, OrderQuery, csv_response, extract::{ApiJson, ApiPath, ApiQuery}};
use crate::{
    core::{
        export,
        query::Paginated,
        seller_order::{
            self, NewSellerOrder, SellerOrderDetail, SellerOrderFilter, SellerOrderPatch,
            SellerOrderSummary,
        },
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
    Router::new().nest("/api/seller-orders", routes())
}

fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/export", get(export_csv))
        .route("/{id}", get(get_by_id).put(update).delete(delete))
}

/// GET /api/seller-orders
async fn list(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<OrderQuery>,
) -> Result<Json<Paginated<SellerOrderSummary>>> {
    let filter = SellerOrderFilter {
        search: query.search(),
        payment_status: query.payment_status,
        delivery_status: query.delivery_status,
        range: query.range(),
    };
    Ok(Json(
        seller_order::list_seller_orders(&state.db, &filter, query.page()).await?,
    ))
}

/// GET /api/seller-orders/{id}
async fn get_by_id(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<SellerOrderDetail>> {
    Ok(Json(seller_order::get_seller_order(&state.db, id).await?))
}

/// POST /api/seller-orders
async fn create(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<NewSellerOrder>,
) -> Result<(StatusCode, Json<SellerOrderDetail>)> {
    let created = seller_order::create_seller_order(&state.db, payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// PUT /api/seller-orders/{id}
async fn update(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(payload): ApiJson<SellerOrderPatch>,
) -> Result<Json<SellerOrderDetail>> {
    Ok(Json(
        seller_order::update_seller_order(&state.db, id, payload).await?,
    ))
}

/// DELETE /api/seller-orders/{id}
async fn delete(State(state): State<AppState>, ApiPath(id): ApiPath<i64>) -> Result<StatusCode> {
    seller_order::delete_seller_order(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/seller-orders/export
async fn export_csv(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<OrderQuery>,
) -> Result<Response> {
    let body = export::export_seller_orders(&state.db, &query.range()).await?;
    Ok(csv_response("seller-orders.csv", body))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use crate::api::test_support::*;
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    #[tokio::test]
    async fn test_receiving_stock_from_seller() {
        let app = test_app().await;
        let cookie = login(&app).await;

        let (_, apple) = send_json(
            &app,
            Method::POST,
            "/api/items",
            Some(&cookie),
            Some(json!({
                "name": "Apel",
                "price": 5000.0,
                "cost_price": 3000.0,
                "stock_mode": "TRACK"
            })),
        )
        .await;
        let apple = apple["id"].as_i64().unwrap();

        let (status, created) = send_json(
            &app,
            Method::POST,
            "/api/seller-orders",
            Some(&cookie),
            Some(json!({
                "seller": { "name": "Kebun Pak Harto", "whatsapp": "082177778888" },
                "items": [{ "item_id": apple, "quantity": 20 }],
                "delivery_fee": 15000.0
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        // Priced at cost, plus the delivery fee
        assert_eq!(created["subtotal"].as_f64().unwrap(), 60000.0);
        assert_eq!(created["total"].as_f64().unwrap(), 75000.0);
        let id = created["id"].as_i64().unwrap();

        let (status, _) = send_json(
            &app,
            Method::PUT,
            &format!("/api/seller-orders/{id}"),
            Some(&cookie),
            Some(json!({ "delivery_status": "delivered" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let (_, item) = send_json(
            &app,
            Method::GET,
            &format!("/api/items/{apple}"),
            Some(&cookie),
            None,
        )
        .await;
        assert_eq!(item["stock"], 20);

        let (_, page) = send_json(
            &app,
            Method::GET,
            "/api/seller-orders?delivery_status=delivered",
            Some(&cookie),
            None,
        )
        .await;
        assert_eq!(page["total"], 1);
        assert_eq!(page["data"][0]["seller_name"], "Kebun Pak Harto");

        let seller_id = created["seller"]["id"].as_i64().unwrap();
        let (status, _) = send_json(
            &app,
            Method::DELETE,
            &format!("/api/sellers/{seller_id}"),
            Some(&cookie),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, headers, csv) = send(
            &app,
            Method::GET,
            "/api/seller-orders/export",
            Some(&cookie),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(
            headers[axum::http::header::CONTENT_DISPOSITION]
                .to_str()
                .unwrap()
                .contains("seller-orders.csv")
        );
        assert!(csv.contains("Apel x20"));

        let (status, _) = send_json(
            &app,
            Method::DELETE,
            &format!("/api/seller-orders/{id}"),
            Some(&cookie),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (_, item) = send_json(
            &app,
            Method::GET,
            &format!("/api/items/{apple}"),
            Some(&cookie),
            None,
        )
        .await;
        assert_eq!(item["stock"], 0);
    }
}
