//! Seller API

use super::{
    AppState, ContactExportQuery, ListQuery, csv_response,
    extract::{ApiJson, ApiPath, ApiQuery},
};
use crate::{
    core::{
        contact::ContactInput,
        seller,
        export,
        import::{self, ImportReport},
        query::Paginated,
    },
    entities::seller::Model as Seller,
    errors::{Error, Result},
};
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::Response,
    routing::{get, post},
};

pub fn router() -> Router<AppState> {
    Router::new().nest("/api/sellers", routes())
}

fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        // Static segments before /{id}
        .route("/export", get(export_csv))
        .route("/import", post(import_csv))
        .route("/{id}", get(get_by_id).put(update).delete(delete))
}

/// GET /api/sellers
async fn list(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> Result<Json<Paginated<Seller>>> {
    let page = seller::list_sellers(&state.db, query.search(), query.page()).await?;
    Ok(Json(page))
}

/// GET /api/sellers/{id}
async fn get_by_id(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Seller>> {
    seller::get_seller_by_id(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| Error::not_found("seller", id))
}

/// POST /api/sellers
async fn create(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<ContactInput>,
) -> Result<(StatusCode, Json<Seller>)> {
    let created = seller::create_seller(&state.db, payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// PUT /api/sellers/{id}
async fn update(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(payload): ApiJson<ContactInput>,
) -> Result<Json<Seller>> {
    Ok(Json(seller::update_seller(&state.db, id, payload).await?))
}

/// DELETE /api/sellers/{id}
async fn delete(State(state): State<AppState>, ApiPath(id): ApiPath<i64>) -> Result<StatusCode> {
    seller::delete_seller(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/sellers/export
async fn export_csv(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ContactExportQuery>,
) -> Result<Response> {
    let body = export::export_sellers(&state.db, query.format).await?;
    Ok(csv_response("sellers.csv", body))
}

/// POST /api/sellers/import
async fn import_csv(State(state): State<AppState>, body: String) -> Result<Json<ImportReport>> {
    Ok(Json(import::import_sellers(&state.db, &body).await?))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use crate::api::test_support::*;
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    #[tokio::test]
    async fn test_seller_import_then_edit() {
        let app = test_app().await;
        let cookie = login(&app).await;

        let (status, _, body) = send_csv(
            &app,
            "/api/sellers/import",
            Some(&cookie),
            "nama,wa,alamat\nKebun Pak Harto,0821 7777 8888,Malang\n",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("\"created\":1"));

        let (_, page) =
            send_json(&app, Method::GET, "/api/sellers?search=harto", Some(&cookie), None).await;
        assert_eq!(page["total"], 1);
        let seller = &page["data"][0];
        assert_eq!(seller["whatsapp"], "6282177778888");
        let id = seller["id"].as_i64().unwrap();

        let (status, updated) = send_json(
            &app,
            Method::PUT,
            &format!("/api/sellers/{id}"),
            Some(&cookie),
            Some(json!({ "name": "Kebun Harto", "whatsapp": "6282177778888", "notes": "apel" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["notes"], "apel");

        let (_, _, csv) =
            send(&app, Method::GET, "/api/sellers/export", Some(&cookie), None).await;
        assert!(csv.starts_with('\u{feff}'));
        assert!(csv.contains("Kebun Harto,\"=\"\"6282177778888\"\"\""));
    }

    #[tokio::test]
    async fn test_blank_seller_name_is_rejected() {
        let app = test_app().await;
        let cookie = login(&app).await;
        let (status, body) = send_json(
            &app,
            Method::POST,
            "/api/sellers",
            Some(&cookie),
            Some(json!({ "name": "   " })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }
}
