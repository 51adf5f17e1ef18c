//! Customer API

use super::{
    AppState, ContactExportQuery, ListQuery, csv_response,
    extract::{ApiJson, ApiPath, ApiQuery},
};
use crate::{
    core::{
        contact::ContactInput,
        customer,
        export,
        import::{self, ImportReport},
        query::Paginated,
    },
    entities::customer::Model as Customer,
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
    Router::new().nest("/api/customers", routes())
}

fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        // Static segments before /{id}
        .route("/export", get(export_csv))
        .route("/import", post(import_csv))
        .route("/{id}", get(get_by_id).put(update).delete(delete))
}

/// GET /api/customers
async fn list(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> Result<Json<Paginated<Customer>>> {
    let page = customer::list_customers(&state.db, query.search(), query.page()).await?;
    Ok(Json(page))
}

/// GET /api/customers/{id}
async fn get_by_id(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Customer>> {
    customer::get_customer_by_id(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| Error::not_found("customer", id))
}

/// POST /api/customers
async fn create(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<ContactInput>,
) -> Result<(StatusCode, Json<Customer>)> {
    let created = customer::create_customer(&state.db, payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// PUT /api/customers/{id}
async fn update(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(payload): ApiJson<ContactInput>,
) -> Result<Json<Customer>> {
    Ok(Json(customer::update_customer(&state.db, id, payload).await?))
}

/// DELETE /api/customers/{id}
async fn delete(State(state): State<AppState>, ApiPath(id): ApiPath<i64>) -> Result<StatusCode> {
    customer::delete_customer(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/customers/export
async fn export_csv(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ContactExportQuery>,
) -> Result<Response> {
    let body = export::export_customers(&state.db, query.format).await?;
    Ok(csv_response("customers.csv", body))
}

/// POST /api/customers/import
async fn import_csv(State(state): State<AppState>, body: String) -> Result<Json<ImportReport>> {
    Ok(Json(import::import_customers(&state.db, &body).await?))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use crate::api::test_support::*;
    use axum::http::{Method, StatusCode, header};
    use serde_json::json;

    #[tokio::test]
    async fn test_customer_crud() {
        let app = test_app().await;
        let cookie = login(&app).await;

        let (status, created) = send_json(
            &app,
            Method::POST,
            "/api/customers",
            Some(&cookie),
            Some(json!({ "name": "Bu Ani", "whatsapp": "0812-1111-0001" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["whatsapp"], "6281211110001");
        let id = created["id"].as_i64().unwrap();

        let (status, _) = send_json(
            &app,
            Method::POST,
            "/api/customers",
            Some(&cookie),
            Some(json!({ "name": "Someone Else", "whatsapp": "6281211110001" })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, updated) = send_json(
            &app,
            Method::PUT,
            &format!("/api/customers/{id}"),
            Some(&cookie),
            Some(json!({
                "name": "Bu Ani S.",
                "whatsapp": "6281211110001",
                "address": "Jl. Mawar"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["address"], "Jl. Mawar");

        let (_, page) =
            send_json(&app, Method::GET, "/api/customers?q=mawar", Some(&cookie), None).await;
        assert_eq!(page["total"], 1);
        assert_eq!(page["limit"], 20);

        let (status, _) = send_json(
            &app,
            Method::DELETE,
            &format!("/api/customers/{id}"),
            Some(&cookie),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, body) = send_json(
            &app,
            Method::GET,
            &format!("/api/customers/{id}"),
            Some(&cookie),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().contains("not found"));
    }

    #[tokio::test]
    async fn test_customer_csv_export_and_import() {
        let app = test_app().await;
        let cookie = login(&app).await;

        let csv = "name,whatsapp,address\r\nBu Ani,0812111,Jl. A\r\nNo Number,,\r\n";
        let (status, _, body) =
            send_csv(&app, "/api/customers/import", Some(&cookie), csv).await;
        assert_eq!(status, StatusCode::OK);
        let report: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(report["created"], 1);
        assert_eq!(report["skipped"], 1);

        let (status, headers, body) = send(
            &app,
            Method::GET,
            "/api/customers/export?format=full",
            Some(&cookie),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(
            headers[header::CONTENT_TYPE]
                .to_str()
                .unwrap()
                .starts_with("text/csv")
        );
        assert!(
            headers[header::CONTENT_DISPOSITION]
                .to_str()
                .unwrap()
                .contains("customers.csv")
        );
        assert!(body.contains("Bu Ani"));
        assert!(body.contains("order_count"));
    }
}
