//! Login, logout and PIN management.

use super::{AppState, extract::ApiJson, middleware::session_cookie};
use crate::{core::auth, errors::Result};
use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

/// Pause before answering a wrong PIN
const FAILED_LOGIN_DELAY: Duration = Duration::from_millis(500);

pub fn router() -> Router<AppState> {
    Router::new().nest("/api/auth", routes())
}

fn routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/session", get(session))
        .route("/pin", put(change_pin))
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    pin: String,
}

#[derive(Debug, Deserialize)]
struct ChangePinRequest {
    current_pin: String,
    new_pin: String,
}

#[derive(Debug, Serialize)]
struct SessionStatus {
    authenticated: bool,
    expires_at: Option<DateTime<Utc>>,
}

fn cookie_header(name: &str, value: &str, max_age: i64) -> Result<HeaderValue> {
    let cookie = format!("{name}={value}; HttpOnly; SameSite=Lax; Path=/; Max-Age={max_age}");
    HeaderValue::from_str(&cookie).map_err(|e| crate::errors::Error::Config {
        message: format!("Invalid session cookie: {e}"),
    })
}

fn expiry(exp: usize) -> Option<DateTime<Utc>> {
    i64::try_from(exp)
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
}

/// POST /api/auth/login
async fn login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> Result<Response> {
    if let Err(e) = auth::authenticate(&state.db, &payload.pin).await {
        warn!(error = %e, "Failed login attempt");
        tokio::time::sleep(FAILED_LOGIN_DELAY).await;
        return Err(e);
    }

    let token = state.sessions.issue()?;
    let claims = state.sessions.verify(&token)?;
    let cookie = cookie_header(
        &state.config.auth.cookie_name,
        &token,
        state.sessions.ttl_seconds(),
    )?;
    info!("Admin logged in");

    let body = SessionStatus {
        authenticated: true,
        expires_at: expiry(claims.exp),
    };
    Ok(([(header::SET_COOKIE, cookie)], Json(body)).into_response())
}

/// POST /api/auth/logout
async fn logout(State(state): State<AppState>) -> Result<Response> {
    let cookie = cookie_header(&state.config.auth.cookie_name, "", 0)?;
    Ok(([(header::SET_COOKIE, cookie)], StatusCode::NO_CONTENT).into_response())
}

/// GET /api/auth/session
async fn session(State(state): State<AppState>, headers: HeaderMap) -> Json<SessionStatus> {
    let claims = session_cookie(&headers, &state.config.auth.cookie_name)
        .and_then(|token| state.sessions.verify(&token).ok());
    Json(SessionStatus {
        authenticated: claims.is_some(),
        expires_at: claims.and_then(|c| expiry(c.exp)),
    })
}

/// PUT /api/auth/pin
async fn change_pin(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<ChangePinRequest>,
) -> Result<StatusCode> {
    auth::change_pin(&state.db, &payload.current_pin, &payload.new_pin).await?;
    Ok(StatusCode::NO_CONTENT)
}
