//! Session check applied to every `/api/` route.

use super::AppState;
use crate::errors::Error;
use axum::{
    extract::{Request, State},
    http::{HeaderMap, Method, header},
    middleware::Next,
    response::Response,
};
use tracing::warn;

/// Routes reachable without a session
const PUBLIC_API_ROUTES: [&str; 3] = ["/api/auth/login", "/api/auth/logout", "/api/auth/session"];

/// Rejects `/api/` requests that carry no valid session cookie.
///
/// On success the verified [`crate::core::auth::SessionClaims`] are put in the request
/// extensions. Non-API paths pass through so they 404 normally.
pub async fn require_session(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, Error> {
    let path = req.uri().path();
    if req.method() == Method::OPTIONS
        || !path.starts_with("/api/")
        || PUBLIC_API_ROUTES.contains(&path)
    {
        return Ok(next.run(req).await);
    }

    let Some(token) = session_cookie(req.headers(), &state.config.auth.cookie_name) else {
        return Err(Error::Unauthorized);
    };
    let claims = state.sessions.verify(&token).map_err(|e| {
        warn!(error = %e, uri = %req.uri(), "Rejected session token");
        Error::Unauthorized
    })?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

/// Reads the value of cookie `name` from the `Cookie` headers.
#[must_use]
pub fn session_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_session_cookie() {
        let mut headers = HeaderMap::new();
        assert_eq!(session_cookie(&headers, "sid"), None);

        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; sid=abc.def; other=1"),
        );
        assert_eq!(session_cookie(&headers, "sid").as_deref(), Some("abc.def"));
        assert_eq!(session_cookie(&headers, "missing"), None);

        headers.insert(header::COOKIE, HeaderValue::from_static("sid="));
        assert_eq!(session_cookie(&headers, "sid"), None);
    }
}
