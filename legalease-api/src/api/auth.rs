//! Account and session endpoints
//!
//! Sessions are opaque tokens stored server-side. Browsers carry the token in
//! the `auth-token` cookie; the extension sends `Authorization: Bearer`.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts, State},
    http::{header, request::Parts, HeaderMap, HeaderValue},
    response::{AppendHeaders, IntoResponse},
    routing::{get, post},
    Json, Router,
};
use legalease_common::models::User;
use legalease_common::secrets;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use crate::db;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

pub const AUTH_COOKIE: &str = "auth-token";

/// Authenticated caller
///
/// Rejects with 401 when no token is presented or the session is unknown or
/// expired.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        let token = session_token(&parts.headers).ok_or_else(ApiError::unauthorized)?;
        let user = db::lookup_session(&state.db, &token)
            .await?
            .ok_or_else(ApiError::unauthorized)?;
        Ok(CurrentUser(user))
    }
}

/// Session token from the auth cookie, else from a bearer header
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    let from_cookie = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == AUTH_COOKIE)
        .map(|(_, value)| value.trim().to_string());

    from_cookie
        .or_else(|| {
            headers
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.strip_prefix("Bearer "))
                .map(|t| t.trim().to_string())
        })
        .filter(|t| !t.is_empty())
}

fn session_cookie(token: &str, max_age_secs: i64, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; HttpOnly; SameSite=Strict; Path=/; Max-Age={}",
        AUTH_COOKIE, token, max_age_secs
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

fn cookie_header(value: String) -> ApiResult<AppendHeaders<[(header::HeaderName, HeaderValue); 1]>> {
    let value = HeaderValue::from_str(&value)
        .map_err(|e| ApiError::Internal(format!("Invalid cookie header: {}", e)))?;
    Ok(AppendHeaders([(header::SET_COOKIE, value)]))
}

/// Field present and not blank, trimmed
fn required(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Password present and not blank, kept exactly as typed
fn password(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SigninRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

async fn start_session(state: &AppState, user: User) -> ApiResult<impl IntoResponse> {
    let token = db::create_session(&state.db, user.id, state.settings.session_ttl).await?;
    let cookie = session_cookie(
        &token,
        state.settings.session_ttl.num_seconds(),
        state.settings.secure_cookies,
    );
    Ok((cookie_header(cookie)?, Json(json!({ "user": user }))))
}

/// POST /api/auth/signup
pub async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> ApiResult<impl IntoResponse> {
    let (Some(email), Some(password), Some(name)) =
        (required(&req.email), password(&req.password), required(&req.name))
    else {
        return Err(ApiError::BadRequest(
            "Email, password, and name are required".to_string(),
        ));
    };

    let hash = secrets::hash_password(password, Some(state.settings.password_cost)).await?;
    let Some(user) = db::create_user(&state.db, email, name, &hash).await? else {
        return Err(ApiError::Conflict("User already exists".to_string()));
    };

    info!(user_id = %user.id, "User signed up");
    start_session(&state, user).await
}

/// POST /api/auth/signin
pub async fn signin(
    State(state): State<AppState>,
    Json(req): Json<SigninRequest>,
) -> ApiResult<impl IntoResponse> {
    let (Some(email), Some(password)) = (required(&req.email), password(&req.password)) else {
        return Err(ApiError::BadRequest(
            "Email and password are required".to_string(),
        ));
    };

    let invalid = || ApiError::Unauthorized("Invalid credentials".to_string());

    let Some(user) = db::get_user_by_email(&state.db, email).await? else {
        // Unknown emails still pay for one hash
        secrets::hash_password(password, Some(state.settings.password_cost)).await?;
        return Err(invalid());
    };
    let stored = db::get_password_hash(&state.db, user.id).await?;
    if !secrets::verify_password(password, &stored).await? {
        warn!(user_id = %user.id, "Rejected sign-in");
        return Err(invalid());
    }

    start_session(&state, user).await
}

/// POST /api/auth/signout
///
/// Always succeeds; a missing or stale token just clears the cookie.
pub async fn signout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<impl IntoResponse> {
    if let Some(token) = session_token(&headers) {
        db::delete_session(&state.db, &token).await?;
    }
    let cookie = session_cookie("", 0, state.settings.secure_cookies);
    Ok((cookie_header(cookie)?, Json(json!({ "success": true }))))
}

/// GET /api/auth/me
pub async fn me(State(state): State<AppState>, headers: HeaderMap) -> Json<serde_json::Value> {
    let user = match session_token(&headers) {
        Some(token) => match db::lookup_session(&state.db, &token).await {
            Ok(user) => user,
            Err(e) => {
                warn!(error = %e, "Session lookup failed");
                None
            }
        },
        None => None,
    };
    Json(json!({ "user": user }))
}

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/signup", post(signup))
        .route("/api/auth/signin", post(signin))
        .route("/api/auth/signout", post(signout))
        .route("/api/auth/me", get(me))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(header::HeaderName, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(name.clone(), HeaderValue::from_str(value).unwrap());
        }
        map
    }

    #[test]
    fn test_token_from_cookie() {
        let h = headers(&[(header::COOKIE, "theme=dark; auth-token=abc123; other=1")]);
        assert_eq!(session_token(&h).as_deref(), Some("abc123"));
    }

    #[test]
    fn test_token_from_bearer() {
        let h = headers(&[(header::AUTHORIZATION, "Bearer xyz")]);
        assert_eq!(session_token(&h).as_deref(), Some("xyz"));
    }

    #[test]
    fn test_cookie_wins_over_bearer() {
        let h = headers(&[
            (header::COOKIE, "auth-token=from-cookie"),
            (header::AUTHORIZATION, "Bearer from-header"),
        ]);
        assert_eq!(session_token(&h).as_deref(), Some("from-cookie"));
    }

    #[test]
    fn test_empty_token_is_absent() {
        assert_eq!(session_token(&headers(&[(header::COOKIE, "auth-token=")])), None);
        assert_eq!(session_token(&HeaderMap::new()), None);
    }

    #[test]
    fn test_password_keeps_surrounding_whitespace() {
        assert_eq!(password(&Some(" pw ".to_string())), Some(" pw "));
        assert_eq!(password(&Some("   ".to_string())), None);
        assert_eq!(password(&None), None);
        assert_eq!(required(&Some(" a@b.c ".to_string())), Some("a@b.c"));
    }

    #[test]
    fn test_session_cookie_attributes() {
        assert_eq!(
            session_cookie("t", 604800, false),
            "auth-token=t; HttpOnly; SameSite=Strict; Path=/; Max-Age=604800"
        );
        assert!(session_cookie("t", 0, true).ends_with("Max-Age=0; Secure"));
    }
}
