//! Login sessions
//!
//! Sessions are opaque random tokens; the cookie carries only the token.

use chrono::Duration;
use legalease_common::models::User;
use legalease_common::{secrets, time, Result};
use sqlx::SqlitePool;
use uuid::Uuid;

use super::users::get_user_by_id;
use super::parse_guid;

/// Create a session for `user_id` valid for `ttl`, returning its token
pub async fn create_session(pool: &SqlitePool, user_id: Uuid, ttl: Duration) -> Result<String> {
    let token = secrets::generate_token();
    let now = time::now();

    sqlx::query("INSERT INTO sessions (token, user_id, created_at, expires_at) VALUES (?, ?, ?, ?)")
        .bind(&token)
        .bind(user_id.to_string())
        .bind(time::to_db(&now))
        .bind(time::to_db(&(now + ttl)))
        .execute(pool)
        .await?;

    Ok(token)
}

/// User owning an unexpired session
pub async fn lookup_session(pool: &SqlitePool, token: &str) -> Result<Option<User>> {
    let user_id: Option<String> =
        sqlx::query_scalar("SELECT user_id FROM sessions WHERE token = ? AND expires_at > ?")
            .bind(token)
            .bind(time::to_db(&time::now()))
            .fetch_optional(pool)
            .await?;

    match user_id {
        Some(id) => get_user_by_id(pool, parse_guid("sessions.user_id", &id)?).await,
        None => Ok(None),
    }
}

/// Delete a session, returning whether it existed
pub async fn delete_session(pool: &SqlitePool, token: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM sessions WHERE token = ?")
        .bind(token)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Remove expired sessions, returning how many were removed
pub async fn purge_expired_sessions(pool: &SqlitePool) -> Result<u64> {
    let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
        .bind(time::to_db(&time::now()))
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}
