//! User accounts

use legalease_common::models::User;
use legalease_common::{time, Error, Result};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use uuid::Uuid;

use super::parse_guid;

fn user_from_row(row: &SqliteRow) -> Result<User> {
    let guid: String = row.get("guid");
    let created_at: String = row.get("created_at");
    Ok(User {
        id: parse_guid("users.guid", &guid)?,
        email: row.get("email"),
        name: row.get("name"),
        created_at: time::from_db("users.created_at", &created_at)?,
    })
}

/// Insert a new user
///
/// Returns `Ok(None)` when the email is already registered (compared
/// case-insensitively).
pub async fn create_user(
    pool: &SqlitePool,
    email: &str,
    name: &str,
    password_hash: &str,
) -> Result<Option<User>> {
    let user = User {
        id: Uuid::new_v4(),
        email: email.trim().to_string(),
        name: name.trim().to_string(),
        created_at: time::now(),
    };

    let result = sqlx::query(
        r#"
        INSERT INTO users (guid, email, name, password_hash, created_at)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT DO NOTHING
        "#,
    )
    .bind(user.id.to_string())
    .bind(&user.email)
    .bind(&user.name)
    .bind(password_hash)
    .bind(time::to_db(&user.created_at))
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }
    Ok(Some(user))
}

pub async fn get_user_by_email(pool: &SqlitePool, email: &str) -> Result<Option<User>> {
    let row = sqlx::query("SELECT guid, email, name, created_at FROM users WHERE email = ?")
        .bind(email.trim())
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(user_from_row).transpose()
}

pub async fn get_user_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<User>> {
    let row = sqlx::query("SELECT guid, email, name, created_at FROM users WHERE guid = ?")
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(user_from_row).transpose()
}

/// Stored password hash for a user
pub async fn get_password_hash(pool: &SqlitePool, user_id: Uuid) -> Result<String> {
    sqlx::query_scalar("SELECT password_hash FROM users WHERE guid = ?")
        .bind(user_id.to_string())
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("User {}", user_id)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use legalease_common::db::init_memory_database;

    #[tokio::test]
    async fn test_create_and_lookup_user() {
        let pool = init_memory_database().await.unwrap();

        let user = create_user(&pool, " Ada@Example.com ", "Ada", "hash")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(user.email, "Ada@Example.com");

        let by_email = get_user_by_email(&pool, "ada@example.com").await.unwrap().unwrap();
        assert_eq!(by_email.id, user.id);
        assert_eq!(by_email.created_at, user.created_at);

        let by_id = get_user_by_id(&pool, user.id).await.unwrap().unwrap();
        assert_eq!(by_id.name, "Ada");
        assert_eq!(get_password_hash(&pool, user.id).await.unwrap(), "hash");
    }

    #[tokio::test]
    async fn test_duplicate_email_returns_none() {
        let pool = init_memory_database().await.unwrap();
        create_user(&pool, "a@b.c", "A", "h").await.unwrap();
        assert!(create_user(&pool, "A@B.C", "Other", "h").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_missing_user() {
        let pool = init_memory_database().await.unwrap();
        assert!(get_user_by_id(&pool, Uuid::new_v4()).await.unwrap().is_none());
        assert!(matches!(
            get_password_hash(&pool, Uuid::new_v4()).await,
            Err(Error::NotFound(_))
        ));
    }
}
