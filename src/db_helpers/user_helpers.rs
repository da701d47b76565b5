use chrono::Utc;
use sqlx::SqlitePool;

use crate::{errors::RequestError, models::User};

const USER_COLUMNS: &str = "id, username, password, created_at";

pub async fn insert_user(
    pool: &SqlitePool,
    username: &str,
    password_hash: &str,
) -> Result<User, RequestError> {
    let user = sqlx::query_as::<_, User>(&format!(
        r#"
        INSERT INTO users (username, password, created_at)
        VALUES ($1, $2, $3)
        RETURNING {}
        "#,
        USER_COLUMNS
    ))
    .bind(username)
    .bind(password_hash)
    .bind(Utc::now())
    .fetch_one(pool)
    .await?;
    Ok(user)
}

pub async fn get_user_by_username(
    pool: &SqlitePool,
    username: &str,
) -> Result<Option<User>, RequestError> {
    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {} FROM users WHERE username = $1",
        USER_COLUMNS
    ))
    .bind(username)
    .fetch_optional(pool)
    .await?;
    Ok(user)
}

/// Looks up the author named in a URL.
pub async fn require_user_by_username(
    pool: &SqlitePool,
    username: &str,
) -> Result<User, RequestError> {
    get_user_by_username(pool, username)
        .await?
        .ok_or(RequestError::NotFound("User not found"))
}
