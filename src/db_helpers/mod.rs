use sqlx::{migrate::MigrateDatabase, Sqlite, SqlitePool};

use anyhow::{Context, Result};

mod comment_helpers;
mod follow_helpers;
mod group_helpers;
mod post_helpers;
mod user_helpers;

pub use comment_helpers::*;
pub use follow_helpers::*;
pub use group_helpers::*;
pub use post_helpers::*;
pub use user_helpers::*;

/// Opens the database at `db_url`, creating it if needed, and brings the schema
/// up to date.
pub async fn init_db(db_url: &str) -> Result<SqlitePool> {
    if !Sqlite::database_exists(db_url).await.unwrap_or(false) {
        tracing::info!(db_url, "creating database");
        Sqlite::create_database(db_url)
            .await
            .with_context(|| format!("Failed to create database {}", db_url))?;
    }
    let pool = SqlitePool::connect(db_url)
        .await
        .with_context(|| format!("Failed to connect to {}", db_url))?;
    migrate(&pool).await?;
    Ok(pool)
}

pub async fn migrate(pool: &SqlitePool) -> Result<()> {
    tracing::info!("running migrations");
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("Failed to run migrations")?;
    Ok(())
}

#[cfg(test)]
pub(crate) mod test_support {
    use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};

    use super::*;
    use crate::data_formats::{GroupInput, PostInput};
    use crate::models::{Group, Post, User};

    /// A private in-memory database. One connection, so every query sees the
    /// same memory database.
    pub async fn test_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        migrate(&pool).await.unwrap();
        pool
    }

    pub async fn user(pool: &SqlitePool, username: &str) -> User {
        insert_user(pool, username, "not-a-real-hash").await.unwrap()
    }

    pub async fn group(pool: &SqlitePool, slug: &str) -> Group {
        let input = GroupInput {
            title: format!("Group {}", slug),
            description: "Test group".to_string(),
            slug: slug.to_string(),
        };
        insert_group(pool, &input).await.unwrap()
    }

    pub async fn post(pool: &SqlitePool, author: &User, text: &str, group: Option<&Group>) -> Post {
        let input = PostInput {
            text: text.to_string(),
            group_id: group.map(|g| g.id),
            image: None,
        };
        insert_post(pool, author.id, &input).await.unwrap()
    }
}
