use sqlx::SqlitePool;

use crate::{errors::RequestError, models::AuthorStats};

/// Records that `follower_id` follows `followed_id`. Returns whether a new row
/// was written; following twice is not an error.
///
/// Self-follows are not rejected here, callers decide.
pub async fn follow_user_in_db(
    pool: &SqlitePool,
    follower_id: i64,
    followed_id: i64,
) -> Result<bool, RequestError> {
    let result = sqlx::query(
        r#"
        INSERT INTO follows (follower_id, followed_id)
        VALUES ($1, $2)
        ON CONFLICT (follower_id, followed_id) DO NOTHING
        "#,
    )
    .bind(follower_id)
    .bind(followed_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// Returns whether a row was removed.
pub async fn unfollow_user_in_db(
    pool: &SqlitePool,
    follower_id: i64,
    followed_id: i64,
) -> Result<bool, RequestError> {
    let result = sqlx::query(
        r#"
        DELETE FROM follows WHERE follower_id = $1 AND followed_id = $2
        "#,
    )
    .bind(follower_id)
    .bind(followed_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn is_following_in_db(
    pool: &SqlitePool,
    follower_id: i64,
    followed_id: i64,
) -> Result<bool, RequestError> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM follows WHERE follower_id = $1 AND followed_id = $2)",
    )
    .bind(follower_id)
    .bind(followed_id)
    .fetch_one(pool)
    .await?;
    Ok(exists)
}

/// Counts for the author block. `following` is false for anonymous viewers
/// and for authors looking at themselves.
pub async fn get_author_stats_in_db(
    pool: &SqlitePool,
    author_id: i64,
    viewer_id: Option<i64>,
) -> Result<AuthorStats, RequestError> {
    let (posts, followers, followings): (i64, i64, i64) = sqlx::query_as(
        r#"
        SELECT (SELECT COUNT(*) FROM posts WHERE author_id = $1),
               (SELECT COUNT(*) FROM follows WHERE followed_id = $1),
               (SELECT COUNT(*) FROM follows WHERE follower_id = $1)
        "#,
    )
    .bind(author_id)
    .fetch_one(pool)
    .await?;

    let following = match viewer_id {
        Some(viewer_id) if viewer_id != author_id => {
            is_following_in_db(pool, viewer_id, author_id).await?
        }
        _ => false,
    };

    Ok(AuthorStats {
        posts,
        followers,
        followings,
        following,
    })
}
