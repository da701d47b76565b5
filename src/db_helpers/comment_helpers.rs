use chrono::Utc;
use sqlx::SqlitePool;

use crate::errors::RequestError;
use crate::models::{Comment, CommentWithAuthor};

pub async fn insert_comment(
    pool: &SqlitePool,
    author_id: i64,
    post_id: i64,
    text: &str,
) -> Result<Comment, RequestError> {
    let comment = sqlx::query_as::<_, Comment>(
        r#"
        INSERT INTO comments (text, created_at, author_id, post_id)
        VALUES ($1, $2, $3, $4)
        RETURNING id, text, created_at, author_id, post_id
        "#,
    )
    .bind(text)
    .bind(Utc::now())
    .bind(author_id)
    .bind(post_id)
    .fetch_one(pool)
    .await?;
    Ok(comment)
}

/// Comments on a post, oldest first.
pub async fn get_comments_for_post_in_db(
    pool: &SqlitePool,
    post_id: i64,
) -> Result<Vec<CommentWithAuthor>, RequestError> {
    let comments = sqlx::query_as::<_, CommentWithAuthor>(
        r#"
        SELECT comments.id AS "id",
               comments.text AS "text",
               comments.created_at AS "created_at",
               users.username AS "author_username"
        FROM comments
            JOIN users ON users.id = comments.author_id
        WHERE comments.post_id = $1
        ORDER BY comments.id
        "#,
    )
    .bind(post_id)
    .fetch_all(pool)
    .await?;
    Ok(comments)
}
