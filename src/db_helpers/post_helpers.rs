use chrono::Utc;
use sqlx::SqlitePool;

use crate::{
    data_formats::PostInput,
    errors::RequestError,
    models::{FeedPost, Post},
    pagination::{Page, PageWindow},
};

const FEED_QUERY: &str = r#"
            SELECT posts.id           AS "id",
                   posts.text         AS "text",
                   posts.created_at   AS "created_at",
                   posts.image        AS "image",
                   posts.author_id    AS "author_id",
                   users.username     AS "author_username",
                   posts.group_id     AS "group_id",
                   post_groups.slug   AS "group_slug",
                   post_groups.title  AS "group_title"
            FROM   posts
                JOIN users
                    ON users.id = posts.author_id
                LEFT JOIN post_groups
                    ON post_groups.id = posts.group_id
    "#;

const FEED_ORDER: &str = "ORDER BY posts.created_at DESC, posts.id DESC";

/// Which posts a feed shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feed {
    All,
    Group(i64),
    Author(i64),
    /// Posts by every author the given user follows.
    FollowedBy(i64),
}

impl Feed {
    fn filter(&self) -> (&'static str, Option<i64>) {
        match *self {
            Feed::All => ("", None),
            Feed::Group(id) => ("WHERE posts.group_id = $1", Some(id)),
            Feed::Author(id) => ("WHERE posts.author_id = $1", Some(id)),
            Feed::FollowedBy(id) => (
                "WHERE posts.author_id IN (SELECT followed_id FROM follows WHERE follower_id = $1)",
                Some(id),
            ),
        }
    }
}

pub async fn count_feed(pool: &SqlitePool, feed: Feed) -> Result<i64, RequestError> {
    let (filter, param) = feed.filter();
    let query = format!("SELECT COUNT(*) FROM posts {}", filter);
    let mut query = sqlx::query_scalar::<_, i64>(&query);
    if let Some(param) = param {
        query = query.bind(param);
    }
    Ok(query.fetch_one(pool).await?)
}

/// One page of `feed`, newest first. `requested` is clamped into the valid
/// page range.
pub async fn list_feed(
    pool: &SqlitePool,
    feed: Feed,
    requested: i64,
    per_page: i64,
) -> Result<Page<FeedPost>, RequestError> {
    let count = count_feed(pool, feed).await?;
    let window = PageWindow::resolve(requested, per_page, count);

    let (filter, param) = feed.filter();
    let query = match param {
        Some(_) => format!("{} {} {} LIMIT $2 OFFSET $3", FEED_QUERY, filter, FEED_ORDER),
        None => format!("{} {} LIMIT $1 OFFSET $2", FEED_QUERY, FEED_ORDER),
    };
    let mut query = sqlx::query_as::<_, FeedPost>(&query);
    if let Some(param) = param {
        query = query.bind(param);
    }
    let posts = query
        .bind(window.limit())
        .bind(window.offset())
        .fetch_all(pool)
        .await?;

    Ok(Page::new(posts, window))
}

pub async fn insert_post(
    pool: &SqlitePool,
    author_id: i64,
    post: &PostInput,
) -> Result<Post, RequestError> {
    let post = sqlx::query_as::<_, Post>(
        r#"
        INSERT INTO posts (text, created_at, author_id, group_id, image)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, text, created_at, author_id, group_id, image
        "#,
    )
    .bind(&post.text)
    .bind(Utc::now())
    .bind(author_id)
    .bind(post.group_id)
    .bind(&post.image)
    .fetch_one(pool)
    .await?;
    Ok(post)
}

/// Replaces the editable fields of a post. Author and creation time stay.
pub async fn update_post(
    pool: &SqlitePool,
    post_id: i64,
    post: &PostInput,
) -> Result<(), RequestError> {
    let result = sqlx::query(
        r#"
        UPDATE posts SET text = $1, group_id = $2, image = $3
        WHERE id = $4
        "#,
    )
    .bind(&post.text)
    .bind(post.group_id)
    .bind(&post.image)
    .bind(post_id)
    .execute(pool)
    .await?;
    if result.rows_affected() == 0 {
        return Err(RequestError::NotFound("Post not found"));
    }
    Ok(())
}

/// The post with `post_id`, only if it was written by `username`.
pub async fn get_post_by_author(
    pool: &SqlitePool,
    username: &str,
    post_id: i64,
) -> Result<FeedPost, RequestError> {
    let query = format!(
        "{} WHERE posts.id = $1 AND users.username = $2",
        FEED_QUERY
    );
    sqlx::query_as::<_, FeedPost>(&query)
        .bind(post_id)
        .bind(username)
        .fetch_optional(pool)
        .await?
        .ok_or(RequestError::NotFound("Post not found"))
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::db_helpers::{follow_user_in_db, test_support::*};

    #[tokio::test]
    async fn twelve_posts_fill_two_pages() {
        let pool = test_pool().await;
        let leo = user(&pool, "leo").await;
        for i in 0..12 {
            post(&pool, &leo, &format!("post {}", i), None).await;
        }

        let first = list_feed(&pool, Feed::All, 1, 10).await.unwrap();
        assert_eq!(first.object_list.len(), 10);
        assert_eq!(first.count, 12);
        assert_eq!(first.num_pages, 2);
        assert!(first.has_next);

        let second = list_feed(&pool, Feed::All, 2, 10).await.unwrap();
        assert_eq!(second.object_list.len(), 2);
        assert!(!second.has_next);
    }

    #[tokio::test]
    async fn pages_are_disjoint_and_newest_first() {
        let pool = test_pool().await;
        let leo = user(&pool, "leo").await;
        let mut created = Vec::new();
        for i in 0..7 {
            created.push(post(&pool, &leo, &format!("post {}", i), None).await.id);
        }

        let mut seen = Vec::new();
        for page in 1..=3 {
            let page = list_feed(&pool, Feed::All, page, 3).await.unwrap();
            seen.extend(page.object_list.into_iter().map(|p| p.id));
        }

        created.reverse();
        assert_eq!(seen, created);
        assert_eq!(seen.iter().collect::<HashSet<_>>().len(), 7);
    }

    #[tokio::test]
    async fn out_of_range_page_returns_last_page() {
        let pool = test_pool().await;
        let leo = user(&pool, "leo").await;
        for i in 0..12 {
            post(&pool, &leo, &format!("post {}", i), None).await;
        }
        let page = list_feed(&pool, Feed::All, 40, 10).await.unwrap();
        assert_eq!(page.number, 2);
        assert_eq!(page.object_list.len(), 2);

        let page = list_feed(&pool, Feed::All, 0, 10).await.unwrap();
        assert_eq!(page.number, 1);
    }

    #[tokio::test]
    async fn group_feed_only_shows_its_group() {
        let pool = test_pool().await;
        let leo = user(&pool, "leo").await;
        let cats = group(&pool, "cats").await;
        let dogs = group(&pool, "dogs").await;
        let cat_post = post(&pool, &leo, "meow", Some(&cats)).await;
        post(&pool, &leo, "no group", None).await;

        let page = list_feed(&pool, Feed::Group(cats.id), 1, 10).await.unwrap();
        assert_eq!(page.object_list.len(), 1);
        assert_eq!(page.object_list[0].id, cat_post.id);
        assert_eq!(page.object_list[0].group_slug.as_deref(), Some("cats"));

        let page = list_feed(&pool, Feed::Group(dogs.id), 1, 10).await.unwrap();
        assert!(page.object_list.is_empty());
        assert_eq!(page.num_pages, 1);
    }

    #[tokio::test]
    async fn author_feed_only_shows_author() {
        let pool = test_pool().await;
        let leo = user(&pool, "leo").await;
        let mia = user(&pool, "mia").await;
        post(&pool, &leo, "by leo", None).await;
        post(&pool, &mia, "by mia", None).await;

        let page = list_feed(&pool, Feed::Author(mia.id), 1, 10).await.unwrap();
        assert_eq!(page.object_list.len(), 1);
        assert_eq!(page.object_list[0].author_username, "mia");
    }

    #[tokio::test]
    async fn follow_feed_shows_followed_authors_only() {
        let pool = test_pool().await;
        let author = user(&pool, "author").await;
        let follower = user(&pool, "follower").await;
        let stranger = user(&pool, "stranger").await;
        follow_user_in_db(&pool, follower.id, author.id).await.unwrap();
        let written = post(&pool, &author, "for my followers", None).await;
        post(&pool, &stranger, "unrelated", None).await;

        let page = list_feed(&pool, Feed::FollowedBy(follower.id), 1, 10)
            .await
            .unwrap();
        assert_eq!(
            page.object_list.iter().map(|p| p.id).collect::<Vec<_>>(),
            vec![written.id]
        );

        let page = list_feed(&pool, Feed::FollowedBy(stranger.id), 1, 10)
            .await
            .unwrap();
        assert!(page.object_list.is_empty());
    }

    #[tokio::test]
    async fn update_keeps_author_and_creation_time() {
        let pool = test_pool().await;
        let leo = user(&pool, "leo").await;
        let cats = group(&pool, "cats").await;
        let original = post(&pool, &leo, "first draft", None).await;

        let edit = PostInput {
            text: "second draft".to_string(),
            group_id: Some(cats.id),
            image: Some("posts/cat.png".to_string()),
        };
        update_post(&pool, original.id, &edit).await.unwrap();

        let edited = get_post_by_author(&pool, "leo", original.id).await.unwrap();
        assert_eq!(edited.text, "second draft");
        assert_eq!(edited.group_id, Some(cats.id));
        assert_eq!(edited.image.as_deref(), Some("posts/cat.png"));
        assert_eq!(edited.author_id, leo.id);
        assert_eq!(edited.created_at, original.created_at);
    }

    #[tokio::test]
    async fn post_lookup_requires_matching_author() {
        let pool = test_pool().await;
        let leo = user(&pool, "leo").await;
        user(&pool, "mia").await;
        let written = post(&pool, &leo, "hello", None).await;

        assert_eq!(
            get_post_by_author(&pool, "leo", written.id).await.unwrap().id,
            written.id
        );
        assert!(matches!(
            get_post_by_author(&pool, "mia", written.id).await,
            Err(RequestError::NotFound(_))
        ));
    }
}
