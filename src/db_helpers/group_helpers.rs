use sqlx::SqlitePool;

use crate::{data_formats::GroupInput, errors::RequestError, models::Group};

pub async fn insert_group(pool: &SqlitePool, group: &GroupInput) -> Result<Group, RequestError> {
    let group = sqlx::query_as::<_, Group>(
        r#"
        INSERT INTO post_groups (title, description, slug)
        VALUES ($1, $2, $3)
        RETURNING id, title, description, slug
        "#,
    )
    .bind(&group.title)
    .bind(&group.description)
    .bind(&group.slug)
    .fetch_one(pool)
    .await?;
    Ok(group)
}

pub async fn get_group_by_slug(pool: &SqlitePool, slug: &str) -> Result<Option<Group>, RequestError> {
    let group = sqlx::query_as::<_, Group>(
        "SELECT id, title, description, slug FROM post_groups WHERE slug = $1",
    )
    .bind(slug)
    .fetch_optional(pool)
    .await?;
    Ok(group)
}

pub async fn get_group_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Group>, RequestError> {
    let group = sqlx::query_as::<_, Group>(
        "SELECT id, title, description, slug FROM post_groups WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(group)
}

/// Every group, for the group select of the post form.
pub async fn list_groups(pool: &SqlitePool) -> Result<Vec<Group>, RequestError> {
    let groups = sqlx::query_as::<_, Group>(
        "SELECT id, title, description, slug FROM post_groups ORDER BY title, id",
    )
    .fetch_all(pool)
    .await?;
    Ok(groups)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db_helpers::{get_post_by_author, test_support::*};

    #[tokio::test]
    async fn slugs_are_unique() {
        let pool = test_pool().await;
        group(&pool, "cats").await;
        let input = GroupInput {
            title: "Other cats".to_string(),
            description: "Same slug".to_string(),
            slug: "cats".to_string(),
        };
        assert!(insert_group(&pool, &input).await.unwrap_err().is_unique_violation());
    }

    #[tokio::test]
    async fn looks_up_groups() {
        let pool = test_pool().await;
        let cats = group(&pool, "cats").await;
        group(&pool, "dogs").await;

        assert_eq!(get_group_by_slug(&pool, "cats").await.unwrap().unwrap().id, cats.id);
        assert_eq!(get_group_by_id(&pool, cats.id).await.unwrap().unwrap().slug, "cats");
        assert!(get_group_by_slug(&pool, "birds").await.unwrap().is_none());
        assert_eq!(list_groups(&pool).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn deleting_a_group_keeps_its_posts() {
        let pool = test_pool().await;
        let leo = user(&pool, "leo").await;
        let cats = group(&pool, "cats").await;
        let kept = post(&pool, &leo, "in a group", Some(&cats)).await;

        sqlx::query("DELETE FROM post_groups WHERE id = $1")
            .bind(cats.id)
            .execute(&pool)
            .await
            .unwrap();

        let survivor = get_post_by_author(&pool, "leo", kept.id).await.unwrap();
        assert_eq!(survivor.group_id, None);
    }
}
