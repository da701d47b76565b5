use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{AuthorStats, CommentWithAuthor, FeedPost, Group, User};

#[derive(Deserialize, Serialize, Debug)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub token: String,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct GroupResponse {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub slug: String,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct PostGroupResponse {
    pub slug: String,
    pub title: String,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct PostResponse {
    pub id: i64,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub author: String,
    pub group: Option<PostGroupResponse>,
    pub image: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct CommentResponse {
    pub id: i64,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub author: String,
}

/// The author block shown on profile and post pages.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct AuthorResponse {
    pub username: String,
    pub count: i64,
    pub followers: i64,
    pub followings: i64,
    pub following: bool,
}

impl UserResponse {
    pub fn new(User { id, username, .. }: User, token: String) -> Self {
        UserResponse {
            id,
            username,
            token,
        }
    }
}

impl From<Group> for GroupResponse {
    fn from(
        Group {
            id,
            title,
            description,
            slug,
        }: Group,
    ) -> Self {
        GroupResponse {
            id,
            title,
            description,
            slug,
        }
    }
}

impl From<FeedPost> for PostResponse {
    fn from(
        FeedPost {
            id,
            text,
            created_at,
            image,
            author_username,
            group_slug,
            group_title,
            ..
        }: FeedPost,
    ) -> Self {
        let group = match (group_slug, group_title) {
            (Some(slug), Some(title)) => Some(PostGroupResponse { slug, title }),
            _ => None,
        };
        PostResponse {
            id,
            text,
            created_at,
            author: author_username,
            group,
            image,
        }
    }
}

impl From<CommentWithAuthor> for CommentResponse {
    fn from(
        CommentWithAuthor {
            id,
            text,
            created_at,
            author_username,
            ..
        }: CommentWithAuthor,
    ) -> Self {
        CommentResponse {
            id,
            text,
            created_at,
            author: author_username,
        }
    }
}

impl AuthorResponse {
    pub fn new(username: String, stats: AuthorStats) -> Self {
        AuthorResponse {
            username,
            count: stats.posts,
            followers: stats.followers,
            followings: stats.followings,
            following: stats.following,
        }
    }
}
