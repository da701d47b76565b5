use serde::{Deserialize, Serialize};

use super::request::FormErrors;
use super::response::{AuthorResponse, CommentResponse, GroupResponse, PostResponse};
use crate::pagination::Page;

#[derive(Debug, Deserialize, Serialize)]
pub struct UserWrapper<T> {
    pub user: T,
}

impl<T> UserWrapper<T> {
    pub fn wrap_with_user_data(request: T) -> UserWrapper<T> {
        UserWrapper { user: request }
    }
}

/// Payload of `/`, `/follow/`.
#[derive(Debug, Deserialize, Serialize)]
pub struct FeedPage {
    pub page: Page<PostResponse>,
}

/// Payload of `/group/{slug}/`.
#[derive(Debug, Deserialize, Serialize)]
pub struct GroupPage {
    pub group: GroupResponse,
    pub page: Page<PostResponse>,
}

/// Payload of `/{username}/`.
#[derive(Debug, Deserialize, Serialize)]
pub struct ProfilePage {
    pub author: AuthorResponse,
    pub page: Page<PostResponse>,
}

/// Payload of `/{username}/{post_id}/`.
#[derive(Debug, Deserialize, Serialize)]
pub struct PostPage {
    pub post: PostResponse,
    pub author: AuthorResponse,
    pub comments: Vec<CommentResponse>,
}

/// A form ready to be rendered, with the submitted values and any field errors.
#[derive(Debug, Deserialize, Serialize)]
pub struct FormPage<F> {
    pub form: F,
    #[serde(default)]
    pub errors: std::collections::BTreeMap<String, Vec<String>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<GroupResponse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post: Option<PostResponse>,
}

impl<F> FormPage<F> {
    pub fn new(form: F) -> Self {
        FormPage {
            form,
            errors: Default::default(),
            groups: Vec::new(),
            post: None,
        }
    }

    pub fn with_errors(mut self, errors: FormErrors) -> Self {
        self.errors = errors
            .into_iter()
            .map(|(field, messages)| (field.to_string(), messages))
            .collect();
        self
    }

    pub fn with_groups(mut self, groups: Vec<GroupResponse>) -> Self {
        self.groups = groups;
        self
    }

    pub fn with_post(mut self, post: PostResponse) -> Self {
        self.post = Some(post);
        self
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct LoginPage {
    pub next: Option<String>,
}
