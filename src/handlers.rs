use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::{Path, Query},
    http::{header, StatusCode, Uri},
    response::{IntoResponse, Redirect, Response},
    Extension, Form, Json,
};
use sqlx::SqlitePool;

use crate::{
    authentication::{
        get_jwt_token, hash_password_argon2, verify_password_argon2, AuthUser, MaybeUser,
    },
    cache::{FragmentCache, INDEX_PAGE_FRAGMENT},
    data_formats::*,
    db_helpers::*,
    errors::RequestError,
    pagination::{PageQuery, PageWindow},
    AppState,
};

type JsonResult<T> = Result<Json<T>, RequestError>;

fn post_url(username: &str, post_id: i64) -> String {
    format!("/{}/{}/", username, post_id)
}

fn profile_url(username: &str) -> String {
    format!("/{}/", username)
}

/// Post ids in URLs are plain digits; anything else is an unknown page.
fn parse_post_id(raw: &str) -> Result<i64, RequestError> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(RequestError::NotFound("Post not found"));
    }
    raw.parse().map_err(|_| RequestError::NotFound("Post not found"))
}

fn form_error<F: serde::Serialize>(page: FormPage<F>) -> Response {
    (StatusCode::UNPROCESSABLE_ENTITY, Json(page)).into_response()
}

async fn group_choices(pool: &SqlitePool) -> Result<Vec<GroupResponse>, RequestError> {
    Ok(list_groups(pool)
        .await?
        .into_iter()
        .map(GroupResponse::from)
        .collect())
}

/// Runs the form checks, then makes sure the chosen group exists.
async fn validate_post_form(
    pool: &SqlitePool,
    form: &PostForm,
) -> Result<Result<PostInput, FormErrors>, RequestError> {
    let input = match form.validate() {
        Ok(input) => input,
        Err(errors) => return Ok(Err(errors)),
    };
    if let Some(group_id) = input.group_id {
        if get_group_by_id(pool, group_id).await?.is_none() {
            let mut errors = FormErrors::new();
            errors
                .entry("group")
                .or_default()
                .push(INVALID_CHOICE.to_string());
            return Ok(Err(errors));
        }
    }
    Ok(Ok(input))
}

// ----------------- Helper Handlers -----------------
pub async fn alive() -> &'static str {
    "alive"
}

pub async fn not_found(uri: Uri) -> Response {
    tracing::debug!(%uri, "no route");
    RequestError::NotFound("Page not found").into_response()
}

// ----------------- User Handlers -----------------
pub async fn register_user(
    Extension(state): Extension<Arc<AppState>>,
    Json(UserWrapper { user: request }): Json<UserWrapper<RegisterRequest>>,
) -> Result<Response, RequestError> {
    let username = request.username.trim().to_string();
    // Passwords are never echoed back in the form.
    let echo = RegisterRequest {
        username: username.clone(),
        password: String::new(),
    };
    if let Err(errors) = request.validate() {
        return Ok(form_error(FormPage::new(echo).with_errors(errors)));
    }
    let password = hash_password_argon2(request.password).await?;

    let user = match insert_user(&state.db, &username, &password).await {
        Ok(user) => user,
        Err(e) if e.is_unique_violation() => {
            let mut errors = FormErrors::new();
            errors
                .entry("username")
                .or_default()
                .push("A user with that username already exists.".to_string());
            return Ok(form_error(FormPage::new(echo).with_errors(errors)));
        }
        Err(e) => return Err(e),
    };
    tracing::info!(user_id = user.id, username = %user.username, "registered user");

    let token = get_jwt_token(&state.config.jwt_secret, user.id)?;
    Ok((
        StatusCode::CREATED,
        Json(UserWrapper::wrap_with_user_data(UserResponse::new(
            user, token,
        ))),
    )
        .into_response())
}

pub async fn login_user(
    Extension(state): Extension<Arc<AppState>>,
    Json(UserWrapper { user: request }): Json<UserWrapper<LoginRequest>>,
) -> JsonResult<UserWrapper<UserResponse>> {
    let user = get_user_by_username(&state.db, request.username.trim())
        .await?
        .ok_or(RequestError::RunTimeError("Invalid username or password"))?;
    let is_password_correct =
        verify_password_argon2(request.password, user.password.clone()).await?;
    if !is_password_correct {
        return Err(RequestError::RunTimeError("Invalid username or password"));
    }
    let token = get_jwt_token(&state.config.jwt_secret, user.id)?;
    Ok(Json(UserWrapper::wrap_with_user_data(UserResponse::new(
        user, token,
    ))))
}

pub async fn login_page(Query(params): Query<LoginQueryParams>) -> Json<LoginPage> {
    Json(LoginPage { next: params.next })
}

// ----------------- Feed Handlers -----------------

/// The global feed. Rendered pages are kept in the fragment cache, so new
/// posts may take up to the cache expiry to show up here.
pub async fn index(
    Extension(state): Extension<Arc<AppState>>,
    Query(query): Query<PageQuery>,
) -> Result<Response, RequestError> {
    let per_page = state.config.paginate_by;
    // Keyed on the resolved page so out of range requests share one entry.
    let count = count_feed(&state.db, Feed::All).await?;
    let number = PageWindow::resolve(query.requested(), per_page, count).number;
    let key = FragmentCache::key(INDEX_PAGE_FRAGMENT, &[&number]);
    let body = match state.cache.get(&key) {
        Some(body) => body,
        None => {
            let page = list_feed(&state.db, Feed::All, number, per_page)
                .await?
                .map(PostResponse::from);
            let body =
                serde_json::to_string(&FeedPage { page }).context("Failed to render index page")?;
            state.cache.insert(key, body.clone());
            body
        }
    };
    Ok(([(header::CONTENT_TYPE, "application/json")], body).into_response())
}

pub async fn group_posts(
    Extension(state): Extension<Arc<AppState>>,
    Path(slug): Path<String>,
    Query(query): Query<PageQuery>,
) -> JsonResult<GroupPage> {
    let group = get_group_by_slug(&state.db, &slug)
        .await?
        .ok_or(RequestError::NotFound("Group not found"))?;
    let page = list_feed(
        &state.db,
        Feed::Group(group.id),
        query.requested(),
        state.config.paginate_by,
    )
    .await?
    .map(PostResponse::from);
    Ok(Json(GroupPage {
        group: group.into(),
        page,
    }))
}

pub async fn profile(
    Extension(state): Extension<Arc<AppState>>,
    maybe_user: MaybeUser,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
) -> JsonResult<ProfilePage> {
    let author = require_user_by_username(&state.db, &username).await?;
    let page = list_feed(
        &state.db,
        Feed::Author(author.id),
        query.requested(),
        state.config.paginate_by,
    )
    .await?
    .map(PostResponse::from);
    let stats = get_author_stats_in_db(&state.db, author.id, maybe_user.get_id()).await?;
    Ok(Json(ProfilePage {
        author: AuthorResponse::new(author.username, stats),
        page,
    }))
}

pub async fn follow_index(
    user: AuthUser,
    Extension(state): Extension<Arc<AppState>>,
    Query(query): Query<PageQuery>,
) -> JsonResult<FeedPage> {
    let page = list_feed(
        &state.db,
        Feed::FollowedBy(user.id),
        query.requested(),
        state.config.paginate_by,
    )
    .await?
    .map(PostResponse::from);
    Ok(Json(FeedPage { page }))
}

// ----------------- Post Handlers -----------------

pub async fn post_view(
    Extension(state): Extension<Arc<AppState>>,
    maybe_user: MaybeUser,
    Path((username, post_id)): Path<(String, String)>,
) -> JsonResult<PostPage> {
    let post_id = parse_post_id(&post_id)?;
    let post = get_post_by_author(&state.db, &username, post_id).await?;
    let stats = get_author_stats_in_db(&state.db, post.author_id, maybe_user.get_id()).await?;
    let comments = get_comments_for_post_in_db(&state.db, post.id)
        .await?
        .into_iter()
        .map(CommentResponse::from)
        .collect();
    Ok(Json(PostPage {
        author: AuthorResponse::new(post.author_username.clone(), stats),
        post: post.into(),
        comments,
    }))
}

pub async fn new_post_form(
    _user: AuthUser,
    Extension(state): Extension<Arc<AppState>>,
) -> JsonResult<FormPage<PostForm>> {
    let groups = group_choices(&state.db).await?;
    Ok(Json(FormPage::new(PostForm::default()).with_groups(groups)))
}

pub async fn new_post(
    user: AuthUser,
    Extension(state): Extension<Arc<AppState>>,
    Form(form): Form<PostForm>,
) -> Result<Response, RequestError> {
    let input = match validate_post_form(&state.db, &form).await? {
        Ok(input) => input,
        Err(errors) => {
            let groups = group_choices(&state.db).await?;
            return Ok(form_error(
                FormPage::new(form).with_errors(errors).with_groups(groups),
            ));
        }
    };
    let post = insert_post(&state.db, user.id, &input).await?;
    tracing::info!(post_id = post.id, author_id = user.id, post = %post, "created post");
    Ok(Redirect::to("/").into_response())
}

pub async fn post_edit_form(
    user: AuthUser,
    Extension(state): Extension<Arc<AppState>>,
    Path((username, post_id)): Path<(String, String)>,
) -> Result<Response, RequestError> {
    let post_id = parse_post_id(&post_id)?;
    let post = get_post_by_author(&state.db, &username, post_id).await?;
    if post.author_id != user.id {
        return Ok(Redirect::to(&post_url(&username, post_id)).into_response());
    }
    let form = PostForm::from_post(&post.text, post.group_id, post.image.as_deref());
    let groups = group_choices(&state.db).await?;
    Ok(Json(
        FormPage::new(form)
            .with_groups(groups)
            .with_post(post.into()),
    )
    .into_response())
}

pub async fn post_edit(
    user: AuthUser,
    Extension(state): Extension<Arc<AppState>>,
    Path((username, post_id)): Path<(String, String)>,
    Form(form): Form<PostForm>,
) -> Result<Response, RequestError> {
    let post_id = parse_post_id(&post_id)?;
    let post = get_post_by_author(&state.db, &username, post_id).await?;
    if post.author_id != user.id {
        tracing::info!(post_id, viewer_id = user.id, "refused edit by non-author");
        return Ok(Redirect::to(&post_url(&username, post_id)).into_response());
    }
    let input = match validate_post_form(&state.db, &form).await? {
        Ok(input) => input,
        Err(errors) => {
            let groups = group_choices(&state.db).await?;
            return Ok(form_error(
                FormPage::new(form)
                    .with_errors(errors)
                    .with_groups(groups)
                    .with_post(post.into()),
            ));
        }
    };
    update_post(&state.db, post_id, &input).await?;
    tracing::info!(post_id, "edited post");
    Ok(Redirect::to(&post_url(&username, post_id)).into_response())
}

// ----------------- Comment Handlers -----------------

/// Always lands back on the post. A blank comment is dropped without telling
/// the user.
pub async fn add_comment(
    user: AuthUser,
    Extension(state): Extension<Arc<AppState>>,
    Path((username, post_id)): Path<(String, String)>,
    Form(form): Form<CommentForm>,
) -> Result<Redirect, RequestError> {
    let post_id = parse_post_id(&post_id)?;
    let post = get_post_by_author(&state.db, &username, post_id).await?;
    match form.validate() {
        Ok(text) => {
            let comment = insert_comment(&state.db, user.id, post.id, &text).await?;
            tracing::info!(
                comment_id = comment.id,
                post_id,
                author_id = user.id,
                comment = %comment,
                "added comment"
            );
        }
        Err(errors) => {
            tracing::warn!(post_id, viewer_id = user.id, ?errors, "discarded invalid comment");
        }
    }
    Ok(Redirect::to(&post_url(&username, post_id)))
}

// ----------------- Follow Handlers -----------------

pub async fn profile_follow(
    user: AuthUser,
    Extension(state): Extension<Arc<AppState>>,
    Path(username): Path<String>,
) -> Result<Redirect, RequestError> {
    let author = require_user_by_username(&state.db, &username).await?;
    if author.id != user.id {
        let created = follow_user_in_db(&state.db, user.id, author.id).await?;
        tracing::info!(follower_id = user.id, followed_id = author.id, created, "follow");
    }
    Ok(Redirect::to(&profile_url(&username)))
}

pub async fn profile_unfollow(
    user: AuthUser,
    Extension(state): Extension<Arc<AppState>>,
    Path(username): Path<String>,
) -> Result<Redirect, RequestError> {
    let author = require_user_by_username(&state.db, &username).await?;
    let removed = unfollow_user_in_db(&state.db, user.id, author.id).await?;
    tracing::info!(follower_id = user.id, followed_id = author.id, removed, "unfollow");
    Ok(Redirect::to(&profile_url(&username)))
}

// ----------------- Group Handlers -----------------

// Open to anonymous visitors; unlike the other write routes this one has
// never asked for a login.
pub async fn group_create_form() -> Json<FormPage<GroupForm>> {
    Json(FormPage::new(GroupForm::default()))
}

pub async fn group_create(
    maybe_user: MaybeUser,
    Extension(state): Extension<Arc<AppState>>,
    Form(form): Form<GroupForm>,
) -> Result<Response, RequestError> {
    let input = match form.validate() {
        Ok(input) => input,
        Err(errors) => return Ok(form_error(FormPage::new(form).with_errors(errors))),
    };
    let group = match insert_group(&state.db, &input).await {
        Ok(group) => group,
        Err(e) if e.is_unique_violation() => {
            let mut errors = FormErrors::new();
            errors
                .entry("slug")
                .or_default()
                .push("Group with this Slug already exists.".to_string());
            return Ok(form_error(FormPage::new(form).with_errors(errors)));
        }
        Err(e) => return Err(e),
    };
    tracing::info!(
        group_id = group.id,
        group = %group,
        viewer_id = ?maybe_user.get_id(),
        "created group"
    );
    Ok(Redirect::to(&format!("/group/{}/", group.slug)).into_response())
}
