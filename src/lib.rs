mod authentication;
mod cache;
mod config;
mod data_formats;
mod db_helpers;
mod errors;
mod handlers;
mod models;
mod pagination;

use anyhow::Context;
pub use anyhow::Result;
use axum::http::StatusCode;
use axum::{routing::*, Extension, Json, Router};
pub use cache::FragmentCache;
pub use crate::config::AppConfig;
pub use data_formats::*;
pub use db_helpers::init_db;
pub use errors::{RequestErrorJsonWrapper, LOGIN_URL};
use handlers::*;
pub use pagination::Page;
use sqlx::SqlitePool;
use std::{
    net::{SocketAddr, TcpListener},
    sync::Arc,
};
pub type JsonResponse<T> = (StatusCode, Json<T>);

/// Shared by every request through an `Extension` layer.
#[derive(Debug)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: AppConfig,
    pub cache: FragmentCache,
}

impl AppState {
    pub fn new(db: SqlitePool, config: AppConfig) -> Self {
        let cache = FragmentCache::new(config.index_cache_ttl);
        Self { db, config, cache }
    }
}

pub async fn run_app(app: Router, config: AppConfig) -> Result<()> {
    let db = init_db(&config.database_url).await?;
    let address = config.server_addr;
    let app = with_state(app, AppState::new(db, config));
    tracing::info!(%address, "listening");
    axum::Server::bind(&address)
        .serve(app.into_make_service())
        .await
        .context("Server stopped with an error")?;
    Ok(())
}

pub fn with_state(app: Router, state: AppState) -> Router {
    app.layer(Extension(Arc::new(state)))
}

pub fn get_random_free_port() -> (u16, SocketAddr) {
    let listener = TcpListener::bind("localhost:0").expect("Could not bind a free port");
    match listener.local_addr() {
        Ok(addr) => (addr.port(), addr),
        Err(_) => panic!("Could not get a free port"),
    }
}

pub fn make_router() -> Router {
    Router::new()
        .route("/check_health", get(alive))
        .route("/auth/signup/", post(register_user))
        .route("/auth/login/", get(login_page).post(login_user))
        .route("/", get(index))
        .route("/follow/", get(follow_index))
        .route("/new/", get(new_post_form).post(new_post))
        .route("/group/new/", get(group_create_form).post(group_create))
        .route("/group/:slug/", get(group_posts))
        .route("/:username/", get(profile))
        .route("/:username/follow/", get(profile_follow))
        .route("/:username/unfollow/", get(profile_unfollow))
        .route("/:username/:post_id/", get(post_view))
        .route("/:username/:post_id/edit/", get(post_edit_form).post(post_edit))
        .route("/:username/:post_id/comment", post(add_comment))
        .fallback(not_found)
}
