use std::{net::SocketAddr, time::Duration};

use ::config::{builder::DefaultState, Config, ConfigBuilder, Environment};
use anyhow::{Context, Result};
use serde::Deserialize;

const DEFAULT_PAGINATE_BY: i64 = 10;
const DEFAULT_INDEX_CACHE_SECONDS: u64 = 20;

fn default_server_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 3001))
}

fn default_paginate_by() -> i64 {
    DEFAULT_PAGINATE_BY
}

fn default_index_cache_seconds() -> u64 {
    DEFAULT_INDEX_CACHE_SECONDS
}

/// Settings as they are spelled in the environment.
#[derive(Debug, Deserialize)]
struct EnvConfig {
    database_url: String,
    jwt_secret: String,
    #[serde(default = "default_server_addr")]
    server_addr: SocketAddr,
    #[serde(default = "default_paginate_by")]
    paginate_by: i64,
    #[serde(default = "default_index_cache_seconds")]
    index_cache_seconds: u64,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: SocketAddr,
    /// Number of posts on every feed page.
    pub paginate_by: i64,
    /// Expiry of the home feed fragment cache. Zero disables it.
    pub index_cache_ttl: Duration,
}

impl AppConfig {
    /// Reads `DATABASE_URL`, `JWT_SECRET`, `SERVER_ADDR`, `PAGINATE_BY` and
    /// `INDEX_CACHE_SECONDS`. Call `dotenvy::dotenv()` first if a `.env` file
    /// should be honoured.
    pub fn from_env() -> Result<Self> {
        Self::load(Config::builder().add_source(Environment::default()))
    }

    fn load(builder: ConfigBuilder<DefaultState>) -> Result<Self> {
        let env: EnvConfig = builder
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")?;
        if env.paginate_by < 1 {
            anyhow::bail!("PAGINATE_BY must be at least 1, got {}", env.paginate_by);
        }

        Ok(Self {
            database_url: env.database_url,
            jwt_secret: env.jwt_secret,
            server_addr: env.server_addr,
            paginate_by: env.paginate_by,
            index_cache_ttl: Duration::from_secs(env.index_cache_seconds),
        })
    }

    pub fn new(database_url: impl Into<String>, jwt_secret: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            jwt_secret: jwt_secret.into(),
            server_addr: default_server_addr(),
            paginate_by: DEFAULT_PAGINATE_BY,
            index_cache_ttl: Duration::from_secs(DEFAULT_INDEX_CACHE_SECONDS),
        }
    }
}
