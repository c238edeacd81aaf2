//! fantasy xc: pick athletes for each cross-country meet and compete in leagues.

pub mod auth;
pub mod captcha;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod picks;
pub mod routes;
pub mod scoring;
pub mod views;

use std::sync::Arc;

use sqlx::sqlite::SqlitePool;

use crate::captcha::Captcha;
use crate::config::Config;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub config: Arc<Config>,
    pub captcha: Captcha,
}

impl AppState {
    pub fn new(pool: SqlitePool, config: Config) -> Self {
        let captcha = Captcha::from_config(config.turnstile.as_ref());
        Self {
            pool,
            config: Arc::new(config),
            captcha,
        }
    }
}
