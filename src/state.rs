// src/state.rs

use std::sync::Arc;

use crate::{config::Config, utils::session::SessionStore};
use axum::extract::FromRef;
use chrono::TimeDelta;
use sqlx::SqlitePool;
use tera::Tera;

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub config: Config,
    pub sessions: SessionStore,
    pub templates: Arc<Tera>,
}

impl AppState {
    /// Builds the state with a fresh session store and the embedded templates.
    pub fn new(pool: SqlitePool, config: Config) -> Result<Self, tera::Error> {
        let sessions = SessionStore::new(TimeDelta::seconds(config.session_ttl.into()));
        Ok(Self {
            pool,
            config,
            sessions,
            templates: Arc::new(crate::templates::engine()?),
        })
    }
}

impl FromRef<AppState> for SqlitePool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for SessionStore {
    fn from_ref(state: &AppState) -> Self {
        state.sessions.clone()
    }
}

impl FromRef<AppState> for Arc<Tera> {
    fn from_ref(state: &AppState) -> Self {
        state.templates.clone()
    }
}
