use crate::config::Config;
use sqlx::PgPool;
use std::sync::Arc;

/// Shared handler state: the Postgres pool all settlement queries run on,
/// plus the environment config (the tenant extractor reads the JWT secret
/// from it).
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(db: PgPool, config: Config) -> Self {
        Self {
            db,
            config: Arc::new(config),
        }
    }
}
