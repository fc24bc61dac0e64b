use std::sync::Arc;

use crate::auth::token::TokenKeys;
use crate::config::AppConfig;
use crate::db::{Database, PgConnector};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: Arc<Database>,
    pub keys: TokenKeys,
}

impl AppState {
    /// Reads configuration and builds the process-wide state. Does not touch
    /// the database: the connection guard establishes it on first use.
    pub fn init() -> Result<Self, crate::config::ConfigError> {
        let config = Arc::new(AppConfig::from_env()?);
        let keys = TokenKeys::from_config(&config.jwt);
        let db = Arc::new(Database::new(PgConnector::new(config.database_url.as_str())));
        Ok(Self { config, db, keys })
    }
}
