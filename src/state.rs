use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::config::AppConfig;

/// Shared handler state. The connection sits behind an `Arc` so the state
/// stays cheap to clone whatever backend the connection wraps.
#[derive(Clone)]
pub struct AppState {
    pub orm: Arc<DatabaseConnection>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(orm: DatabaseConnection, config: AppConfig) -> Self {
        Self {
            orm: Arc::new(orm),
            config: Arc::new(config),
        }
    }
}
