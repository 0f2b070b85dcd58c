use std::sync::Arc;

use sqlx::SqlitePool;

use crate::auth::session::{SessionKeys, SessionStore};
use crate::config::AppConfig;
use crate::db;
use crate::storage::{LocalStorage, StorageClient};

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Arc<AppConfig>,
    pub sessions: SessionStore,
    pub keys: SessionKeys,
    pub storage: Arc<dyn StorageClient>,
}

impl AppState {
    /// Connect, migrate and wire everything up from `config`.
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let db = db::connect(&config.database_url).await?;
        db::migrate(&db).await?;
        let storage = Arc::new(LocalStorage::new(config.plots_dir.clone())) as Arc<dyn StorageClient>;
        Ok(Self::from_parts(db, Arc::new(config), storage))
    }

    pub fn from_parts(db: SqlitePool, config: Arc<AppConfig>, storage: Arc<dyn StorageClient>) -> Self {
        let keys = SessionKeys::new(&config.session);
        Self {
            db,
            config,
            sessions: SessionStore::new(),
            keys,
            storage,
        }
    }
}
