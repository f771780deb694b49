use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::Connection;

use crate::config::AppConfig;
use crate::errors::AppError;
use crate::services::flow::FlowPorts;
use crate::services::sessions::SessionRegistry;
use crate::services::store::SqliteStore;

pub struct AppState {
    pub db: Arc<Mutex<Connection>>,
    pub config: AppConfig,
    pub store: SqliteStore,
    pub sessions: SessionRegistry,
}

impl AppState {
    pub fn new(conn: Connection, config: AppConfig) -> Self {
        let db = Arc::new(Mutex::new(conn));
        Self {
            store: SqliteStore::new(Arc::clone(&db)),
            sessions: SessionRegistry::new(chrono::Duration::minutes(config.session_ttl_minutes)),
            db,
            config,
        }
    }

    pub fn ports(&self) -> FlowPorts {
        let store = Arc::new(self.store.clone());
        FlowPorts {
            settings: store.clone(),
            professionals: store.clone(),
            bookings: store,
        }
    }

    pub fn db(&self) -> Result<MutexGuard<'_, Connection>, AppError> {
        self.db
            .lock()
            .map_err(|_| AppError::Database(anyhow::anyhow!("database lock poisoned")))
    }
}
