use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use rusqlite::Connection;

use crate::db::queries;
use crate::models::{BookingRecord, BookingSettings, Professional};
use crate::services::ports::{BookingStore, PortError, ProfessionalDirectory, SettingsSource};

/// SQLite-backed settings, directory and booking collections.
#[derive(Clone)]
pub struct SqliteStore {
    db: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    pub fn new(db: Arc<Mutex<Connection>>) -> Self {
        Self { db }
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, PortError> {
        self.db
            .lock()
            .map_err(|_| PortError::Storage("database lock poisoned".to_string()))
    }
}

#[async_trait]
impl SettingsSource for SqliteStore {
    async fn fetch_booking_settings(&self, card_id: &str) -> Result<BookingSettings, PortError> {
        let conn = self.conn()?;
        queries::get_booking_settings(&conn, card_id)?.ok_or(PortError::NotFound)
    }
}

#[async_trait]
impl ProfessionalDirectory for SqliteStore {
    async fn fetch_professionals(&self, owner_id: &str) -> Result<Vec<Professional>, PortError> {
        let conn = self.conn()?;
        Ok(queries::list_professionals(&conn, owner_id)?)
    }
}

#[async_trait]
impl BookingStore for SqliteStore {
    async fn create_booking(
        &self,
        owner_id: &str,
        record: &BookingRecord,
    ) -> Result<String, PortError> {
        let conn = self.conn()?;
        Ok(queries::create_booking(&conn, owner_id, record)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    #[tokio::test]
    async fn test_missing_settings_is_not_found() {
        let store = SqliteStore::new(Arc::new(Mutex::new(db::init_db(":memory:").unwrap())));
        assert_eq!(
            store.fetch_booking_settings("nope").await,
            Err(PortError::NotFound)
        );
        assert!(store.fetch_professionals("owner-1").await.unwrap().is_empty());
    }
}
