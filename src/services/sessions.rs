use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{Duration, NaiveDateTime, Utc};

use crate::services::flow::{BookingFlow, FlowHost, InlineCompletion};

/// A running flow plus the time it was last touched.
pub struct SessionEntry {
    pub flow: tokio::sync::Mutex<BookingFlow>,
    last_activity: Mutex<NaiveDateTime>,
}

impl SessionEntry {
    fn touch(&self, now: NaiveDateTime) {
        *self
            .last_activity
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = now;
    }

    fn idle_since(&self) -> NaiveDateTime {
        *self
            .last_activity
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Flows kept in memory for the HTTP surface, dropped after `ttl` idle.
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, Arc<SessionEntry>>>,
    ttl: Duration,
}

impl SessionRegistry {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    fn map(&self) -> std::sync::MutexGuard<'_, HashMap<String, Arc<SessionEntry>>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn insert(&self, id: String, flow: BookingFlow) -> Arc<SessionEntry> {
        let entry = Arc::new(SessionEntry {
            flow: tokio::sync::Mutex::new(flow),
            last_activity: Mutex::new(Utc::now().naive_utc()),
        });
        self.map().insert(id, Arc::clone(&entry));
        entry
    }

    /// Looks up a live session and marks it active.
    pub fn get(&self, id: &str) -> Option<Arc<SessionEntry>> {
        let now = Utc::now().naive_utc();
        let mut map = self.map();
        let entry = Arc::clone(map.get(id)?);
        if now - entry.idle_since() >= self.ttl {
            tracing::debug!(session_id = id, "session expired");
            map.remove(id);
            return None;
        }
        entry.touch(now);
        Some(entry)
    }

    pub fn remove(&self, id: &str) -> Option<Arc<SessionEntry>> {
        self.map().remove(id)
    }

    /// Drops every idle session. Their pending fetches are aborted when the
    /// last reference to the flow goes away.
    pub fn expire_idle(&self) -> usize {
        let now = Utc::now().naive_utc();
        let mut map = self.map();
        let before = map.len();
        map.retain(|_, entry| now - entry.idle_since() < self.ttl);
        let expired = before - map.len();
        if expired > 0 {
            tracing::info!(expired, "expired idle booking sessions");
        }
        expired
    }

    pub fn len(&self) -> usize {
        self.map().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Flow host for sessions driven over HTTP: outcomes travel back in the
/// response, so the callbacks only log.
pub struct LogHost {
    pub session_id: String,
}

impl FlowHost for LogHost {
    fn on_inline_complete(&self, completion: &InlineCompletion) {
        tracing::info!(
            session_id = %self.session_id,
            date = %completion.date,
            time = %completion.time,
            service_id = %completion.service_id,
            "inline flow handed back to host"
        );
    }

    fn on_close(&self) {
        tracing::info!(session_id = %self.session_id, "booking session closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::models::InitialData;
    use crate::services::flow::{FlowConfig, FlowPorts, NoopHost};
    use crate::services::store::SqliteStore;

    fn flow() -> BookingFlow {
        let store = Arc::new(SqliteStore::new(Arc::new(Mutex::new(
            db::init_db(":memory:").unwrap(),
        ))));
        BookingFlow::new(
            FlowConfig {
                card_id: "card-1".to_string(),
                owner_id: "owner-1".to_string(),
                inline_mode: false,
                initial_step: 1,
                initial_data: InitialData::default(),
            },
            FlowPorts {
                settings: store.clone(),
                professionals: store.clone(),
                bookings: store,
            },
            Arc::new(NoopHost),
        )
    }

    #[test]
    fn test_insert_get_remove() {
        let registry = SessionRegistry::new(Duration::minutes(30));
        registry.insert("s1".to_string(), flow());
        assert!(registry.get("s1").is_some());
        assert!(registry.get("s2").is_none());
        assert_eq!(registry.len(), 1);
        assert!(registry.remove("s1").is_some());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_idle_sessions_expire() {
        let registry = SessionRegistry::new(Duration::zero());
        registry.insert("s1".to_string(), flow());
        registry.insert("s2".to_string(), flow());
        assert!(registry.get("s1").is_none());
        assert_eq!(registry.expire_idle(), 1);
        assert!(registry.is_empty());
    }
}
