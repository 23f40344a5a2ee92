use std::collections::HashMap;

use super::{DurableStore, GridRecord, SessionStore, StateKey};
use crate::error::{GridError, Result};
use crate::session::GridSession;

/// In-memory session store for testing and development.
///
/// Entries are held as serialized JSON, the same way a real HTTP session
/// would carry them, so loading exercises the tolerant deserializer.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    entries: HashMap<String, serde_json::Value>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for InMemorySessionStore {
    fn load(&self, grid: &str) -> Result<Option<GridSession>> {
        match self.entries.get(grid) {
            Some(value) => {
                let session = serde_json::from_value(value.clone())?;
                Ok(Some(session))
            }
            None => Ok(None),
        }
    }

    fn save(&mut self, grid: &str, session: &GridSession) -> Result<()> {
        let value = serde_json::to_value(session)?;
        self.entries.insert(grid.to_string(), value);
        Ok(())
    }

    fn remove(&mut self, grid: &str) -> Result<()> {
        self.entries.remove(grid);
        Ok(())
    }
}

/// In-memory durable store. Does NOT persist across process restarts.
#[derive(Debug, Default)]
pub struct InMemoryDurableStore {
    rows: HashMap<StateKey, GridRecord>,
}

impl InMemoryDurableStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl DurableStore for InMemoryDurableStore {
    fn load(&self, key: &StateKey) -> Result<Option<GridRecord>> {
        Ok(self.rows.get(key).cloned())
    }

    fn upsert(&mut self, key: &StateKey, record: &GridRecord) -> Result<()> {
        self.rows.insert(key.clone(), record.clone());
        Ok(())
    }

    fn delete(&mut self, key: &StateKey) -> Result<()> {
        self.rows.remove(key);
        Ok(())
    }
}

/// Session store whose writes always fail, for exercising error paths.
#[derive(Debug, Default)]
pub struct FailingSessionStore;

impl SessionStore for FailingSessionStore {
    fn load(&self, _grid: &str) -> Result<Option<GridSession>> {
        Ok(None)
    }

    fn save(&mut self, _grid: &str, _session: &GridSession) -> Result<()> {
        Err(GridError::Store("session backend unavailable".to_string()))
    }

    fn remove(&mut self, _grid: &str) -> Result<()> {
        Err(GridError::Store("session backend unavailable".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Sense;
    use uuid::Uuid;

    fn session() -> GridSession {
        GridSession {
            displayed_columns: vec!["name".into()],
            results_per_page: 10,
            sort: "name".into(),
            sense: Sense::Asc,
            page: 2,
            search: None,
            search_kind: None,
        }
    }

    #[test]
    fn session_store_round_trip() {
        let mut store = InMemorySessionStore::new();
        assert!(store.load("users").unwrap().is_none());

        store.save("users", &session()).unwrap();
        let loaded = store.load("users").unwrap().unwrap();
        assert_eq!(loaded, session());

        store.remove("users").unwrap();
        assert!(store.load("users").unwrap().is_none());
    }

    #[test]
    fn durable_store_is_keyed_per_user() {
        let mut store = InMemoryDurableStore::new();
        let alice = StateKey::new(Uuid::new_v4(), "users");
        let bob = StateKey::new(Uuid::new_v4(), "users");

        store
            .upsert(&alice, &GridRecord::from_session(&session()))
            .unwrap();

        assert!(store.load(&alice).unwrap().is_some());
        assert!(store.load(&bob).unwrap().is_none());

        store.delete(&alice).unwrap();
        assert!(store.is_empty());
    }
}
