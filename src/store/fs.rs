use std::fs;
use std::path::{Path, PathBuf};

use super::{DurableStore, GridRecord, StateKey};
use crate::error::Result;

/// File-backed durable store: one JSON file per user and grid under a base
/// directory. Suitable for single-node deployments and for integration
/// tests; multi-node hosts supply their own [`DurableStore`] over a
/// database.
pub struct JsonFileDurableStore {
    base_path: PathBuf,
}

impl JsonFileDurableStore {
    pub fn new<P: AsRef<Path>>(base_path: P) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    fn record_path(&self, key: &StateKey) -> PathBuf {
        // Grid names are validated identifiers, safe as path components.
        self.base_path
            .join(format!("{}__{}.json", key.user, key.grid))
    }
}

impl DurableStore for JsonFileDurableStore {
    fn load(&self, key: &StateKey) -> Result<Option<GridRecord>> {
        let path = self.record_path(key);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path)?;
        let record: GridRecord = serde_json::from_str(&content)?;
        Ok(Some(record))
    }

    fn upsert(&mut self, key: &StateKey, record: &GridRecord) -> Result<()> {
        if !self.base_path.exists() {
            fs::create_dir_all(&self.base_path)?;
        }
        let path = self.record_path(key);
        let content = serde_json::to_string_pretty(record)?;

        // Write to a sibling temp file and rename so a crash mid-write
        // never leaves a truncated record behind.
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, content)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn delete(&mut self, key: &StateKey) -> Result<()> {
        let path = self.record_path(key);
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Sense;
    use crate::session::GridSession;
    use tempfile::TempDir;
    use uuid::Uuid;

    fn record() -> GridRecord {
        GridRecord::from_session(&GridSession {
            displayed_columns: vec!["name".into(), "date".into()],
            results_per_page: 25,
            sort: "date".into(),
            sense: Sense::Desc,
            page: 4,
            search: None,
            search_kind: None,
        })
    }

    #[test]
    fn upsert_then_load() {
        let dir = TempDir::new().unwrap();
        let mut store = JsonFileDurableStore::new(dir.path());
        let key = StateKey::new(Uuid::new_v4(), "users");

        assert!(store.load(&key).unwrap().is_none());

        let rec = record();
        store.upsert(&key, &rec).unwrap();
        let loaded = store.load(&key).unwrap().unwrap();
        assert_eq!(loaded, rec);
    }

    #[test]
    fn upsert_overwrites_existing_row() {
        let dir = TempDir::new().unwrap();
        let mut store = JsonFileDurableStore::new(dir.path());
        let key = StateKey::new(Uuid::new_v4(), "users");

        store.upsert(&key, &record()).unwrap();
        let mut updated = record();
        updated.results_per_page = 100;
        store.upsert(&key, &updated).unwrap();

        let loaded = store.load(&key).unwrap().unwrap();
        assert_eq!(loaded.results_per_page, 100);
    }

    #[test]
    fn delete_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let mut store = JsonFileDurableStore::new(dir.path());
        let key = StateKey::new(Uuid::new_v4(), "users");

        store.upsert(&key, &record()).unwrap();
        store.delete(&key).unwrap();
        store.delete(&key).unwrap();
        assert!(store.load(&key).unwrap().is_none());
    }

    #[test]
    fn rows_do_not_collide_across_grids() {
        let dir = TempDir::new().unwrap();
        let mut store = JsonFileDurableStore::new(dir.path());
        let user = Uuid::new_v4();
        let users_key = StateKey::new(user, "users");
        let orders_key = StateKey::new(user, "orders");

        store.upsert(&users_key, &record()).unwrap();
        assert!(store.load(&orders_key).unwrap().is_none());
    }
}
