use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::query::Sense;
use crate::search::FilterValues;
use crate::session::GridSession;

pub mod fs;
pub mod memory;

/// Identifies one user's durable row for one named grid.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StateKey {
    pub user: Uuid,
    pub grid: String,
}

impl StateKey {
    pub fn new(user: Uuid, grid: impl Into<String>) -> Self {
        Self {
            user,
            grid: grid.into(),
        }
    }
}

/// Durable snapshot of a user's grid preferences. The current page is
/// deliberately absent: it is transient, session-only state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridRecord {
    pub displayed_columns: Vec<String>,
    pub results_per_page: u32,
    pub sort: String,
    pub sense: Sense,
    #[serde(default)]
    pub search: Option<FilterValues>,
    #[serde(default)]
    pub search_kind: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl GridRecord {
    pub fn from_session(session: &GridSession) -> Self {
        Self {
            displayed_columns: session.displayed_columns.clone(),
            results_per_page: session.results_per_page,
            sort: session.sort.clone(),
            sense: session.sense,
            search: session.search.clone(),
            search_kind: session.search_kind.clone(),
            updated_at: Utc::now(),
        }
    }

    /// Rehydrates a session from a durable row. The page always restarts
    /// at 1.
    pub fn into_session(self) -> GridSession {
        GridSession {
            displayed_columns: self.displayed_columns,
            results_per_page: self.results_per_page,
            sort: self.sort,
            sense: self.sense,
            page: 1,
            search: self.search,
            search_kind: self.search_kind,
        }
    }
}

/// Per-visit state, keyed by grid name. Implementations wrap whatever the
/// host application uses for its HTTP session, so the store is scoped to a
/// single user already.
pub trait SessionStore {
    fn load(&self, grid: &str) -> Result<Option<GridSession>>;
    fn save(&mut self, grid: &str, session: &GridSession) -> Result<()>;
    fn remove(&mut self, grid: &str) -> Result<()>;
}

/// Cross-visit state, keyed by user and grid name.
pub trait DurableStore {
    fn load(&self, key: &StateKey) -> Result<Option<GridRecord>>;

    /// Create or update the row for `key`.
    fn upsert(&mut self, key: &StateKey, record: &GridRecord) -> Result<()>;

    fn delete(&mut self, key: &StateKey) -> Result<()>;
}

impl<T: SessionStore + ?Sized> SessionStore for &mut T {
    fn load(&self, grid: &str) -> Result<Option<GridSession>> {
        (**self).load(grid)
    }

    fn save(&mut self, grid: &str, session: &GridSession) -> Result<()> {
        (**self).save(grid, session)
    }

    fn remove(&mut self, grid: &str) -> Result<()> {
        (**self).remove(grid)
    }
}

impl<T: DurableStore + ?Sized> DurableStore for &mut T {
    fn load(&self, key: &StateKey) -> Result<Option<GridRecord>> {
        (**self).load(key)
    }

    fn upsert(&mut self, key: &StateKey, record: &GridRecord) -> Result<()> {
        (**self).upsert(key, record)
    }

    fn delete(&mut self, key: &StateKey) -> Result<()> {
        (**self).delete(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::FilterValue;

    #[test]
    fn record_round_trip_drops_page() {
        let mut values = FilterValues::new();
        values.insert("flag".into(), FilterValue::Bool(true));
        let session = GridSession {
            displayed_columns: vec!["name".into()],
            results_per_page: 50,
            sort: "name".into(),
            sense: Sense::Desc,
            page: 7,
            search: Some(values),
            search_kind: Some("main".into()),
        };

        let restored = GridRecord::from_session(&session).into_session();
        assert_eq!(restored.page, 1);
        assert_eq!(restored.displayed_columns, session.displayed_columns);
        assert_eq!(restored.search, session.search);
        assert_eq!(restored.search_kind, session.search_kind);
    }
}
