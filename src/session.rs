//! # Persisted grid state
//!
//! [`GridSession`] is the serializable snapshot of one user's preferences
//! for one named grid: which columns are displayed, how many results per
//! page, the active sort, the current page, and the filter snapshot. It is
//! created with defaults on first visit, loaded from the session store each
//! request, and written back each request.
//!
//! Deserialization is tolerant: rows written by an older release may lack
//! fields added since, so every addition carries a serde default. A loaded
//! session is *never* trusted — the engine re-validates every field against
//! the current configuration before use, because the configuration may have
//! changed since the row was written.

use serde::{Deserialize, Serialize};

use crate::query::Sense;
use crate::search::FilterValues;

/// Sort sentinel meaning "the grid's personalized multi-key default sort".
pub const PERSONALIZED_SORT: &str = "__defaultpersonalizedsort";

/// Pages above this ceiling are treated as corrupted or abusive input and
/// reset to 1.
pub const PAGE_CEILING: u64 = 1_000_000_000;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridSession {
    pub displayed_columns: Vec<String>,
    pub results_per_page: u32,
    pub sort: String,
    pub sense: Sense,
    pub page: u64,
    /// The filter snapshot,`None` until the user first searches.
    pub search: Option<FilterValues>,
    /// Name of the searcher that produced `search`; a mismatch against the
    /// configured searcher marks the snapshot stale.
    pub search_kind: Option<String>,
}

// Tolerant deserializer: sessions written before `search_kind` existed (or
// with a missing page) still load, with safe defaults the engine re-checks.
impl<'de> Deserialize<'de> for GridSession {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let helper = GridSessionHelper::deserialize(deserializer)?;
        Ok(GridSession {
            displayed_columns: helper.displayed_columns,
            results_per_page: helper.results_per_page,
            sort: helper.sort,
            sense: helper.sense,
            page: helper.page.unwrap_or(1),
            search: helper.search,
            search_kind: helper.search_kind,
        })
    }
}

#[derive(Deserialize)]
struct GridSessionHelper {
    displayed_columns: Vec<String>,
    results_per_page: u32,
    sort: String,
    #[serde(default)]
    sense: Sense,
    #[serde(default)]
    page: Option<u64>,
    #[serde(default)]
    search: Option<FilterValues>,
    #[serde(default)]
    search_kind: Option<String>,
}

/// Which tracked fields changed away from their previous effective value
/// during this request. Reset at the start of every request; a durable
/// write only happens when at least one flag is set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DirtyState {
    pub page_size: bool,
    pub columns: bool,
    pub sort: bool,
    pub sense: bool,
}

impl DirtyState {
    pub fn any(&self) -> bool {
        self.page_size || self.columns || self.sort || self.sense
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::FilterValue;

    fn session() -> GridSession {
        GridSession {
            displayed_columns: vec!["name".into(), "date".into()],
            results_per_page: 25,
            sort: "name".into(),
            sense: Sense::Desc,
            page: 3,
            search: None,
            search_kind: None,
        }
    }

    #[test]
    fn serialization_round_trip() {
        let mut s = session();
        let mut values = FilterValues::new();
        values.insert("query_name".into(), FilterValue::Text("ann".into()));
        s.search = Some(values);
        s.search_kind = Some("user_search".into());

        let json = serde_json::to_string(&s).unwrap();
        let loaded: GridSession = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded, s);
    }

    #[test]
    fn legacy_session_without_new_fields_loads() {
        let json = r#"{
            "displayed_columns": ["name"],
            "results_per_page": 10,
            "sort": "name"
        }"#;
        let loaded: GridSession = serde_json::from_str(json).unwrap();
        assert_eq!(loaded.page, 1);
        assert_eq!(loaded.sense, Sense::Asc);
        assert!(loaded.search.is_none());
        assert!(loaded.search_kind.is_none());
    }

    #[test]
    fn dirty_state_any() {
        let mut d = DirtyState::default();
        assert!(!d.any());
        d.sort = true;
        assert!(d.any());
    }
}
