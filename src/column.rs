//! Column declarations and the registry a grid validates against.
//!
//! A [`Column`] names one orderable/filterable projection of the underlying
//! data: a stable `id` used in URLs and persisted state, a storage `alias`
//! used when talking to the query backend, and flags describing what the
//! column can do. A **virtual column** is registered purely as a search
//! target: it is never displayed and never sortable.
//!
//! Columns are immutable once registered. Everything that can go wrong here
//! is an integrator mistake, so [`ColumnRegistry::register`] fails fast
//! instead of limping along with a grid that is subtly broken for every user.

use serde::{Deserialize, Serialize};

use crate::error::{GridError, Result};
use crate::query::Sense;

/// Maximum length of a column id. Ids end up in URLs, session keys and
/// durable rows, so they are kept short and stable.
pub const MAX_COLUMN_ID_LEN: usize = 30;

/// The alias (or aliases) used when sorting by a column.
///
/// Most columns sort by a single storage alias. A composite alias sorts by
/// several, in the given order, all with the one active sense (e.g. sorting
/// "name" as `last_name, first_name`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortAlias {
    Single(String),
    Composite(Vec<String>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Column {
    pub id: String,
    /// Storage alias used for default sort and search targeting.
    pub alias: String,
    pub label: String,
    pub sortable: bool,
    pub default_displayed: bool,
    /// Distinct alias for search, when filtering goes through a different
    /// expression than display (e.g. a joined table's column).
    pub alias_search: Option<String>,
    /// Distinct alias (or composite alias list) for sorting.
    pub alias_sort: Option<SortAlias>,
    /// Virtual columns are search-only: never displayed, never sorted.
    pub virtual_column: bool,
}

impl Column {
    pub fn new(id: impl Into<String>, alias: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            alias: alias.into(),
            label: label.into(),
            sortable: false,
            default_displayed: false,
            alias_search: None,
            alias_sort: None,
            virtual_column: false,
        }
    }

    /// A virtual column: a named search target with no display or sort
    /// capability.
    pub fn virtual_col(id: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            alias: alias.into(),
            label: String::new(),
            sortable: false,
            default_displayed: false,
            alias_search: None,
            alias_sort: None,
            virtual_column: true,
        }
    }

    pub fn sortable(mut self) -> Self {
        self.sortable = true;
        self
    }

    pub fn default_displayed(mut self) -> Self {
        self.default_displayed = true;
        self
    }

    pub fn with_search_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias_search = Some(alias.into());
        self
    }

    pub fn with_sort_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias_sort = Some(SortAlias::Single(alias.into()));
        self
    }

    /// Composite sort key: each alias becomes a successive ORDER BY clause,
    /// first listed is primary.
    pub fn with_composite_sort(mut self, aliases: Vec<String>) -> Self {
        self.alias_sort = Some(SortAlias::Composite(aliases));
        self
    }

    /// The alias used when searching against this column.
    pub fn search_alias(&self) -> &str {
        self.alias_search.as_deref().unwrap_or(&self.alias)
    }

    /// The alias(es) used when sorting by this column, falling back to the
    /// storage alias when no distinct sort alias was declared.
    pub fn sort_alias(&self) -> SortAlias {
        match &self.alias_sort {
            Some(alias) => alias.clone(),
            None => SortAlias::Single(self.alias.clone()),
        }
    }
}

/// One criterion of a personalized multi-key default sort.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortCriterion {
    /// Sort by this alias using the grid's default sense.
    Aliased(String),
    /// Sort by this alias with an explicit sense.
    Explicit(String, Sense),
}

/// The set of columns a grid validates every candidate value against.
///
/// Registration order is preserved: it is the order columns are displayed in
/// when no user preference narrows them down.
#[derive(Debug, Clone, Default)]
pub struct ColumnRegistry {
    columns: Vec<Column>,
}

impl ColumnRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a column. Fails on a duplicate or over-long id.
    pub fn register(&mut self, column: Column) -> Result<()> {
        if column.id.is_empty() {
            return Err(GridError::Configuration("column id must not be empty".into()));
        }
        if column.id.chars().count() > MAX_COLUMN_ID_LEN {
            return Err(GridError::Configuration(format!(
                "column id '{}' exceeds {} characters",
                column.id, MAX_COLUMN_ID_LEN
            )));
        }
        if self.get(&column.id).is_some() {
            return Err(GridError::Configuration(format!(
                "duplicate column id '{}'",
                column.id
            )));
        }
        self.columns.push(column);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// True when `id` names a registered, sortable, non-virtual column.
    pub fn is_sortable(&self, id: &str) -> bool {
        self.get(id).map(|c| c.sortable && !c.virtual_column).unwrap_or(false)
    }

    /// All non-virtual columns, in registration order.
    pub fn displayable(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(|c| !c.virtual_column)
    }

    /// Ids of the columns displayed when the user never customized anything.
    pub fn default_displayed_ids(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| c.default_displayed && !c.virtual_column)
            .map(|c| c.id.clone())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> ColumnRegistry {
        let mut reg = ColumnRegistry::new();
        reg.register(Column::new("name", "u.name", "Name").sortable().default_displayed())
            .unwrap();
        reg.register(Column::new("date", "u.created_at", "Created").sortable())
            .unwrap();
        reg.register(Column::new("status", "u.status", "Status").default_displayed())
            .unwrap();
        reg.register(Column::virtual_col("text", "u.bio")).unwrap();
        reg
    }

    #[test]
    fn register_rejects_duplicate_id() {
        let mut reg = registry();
        let err = reg.register(Column::new("name", "x", "X")).unwrap_err();
        assert!(matches!(err, GridError::Configuration(_)));
    }

    #[test]
    fn register_rejects_over_long_id() {
        let mut reg = ColumnRegistry::new();
        let id = "a".repeat(MAX_COLUMN_ID_LEN + 1);
        let err = reg.register(Column::new(id, "x", "X")).unwrap_err();
        assert!(matches!(err, GridError::Configuration(_)));
    }

    #[test]
    fn register_rejects_empty_id() {
        let mut reg = ColumnRegistry::new();
        assert!(reg.register(Column::new("", "x", "X")).is_err());
    }

    #[test]
    fn sortable_excludes_virtual_and_unsortable() {
        let reg = registry();
        assert!(reg.is_sortable("name"));
        assert!(!reg.is_sortable("status"));
        assert!(!reg.is_sortable("text"));
        assert!(!reg.is_sortable("missing"));
    }

    #[test]
    fn default_displayed_ids_skip_virtual() {
        let reg = registry();
        assert_eq!(reg.default_displayed_ids(), vec!["name", "status"]);
    }

    #[test]
    fn sort_alias_falls_back_to_storage_alias() {
        let col = Column::new("name", "u.name", "Name");
        assert_eq!(col.sort_alias(), SortAlias::Single("u.name".into()));

        let col = Column::new("name", "u.name", "Name")
            .with_composite_sort(vec!["u.last".into(), "u.first".into()]);
        assert_eq!(
            col.sort_alias(),
            SortAlias::Composite(vec!["u.last".into(), "u.first".into()])
        );
    }

    #[test]
    fn search_alias_prefers_distinct_alias() {
        let col = Column::new("name", "u.name", "Name").with_search_alias("search.name");
        assert_eq!(col.search_alias(), "search.name");
    }
}
