//! # The reconciliation engine
//!
//! One [`GridEngine::handle`] call runs the whole request cycle for a grid:
//! load the user's saved state, fold in this request's deltas, persist the
//! reconciled state, build the query, paginate, and return a render-ready
//! [`GridView`].
//!
//! The engine trusts nothing it loads or receives. Every candidate value,
//! whether from a store or from the request, is validated against the
//! current [`GridConfig`]; an invalid value is silently replaced by the
//! configured default and logged at debug level. User-originated anomalies
//! are never errors. Integrator mistakes, by contrast, fail fast at
//! [`GridConfigBuilder::build`] time.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, warn};
use uuid::Uuid;

use crate::column::{ColumnRegistry, SortAlias, SortCriterion};
use crate::error::{GridError, Result};
use crate::pagination::{paginate, PaginationMode};
use crate::query::{CountStrategy, GridQuery, Sense};
use crate::search::{FieldError, FilterValues, SearchDefinition};
use crate::session::{DirtyState, GridSession, PAGE_CEILING, PERSONALIZED_SORT};
use crate::store::{DurableStore, GridRecord, SessionStore, StateKey};
use crate::view::{
    ColumnView, FieldView, FormView, Fragment, GridView, SettingsColumn, SettingsView,
};

/// The grid's default sort order.
#[derive(Debug, Clone)]
pub enum DefaultSort {
    /// Sort by one sortable column, identified by its id.
    Column(String),
    /// A fixed multi-key sort, active when the sort token is the
    /// personalized-sort sentinel.
    Personalized(Vec<SortCriterion>),
}

impl DefaultSort {
    /// The sort token stored in state when this default is active.
    fn token(&self) -> String {
        match self {
            DefaultSort::Column(id) => id.clone(),
            DefaultSort::Personalized(_) => PERSONALIZED_SORT.to_string(),
        }
    }
}

/// Immutable per-grid configuration, validated once at build time.
#[derive(Debug)]
pub struct GridConfig {
    name: String,
    registry: ColumnRegistry,
    default_columns: Vec<String>,
    page_sizes: Vec<u32>,
    default_page_size: u32,
    default_sort: DefaultSort,
    default_sense: Sense,
    search: Option<Arc<SearchDefinition>>,
    persist: bool,
    results_only_after_search: bool,
    count_strategy: Option<CountStrategy>,
    pagination_mode: PaginationMode,
}

impl GridConfig {
    pub fn builder(name: impl Into<String>) -> GridConfigBuilder {
        GridConfigBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn registry(&self) -> &ColumnRegistry {
        &self.registry
    }

    /// The state a user gets before they ever customize anything.
    pub fn default_session(&self) -> GridSession {
        GridSession {
            displayed_columns: self.default_columns.clone(),
            results_per_page: self.default_page_size,
            sort: self.default_sort.token(),
            sense: self.default_sense,
            page: 1,
            search: None,
            search_kind: None,
        }
    }
}

/// Builder for [`GridConfig`]. `build` rejects every integrator mistake it
/// can detect: unknown or unsortable default sort, a default page size
/// missing from the selectable sizes, search fields targeting unregistered
/// columns.
pub struct GridConfigBuilder {
    name: String,
    registry: ColumnRegistry,
    page_sizes: Vec<u32>,
    default_page_size: u32,
    default_sort: Option<DefaultSort>,
    default_sense: Sense,
    search: Option<Arc<SearchDefinition>>,
    persist: bool,
    results_only_after_search: bool,
    count_strategy: Option<CountStrategy>,
    pagination_mode: PaginationMode,
}

impl GridConfigBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            registry: ColumnRegistry::new(),
            page_sizes: vec![10, 25, 50, 100],
            default_page_size: 10,
            default_sort: None,
            default_sense: Sense::Asc,
            search: None,
            persist: false,
            results_only_after_search: false,
            count_strategy: None,
            pagination_mode: PaginationMode::Direct,
        }
    }

    pub fn columns(mut self, registry: ColumnRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn page_sizes(mut self, sizes: Vec<u32>, default: u32) -> Self {
        self.page_sizes = sizes;
        self.default_page_size = default;
        self
    }

    pub fn default_sort(mut self, column_id: impl Into<String>, sense: Sense) -> Self {
        self.default_sort = Some(DefaultSort::Column(column_id.into()));
        self.default_sense = sense;
        self
    }

    /// Multi-key default sort, stored under the personalized-sort sentinel.
    pub fn personalized_sort(mut self, criteria: Vec<SortCriterion>, sense: Sense) -> Self {
        self.default_sort = Some(DefaultSort::Personalized(criteria));
        self.default_sense = sense;
        self
    }

    pub fn search(mut self, definition: SearchDefinition) -> Self {
        self.search = Some(Arc::new(definition));
        self
    }

    /// Persist preferences across sessions into the durable store.
    pub fn persist(mut self) -> Self {
        self.persist = true;
        self
    }

    /// Withhold the result list until the user has searched at least once.
    pub fn results_only_after_search(mut self) -> Self {
        self.results_only_after_search = true;
        self
    }

    /// Override the backend's preferred counting strategy.
    pub fn count_strategy(mut self, strategy: CountStrategy) -> Self {
        self.count_strategy = Some(strategy);
        self
    }

    pub fn pagination_mode(mut self, mode: PaginationMode) -> Self {
        self.pagination_mode = mode;
        self
    }

    pub fn build(self) -> Result<GridConfig> {
        if self.name.is_empty() {
            return Err(GridError::Configuration("grid name must not be empty".into()));
        }
        if self.registry.displayable().next().is_none() {
            return Err(GridError::Configuration(format!(
                "grid '{}' declares no displayable column",
                self.name
            )));
        }
        if self.page_sizes.is_empty() {
            return Err(GridError::Configuration("page size list must not be empty".into()));
        }
        if !self.page_sizes.contains(&self.default_page_size) {
            return Err(GridError::Configuration(format!(
                "default page size {} is not among the selectable sizes",
                self.default_page_size
            )));
        }

        let default_sort = self.default_sort.ok_or_else(|| {
            GridError::Configuration(format!("grid '{}' declares no default sort", self.name))
        })?;
        match &default_sort {
            DefaultSort::Column(id) => {
                if !self.registry.is_sortable(id) {
                    return Err(GridError::Configuration(format!(
                        "default sort column '{}' is not a sortable column",
                        id
                    )));
                }
            }
            DefaultSort::Personalized(criteria) => {
                if criteria.is_empty() {
                    return Err(GridError::Configuration(
                        "personalized sort requires at least one criterion".into(),
                    ));
                }
            }
        }

        if let Some(def) = &self.search {
            for field in def.fields() {
                if !self.registry.contains(field.column_id()) {
                    return Err(GridError::Configuration(format!(
                        "search field '{}' targets unregistered column '{}'",
                        field.property(),
                        field.column_id()
                    )));
                }
            }
        }

        let mut default_columns = self.registry.default_displayed_ids();
        if default_columns.is_empty() {
            default_columns = self.registry.displayable().map(|c| c.id.clone()).collect();
        }

        Ok(GridConfig {
            name: self.name,
            registry: self.registry,
            default_columns,
            page_sizes: self.page_sizes,
            default_page_size: self.default_page_size,
            default_sort,
            default_sense: self.default_sense,
            search: self.search,
            persist: self.persist,
            results_only_after_search: self.results_only_after_search,
            count_strategy: self.count_strategy,
            pagination_mode: self.pagination_mode,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// The display-settings form as submitted.
#[derive(Debug, Clone, Default)]
pub struct SettingsPayload {
    pub displayed_columns: Vec<String>,
    /// Raw page-size token; anything unparsable falls back to the default.
    pub results_per_page: Option<String>,
}

/// Everything the engine reads from one HTTP request. Deltas are raw
/// strings exactly as they arrived; the engine does its own parsing and
/// clamping.
#[derive(Debug, Clone)]
pub struct GridRequest {
    pub method: Method,
    pub user: Uuid,
    pub is_ajax: bool,
    /// Reset display settings to defaults and drop the durable row.
    pub reset_settings: bool,
    /// Discard the filter snapshot.
    pub reset_search: bool,
    pub settings: Option<SettingsPayload>,
    pub sort: Option<String>,
    pub sense: Option<String>,
    pub page: Option<String>,
    /// Raw search-form payload, present on search submissions.
    pub search_payload: Option<BTreeMap<String, serde_json::Value>>,
    pub is_search_submission: bool,
}

impl GridRequest {
    pub fn get(user: Uuid) -> Self {
        Self {
            method: Method::Get,
            user,
            is_ajax: true,
            reset_settings: false,
            reset_search: false,
            settings: None,
            sort: None,
            sense: None,
            page: None,
            search_payload: None,
            is_search_submission: false,
        }
    }

    pub fn post(user: Uuid) -> Self {
        Self { method: Method::Post, ..Self::get(user) }
    }

    pub fn with_sort(mut self, sort: impl Into<String>) -> Self {
        self.sort = Some(sort.into());
        self
    }

    pub fn with_sense(mut self, sense: impl Into<String>) -> Self {
        self.sense = Some(sense.into());
        self
    }

    pub fn with_page(mut self, page: impl Into<String>) -> Self {
        self.page = Some(page.into());
        self
    }

    pub fn with_settings(mut self, settings: SettingsPayload) -> Self {
        self.settings = Some(settings);
        self
    }

    pub fn search_submission(mut self, payload: BTreeMap<String, serde_json::Value>) -> Self {
        self.is_search_submission = true;
        self.search_payload = Some(payload);
        self
    }

    pub fn reset_search(mut self) -> Self {
        self.reset_search = true;
        self
    }

    pub fn reset_settings(mut self) -> Self {
        self.reset_settings = true;
        self
    }

    pub fn non_ajax(mut self) -> Self {
        self.is_ajax = false;
        self
    }
}

/// Orchestrates one grid over a session store, a durable store and a query
/// backend.
pub struct GridEngine<S: SessionStore, D: DurableStore> {
    config: GridConfig,
    sessions: S,
    durable: D,
}

impl<S: SessionStore, D: DurableStore> GridEngine<S, D> {
    pub fn new(config: GridConfig, sessions: S, durable: D) -> Self {
        Self { config, sessions, durable }
    }

    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    /// Entry point for the partial-render surface. Non-AJAX requests are a
    /// client error: the grid endpoints only ever serve fragments.
    pub fn handle_ajax(
        &mut self,
        request: &GridRequest,
        query: &mut dyn GridQuery,
    ) -> Result<GridView> {
        if !request.is_ajax {
            return Err(GridError::ClientRequest(
                "grid endpoints serve AJAX fragments only".into(),
            ));
        }
        self.handle(request, query)
    }

    /// Run the full request cycle and return a render-ready view.
    pub fn handle(
        &mut self,
        request: &GridRequest,
        query: &mut dyn GridQuery,
    ) -> Result<GridView> {
        let mut dirty = DirtyState::default();
        let mut session = self.load_session(request, &mut dirty);
        let mut search_errors: Vec<FieldError> = Vec::new();

        // Search submission first: a successful bind swaps in a fresh value
        // map and restarts at page 1; a failed bind leaves the previous
        // snapshot in force and reports the field errors.
        if request.is_search_submission && !request.reset_search {
            let def = self.config.search.as_ref().ok_or_else(|| {
                GridError::ClientRequest(format!(
                    "grid '{}' has no search configured",
                    self.config.name
                ))
            })?;
            if request.method == Method::Post {
                let empty = BTreeMap::new();
                let payload = request.search_payload.as_ref().unwrap_or(&empty);
                match def.bind(payload) {
                    Ok(values) => {
                        session.search = Some(values);
                        session.search_kind = Some(def.name().to_string());
                        session.page = 1;
                    }
                    Err(errors) => {
                        warn!(
                            grid = %self.config.name,
                            errors = errors.len(),
                            "search submission rejected"
                        );
                        search_errors = errors;
                    }
                }
            }
        }

        // Request deltas. The reset flags short-circuit everything else.
        let mut settings_reset = false;
        if request.reset_settings {
            self.reset_display_settings(request, &mut session)?;
            settings_reset = true;
        } else if request.reset_search {
            session.search = None;
            session.search_kind = None;
            session.page = 1;
        } else {
            if let Some(payload) = &request.settings {
                self.apply_settings(&mut session, payload, &mut dirty);
            }
            if let Some(sort) = &request.sort {
                self.apply_sort(&mut session, sort, &mut dirty);
            }
            if let Some(sense) = &request.sense {
                self.apply_sense(&mut session, sense, &mut dirty);
            }
            if let Some(page) = &request.page {
                self.apply_page(&mut session, page);
            }
        }

        self.persist(request, &session, &dirty, settings_reset)?;

        // Query assembly: sort, then per-field predicates, then the global
        // query hook.
        self.contribute_sort(query, &session);
        let working = self.working_values(&session);
        if let Some(def) = &self.config.search {
            for field in def.fields() {
                if let Some(value) = working.get(field.property()) {
                    match self.config.registry.get(field.column_id()) {
                        Some(col) => field.contribute_query(query, value, col.search_alias()),
                        // Unreachable after build-time validation.
                        None => debug!(column = field.column_id(), "search column vanished"),
                    }
                }
            }
            def.apply_query_hook(query);
        }

        // Count + slice, unless this grid withholds results until the user
        // has searched.
        let suppressed = self.config.results_only_after_search && session.search.is_none();
        let (paginator, rows) = if suppressed {
            (None, Vec::new())
        } else {
            let strategy = self
                .config
                .count_strategy
                .clone()
                .unwrap_or_else(|| query.default_count_strategy());
            let (paginator, rows) = paginate(
                query,
                session.page,
                session.results_per_page,
                &strategy,
                &self.config.pagination_mode,
            )?;
            (Some(paginator), rows)
        };

        Ok(self.into_view(request, &session, &working, paginator, rows, search_errors))
    }

    /// Load saved state: session first, then the durable row, then pure
    /// defaults. Loaded state is clamped against the current configuration.
    /// An unreadable entry counts as absent, never as a request failure.
    fn load_session(&self, request: &GridRequest, dirty: &mut DirtyState) -> GridSession {
        match self.sessions.load(&self.config.name) {
            Ok(Some(mut session)) => {
                self.check_session(&mut session, dirty);
                return session;
            }
            Ok(None) => {}
            Err(err) => {
                warn!(grid = %self.config.name, error = %err, "discarding unreadable session entry");
            }
        }
        if self.config.persist {
            let key = StateKey::new(request.user, self.config.name.clone());
            match self.durable.load(&key) {
                Ok(Some(record)) => {
                    debug!(grid = %self.config.name, "restoring preferences from durable store");
                    let mut session = record.into_session();
                    self.check_session(&mut session, dirty);
                    return session;
                }
                Ok(None) => {}
                Err(err) => {
                    warn!(grid = %self.config.name, error = %err, "discarding unreadable durable row");
                }
            }
        }
        self.config.default_session()
    }

    /// Clamp every loaded field against the current configuration. Each
    /// replacement marks the corresponding dirty flag so a stale durable
    /// row gets rewritten.
    fn check_session(&self, session: &mut GridSession, dirty: &mut DirtyState) {
        let mut columns: Vec<String> = Vec::new();
        for id in &session.displayed_columns {
            if columns.iter().any(|c| c == id) {
                continue;
            }
            match self.config.registry.get(id) {
                Some(col) if !col.virtual_column => columns.push(id.clone()),
                _ => debug!(grid = %self.config.name, column = %id, "dropping unknown displayed column"),
            }
        }
        if columns.is_empty() {
            columns = self.config.default_columns.clone();
        }
        if columns != session.displayed_columns {
            session.displayed_columns = columns;
            dirty.columns = true;
        }

        if !self.config.page_sizes.contains(&session.results_per_page) {
            debug!(
                grid = %self.config.name,
                size = session.results_per_page,
                "resetting unknown page size"
            );
            session.results_per_page = self.config.default_page_size;
            dirty.page_size = true;
        }

        if !self.sort_is_valid(&session.sort) {
            debug!(grid = %self.config.name, sort = %session.sort, "resetting unknown sort");
            session.sort = self.config.default_sort.token();
            dirty.sort = true;
        }

        if session.page == 0 || session.page > PAGE_CEILING {
            session.page = 1;
        }

        // A snapshot written by a different searcher is stale.
        if session.search.is_some() {
            let configured = self.config.search.as_ref().map(|d| d.name());
            if session.search_kind.as_deref() != configured {
                debug!(grid = %self.config.name, "discarding stale search snapshot");
                session.search = None;
                session.search_kind = None;
            }
        }
    }

    fn sort_is_valid(&self, token: &str) -> bool {
        if token == PERSONALIZED_SORT {
            return matches!(self.config.default_sort, DefaultSort::Personalized(_));
        }
        self.config.registry.is_sortable(token)
    }

    fn apply_settings(
        &self,
        session: &mut GridSession,
        payload: &SettingsPayload,
        dirty: &mut DirtyState,
    ) {
        let mut columns: Vec<String> = Vec::new();
        for id in &payload.displayed_columns {
            if columns.iter().any(|c| c == id) {
                continue;
            }
            if let Some(col) = self.config.registry.get(id) {
                if !col.virtual_column {
                    columns.push(id.clone());
                }
            }
        }
        if columns.is_empty() {
            columns = self.config.default_columns.clone();
        }
        if columns != session.displayed_columns {
            session.displayed_columns = columns;
            dirty.columns = true;
        }

        let size = payload
            .results_per_page
            .as_deref()
            .and_then(|raw| raw.trim().parse::<u32>().ok())
            .filter(|size| self.config.page_sizes.contains(size))
            .unwrap_or(self.config.default_page_size);
        if size != session.results_per_page {
            session.results_per_page = size;
            session.page = 1;
            dirty.page_size = true;
        }
    }

    fn apply_sort(&self, session: &mut GridSession, candidate: &str, dirty: &mut DirtyState) {
        let effective = if self.sort_is_valid(candidate) {
            candidate.to_string()
        } else {
            debug!(grid = %self.config.name, sort = %candidate, "ignoring unknown sort request");
            self.config.default_sort.token()
        };
        if effective != session.sort {
            session.sort = effective;
            dirty.sort = true;
        }
    }

    fn apply_sense(&self, session: &mut GridSession, candidate: &str, dirty: &mut DirtyState) {
        let effective = Sense::parse(candidate).unwrap_or(self.config.default_sense);
        if effective != session.sense {
            session.sense = effective;
            dirty.sense = true;
        }
    }

    fn apply_page(&self, session: &mut GridSession, candidate: &str) {
        let page = match candidate.trim().parse::<u64>() {
            Ok(p) if p >= 1 && p <= PAGE_CEILING => p,
            _ => 1,
        };
        session.page = page;
    }

    fn reset_display_settings(
        &mut self,
        request: &GridRequest,
        session: &mut GridSession,
    ) -> Result<()> {
        let defaults = self.config.default_session();
        session.displayed_columns = defaults.displayed_columns;
        session.results_per_page = defaults.results_per_page;
        session.sort = defaults.sort;
        session.sense = defaults.sense;
        session.page = 1;
        if self.config.persist {
            let key = StateKey::new(request.user, self.config.name.clone());
            self.durable.delete(&key)?;
        }
        Ok(())
    }

    /// Save the session unconditionally; write the durable row only when a
    /// tracked field actually changed, and insert a new row only when the
    /// state differs from the configured defaults.
    fn persist(
        &mut self,
        request: &GridRequest,
        session: &GridSession,
        dirty: &DirtyState,
        settings_reset: bool,
    ) -> Result<()> {
        self.sessions.save(&self.config.name, session)?;

        if !self.config.persist || settings_reset || !dirty.any() {
            return Ok(());
        }
        let key = StateKey::new(request.user, self.config.name.clone());
        let record = GridRecord::from_session(session);
        if self.durable.load(&key)?.is_some() {
            self.durable.upsert(&key, &record)?;
        } else if self.differs_from_defaults(session) {
            self.durable.upsert(&key, &record)?;
        } else {
            debug!(grid = %self.config.name, "state matches defaults, skipping durable insert");
        }
        Ok(())
    }

    fn differs_from_defaults(&self, session: &GridSession) -> bool {
        let defaults = self.config.default_session();
        session.displayed_columns != defaults.displayed_columns
            || session.results_per_page != defaults.results_per_page
            || session.sort != defaults.sort
            || session.sense != defaults.sense
    }

    /// The values the query and form are built from: always a fresh copy,
    /// never a reference into persisted state.
    fn working_values(&self, session: &GridSession) -> FilterValues {
        if let Some(values) = &session.search {
            return values.clone();
        }
        self.config
            .search
            .as_ref()
            .map(|d| d.default_values())
            .unwrap_or_default()
    }

    fn contribute_sort(&self, query: &mut dyn GridQuery, session: &GridSession) {
        if session.sort == PERSONALIZED_SORT {
            if let DefaultSort::Personalized(criteria) = &self.config.default_sort {
                for (i, criterion) in criteria.iter().enumerate() {
                    let (alias, sense) = match criterion {
                        SortCriterion::Aliased(alias) => (alias.as_str(), session.sense),
                        SortCriterion::Explicit(alias, sense) => (alias.as_str(), *sense),
                    };
                    if i == 0 {
                        query.order_by(alias, sense);
                    } else {
                        query.add_order_by(alias, sense);
                    }
                }
            }
            return;
        }
        if let Some(col) = self.config.registry.get(&session.sort) {
            match col.sort_alias() {
                SortAlias::Single(alias) => query.order_by(&alias, session.sense),
                SortAlias::Composite(aliases) => {
                    for (i, alias) in aliases.iter().enumerate() {
                        if i == 0 {
                            query.order_by(alias, session.sense);
                        } else {
                            query.add_order_by(alias, session.sense);
                        }
                    }
                }
            }
        }
    }

    fn into_view(
        &self,
        request: &GridRequest,
        session: &GridSession,
        working: &FilterValues,
        paginator: Option<crate::pagination::Paginator>,
        rows: Vec<crate::query::Row>,
        search_errors: Vec<FieldError>,
    ) -> GridView {
        let columns = session
            .displayed_columns
            .iter()
            .filter_map(|id| self.config.registry.get(id))
            .map(|col| ColumnView::from_column(col, &session.sort))
            .collect();

        let settings = SettingsView {
            columns: self
                .config
                .registry
                .displayable()
                .map(|col| SettingsColumn {
                    id: col.id.clone(),
                    label: col.label.clone(),
                    displayed: session.displayed_columns.contains(&col.id),
                })
                .collect(),
            page_sizes: self.config.page_sizes.clone(),
            current_page_size: session.results_per_page,
        };

        let search_form = self.config.search.as_ref().map(|def| {
            let mut form = FormView {
                fields: def
                    .fields()
                    .iter()
                    .map(|field| FieldView {
                        widget: field.widget(),
                        value: working.get(field.property()).cloned(),
                    })
                    .collect(),
            };
            def.apply_form_hook(&mut form);
            form
        });

        let fragment = if request.is_search_submission || request.reset_search {
            Fragment::ListAndSearch
        } else {
            Fragment::List
        };

        GridView {
            name: self.config.name.clone(),
            columns,
            sort: session.sort.clone(),
            sense: session.sense,
            paginator,
            rows,
            search_form,
            search_errors,
            settings,
            fragment,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::Column;
    use crate::query::memory::MemoryQuery;
    use crate::query::{ParamValue, Row};
    use crate::store::memory::{InMemoryDurableStore, InMemorySessionStore};

    fn registry() -> ColumnRegistry {
        let mut reg = ColumnRegistry::new();
        reg.register(Column::new("name", "name", "Name").sortable().default_displayed())
            .unwrap();
        reg.register(Column::new("age", "age", "Age").sortable()).unwrap();
        reg.register(Column::new("city", "city", "City").default_displayed())
            .unwrap();
        reg
    }

    fn config() -> GridConfig {
        GridConfig::builder("users")
            .columns(registry())
            .page_sizes(vec![10, 25, 50], 10)
            .default_sort("name", Sense::Asc)
            .build()
            .unwrap()
    }

    fn engine() -> GridEngine<InMemorySessionStore, InMemoryDurableStore> {
        GridEngine::new(config(), InMemorySessionStore::new(), InMemoryDurableStore::new())
    }

    fn data(n: i64) -> Vec<Row> {
        (0..n)
            .map(|i| {
                let mut row = Row::new();
                row.insert("name".into(), ParamValue::Text(format!("user{:03}", i)));
                row.insert("age".into(), ParamValue::Int(20 + i));
                row.insert("city".into(), ParamValue::Text("berlin".into()));
                row
            })
            .collect()
    }

    #[test]
    fn build_rejects_unsortable_default_sort() {
        let err = GridConfig::builder("users")
            .columns(registry())
            .default_sort("city", Sense::Asc)
            .build()
            .unwrap_err();
        assert!(matches!(err, GridError::Configuration(_)));
    }

    #[test]
    fn build_rejects_empty_personalized_sort() {
        let err = GridConfig::builder("users")
            .columns(registry())
            .personalized_sort(Vec::new(), Sense::Asc)
            .build()
            .unwrap_err();
        assert!(matches!(err, GridError::Configuration(_)));
    }

    #[test]
    fn build_rejects_default_page_size_not_selectable() {
        let err = GridConfig::builder("users")
            .columns(registry())
            .page_sizes(vec![10, 25], 20)
            .default_sort("name", Sense::Asc)
            .build()
            .unwrap_err();
        assert!(matches!(err, GridError::Configuration(_)));
    }

    #[test]
    fn first_visit_uses_defaults() {
        let mut engine = engine();
        let mut query = MemoryQuery::new(data(5));
        let user = Uuid::new_v4();

        let view = engine.handle(&GridRequest::get(user), &mut query).unwrap();
        assert_eq!(view.sort, "name");
        assert_eq!(view.sense, Sense::Asc);
        let ids: Vec<&str> = view.columns.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["name", "city"]);
        assert_eq!(view.paginator.as_ref().unwrap().max_per_page, 10);
        assert_eq!(view.rows.len(), 5);
    }

    #[test]
    fn unknown_sort_falls_back_silently() {
        let mut engine = engine();
        let mut query = MemoryQuery::new(data(3));
        let user = Uuid::new_v4();

        let request = GridRequest::get(user).with_sort("nope").with_sense("sideways");
        let view = engine.handle(&request, &mut query).unwrap();
        assert_eq!(view.sort, "name");
        assert_eq!(view.sense, Sense::Asc);
    }

    #[test]
    fn non_ajax_request_is_rejected() {
        let mut engine = engine();
        let mut query = MemoryQuery::new(data(1));
        let err = engine
            .handle_ajax(&GridRequest::get(Uuid::new_v4()).non_ajax(), &mut query)
            .unwrap_err();
        assert!(matches!(err, GridError::ClientRequest(_)));
    }

    #[test]
    fn absurd_page_resets_to_one() {
        let mut engine = engine();
        let mut query = MemoryQuery::new(data(30));
        let user = Uuid::new_v4();

        let request = GridRequest::get(user).with_page("1000000001");
        let view = engine.handle(&request, &mut query).unwrap();
        assert_eq!(view.paginator.unwrap().page, 1);

        let mut query = MemoryQuery::new(data(30));
        let request = GridRequest::get(user).with_page("garbage");
        let view = engine.handle(&request, &mut query).unwrap();
        assert_eq!(view.paginator.unwrap().page, 1);
    }

    #[test]
    fn sort_delta_persists_in_session() {
        let mut engine = engine();
        let user = Uuid::new_v4();

        let mut query = MemoryQuery::new(data(3));
        let request = GridRequest::get(user).with_sort("age").with_sense("DESC");
        engine.handle(&request, &mut query).unwrap();

        // Next plain request keeps the sort.
        let mut query = MemoryQuery::new(data(3));
        let view = engine.handle(&GridRequest::get(user), &mut query).unwrap();
        assert_eq!(view.sort, "age");
        assert_eq!(view.sense, Sense::Desc);
    }
}
