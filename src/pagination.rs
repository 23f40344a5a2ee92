//! Count + slice pagination over a [`GridQuery`].
//!
//! One call computes the total count (with a selectable counting strategy),
//! derives the navigation metadata, clamps the requested page into range and
//! fetches the windowed rows. When the count is zero no window is set and no
//! slice query runs at all.
//!
//! Two alternate modes exist beyond direct windowing: identifier-subquery
//! pagination for queries whose joins multiply rows, and a caller-supplied
//! closure for backends that are not relational at all.

use std::fmt;

use serde::Serialize;

use crate::query::filters::{add_filter, FilterMode};
use crate::query::{CountStrategy, GridQuery, QueryError, Row};

/// Transient per-request pagination state and navigation metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Paginator {
    pub page: u64,
    pub max_per_page: u32,
    pub count_results: u64,
    pub last_page: u64,
}

impl Paginator {
    /// Derive the metadata for `requested_page`, clamping it into
    /// `[1, last_page]`.
    pub fn new(count_results: u64, requested_page: u64, max_per_page: u32) -> Self {
        let per = u64::from(max_per_page.max(1));
        let last_page = (count_results.div_ceil(per)).max(1);
        let page = requested_page.clamp(1, last_page);
        Self { page, max_per_page: max_per_page.max(1), count_results, last_page }
    }

    pub fn offset(&self) -> u64 {
        (self.page - 1) * u64::from(self.max_per_page)
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.last_page
    }

    pub fn previous_page(&self) -> u64 {
        self.page.saturating_sub(1).max(1)
    }

    pub fn next_page(&self) -> u64 {
        (self.page + 1).min(self.last_page)
    }
}

/// Caller-supplied pagination for non-relational backends: receives the
/// query, the requested page and the page size, returns the paginator and
/// the page's rows.
pub type PageFn =
    Box<dyn Fn(&mut dyn GridQuery, u64, u32) -> Result<(Paginator, Vec<Row>), QueryError> + Send + Sync>;

/// How the result window is produced once the count is known.
pub enum PaginationMode {
    /// Offset/limit on the query itself.
    Direct,
    /// Paginate a distinct-identifier projection of the query first, then
    /// restrict the full projection to that page's identifier set. One extra
    /// round trip, but correct under fan-out joins.
    ByIdentifier { alias: String },
    /// Full replacement of the count + slice machinery.
    Manual(PageFn),
}

impl fmt::Debug for PaginationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaginationMode::Direct => write!(f, "Direct"),
            PaginationMode::ByIdentifier { alias } => {
                write!(f, "ByIdentifier {{ alias: {:?} }}", alias)
            }
            PaginationMode::Manual(_) => write!(f, "Manual(..)"),
        }
    }
}

/// Run the full count + slice cycle.
pub fn paginate(
    query: &mut dyn GridQuery,
    requested_page: u64,
    max_per_page: u32,
    strategy: &CountStrategy,
    mode: &PaginationMode,
) -> Result<(Paginator, Vec<Row>), QueryError> {
    match mode {
        PaginationMode::Manual(page_fn) => page_fn(query, requested_page, max_per_page),
        PaginationMode::Direct => {
            let count = query.count(strategy)?;
            let paginator = Paginator::new(count, requested_page, max_per_page);
            if count == 0 {
                return Ok((paginator, Vec::new()));
            }
            query.window(paginator.offset(), u64::from(paginator.max_per_page));
            let rows = query.fetch()?;
            Ok((paginator, rows))
        }
        PaginationMode::ByIdentifier { alias } => {
            let count = query.count(&CountStrategy::ByAlias {
                alias: alias.clone(),
                distinct: true,
            })?;
            let paginator = Paginator::new(count, requested_page, max_per_page);
            if count == 0 {
                return Ok((paginator, Vec::new()));
            }
            let ids =
                query.fetch_ids(alias, paginator.offset(), u64::from(paginator.max_per_page))?;
            if ids.is_empty() {
                return Ok((paginator, Vec::new()));
            }
            add_filter(query, FilterMode::In, alias, &ids, "page_ids");
            let rows = query.fetch()?;
            Ok((paginator, rows))
        }
    }
}
