//! SQL-builder backend for [`GridQuery`].
//!
//! [`SqlSelect`] assembles a SELECT statement piece by piece and renders it
//! to a `?`-placeholder string plus a flattened parameter list, in the exact
//! order the placeholders appear. Execution goes through the [`Executor`]
//! trait so any driver (rusqlite, postgres, a pooled connection) can plug in.
//!
//! Counting rewrites the query rather than wrapping the result: the
//! by-alias strategy replaces the select list with `COUNT([DISTINCT] alias)`
//! and strips ORDER BY (order is irrelevant to a count and may reference
//! expressions that break under COUNT); the subquery strategy wraps the
//! order-stripped statement as a derived table.

use std::collections::BTreeMap;

use super::{Cond, CountStrategy, GridQuery, ParamValue, QueryError, Row, Sense};

/// Synchronous driver seam. The grid engine is single-request synchronous,
/// so the executor is too; async drivers block on at this boundary.
pub trait Executor {
    fn query(&mut self, sql: &str, params: &[ParamValue]) -> Result<Vec<Row>, QueryError>;
}

impl<E: Executor + ?Sized> Executor for &mut E {
    fn query(&mut self, sql: &str, params: &[ParamValue]) -> Result<Vec<Row>, QueryError> {
        (**self).query(sql, params)
    }
}

/// A SELECT statement under construction.
#[derive(Debug, Clone)]
pub struct SqlSelect {
    select: Vec<String>,
    from: String,
    joins: Vec<String>,
    conds: Vec<Cond>,
    params: BTreeMap<String, ParamValue>,
    order: Vec<(String, Sense)>,
    group_by: Vec<String>,
    offset: Option<u64>,
    limit: Option<u64>,
}

impl SqlSelect {
    /// `from` is the table expression, alias included (e.g. `"users u"`).
    pub fn new(from: impl Into<String>) -> Self {
        Self {
            select: vec!["*".to_string()],
            from: from.into(),
            joins: Vec::new(),
            conds: Vec::new(),
            params: BTreeMap::new(),
            order: Vec::new(),
            group_by: Vec::new(),
            offset: None,
            limit: None,
        }
    }

    pub fn select(mut self, exprs: Vec<String>) -> Self {
        self.select = exprs;
        self
    }

    /// Full join clause, e.g. `"LEFT JOIN roles r ON r.id = u.role_id"`.
    pub fn join(mut self, clause: impl Into<String>) -> Self {
        self.joins.push(clause.into());
        self
    }

    pub fn group_by(mut self, expr: impl Into<String>) -> Self {
        self.group_by.push(expr.into());
        self
    }

    /// Render to `(sql, flattened params)`, placeholders in appearance order.
    pub fn to_sql(&self) -> Result<(String, Vec<ParamValue>), QueryError> {
        self.render(&self.select, true, self.offset, self.limit)
    }

    fn render(
        &self,
        select: &[String],
        with_order: bool,
        offset: Option<u64>,
        limit: Option<u64>,
    ) -> Result<(String, Vec<ParamValue>), QueryError> {
        let mut sql = format!("SELECT {} FROM {}", select.join(", "), self.from);
        let mut params: Vec<ParamValue> = Vec::new();

        for join in &self.joins {
            sql.push(' ');
            sql.push_str(join);
        }

        if !self.conds.is_empty() {
            let parts = self
                .conds
                .iter()
                .map(|c| self.render_cond(c, &mut params))
                .collect::<Result<Vec<_>, _>>()?;
            sql.push_str(" WHERE ");
            sql.push_str(&parts.join(" AND "));
        }

        if !self.group_by.is_empty() {
            sql.push_str(" GROUP BY ");
            sql.push_str(&self.group_by.join(", "));
        }

        if with_order && !self.order.is_empty() {
            let parts: Vec<String> = self
                .order
                .iter()
                .map(|(alias, sense)| format!("{} {}", alias, sense.token()))
                .collect();
            sql.push_str(" ORDER BY ");
            sql.push_str(&parts.join(", "));
        }

        if let Some(l) = limit {
            sql.push_str(&format!(" LIMIT {}", l));
        }
        if let Some(o) = offset {
            sql.push_str(&format!(" OFFSET {}", o));
        }

        Ok((sql, params))
    }

    fn render_cond(&self, cond: &Cond, params: &mut Vec<ParamValue>) -> Result<String, QueryError> {
        match cond {
            Cond::Cmp { alias, op, param } => {
                params.push(self.param(param)?);
                Ok(format!("{} {} ?", alias, op.sql()))
            }
            Cond::In { alias, params: names, negated } => {
                let mut placeholders = Vec::with_capacity(names.len());
                for name in names {
                    params.push(self.param(name)?);
                    placeholders.push("?");
                }
                let kw = if *negated { "NOT IN" } else { "IN" };
                Ok(format!("{} {} ({})", alias, kw, placeholders.join(", ")))
            }
            Cond::Between { alias, low, high } => {
                params.push(self.param(low)?);
                params.push(self.param(high)?);
                Ok(format!("{} BETWEEN ? AND ?", alias))
            }
            Cond::IsNull { alias, negated } => {
                let kw = if *negated { "IS NOT NULL" } else { "IS NULL" };
                Ok(format!("{} {}", alias, kw))
            }
            Cond::False => Ok("1 = 0".to_string()),
            Cond::Or(subs) => {
                let parts = subs
                    .iter()
                    .map(|c| self.render_cond(c, params))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(format!("({})", parts.join(" OR ")))
            }
            Cond::And(subs) => {
                let parts = subs
                    .iter()
                    .map(|c| self.render_cond(c, params))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(format!("({})", parts.join(" AND ")))
            }
            Cond::Raw(clause) => Ok(format!("({})", clause)),
        }
    }

    fn param(&self, name: &str) -> Result<ParamValue, QueryError> {
        self.params
            .get(name)
            .cloned()
            .ok_or_else(|| QueryError::UnboundParameter(name.to_string()))
    }
}

/// A [`SqlSelect`] paired with an executor: the SQL implementation of the
/// grid's query capability.
pub struct SqlQuery<E: Executor> {
    select: SqlSelect,
    executor: E,
}

impl<E: Executor> SqlQuery<E> {
    pub fn new(select: SqlSelect, executor: E) -> Self {
        Self { select, executor }
    }

    pub fn select(&self) -> &SqlSelect {
        &self.select
    }

    fn run_count(&mut self, select_expr: String) -> Result<u64, QueryError> {
        let projection = vec![format!("{} AS cnt", select_expr)];
        let (sql, params) = self.select.render(&projection, false, None, None)?;
        let rows = self.executor.query(&sql, &params)?;
        read_count(&rows)
    }
}

fn read_count(rows: &[Row]) -> Result<u64, QueryError> {
    let row = rows
        .first()
        .ok_or_else(|| QueryError::Execution("count query returned no rows".into()))?;
    match row.get("cnt") {
        Some(ParamValue::Int(n)) if *n >= 0 => Ok(*n as u64),
        other => Err(QueryError::Execution(format!(
            "count query returned a non-integer: {:?}",
            other
        ))),
    }
}

impl<E: Executor> GridQuery for SqlQuery<E> {
    fn order_by(&mut self, alias: &str, sense: Sense) {
        self.select.order.clear();
        self.select.order.push((alias.to_string(), sense));
    }

    fn add_order_by(&mut self, alias: &str, sense: Sense) {
        self.select.order.push((alias.to_string(), sense));
    }

    fn and_where(&mut self, cond: Cond) {
        self.select.conds.push(cond);
    }

    fn bind(&mut self, name: &str, value: ParamValue) {
        self.select.params.insert(name.to_string(), value);
    }

    fn window(&mut self, offset: u64, limit: u64) {
        self.select.offset = Some(offset);
        self.select.limit = Some(limit);
    }

    fn count(&mut self, strategy: &CountStrategy) -> Result<u64, QueryError> {
        match strategy {
            CountStrategy::ByAlias { alias, distinct } => {
                let expr = if *distinct {
                    format!("COUNT(DISTINCT {})", alias)
                } else {
                    format!("COUNT({})", alias)
                };
                self.run_count(expr)
            }
            CountStrategy::BySubquery => {
                let (inner, params) =
                    self.select.render(&self.select.select, false, None, None)?;
                let sql = format!("SELECT COUNT(*) AS cnt FROM ({}) countable", inner);
                let rows = self.executor.query(&sql, &params)?;
                read_count(&rows)
            }
            CountStrategy::Native => Err(QueryError::Unsupported(
                "the SQL backend has no engine-native count".into(),
            )),
        }
    }

    fn fetch(&mut self) -> Result<Vec<Row>, QueryError> {
        let (sql, params) = self.select.to_sql()?;
        self.executor.query(&sql, &params)
    }

    fn fetch_ids(&mut self, alias: &str, offset: u64, limit: u64) -> Result<Vec<ParamValue>, QueryError> {
        let projection = vec![format!("DISTINCT {} AS id", alias)];
        let (sql, params) =
            self.select.render(&projection, true, Some(offset), Some(limit))?;
        let rows = self.executor.query(&sql, &params)?;
        Ok(rows
            .into_iter()
            .filter_map(|mut row| row.remove("id"))
            .collect())
    }
}
