//! The query-builder capability the grid engine drives.
//!
//! The engine never talks to a concrete backend. It rewrites an abstract
//! [`GridQuery`]: append predicates, bind named parameters, set the order,
//! window the result, count. Each backend (SQL string builder, in-memory
//! rows, a remote API behind a manual paginator) supplies its own
//! implementation; the engine itself never branches on the backend type.
//!
//! Predicates are structured ([`Cond`]) rather than raw strings so that
//! non-SQL backends can evaluate them. A [`Cond::Raw`] escape hatch exists
//! for backend-specific clauses; backends that cannot interpret it reject it
//! with [`QueryError::Unsupported`].

pub mod filters;
pub mod memory;
pub mod sql;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Sort direction. The wire tokens are `ASC` and `DESC`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Sense {
    #[default]
    Asc,
    Desc,
}

impl Sense {
    pub fn token(&self) -> &'static str {
        match self {
            Sense::Asc => "ASC",
            Sense::Desc => "DESC",
        }
    }

    /// Parse a wire token. Anything but the two exact tokens is rejected,
    /// the caller falls back to its default.
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "ASC" => Some(Sense::Asc),
            "DESC" => Some(Sense::Desc),
            _ => None,
        }
    }
}

/// A value bound to a query parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParamValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    DateTime(DateTime<Utc>),
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        ParamValue::Text(s.to_owned())
    }
}
impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        ParamValue::Text(s)
    }
}
impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}
impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
        ParamValue::Int(v as i64)
    }
}
impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}
impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}
impl From<DateTime<Utc>> for ParamValue {
    fn from(v: DateTime<Utc>) -> Self {
        ParamValue::DateTime(v)
    }
}

/// One result row, keyed by column alias.
pub type Row = BTreeMap<String, ParamValue>;

/// Comparison operator usable in a [`Cond::Cmp`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cmp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    Like,
}

impl Cmp {
    pub fn sql(&self) -> &'static str {
        match self {
            Cmp::Eq => "=",
            Cmp::Ne => "<>",
            Cmp::Gt => ">",
            Cmp::Ge => ">=",
            Cmp::Lt => "<",
            Cmp::Le => "<=",
            Cmp::Like => "LIKE",
        }
    }
}

/// A structured predicate. Parameter names reference values registered via
/// [`GridQuery::bind`].
#[derive(Debug, Clone, PartialEq)]
pub enum Cond {
    /// `alias <op> :param`
    Cmp { alias: String, op: Cmp, param: String },
    /// `alias [NOT] IN (:p1, :p2, ...)`
    In { alias: String, params: Vec<String>, negated: bool },
    /// `alias BETWEEN :low AND :high`
    Between { alias: String, low: String, high: String },
    /// `alias IS [NOT] NULL`
    IsNull { alias: String, negated: bool },
    /// Always false. Forces an empty result set.
    False,
    /// Any sub-condition matches.
    Or(Vec<Cond>),
    /// Every sub-condition matches.
    And(Vec<Cond>),
    /// A backend-specific clause. Non-SQL backends reject it.
    Raw(String),
}

impl Cond {
    /// `alias = :param`
    pub fn eq(alias: impl Into<String>, param: impl Into<String>) -> Self {
        Cond::Cmp { alias: alias.into(), op: Cmp::Eq, param: param.into() }
    }

    pub fn cmp(alias: impl Into<String>, op: Cmp, param: impl Into<String>) -> Self {
        Cond::Cmp { alias: alias.into(), op, param: param.into() }
    }
}

/// How a total result count is computed before windowing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CountStrategy {
    /// `SELECT COUNT([DISTINCT] alias)` replacing the select list, ORDER BY
    /// stripped. Cheapest when the query shape allows it.
    ByAlias { alias: String, distinct: bool },
    /// Wrap the order-stripped query as a derived table and count its rows.
    /// Correct for arbitrary joins/grouping at the cost of a round trip.
    BySubquery,
    /// Let the backend count its own way. Only some backends support this.
    Native,
}

#[derive(Error, Debug)]
pub enum QueryError {
    #[error("unsupported query operation: {0}")]
    Unsupported(String),

    #[error("query execution failed: {0}")]
    Execution(String),

    #[error("unbound parameter: {0}")]
    UnboundParameter(String),
}

/// The capability the engine needs from a query backend.
///
/// Every mutation is deterministic and order-preserving: predicates are
/// ANDed in the order they arrive, `add_order_by` appends a sort key after
/// the existing ones, `order_by` replaces them all.
pub trait GridQuery {
    /// Replace the whole ORDER BY with this single key.
    fn order_by(&mut self, alias: &str, sense: Sense);

    /// Append one more ORDER BY key (stable multi-key sort).
    fn add_order_by(&mut self, alias: &str, sense: Sense);

    /// AND a predicate onto the query.
    fn and_where(&mut self, cond: Cond);

    /// Register a named parameter value.
    fn bind(&mut self, name: &str, value: ParamValue);

    /// Restrict the result window. Never called when the count is zero.
    fn window(&mut self, offset: u64, limit: u64);

    /// Compute the total result count under the current predicates.
    fn count(&mut self, strategy: &CountStrategy) -> Result<u64, QueryError>;

    /// Execute and return the (windowed) rows.
    fn fetch(&mut self) -> Result<Vec<Row>, QueryError>;

    /// The counting strategy this backend prefers when the grid does not
    /// choose one explicitly.
    fn default_count_strategy(&self) -> CountStrategy {
        CountStrategy::BySubquery
    }

    /// Fetch one page of distinct identifiers (`alias`) under the current
    /// predicates and order, without touching the main query's window.
    /// Backends that cannot run an identifier projection reject this.
    fn fetch_ids(&mut self, alias: &str, offset: u64, limit: u64) -> Result<Vec<ParamValue>, QueryError> {
        let _ = (alias, offset, limit);
        Err(QueryError::Unsupported("identifier projection".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sense_tokens_round_trip() {
        assert_eq!(Sense::parse("ASC"), Some(Sense::Asc));
        assert_eq!(Sense::parse("DESC"), Some(Sense::Desc));
        assert_eq!(Sense::parse("desc"), None);
        assert_eq!(Sense::parse(""), None);
        assert_eq!(Sense::Desc.token(), "DESC");
    }

    #[test]
    fn param_value_conversions() {
        assert_eq!(ParamValue::from("x"), ParamValue::Text("x".into()));
        assert_eq!(ParamValue::from(3_i32), ParamValue::Int(3));
        assert_eq!(ParamValue::from(true), ParamValue::Bool(true));
    }
}
