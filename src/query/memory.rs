//! In-memory backend for [`GridQuery`].
//!
//! The memory twin of the SQL backend: it holds its rows and evaluates the
//! structured predicates directly. Small applications use it for grids over
//! already-loaded data; the test suite uses it to exercise the engine
//! without a database. It is also the backend with an "engine-native" count:
//! it always knows its exact row count, so [`CountStrategy::Native`] is its
//! default.
//!
//! `LIKE` matching is case-insensitive, as on the common SQL collations.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use super::{Cmp, Cond, CountStrategy, GridQuery, ParamValue, QueryError, Row, Sense};

#[derive(Debug, Clone, Default)]
pub struct MemoryQuery {
    rows: Vec<Row>,
    conds: Vec<Cond>,
    params: BTreeMap<String, ParamValue>,
    order: Vec<(String, Sense)>,
    window: Option<(u64, u64)>,
}

impl MemoryQuery {
    pub fn new(rows: Vec<Row>) -> Self {
        Self { rows, ..Self::default() }
    }

    fn matching_rows(&self) -> Result<Vec<Row>, QueryError> {
        let mut out = Vec::new();
        for row in &self.rows {
            let mut keep = true;
            for cond in &self.conds {
                if !self.eval(cond, row)? {
                    keep = false;
                    break;
                }
            }
            if keep {
                out.push(row.clone());
            }
        }
        Ok(out)
    }

    fn eval(&self, cond: &Cond, row: &Row) -> Result<bool, QueryError> {
        match cond {
            Cond::Cmp { alias, op, param } => {
                let value = row.get(alias.as_str());
                let bound = self.param(param)?;
                Ok(eval_cmp(value, *op, &bound))
            }
            Cond::In { alias, params, negated } => {
                let value = row.get(alias.as_str());
                let mut found = false;
                for name in params {
                    if let Some(v) = value {
                        if *v == self.param(name)? {
                            found = true;
                            break;
                        }
                    }
                }
                Ok(found != *negated)
            }
            Cond::Between { alias, low, high } => {
                let value = match row.get(alias.as_str()) {
                    Some(v) => v,
                    None => return Ok(false),
                };
                let low = self.param(low)?;
                let high = self.param(high)?;
                Ok(compare(value, &low) != Ordering::Less
                    && compare(value, &high) != Ordering::Greater)
            }
            Cond::IsNull { alias, negated } => {
                let is_null = matches!(row.get(alias.as_str()), None | Some(ParamValue::Null));
                Ok(is_null != *negated)
            }
            Cond::False => Ok(false),
            Cond::Or(subs) => {
                for sub in subs {
                    if self.eval(sub, row)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Cond::And(subs) => {
                for sub in subs {
                    if !self.eval(sub, row)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Cond::Raw(clause) => Err(QueryError::Unsupported(format!(
                "the memory backend cannot evaluate a raw clause: {}",
                clause
            ))),
        }
    }

    fn param(&self, name: &str) -> Result<ParamValue, QueryError> {
        self.params
            .get(name)
            .cloned()
            .ok_or_else(|| QueryError::UnboundParameter(name.to_string()))
    }

    fn sort(&self, rows: &mut [Row]) {
        rows.sort_by(|a, b| {
            for (alias, sense) in &self.order {
                let av = a.get(alias.as_str()).unwrap_or(&ParamValue::Null);
                let bv = b.get(alias.as_str()).unwrap_or(&ParamValue::Null);
                let ord = match sense {
                    Sense::Asc => compare(av, bv),
                    Sense::Desc => compare(bv, av),
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            Ordering::Equal
        });
    }
}

fn eval_cmp(value: Option<&ParamValue>, op: Cmp, bound: &ParamValue) -> bool {
    let value = match value {
        Some(ParamValue::Null) | None => {
            // NULL never satisfies a comparison, matching SQL semantics.
            return false;
        }
        Some(v) => v,
    };
    match op {
        Cmp::Eq => compare(value, bound) == Ordering::Equal,
        Cmp::Ne => compare(value, bound) != Ordering::Equal,
        Cmp::Gt => compare(value, bound) == Ordering::Greater,
        Cmp::Ge => compare(value, bound) != Ordering::Less,
        Cmp::Lt => compare(value, bound) == Ordering::Less,
        Cmp::Le => compare(value, bound) != Ordering::Greater,
        Cmp::Like => match (value, bound) {
            (ParamValue::Text(s), ParamValue::Text(pattern)) => like_match(pattern, s),
            _ => false,
        },
    }
}

/// Total order over parameter values: nulls first, then by type group, then
/// by value. Numeric types compare across Int/Float.
fn compare(a: &ParamValue, b: &ParamValue) -> Ordering {
    use ParamValue::*;
    match (a, b) {
        (Null, Null) => Ordering::Equal,
        (Null, _) => Ordering::Less,
        (_, Null) => Ordering::Greater,
        (Bool(x), Bool(y)) => x.cmp(y),
        (Int(x), Int(y)) => x.cmp(y),
        (Float(x), Float(y)) => x.partial_cmp(y).unwrap_or(Ordering::Equal),
        (Int(x), Float(y)) => (*x as f64).partial_cmp(y).unwrap_or(Ordering::Equal),
        (Float(x), Int(y)) => x.partial_cmp(&(*y as f64)).unwrap_or(Ordering::Equal),
        (Text(x), Text(y)) => x.cmp(y),
        (DateTime(x), DateTime(y)) => x.cmp(y),
        // Mixed types: order by a stable type rank so sorting stays total.
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

fn type_rank(v: &ParamValue) -> u8 {
    match v {
        ParamValue::Null => 0,
        ParamValue::Bool(_) => 1,
        ParamValue::Int(_) | ParamValue::Float(_) => 2,
        ParamValue::DateTime(_) => 3,
        ParamValue::Text(_) => 4,
    }
}

/// SQL LIKE over `%` (any run) and `_` (any one char), `\` escapes.
/// Case-insensitive.
fn like_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.to_lowercase().chars().collect();
    let text: Vec<char> = text.to_lowercase().chars().collect();
    like_rec(&pattern, &text)
}

fn like_rec(pattern: &[char], text: &[char]) -> bool {
    match pattern.first() {
        None => text.is_empty(),
        Some('%') => {
            (0..=text.len()).any(|skip| like_rec(&pattern[1..], &text[skip..]))
        }
        Some('_') => !text.is_empty() && like_rec(&pattern[1..], &text[1..]),
        Some('\\') if pattern.len() > 1 => {
            !text.is_empty() && text[0] == pattern[1] && like_rec(&pattern[2..], &text[1..])
        }
        Some(c) => !text.is_empty() && text[0] == *c && like_rec(&pattern[1..], &text[1..]),
    }
}

impl GridQuery for MemoryQuery {
    fn order_by(&mut self, alias: &str, sense: Sense) {
        self.order.clear();
        self.order.push((alias.to_string(), sense));
    }

    fn add_order_by(&mut self, alias: &str, sense: Sense) {
        self.order.push((alias.to_string(), sense));
    }

    fn and_where(&mut self, cond: Cond) {
        self.conds.push(cond);
    }

    fn bind(&mut self, name: &str, value: ParamValue) {
        self.params.insert(name.to_string(), value);
    }

    fn window(&mut self, offset: u64, limit: u64) {
        self.window = Some((offset, limit));
    }

    fn count(&mut self, strategy: &CountStrategy) -> Result<u64, QueryError> {
        match strategy {
            CountStrategy::Native | CountStrategy::BySubquery => {
                Ok(self.matching_rows()?.len() as u64)
            }
            CountStrategy::ByAlias { alias, distinct } => {
                let rows = self.matching_rows()?;
                let values: Vec<&ParamValue> = rows
                    .iter()
                    .filter_map(|r| r.get(alias.as_str()))
                    .filter(|v| !matches!(v, ParamValue::Null))
                    .collect();
                if *distinct {
                    let mut seen: Vec<&ParamValue> = Vec::new();
                    for v in values {
                        if !seen.contains(&v) {
                            seen.push(v);
                        }
                    }
                    Ok(seen.len() as u64)
                } else {
                    Ok(values.len() as u64)
                }
            }
        }
    }

    fn fetch(&mut self) -> Result<Vec<Row>, QueryError> {
        let mut rows = self.matching_rows()?;
        self.sort(&mut rows);
        if let Some((offset, limit)) = self.window {
            let start = (offset as usize).min(rows.len());
            let end = (start + limit as usize).min(rows.len());
            rows = rows[start..end].to_vec();
        }
        Ok(rows)
    }

    fn default_count_strategy(&self) -> CountStrategy {
        CountStrategy::Native
    }

    fn fetch_ids(&mut self, alias: &str, offset: u64, limit: u64) -> Result<Vec<ParamValue>, QueryError> {
        let mut rows = self.matching_rows()?;
        self.sort(&mut rows);
        let mut ids: Vec<ParamValue> = Vec::new();
        for row in &rows {
            if let Some(v) = row.get(alias) {
                if !ids.contains(v) {
                    ids.push(v.clone());
                }
            }
        }
        let start = (offset as usize).min(ids.len());
        let end = (start + limit as usize).min(ids.len());
        Ok(ids[start..end].to_vec())
    }
}
