//! Two-state boolean filter.
//!
//! Submitted as the tokens `true`/`false` (JSON booleans are accepted too).
//! The stored representation is configurable — some schemas keep `0`/`1`,
//! some `Y`/`N` — and NULL can be declared to mean true or false, in which
//! case the predicate for that side matches NULL rows as well.

use serde_json::Value;

use super::field::{param_prefix, raw_text, FieldError, FieldWidget, FilterField, WidgetKind};
use super::FilterValue;
use crate::query::{Cond, GridQuery, ParamValue};

#[derive(Debug, Clone)]
pub struct BooleanFilter {
    column_id: String,
    property: String,
    label: String,
    true_value: ParamValue,
    false_value: ParamValue,
    /// Which boolean NULL stands for, if any.
    null_means: Option<bool>,
}

impl BooleanFilter {
    pub fn new(column_id: impl Into<String>, property: impl Into<String>) -> Self {
        let property = property.into();
        Self {
            column_id: column_id.into(),
            label: property.clone(),
            property,
            true_value: ParamValue::Bool(true),
            false_value: ParamValue::Bool(false),
            null_means: None,
        }
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Stored representations of true and false.
    pub fn stored_values(mut self, true_value: ParamValue, false_value: ParamValue) -> Self {
        self.true_value = true_value;
        self.false_value = false_value;
        self
    }

    /// Treat NULL as false: filtering on false also matches NULL rows.
    pub fn null_is_false(mut self) -> Self {
        self.null_means = Some(false);
        self
    }

    /// Treat NULL as true: filtering on true also matches NULL rows.
    pub fn null_is_true(mut self) -> Self {
        self.null_means = Some(true);
        self
    }
}

impl FilterField for BooleanFilter {
    fn property(&self) -> &str {
        &self.property
    }

    fn column_id(&self) -> &str {
        &self.column_id
    }

    fn widget(&self) -> FieldWidget {
        FieldWidget {
            property: self.property.clone(),
            column_id: self.column_id.clone(),
            label: self.label.clone(),
            kind: WidgetKind::Boolean,
        }
    }

    fn parse(&self, raw: Option<&Value>) -> Result<Option<FilterValue>, FieldError> {
        if let Some(Value::Bool(b)) = raw {
            return Ok(Some(FilterValue::Bool(*b)));
        }
        match raw_text(raw).as_deref() {
            None => Ok(None),
            Some("true") | Some("1") => Ok(Some(FilterValue::Bool(true))),
            Some("false") | Some("0") => Ok(Some(FilterValue::Bool(false))),
            Some(other) => Err(FieldError::new(
                &self.property,
                format!("not a boolean token: '{}'", other),
            )),
        }
    }

    fn contribute_query(&self, query: &mut dyn GridQuery, value: &FilterValue, alias: &str) {
        let flag = match value {
            FilterValue::Bool(b) => *b,
            _ => return,
        };
        let stored = if flag { self.true_value.clone() } else { self.false_value.clone() };
        let param = param_prefix(&self.property);
        query.bind(&param, stored);
        let eq = Cond::eq(alias, param);
        if self.null_means == Some(flag) {
            query.and_where(Cond::Or(vec![
                eq,
                Cond::IsNull { alias: alias.to_string(), negated: false },
            ]));
        } else {
            query.and_where(eq);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::memory::MemoryQuery;
    use crate::query::{CountStrategy, Row};
    use serde_json::json;

    fn rows() -> Vec<Row> {
        let mk = |v: ParamValue| {
            let mut row = Row::new();
            row.insert("active".into(), v);
            row
        };
        vec![
            mk(ParamValue::Bool(true)),
            mk(ParamValue::Bool(false)),
            mk(ParamValue::Null),
        ]
    }

    #[test]
    fn parses_tokens_and_json_booleans() {
        let f = BooleanFilter::new("active", "active");
        assert_eq!(f.parse(Some(&json!("true"))).unwrap(), Some(FilterValue::Bool(true)));
        assert_eq!(f.parse(Some(&json!("0"))).unwrap(), Some(FilterValue::Bool(false)));
        assert_eq!(f.parse(Some(&json!(false))).unwrap(), Some(FilterValue::Bool(false)));
        assert_eq!(f.parse(Some(&json!(""))).unwrap(), None);
        assert_eq!(f.parse(None).unwrap(), None);
        assert!(f.parse(Some(&json!("maybe"))).is_err());
    }

    #[test]
    fn plain_filter_ignores_null_rows() {
        let f = BooleanFilter::new("active", "active");
        let mut q = MemoryQuery::new(rows());
        f.contribute_query(&mut q, &FilterValue::Bool(false), "active");
        assert_eq!(q.count(&CountStrategy::Native).unwrap(), 1);
    }

    #[test]
    fn null_is_false_matches_false_or_null() {
        // Scenario: null_is_false configured, "false" submitted -> rows where
        // the column equals the false value OR is NULL.
        let f = BooleanFilter::new("active", "active").null_is_false();
        let mut q = MemoryQuery::new(rows());
        f.contribute_query(&mut q, &FilterValue::Bool(false), "active");
        assert_eq!(q.count(&CountStrategy::Native).unwrap(), 2);

        // Filtering on true still matches only the true row.
        let mut q = MemoryQuery::new(rows());
        f.contribute_query(&mut q, &FilterValue::Bool(true), "active");
        assert_eq!(q.count(&CountStrategy::Native).unwrap(), 1);
    }

    #[test]
    fn custom_stored_values() {
        let f = BooleanFilter::new("active", "active")
            .stored_values(ParamValue::Text("Y".into()), ParamValue::Text("N".into()));
        let mk = |v: &str| {
            let mut row = Row::new();
            row.insert("active".into(), ParamValue::Text(v.into()));
            row
        };
        let mut q = MemoryQuery::new(vec![mk("Y"), mk("N"), mk("N")]);
        f.contribute_query(&mut q, &FilterValue::Bool(false), "active");
        assert_eq!(q.count(&CountStrategy::Native).unwrap(), 2);
    }
}
