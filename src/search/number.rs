//! Numeric filter with one fixed comparator.
//!
//! The comparator is chosen when the field is declared, not by the user at
//! request time. An explicit `0` is a real value and still filters; only an
//! absent or blank submission means "no filter".

use serde_json::Value;

use super::field::{param_prefix, raw_text, Comparator, FieldError, FieldWidget, FilterField, WidgetKind};
use super::FilterValue;
use crate::query::{Cond, GridQuery, ParamValue};

#[derive(Debug, Clone)]
pub struct NumberFilter {
    column_id: String,
    property: String,
    label: String,
    comparator: Comparator,
}

impl NumberFilter {
    pub fn new(column_id: impl Into<String>, property: impl Into<String>) -> Self {
        let property = property.into();
        Self {
            column_id: column_id.into(),
            label: property.clone(),
            property,
            comparator: Comparator::Eq,
        }
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn comparator(mut self, comparator: Comparator) -> Self {
        self.comparator = comparator;
        self
    }
}

impl FilterField for NumberFilter {
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
            kind: WidgetKind::Number { comparator: self.comparator },
        }
    }

    fn parse(&self, raw: Option<&Value>) -> Result<Option<FilterValue>, FieldError> {
        if let Some(Value::Number(n)) = raw {
            if let Some(i) = n.as_i64() {
                return Ok(Some(FilterValue::Int(i)));
            }
            if let Some(f) = n.as_f64() {
                return Ok(Some(FilterValue::Number(f)));
            }
        }
        match raw_text(raw) {
            None => Ok(None),
            Some(text) => {
                if let Ok(i) = text.parse::<i64>() {
                    Ok(Some(FilterValue::Int(i)))
                } else if let Ok(f) = text.parse::<f64>() {
                    Ok(Some(FilterValue::Number(f)))
                } else {
                    Err(FieldError::new(
                        &self.property,
                        format!("not a number: '{}'", text),
                    ))
                }
            }
        }
    }

    fn contribute_query(&self, query: &mut dyn GridQuery, value: &FilterValue, alias: &str) {
        let bound = match value {
            FilterValue::Int(i) => ParamValue::Int(*i),
            FilterValue::Number(f) => ParamValue::Float(*f),
            _ => return,
        };
        let param = param_prefix(&self.property);
        query.bind(&param, bound);
        query.and_where(Cond::cmp(alias, self.comparator.cmp(), param));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::memory::MemoryQuery;
    use crate::query::{CountStrategy, Row};
    use serde_json::json;

    fn ages() -> Vec<Row> {
        [0_i64, 18, 30, 65]
            .iter()
            .map(|n| {
                let mut row = Row::new();
                row.insert("age".into(), ParamValue::Int(*n));
                row
            })
            .collect()
    }

    #[test]
    fn parses_numbers_and_rejects_garbage() {
        let f = NumberFilter::new("age", "age");
        assert_eq!(f.parse(Some(&json!(18))).unwrap(), Some(FilterValue::Int(18)));
        assert_eq!(f.parse(Some(&json!("18"))).unwrap(), Some(FilterValue::Int(18)));
        assert_eq!(f.parse(Some(&json!(1.5))).unwrap(), Some(FilterValue::Number(1.5)));
        assert_eq!(f.parse(Some(&json!(""))).unwrap(), None);
        assert!(f.parse(Some(&json!("old"))).is_err());
    }

    #[test]
    fn explicit_zero_still_filters() {
        let f = NumberFilter::new("age", "age");
        assert_eq!(f.parse(Some(&json!(0))).unwrap(), Some(FilterValue::Int(0)));
        let mut q = MemoryQuery::new(ages());
        f.contribute_query(&mut q, &FilterValue::Int(0), "age");
        assert_eq!(q.count(&CountStrategy::Native).unwrap(), 1);
    }

    #[test]
    fn comparator_is_fixed_per_instance() {
        let f = NumberFilter::new("age", "age").comparator(Comparator::Ge);
        let mut q = MemoryQuery::new(ages());
        f.contribute_query(&mut q, &FilterValue::Int(18), "age");
        assert_eq!(q.count(&CountStrategy::Native).unwrap(), 3);
    }
}
