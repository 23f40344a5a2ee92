//! Choice filter over a declared option list.
//!
//! Single selection submits one key; multiple selection submits an array of
//! keys, bounded by configurable min/max counts and translated through the
//! IN helper. Unknown keys reject the submission — the option list is the
//! contract.

use serde_json::Value;

use super::field::{
    param_prefix, raw_text, ChoiceOption, FieldError, FieldWidget, FilterField, WidgetKind,
};
use super::FilterValue;
use crate::error::{GridError, Result};
use crate::query::filters::{add_filter, FilterMode};
use crate::query::{Cond, GridQuery, ParamValue};

#[derive(Debug, Clone)]
pub struct ChoiceFilter {
    column_id: String,
    property: String,
    label: String,
    options: Vec<ChoiceOption>,
    multiple: bool,
    min_choices: usize,
    max_choices: Option<usize>,
}

impl ChoiceFilter {
    /// Fails fast on an empty option list or a min/max contradiction.
    pub fn new(
        column_id: impl Into<String>,
        property: impl Into<String>,
        options: Vec<ChoiceOption>,
    ) -> Result<Self> {
        let property = property.into();
        if options.is_empty() {
            return Err(GridError::Configuration(format!(
                "choice filter '{}' declares no options",
                property
            )));
        }
        Ok(Self {
            column_id: column_id.into(),
            label: property.clone(),
            property,
            options,
            multiple: false,
            min_choices: 0,
            max_choices: None,
        })
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn multiple(mut self) -> Self {
        self.multiple = true;
        self
    }

    /// Bounds on how many keys a multiple selection may carry.
    pub fn choice_bounds(mut self, min: usize, max: Option<usize>) -> Result<Self> {
        if let Some(max) = max {
            if min > max {
                return Err(GridError::Configuration(format!(
                    "choice filter '{}': min {} exceeds max {}",
                    self.property, min, max
                )));
            }
        }
        self.min_choices = min;
        self.max_choices = max;
        Ok(self)
    }

    fn known(&self, key: &str) -> bool {
        self.options.iter().any(|o| o.key == key)
    }

    fn validate_keys(&self, keys: &[String]) -> std::result::Result<(), FieldError> {
        for key in keys {
            if !self.known(key) {
                return Err(FieldError::new(
                    &self.property,
                    format!("unknown choice key: '{}'", key),
                ));
            }
        }
        if keys.len() < self.min_choices {
            return Err(FieldError::new(
                &self.property,
                format!("at least {} choices required", self.min_choices),
            ));
        }
        if let Some(max) = self.max_choices {
            if keys.len() > max {
                return Err(FieldError::new(
                    &self.property,
                    format!("at most {} choices allowed", max),
                ));
            }
        }
        Ok(())
    }
}

impl FilterField for ChoiceFilter {
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
            kind: WidgetKind::Choice {
                options: self.options.clone(),
                multiple: self.multiple,
            },
        }
    }

    fn parse(&self, raw: Option<&Value>) -> std::result::Result<Option<FilterValue>, FieldError> {
        if self.multiple {
            let keys: Vec<String> = match raw {
                None | Some(Value::Null) => return Ok(None),
                Some(Value::Array(items)) => items
                    .iter()
                    .filter_map(|v| raw_text(Some(v)))
                    .collect(),
                Some(other) => raw_text(Some(other)).into_iter().collect(),
            };
            if keys.is_empty() {
                return Ok(None);
            }
            self.validate_keys(&keys)?;
            Ok(Some(FilterValue::Keys(keys)))
        } else {
            match raw_text(raw) {
                None => Ok(None),
                Some(key) => {
                    self.validate_keys(std::slice::from_ref(&key))?;
                    Ok(Some(FilterValue::Text(key)))
                }
            }
        }
    }

    fn contribute_query(&self, query: &mut dyn GridQuery, value: &FilterValue, alias: &str) {
        let prefix = param_prefix(&self.property);
        match value {
            FilterValue::Text(key) => {
                query.bind(&prefix, ParamValue::Text(key.clone()));
                query.and_where(Cond::eq(alias, prefix));
            }
            FilterValue::Keys(keys) if !keys.is_empty() => {
                let values: Vec<ParamValue> =
                    keys.iter().map(|k| ParamValue::Text(k.clone())).collect();
                add_filter(query, FilterMode::In, alias, &values, &prefix);
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::memory::MemoryQuery;
    use crate::query::{CountStrategy, Row};
    use serde_json::json;

    fn statuses() -> Vec<ChoiceOption> {
        vec![
            ChoiceOption::new("open", "Open"),
            ChoiceOption::new("closed", "Closed"),
            ChoiceOption::new("draft", "Draft"),
        ]
    }

    fn rows() -> Vec<Row> {
        ["open", "open", "closed", "draft"]
            .iter()
            .map(|s| {
                let mut row = Row::new();
                row.insert("status".into(), ParamValue::Text((*s).into()));
                row
            })
            .collect()
    }

    #[test]
    fn empty_option_list_is_a_configuration_error() {
        assert!(ChoiceFilter::new("status", "status", vec![]).is_err());
    }

    #[test]
    fn min_over_max_is_a_configuration_error() {
        let f = ChoiceFilter::new("status", "status", statuses()).unwrap();
        assert!(f.multiple().choice_bounds(3, Some(2)).is_err());
    }

    #[test]
    fn single_selection_filters_by_equality() {
        let f = ChoiceFilter::new("status", "status", statuses()).unwrap();
        let value = f.parse(Some(&json!("open"))).unwrap().unwrap();
        let mut q = MemoryQuery::new(rows());
        f.contribute_query(&mut q, &value, "status");
        assert_eq!(q.count(&CountStrategy::Native).unwrap(), 2);
    }

    #[test]
    fn unknown_key_rejects_the_submission() {
        let f = ChoiceFilter::new("status", "status", statuses()).unwrap();
        assert!(f.parse(Some(&json!("bogus"))).is_err());
    }

    #[test]
    fn multiple_selection_goes_through_the_in_helper() {
        let f = ChoiceFilter::new("status", "status", statuses()).unwrap().multiple();
        let value = f.parse(Some(&json!(["open", "draft"]))).unwrap().unwrap();
        let mut q = MemoryQuery::new(rows());
        f.contribute_query(&mut q, &value, "status");
        assert_eq!(q.count(&CountStrategy::Native).unwrap(), 3);
    }

    #[test]
    fn choice_bounds_are_enforced() {
        let f = ChoiceFilter::new("status", "status", statuses())
            .unwrap()
            .multiple()
            .choice_bounds(2, Some(2))
            .unwrap();
        assert!(f.parse(Some(&json!(["open"]))).is_err());
        assert!(f.parse(Some(&json!(["open", "draft", "closed"]))).is_err());
        assert!(f.parse(Some(&json!(["open", "draft"]))).is_ok());
    }

    #[test]
    fn empty_array_means_no_filter() {
        let f = ChoiceFilter::new("status", "status", statuses()).unwrap().multiple();
        assert_eq!(f.parse(Some(&json!([]))).unwrap(), None);
    }
}
