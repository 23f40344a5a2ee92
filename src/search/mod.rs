//! The searcher: declared filter fields, their live values, and binding.
//!
//! A [`SearchDefinition`] is the application's declaration of what can be
//! searched: an ordered list of filter fields (built once, cached), the
//! default values, and two optional global hooks — one adjusting the whole
//! search form, one adjusting the whole query after the per-field
//! predicates.
//!
//! What gets persisted is never the definition, only [`FilterValues`]: an
//! explicit, serializable projection of the live filter state. Binding a
//! request validates into a *fresh* value map and hands it back; the caller
//! swaps it in only on success, so a half-valid submission can never corrupt
//! previously saved filters.

pub mod boolean;
pub mod choice;
pub mod date;
pub mod entity;
pub mod field;
pub mod number;
pub mod text;

pub use field::{ChoiceOption, Comparator, FieldError, FieldWidget, FilterField, WidgetKind};

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use crate::query::GridQuery;
use crate::view::FormView;

/// One typed filter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FilterValue {
    Bool(bool),
    Int(i64),
    Number(f64),
    Text(String),
    Date(NaiveDate),
    DateTime(DateTime<Utc>),
    Keys(Vec<String>),
}

/// The persisted projection of a searcher's live state: property name to
/// value. Absent key means "no filter on that property".
pub type FilterValues = BTreeMap<String, FilterValue>;

type FieldsFn = Box<dyn Fn() -> Vec<Box<dyn FilterField>> + Send + Sync>;
type FormHook = Box<dyn Fn(&mut FormView) + Send + Sync>;
type QueryHook = Box<dyn Fn(&mut dyn GridQuery) + Send + Sync>;

/// A named bag of filter-field declarations plus global hooks.
pub struct SearchDefinition {
    name: String,
    fields_fn: FieldsFn,
    fields: OnceCell<Vec<Box<dyn FilterField>>>,
    defaults: FilterValues,
    form_hook: Option<FormHook>,
    query_hook: Option<QueryHook>,
}

impl std::fmt::Debug for SearchDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchDefinition")
            .field("name", &self.name)
            .field("defaults", &self.defaults)
            .finish_non_exhaustive()
    }
}

impl SearchDefinition {
    /// `name` identifies this searcher kind inside persisted state; a stored
    /// snapshot whose kind does not match is discarded as stale.
    pub fn new(
        name: impl Into<String>,
        fields_fn: impl Fn() -> Vec<Box<dyn FilterField>> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            fields_fn: Box::new(fields_fn),
            fields: OnceCell::new(),
            defaults: FilterValues::new(),
            form_hook: None,
            query_hook: None,
        }
    }

    pub fn with_defaults(mut self, defaults: FilterValues) -> Self {
        self.defaults = defaults;
        self
    }

    /// Hook run over the assembled search form view.
    pub fn with_form_hook(mut self, hook: impl Fn(&mut FormView) + Send + Sync + 'static) -> Self {
        self.form_hook = Some(Box::new(hook));
        self
    }

    /// Hook run over the query after every field contributed its predicate.
    pub fn with_query_hook(
        mut self,
        hook: impl Fn(&mut dyn GridQuery) + Send + Sync + 'static,
    ) -> Self {
        self.query_hook = Some(Box::new(hook));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The declared fields, in declaration order. Built on first use, cached
    /// for the definition's lifetime.
    pub fn fields(&self) -> &[Box<dyn FilterField>] {
        self.fields.get_or_init(|| (self.fields_fn)())
    }

    /// A fresh clone of the default values.
    pub fn default_values(&self) -> FilterValues {
        self.defaults.clone()
    }

    /// Bind a submitted payload into a fresh value map.
    ///
    /// Every field parses its own raw value; any failure rejects the whole
    /// submission and the previous values stay in force.
    pub fn bind(
        &self,
        payload: &BTreeMap<String, serde_json::Value>,
    ) -> Result<FilterValues, Vec<FieldError>> {
        let mut values = FilterValues::new();
        let mut errors = Vec::new();
        for field in self.fields() {
            match field.parse(payload.get(field.property())) {
                Ok(Some(value)) => {
                    values.insert(field.property().to_string(), value);
                }
                Ok(None) => {}
                Err(err) => errors.push(err),
            }
        }
        if errors.is_empty() {
            Ok(values)
        } else {
            Err(errors)
        }
    }

    pub(crate) fn apply_form_hook(&self, form: &mut FormView) {
        if let Some(hook) = &self.form_hook {
            hook(form);
        }
    }

    pub(crate) fn apply_query_hook(&self, query: &mut dyn GridQuery) {
        if let Some(hook) = &self.query_hook {
            hook(query);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::text::TextFilter;
    use serde_json::json;

    fn definition() -> SearchDefinition {
        SearchDefinition::new("user_search", || {
            vec![
                Box::new(TextFilter::new("name", "query_name")) as Box<dyn FilterField>,
                Box::new(TextFilter::new("text", "query_text")),
            ]
        })
    }

    #[test]
    fn fields_are_built_once_in_declaration_order() {
        let def = definition();
        let first = def.fields();
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].property(), "query_name");
        assert_eq!(first[1].property(), "query_text");
        // Same cached slice on the second call.
        let again = def.fields();
        assert_eq!(again.len(), 2);
    }

    #[test]
    fn bind_builds_a_fresh_value_map() {
        let def = definition();
        let mut payload = BTreeMap::new();
        payload.insert("query_name".to_string(), json!("ann"));
        let values = def.bind(&payload).unwrap();
        assert_eq!(values.get("query_name"), Some(&FilterValue::Text("ann".into())));
        assert!(!values.contains_key("query_text"));
    }

    #[test]
    fn bind_ignores_unknown_payload_keys() {
        let def = definition();
        let mut payload = BTreeMap::new();
        payload.insert("unknown".to_string(), json!("x"));
        let values = def.bind(&payload).unwrap();
        assert!(values.is_empty());
    }

    #[test]
    fn values_round_trip_through_json() {
        let mut values = FilterValues::new();
        values.insert("flag".into(), FilterValue::Bool(true));
        values.insert("name".into(), FilterValue::Text("ann".into()));
        values.insert("keys".into(), FilterValue::Keys(vec!["a".into(), "b".into()]));
        let json = serde_json::to_string(&values).unwrap();
        let loaded: FilterValues = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded, values);
    }
}
