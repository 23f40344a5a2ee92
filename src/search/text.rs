//! Text filter: substring by default, prefix/suffix/exact via flags.
//!
//! LIKE metacharacters in the submitted value (`%`, `_`, `\`) are escaped
//! before the pattern is built, so a user searching for "100%" matches the
//! literal text.

use serde_json::Value;

use super::field::{param_prefix, raw_text, FieldError, FieldWidget, FilterField, WidgetKind};
use super::FilterValue;
use crate::query::{Cmp, Cond, GridQuery, ParamValue};

#[derive(Debug, Clone)]
pub struct TextFilter {
    column_id: String,
    property: String,
    label: String,
    must_begin: bool,
    must_end: bool,
}

impl TextFilter {
    pub fn new(column_id: impl Into<String>, property: impl Into<String>) -> Self {
        let property = property.into();
        Self {
            column_id: column_id.into(),
            label: property.clone(),
            property,
            must_begin: false,
            must_end: false,
        }
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// The value must match from the start (prefix search).
    pub fn must_begin(mut self) -> Self {
        self.must_begin = true;
        self
    }

    /// The value must match to the end (suffix search).
    pub fn must_end(mut self) -> Self {
        self.must_end = true;
        self
    }

    fn pattern(&self, value: &str) -> String {
        let escaped = escape_like(value);
        match (self.must_begin, self.must_end) {
            (true, true) => escaped,
            (true, false) => format!("{}%", escaped),
            (false, true) => format!("%{}", escaped),
            (false, false) => format!("%{}%", escaped),
        }
    }
}

/// Escape LIKE metacharacters with a backslash.
fn escape_like(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

impl FilterField for TextFilter {
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
            kind: WidgetKind::Text,
        }
    }

    fn parse(&self, raw: Option<&Value>) -> Result<Option<FilterValue>, FieldError> {
        Ok(raw_text(raw).map(FilterValue::Text))
    }

    fn contribute_query(&self, query: &mut dyn GridQuery, value: &FilterValue, alias: &str) {
        let text = match value {
            FilterValue::Text(t) if !t.is_empty() => t,
            _ => return,
        };
        let param = param_prefix(&self.property);
        query.bind(&param, ParamValue::Text(self.pattern(text)));
        query.and_where(Cond::cmp(alias, Cmp::Like, param));
    }
}
