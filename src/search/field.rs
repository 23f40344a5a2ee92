//! The contract every filter field implements.
//!
//! A filter field is one typed search criterion bound to a column. It knows
//! three things: how to describe its widget to a form renderer, how to parse
//! a raw submitted value into a typed [`FilterValue`], and how to contribute
//! a predicate to the query. Parsing is the copy-on-validate building block:
//! the engine binds a whole submission into a fresh value map and swaps it
//! in only when every field parsed.
//!
//! Fields are stateless across requests; their options are validated once at
//! construction and are immutable afterwards.

use serde::Serialize;
use thiserror::Error;

use super::FilterValue;
use crate::query::{Cmp, GridQuery};

/// A failed parse of one field's submitted value. These are collected per
/// submission; a submission with any field error leaves the previously
/// persisted filters untouched.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize)]
#[error("{property}: {message}")]
pub struct FieldError {
    pub property: String,
    pub message: String,
}

impl FieldError {
    pub fn new(property: impl Into<String>, message: impl Into<String>) -> Self {
        Self { property: property.into(), message: message.into() }
    }
}

/// Comparator fixed per field instance at construction time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
pub enum Comparator {
    #[default]
    Eq,
    Gt,
    Ge,
    Lt,
    Le,
}

impl Comparator {
    pub(crate) fn cmp(&self) -> Cmp {
        match self {
            Comparator::Eq => Cmp::Eq,
            Comparator::Gt => Cmp::Gt,
            Comparator::Ge => Cmp::Ge,
            Comparator::Lt => Cmp::Lt,
            Comparator::Le => Cmp::Le,
        }
    }
}

/// One selectable option of a choice/entity widget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChoiceOption {
    pub key: String,
    pub label: String,
}

impl ChoiceOption {
    pub fn new(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self { key: key.into(), label: label.into() }
    }
}

/// What kind of widget a field renders as.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum WidgetKind {
    Boolean,
    Text,
    Number { comparator: Comparator },
    Date { comparator: Comparator, with_time: bool },
    Choice { options: Vec<ChoiceOption>, multiple: bool },
    /// Entity pickers with `remote` set load their options lazily on the
    /// client; the option list here is empty by design.
    Entity { options: Vec<ChoiceOption>, multiple: bool, remote: bool },
}

/// Inert description of a field's widget: everything a renderer needs,
/// nothing live.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldWidget {
    pub property: String,
    pub column_id: String,
    pub label: String,
    pub kind: WidgetKind,
}

/// The shared capability of all filter-field variants.
pub trait FilterField: Send + Sync {
    /// Key of this field's value in the searcher's value map.
    fn property(&self) -> &str;

    /// Id of the column (real or virtual) this field searches against.
    fn column_id(&self) -> &str;

    /// Describe the widget for form rendering.
    fn widget(&self) -> FieldWidget;

    /// Parse a raw submitted value. `Ok(None)` means "no filter" (absent,
    /// empty, or the semantically neutral value); `Err` rejects the whole
    /// submission.
    fn parse(&self, raw: Option<&serde_json::Value>) -> Result<Option<FilterValue>, FieldError>;

    /// Append this field's predicate to the query. Must be a no-op when the
    /// value does not actually restrict anything.
    fn contribute_query(&self, query: &mut dyn GridQuery, value: &FilterValue, alias: &str);
}

/// Parameter-name prefix for a field's bound values, unique per property.
pub(crate) fn param_prefix(property: &str) -> String {
    format!("sf_{}", property)
}

/// Treat JSON null and blank strings as "no value submitted".
pub(crate) fn raw_text(raw: Option<&serde_json::Value>) -> Option<String> {
    match raw {
        None => None,
        Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Some(other) => Some(other.to_string()),
    }
}
