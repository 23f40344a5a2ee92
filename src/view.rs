//! # Render-ready snapshots
//!
//! The engine never renders anything itself; it hands the caller a
//! [`GridView`], a plain serializable snapshot of everything a template or
//! a JSON endpoint needs. Views carry data only, no live query handles and
//! no store references.

use serde::Serialize;

use crate::column::Column;
use crate::pagination::Paginator;
use crate::query::{Row, Sense};
use crate::search::{FieldError, FieldWidget, FilterValue};

/// Which portion of the grid the response should re-render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Fragment {
    /// Only the result list changed (sort, page, settings deltas).
    List,
    /// A search submission also changed the form (values, errors).
    ListAndSearch,
}

/// One displayed column, in display order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnView {
    pub id: String,
    pub label: String,
    pub sortable: bool,
    /// True when this column is the active sort key.
    pub sorted: bool,
}

impl ColumnView {
    pub(crate) fn from_column(column: &Column, active_sort: &str) -> Self {
        Self {
            id: column.id.clone(),
            label: column.label.clone(),
            sortable: column.sortable,
            sorted: column.id == active_sort,
        }
    }
}

/// One row of the settings panel: every displayable column with its
/// current visibility.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SettingsColumn {
    pub id: String,
    pub label: String,
    pub displayed: bool,
}

/// The display-settings panel: column visibility plus the page-size picker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SettingsView {
    pub columns: Vec<SettingsColumn>,
    pub page_sizes: Vec<u32>,
    pub current_page_size: u32,
}

/// One search-form field: its widget description plus the currently bound
/// value, if any.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldView {
    pub widget: FieldWidget,
    pub value: Option<FilterValue>,
}

/// The search form as rendered: fields in declaration order. Form hooks may
/// relabel, reorder, or drop fields before the view is returned.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FormView {
    pub fields: Vec<FieldView>,
}

impl FormView {
    /// Mutable access to one field by property, for form hooks.
    pub fn field_mut(&mut self, property: &str) -> Option<&mut FieldView> {
        self.fields
            .iter_mut()
            .find(|f| f.widget.property == property)
    }

    /// Drop one field from the rendered form, for form hooks.
    pub fn remove_field(&mut self, property: &str) {
        self.fields.retain(|f| f.widget.property != property);
    }
}

/// The complete render-ready snapshot of one grid response.
#[derive(Debug, Serialize)]
pub struct GridView {
    pub name: String,
    /// Displayed columns, in the user's chosen order.
    pub columns: Vec<ColumnView>,
    pub sort: String,
    pub sense: Sense,
    /// `None` when results are suppressed (search-gated grid, no active
    /// search yet).
    pub paginator: Option<Paginator>,
    pub rows: Vec<Row>,
    /// `None` when the grid has no searcher configured.
    pub search_form: Option<FormView>,
    /// Field errors from a rejected search submission; empty otherwise.
    pub search_errors: Vec<FieldError>,
    pub settings: SettingsView,
    pub fragment: Fragment,
}

impl GridView {
    /// True when the result list was withheld pending a first search.
    pub fn results_suppressed(&self) -> bool {
        self.paginator.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::WidgetKind;

    fn form() -> FormView {
        FormView {
            fields: vec![
                FieldView {
                    widget: FieldWidget {
                        property: "query_name".into(),
                        column_id: "name".into(),
                        label: "Name".into(),
                        kind: WidgetKind::Text,
                    },
                    value: None,
                },
                FieldView {
                    widget: FieldWidget {
                        property: "active".into(),
                        column_id: "active".into(),
                        label: "Active".into(),
                        kind: WidgetKind::Boolean,
                    },
                    value: Some(FilterValue::Bool(true)),
                },
            ],
        }
    }

    #[test]
    fn field_mut_finds_by_property() {
        let mut form = form();
        let field = form.field_mut("active").unwrap();
        field.widget.label = "Enabled".into();
        assert_eq!(form.fields[1].widget.label, "Enabled");
    }

    #[test]
    fn remove_field_drops_only_the_named_field() {
        let mut form = form();
        form.remove_field("query_name");
        assert_eq!(form.fields.len(), 1);
        assert_eq!(form.fields[0].widget.property, "active");
    }
}
