//! Entity-reference filter: choices resolved through a key→entity registry.
//!
//! Unlike [`ChoiceFilter`](super::choice::ChoiceFilter), the option list is
//! not declared inline — selected keys are resolved through an
//! [`EntityRegistry`] at parse time. A key that no longer resolves (the
//! entity was deleted since the form was rendered) is handled per the
//! field's [`MissingKeyPolicy`]: silently dropped, or surfaced as a
//! validation failure on that field.
//!
//! [`RemoteRegistry`] covers reference sets too large to enumerate: the
//! widget carries no options (the client loads them over the wire) and
//! resolution goes through a lookup function.

use std::collections::BTreeMap;

use serde_json::Value;

use super::field::{
    param_prefix, raw_text, ChoiceOption, FieldError, FieldWidget, FilterField, WidgetKind,
};
use super::FilterValue;
use crate::query::filters::{add_filter, FilterMode};
use crate::query::{Cond, GridQuery, ParamValue};

/// Resolves selected keys into managed entities.
pub trait EntityRegistry: Send + Sync {
    /// The display label for a key, or `None` when the key no longer
    /// resolves.
    fn resolve(&self, key: &str) -> Option<String>;

    /// Enumerable options for the widget. Remote registries return none.
    fn choices(&self) -> Vec<ChoiceOption>;

    /// Whether the client loads options lazily instead of enumerating them.
    fn is_remote(&self) -> bool {
        false
    }
}

/// A fixed in-process key→label table.
#[derive(Debug, Clone, Default)]
pub struct MapRegistry {
    entries: BTreeMap<String, String>,
}

impl MapRegistry {
    pub fn new(entries: impl IntoIterator<Item = (String, String)>) -> Self {
        Self { entries: entries.into_iter().collect() }
    }
}

impl EntityRegistry for MapRegistry {
    fn resolve(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn choices(&self) -> Vec<ChoiceOption> {
        self.entries
            .iter()
            .map(|(k, v)| ChoiceOption::new(k.clone(), v.clone()))
            .collect()
    }
}

/// Registry for large reference sets: keys resolve through a lookup
/// function, the widget enumerates nothing.
pub struct RemoteRegistry {
    lookup: Box<dyn Fn(&str) -> Option<String> + Send + Sync>,
}

impl RemoteRegistry {
    pub fn new(lookup: impl Fn(&str) -> Option<String> + Send + Sync + 'static) -> Self {
        Self { lookup: Box::new(lookup) }
    }
}

impl EntityRegistry for RemoteRegistry {
    fn resolve(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
    }

    fn choices(&self) -> Vec<ChoiceOption> {
        Vec::new()
    }

    fn is_remote(&self) -> bool {
        true
    }
}

/// What to do with a selected key that no longer resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingKeyPolicy {
    /// Drop the key and filter on the rest.
    #[default]
    DropSilently,
    /// Fail the field's binding.
    Fail,
}

pub struct EntityFilter<R: EntityRegistry> {
    column_id: String,
    property: String,
    label: String,
    registry: R,
    multiple: bool,
    missing_key: MissingKeyPolicy,
}

impl<R: EntityRegistry> EntityFilter<R> {
    pub fn new(
        column_id: impl Into<String>,
        property: impl Into<String>,
        registry: R,
    ) -> Self {
        let property = property.into();
        Self {
            column_id: column_id.into(),
            label: property.clone(),
            property,
            registry,
            multiple: false,
            missing_key: MissingKeyPolicy::default(),
        }
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn multiple(mut self) -> Self {
        self.multiple = true;
        self
    }

    pub fn missing_key_policy(mut self, policy: MissingKeyPolicy) -> Self {
        self.missing_key = policy;
        self
    }

    fn resolve_keys(&self, keys: Vec<String>) -> Result<Vec<String>, FieldError> {
        let mut resolved = Vec::with_capacity(keys.len());
        for key in keys {
            if self.registry.resolve(&key).is_some() {
                resolved.push(key);
            } else {
                match self.missing_key {
                    MissingKeyPolicy::DropSilently => {
                        tracing::debug!(property = %self.property, key = %key, "dropped unresolvable entity key");
                    }
                    MissingKeyPolicy::Fail => {
                        return Err(FieldError::new(
                            &self.property,
                            format!("entity '{}' no longer exists", key),
                        ));
                    }
                }
            }
        }
        Ok(resolved)
    }
}

impl<R: EntityRegistry> FilterField for EntityFilter<R> {
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
            kind: WidgetKind::Entity {
                options: self.registry.choices(),
                multiple: self.multiple,
                remote: self.registry.is_remote(),
            },
        }
    }

    fn parse(&self, raw: Option<&Value>) -> Result<Option<FilterValue>, FieldError> {
        let keys: Vec<String> = match raw {
            None | Some(Value::Null) => return Ok(None),
            Some(Value::Array(items)) => {
                items.iter().filter_map(|v| raw_text(Some(v))).collect()
            }
            Some(other) => raw_text(Some(other)).into_iter().collect(),
        };
        if keys.is_empty() {
            return Ok(None);
        }
        if !self.multiple && keys.len() > 1 {
            return Err(FieldError::new(&self.property, "a single entity is expected"));
        }
        let resolved = self.resolve_keys(keys)?;
        if resolved.is_empty() {
            return Ok(None);
        }
        Ok(Some(FilterValue::Keys(resolved)))
    }

    fn contribute_query(&self, query: &mut dyn GridQuery, value: &FilterValue, alias: &str) {
        let keys = match value {
            FilterValue::Keys(keys) if !keys.is_empty() => keys,
            _ => return,
        };
        let prefix = param_prefix(&self.property);
        if keys.len() == 1 {
            query.bind(&prefix, ParamValue::Text(keys[0].clone()));
            query.and_where(Cond::eq(alias, prefix));
        } else {
            let values: Vec<ParamValue> =
                keys.iter().map(|k| ParamValue::Text(k.clone())).collect();
            add_filter(query, FilterMode::In, alias, &values, &prefix);
        }
    }
}
