//! Date filter with one fixed comparator.
//!
//! Dates come in as `YYYY-MM-DD` (or RFC 3339 when the field carries a time
//! component). Without a time component the day boundary rules apply:
//! equality expands to the whole day as a BETWEEN range, and inequality
//! comparators snap to the start or end of the day so that "before the 3rd"
//! excludes the 3rd entirely and "up to the 3rd" includes all of it.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde_json::Value;

use super::field::{param_prefix, raw_text, Comparator, FieldError, FieldWidget, FilterField, WidgetKind};
use super::FilterValue;
use crate::query::{Cond, GridQuery, ParamValue};

#[derive(Debug, Clone)]
pub struct DateFilter {
    column_id: String,
    property: String,
    label: String,
    comparator: Comparator,
    with_time: bool,
}

impl DateFilter {
    pub fn new(column_id: impl Into<String>, property: impl Into<String>) -> Self {
        let property = property.into();
        Self {
            column_id: column_id.into(),
            label: property.clone(),
            property,
            comparator: Comparator::Eq,
            with_time: false,
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

    /// Compare with full timestamps instead of day boundaries.
    pub fn with_time(mut self) -> Self {
        self.with_time = true;
        self
    }
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

fn end_of_day(date: NaiveDate) -> DateTime<Utc> {
    start_of_day(date) + Duration::days(1) - Duration::seconds(1)
}

impl FilterField for DateFilter {
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
            kind: WidgetKind::Date { comparator: self.comparator, with_time: self.with_time },
        }
    }

    fn parse(&self, raw: Option<&Value>) -> Result<Option<FilterValue>, FieldError> {
        let text = match raw_text(raw) {
            None => return Ok(None),
            Some(t) => t,
        };
        if self.with_time {
            match DateTime::parse_from_rfc3339(&text) {
                Ok(dt) => Ok(Some(FilterValue::DateTime(dt.with_timezone(&Utc)))),
                Err(_) => Err(FieldError::new(
                    &self.property,
                    format!("not a timestamp: '{}'", text),
                )),
            }
        } else {
            match NaiveDate::parse_from_str(&text, "%Y-%m-%d") {
                Ok(date) => Ok(Some(FilterValue::Date(date))),
                Err(_) => Err(FieldError::new(
                    &self.property,
                    format!("not a date: '{}'", text),
                )),
            }
        }
    }

    fn contribute_query(&self, query: &mut dyn GridQuery, value: &FilterValue, alias: &str) {
        let prefix = param_prefix(&self.property);
        match value {
            FilterValue::DateTime(dt) if self.with_time => {
                query.bind(&prefix, ParamValue::DateTime(*dt));
                query.and_where(Cond::cmp(alias, self.comparator.cmp(), prefix));
            }
            FilterValue::Date(date) => {
                let start = start_of_day(*date);
                let end = end_of_day(*date);
                match self.comparator {
                    Comparator::Eq => {
                        let low = format!("{}_from", prefix);
                        let high = format!("{}_to", prefix);
                        query.bind(&low, ParamValue::DateTime(start));
                        query.bind(&high, ParamValue::DateTime(end));
                        query.and_where(Cond::Between {
                            alias: alias.to_string(),
                            low,
                            high,
                        });
                    }
                    Comparator::Gt | Comparator::Le => {
                        // Strictly after the day / up to and including it.
                        query.bind(&prefix, ParamValue::DateTime(end));
                        query.and_where(Cond::cmp(alias, self.comparator.cmp(), prefix));
                    }
                    Comparator::Ge | Comparator::Lt => {
                        query.bind(&prefix, ParamValue::DateTime(start));
                        query.and_where(Cond::cmp(alias, self.comparator.cmp(), prefix));
                    }
                }
            }
            _ => {}
        }
    }
}
