//! Stateless IN/NOT-IN filter helpers over the [`GridQuery`] capability.
//!
//! These functions append list predicates to a query, taking care of the two
//! sharp edges: value lists larger than what databases accept in one IN list
//! (chunked per [`IN_CHUNK_SIZE`] into OR-joined groups with uniquely
//! suffixed parameter names), and impossible conditions (an IN over an empty
//! set short-circuits to an always-false predicate instead of emitting
//! invalid SQL).

use super::{Cond, GridQuery, ParamValue};

/// Maximum number of values per rendered IN list. Typical engines cap either
/// the IN-list length or the total parameter count around this figure.
pub const IN_CHUNK_SIZE: usize = 1000;

/// What a list filter does with its values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterMode {
    /// No restriction at all.
    All,
    /// Keep rows whose value is in the list.
    In,
    /// Keep rows whose value is not in the list.
    NotIn,
    /// `In` when the list is non-empty, otherwise no restriction.
    Auto,
    /// Force an empty result set.
    No,
}

/// Append a list filter on `alias` to the query.
///
/// `param_prefix` must be unique per call site; every bound parameter name
/// is derived from it.
pub fn add_filter(
    query: &mut dyn GridQuery,
    mode: FilterMode,
    alias: &str,
    values: &[ParamValue],
    param_prefix: &str,
) {
    match normalize(mode, values) {
        FilterMode::All => {}
        FilterMode::No => query.and_where(Cond::False),
        FilterMode::In => {
            if values.is_empty() {
                // IN over nothing can never match.
                query.and_where(Cond::False);
                return;
            }
            let chunks = chunked_conds(query, alias, values, param_prefix, false);
            query.and_where(merge(chunks, false));
        }
        FilterMode::NotIn => {
            if values.is_empty() {
                return;
            }
            let chunks = chunked_conds(query, alias, values, param_prefix, true);
            query.and_where(merge(chunks, true));
        }
        FilterMode::Auto => unreachable!("normalize resolves Auto"),
    }
}

/// Combine a primary list filter with a whitelist/blacklist restriction on
/// the same alias.
///
/// When both resolve to plain IN filters the two value sets are intersected
/// client-side into a single IN clause; otherwise both predicates are
/// appended.
pub fn add_multi_filter_with_restrict_values(
    query: &mut dyn GridQuery,
    alias: &str,
    primary_mode: FilterMode,
    primary_values: &[ParamValue],
    restrict_mode: FilterMode,
    restrict_values: &[ParamValue],
    param_prefix: &str,
) {
    let primary = normalize(primary_mode, primary_values);
    let restrict = normalize(restrict_mode, restrict_values);

    match (primary, restrict) {
        (FilterMode::No, _) | (_, FilterMode::No) => query.and_where(Cond::False),
        (FilterMode::All, _) => {
            add_filter(query, restrict, alias, restrict_values, param_prefix)
        }
        (_, FilterMode::All) => {
            add_filter(query, primary, alias, primary_values, param_prefix)
        }
        (FilterMode::In, FilterMode::In) => {
            let merged: Vec<ParamValue> = primary_values
                .iter()
                .filter(|v| restrict_values.contains(v))
                .cloned()
                .collect();
            add_filter(query, FilterMode::In, alias, &merged, param_prefix);
        }
        (FilterMode::In, FilterMode::NotIn) => {
            let merged: Vec<ParamValue> = primary_values
                .iter()
                .filter(|v| !restrict_values.contains(v))
                .cloned()
                .collect();
            add_filter(query, FilterMode::In, alias, &merged, param_prefix);
        }
        (primary, restrict) => {
            add_filter(query, primary, alias, primary_values, &format!("{}_p", param_prefix));
            add_filter(query, restrict, alias, restrict_values, &format!("{}_r", param_prefix));
        }
    }
}

fn normalize(mode: FilterMode, values: &[ParamValue]) -> FilterMode {
    match mode {
        FilterMode::Auto if values.is_empty() => FilterMode::All,
        FilterMode::Auto => FilterMode::In,
        other => other,
    }
}

fn chunked_conds(
    query: &mut dyn GridQuery,
    alias: &str,
    values: &[ParamValue],
    param_prefix: &str,
    negated: bool,
) -> Vec<Cond> {
    values
        .chunks(IN_CHUNK_SIZE)
        .enumerate()
        .map(|(chunk_idx, chunk)| {
            let mut params = Vec::with_capacity(chunk.len());
            for (i, value) in chunk.iter().enumerate() {
                let name = format!("{}_{}_{}", param_prefix, chunk_idx, i);
                query.bind(&name, value.clone());
                params.push(name);
            }
            Cond::In { alias: alias.to_string(), params, negated }
        })
        .collect()
}

fn merge(mut chunks: Vec<Cond>, negated: bool) -> Cond {
    if chunks.len() == 1 {
        chunks.remove(0)
    } else if negated {
        // x NOT IN (a) AND x NOT IN (b)
        Cond::And(chunks)
    } else {
        // x IN (a) OR x IN (b)
        Cond::Or(chunks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::memory::MemoryQuery;
    use crate::query::{CountStrategy, Row};

    fn rows(n: i64) -> Vec<Row> {
        (0..n)
            .map(|i| {
                let mut row = Row::new();
                row.insert("id".into(), ParamValue::Int(i));
                row
            })
            .collect()
    }

    #[test]
    fn all_is_a_no_op() {
        let mut q = MemoryQuery::new(rows(3));
        add_filter(&mut q, FilterMode::All, "id", &[ParamValue::Int(1)], "f");
        assert_eq!(q.count(&CountStrategy::Native).unwrap(), 3);
    }

    #[test]
    fn no_forces_empty_result() {
        let mut q = MemoryQuery::new(rows(3));
        add_filter(&mut q, FilterMode::No, "id", &[], "f");
        assert_eq!(q.count(&CountStrategy::Native).unwrap(), 0);
    }

    #[test]
    fn in_over_empty_set_matches_nothing() {
        let mut q = MemoryQuery::new(rows(3));
        add_filter(&mut q, FilterMode::In, "id", &[], "f");
        assert_eq!(q.count(&CountStrategy::Native).unwrap(), 0);
    }

    #[test]
    fn auto_over_empty_set_is_a_no_op() {
        let mut q = MemoryQuery::new(rows(3));
        add_filter(&mut q, FilterMode::Auto, "id", &[], "f");
        assert_eq!(q.count(&CountStrategy::Native).unwrap(), 3);
    }

    #[test]
    fn not_in_over_empty_set_is_a_no_op() {
        let mut q = MemoryQuery::new(rows(3));
        add_filter(&mut q, FilterMode::NotIn, "id", &[], "f");
        assert_eq!(q.count(&CountStrategy::Native).unwrap(), 3);
    }

    #[test]
    fn in_filter_keeps_listed_rows() {
        let mut q = MemoryQuery::new(rows(5));
        add_filter(
            &mut q,
            FilterMode::In,
            "id",
            &[ParamValue::Int(1), ParamValue::Int(3)],
            "f",
        );
        assert_eq!(q.count(&CountStrategy::Native).unwrap(), 2);
    }

    #[test]
    fn large_list_is_chunked_with_distinct_parameter_names() {
        let n = 2500_i64;
        let values: Vec<ParamValue> = (0..n).map(ParamValue::Int).collect();
        let mut q = MemoryQuery::new(rows(3000));
        add_filter(&mut q, FilterMode::In, "id", &values, "f");

        // ceil(2500/1000) = 3 chunks, and semantics stay exact: every listed
        // value matches, nothing else does.
        assert_eq!(values.chunks(IN_CHUNK_SIZE).count(), 3);
        assert_eq!(q.count(&CountStrategy::Native).unwrap(), n as u64);
    }

    #[test]
    fn chunk_parameter_names_are_unique_and_cover_all_values() {
        let values: Vec<ParamValue> = (0..2500).map(ParamValue::Int).collect();
        let mut names = std::collections::BTreeSet::new();
        for (chunk_idx, chunk) in values.chunks(IN_CHUNK_SIZE).enumerate() {
            for (i, _) in chunk.iter().enumerate() {
                assert!(names.insert(format!("f_{}_{}", chunk_idx, i)));
            }
        }
        assert_eq!(names.len(), values.len());
    }

    #[test]
    fn restrict_intersects_two_in_filters_client_side() {
        let mut q = MemoryQuery::new(rows(10));
        add_multi_filter_with_restrict_values(
            &mut q,
            "id",
            FilterMode::In,
            &[ParamValue::Int(1), ParamValue::Int(2), ParamValue::Int(3)],
            FilterMode::In,
            &[ParamValue::Int(2), ParamValue::Int(3), ParamValue::Int(4)],
            "f",
        );
        assert_eq!(q.count(&CountStrategy::Native).unwrap(), 2);
    }

    #[test]
    fn restrict_blacklist_subtracts_from_primary() {
        let mut q = MemoryQuery::new(rows(10));
        add_multi_filter_with_restrict_values(
            &mut q,
            "id",
            FilterMode::In,
            &[ParamValue::Int(1), ParamValue::Int(2)],
            FilterMode::NotIn,
            &[ParamValue::Int(2)],
            "f",
        );
        assert_eq!(q.count(&CountStrategy::Native).unwrap(), 1);
    }

    #[test]
    fn restrict_no_wins_over_everything() {
        let mut q = MemoryQuery::new(rows(10));
        add_multi_filter_with_restrict_values(
            &mut q,
            "id",
            FilterMode::In,
            &[ParamValue::Int(1)],
            FilterMode::No,
            &[],
            "f",
        );
        assert_eq!(q.count(&CountStrategy::Native).unwrap(), 0);
    }

    #[test]
    fn disjoint_intersection_matches_nothing() {
        let mut q = MemoryQuery::new(rows(10));
        add_multi_filter_with_restrict_values(
            &mut q,
            "id",
            FilterMode::In,
            &[ParamValue::Int(1)],
            FilterMode::In,
            &[ParamValue::Int(2)],
            "f",
        );
        assert_eq!(q.count(&CountStrategy::Native).unwrap(), 0);
    }
}
