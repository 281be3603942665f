use std::collections::BTreeSet;

use serde_json::Value;

use crate::additive_normalizer::{expand, AdditiveCode};

/// Locations probed for raw additive tokens on a product-like record, in
/// priority order. Every location that holds a list contributes; records
/// structure their additive data differently depending on which backend or
/// cached shape they came from, and a missing field is simply skipped.
pub const ADDITIVE_FIELD_PATHS: &[&[&str]] = &[
    &["additives"],
    &["off", "additives"],
    &["product", "additives"],
    &["e_numbers"],
    &["additives_tags"],
];

fn value_at<'a>(record: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut current = record;
    for key in path {
        current = current.get(key)?;
    }
    Some(current)
}

fn token_of(entry: &Value) -> Option<String> {
    match entry {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Collects every raw additive token found on one record, concatenated
/// across all of [`ADDITIVE_FIELD_PATHS`]. Non-list locations and non-string,
/// non-number entries contribute nothing.
pub fn probe_raw_tokens(record: &Value) -> Vec<String> {
    let mut tokens = Vec::new();
    for path in ADDITIVE_FIELD_PATHS {
        if let Some(Value::Array(entries)) = value_at(record, path) {
            tokens.extend(entries.iter().filter_map(token_of));
        }
    }
    tokens
}

/// Whether the record carries any of the known additive locations as a list,
/// even an empty one. Lets a merge tell "no additive data" apart from
/// "explicitly none".
pub fn has_additive_field(record: &Value) -> bool {
    ADDITIVE_FIELD_PATHS
        .iter()
        .any(|path| matches!(value_at(record, path), Some(Value::Array(_))))
}

/// Builds the canonical additive set for a stream of raw tokens: every token
/// is normalized and expanded into its full and base forms, the union is
/// deduplicated, and the result is sorted lexicographically so equal logical
/// inputs always render identically.
///
/// This is the one place that behavior lives; both record extraction and the
/// routine aggregator's derived set go through it.
pub fn canonical_set<I, S>(tokens: I) -> Vec<AdditiveCode>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut set = BTreeSet::new();
    for token in tokens {
        for code in expand(token.as_ref()) {
            set.insert(code);
        }
    }
    set.into_iter().collect()
}

/// Extracts the canonical, deduplicated, sorted additive set from a
/// collection of heterogeneous product-like records. Records contribute
/// independently; an empty input or a record with no recognizable additive
/// field yields nothing rather than an error.
pub fn extract(records: &[Value]) -> Vec<AdditiveCode> {
    canonical_set(records.iter().flat_map(probe_raw_tokens))
}
