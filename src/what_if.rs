use std::collections::HashSet;

use crate::routine_aggregator::RoutineItem;

/// Returns the routine with the excluded items dropped, leaving the input
/// untouched. An item is excluded when the set contains its barcode or its
/// internal id; keys matching nothing are ignored.
pub fn restrict(items: &[RoutineItem], excluded: &HashSet<String>) -> Vec<RoutineItem> {
    items
        .iter()
        .filter(|item| !is_excluded(item, excluded))
        .cloned()
        .collect()
}

fn is_excluded(item: &RoutineItem, excluded: &HashSet<String>) -> bool {
    if excluded.contains(&item.id) {
        return true;
    }
    item.barcode
        .as_ref()
        .is_some_and(|barcode| excluded.contains(barcode))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::additive_normalizer::{normalize, AdditiveCode};
    use crate::routine_aggregator::{additive_set_of, RoutineAggregator, RoutineItemPatch};

    fn codes(raw: &[&str]) -> Vec<AdditiveCode> {
        raw.iter().map(|c| normalize(c).unwrap()).collect()
    }

    fn routine() -> RoutineAggregator {
        let mut aggregator = RoutineAggregator::new();
        for (barcode, tokens) in [
            ("111", vec!["E330"]),
            ("222", vec!["E322I", "e 102"]),
            ("333", vec!["E330", "E471"]),
        ] {
            aggregator.upsert(RoutineItemPatch {
                barcode: Some(barcode.to_string()),
                raw_additive_tokens: Some(tokens.iter().map(|t| t.to_string()).collect()),
                ..RoutineItemPatch::default()
            });
        }
        aggregator
    }

    fn excluded(keys: &[&str]) -> HashSet<String> {
        keys.iter().map(|k| k.to_string()).collect()
    }

    #[test]
    fn test_excluding_nothing_returns_everything() {
        let aggregator = routine();
        let filtered = restrict(aggregator.list(), &HashSet::new());
        assert_eq!(filtered.len(), 3);
        assert_eq!(additive_set_of(&filtered), aggregator.additive_set());
    }

    #[test]
    fn test_excluded_barcodes_drop_out_of_the_derived_set() {
        let aggregator = routine();
        let filtered = restrict(aggregator.list(), &excluded(&["222"]));

        assert_eq!(filtered.len(), 2);
        assert_eq!(additive_set_of(&filtered), codes(&["E330", "E471"]));
        // The routine itself is untouched.
        assert_eq!(aggregator.len(), 3);
        assert_eq!(
            aggregator.additive_set(),
            codes(&["E102", "E322", "E322I", "E330", "E471"])
        );
    }

    #[test]
    fn test_shared_codes_survive_as_long_as_one_contributor_remains() {
        let aggregator = routine();
        // E330 comes from both 111 and 333; dropping one keeps it.
        let filtered = restrict(aggregator.list(), &excluded(&["111"]));
        assert!(additive_set_of(&filtered).contains(&normalize("E330").unwrap()));

        let filtered = restrict(aggregator.list(), &excluded(&["111", "333"]));
        assert!(!additive_set_of(&filtered).contains(&normalize("E330").unwrap()));
    }

    #[test]
    fn test_items_can_be_excluded_by_internal_id() {
        let mut aggregator = RoutineAggregator::new();
        aggregator.upsert(RoutineItemPatch {
            raw_additive_tokens: Some(vec!["E330".to_string()]),
            ..RoutineItemPatch::default()
        });
        let id = aggregator.list()[0].id.clone();

        let filtered = restrict(aggregator.list(), &excluded(&[id.as_str()]));
        assert!(filtered.is_empty());
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let aggregator = routine();
        let filtered = restrict(aggregator.list(), &excluded(&["999", "not-a-key"]));
        assert_eq!(filtered.len(), 3);
    }
}
