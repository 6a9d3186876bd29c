//! Deal linkage scanner.
//!
//! Reconstructs which deals reference a set of entries by scanning every deal
//! value map. There is no reverse index: every query is a full scan.

use super::directory::DealDirectory;
use super::values::DealValueSource;
use std::collections::HashSet;
use tracing::debug;

/// Finds deals whose value maps hold any of a set of entry ids.
pub struct DealLinkageScanner<'a, V: ?Sized, D: ?Sized> {
    values: &'a V,
    deals: &'a D,
}

impl<'a, V, D> DealLinkageScanner<'a, V, D>
where
    V: DealValueSource + ?Sized,
    D: DealDirectory + ?Sized,
{
    /// Create a scanner over a value-map source and a deal directory.
    pub fn new(values: &'a V, deals: &'a D) -> Self {
        Self { values, deals }
    }

    /// Ids of deals with at least one value referencing `entry_ids`.
    ///
    /// A collection value matches if any element is in the set; a scalar
    /// matches if it is. Each deal id appears once, in enumeration order.
    pub fn matching_deal_ids(&self, entry_ids: &HashSet<String>) -> Vec<String> {
        if entry_ids.is_empty() {
            return Vec::new();
        }

        let maps = self.values.deal_value_maps();
        let scanned = maps.len();
        let mut seen = HashSet::new();
        let mut matched = Vec::new();

        for map in maps {
            let hit = map
                .values
                .values()
                .any(|value| value.references_any(|id| entry_ids.contains(id)));
            if hit && seen.insert(map.deal_id.clone()) {
                matched.push(map.deal_id);
            }
        }

        debug!(scanned, matched = matched.len(), ids = entry_ids.len(), "scanned deal value maps");
        matched
    }

    /// Deals referencing any of `entry_ids`, de-duplicated.
    ///
    /// Matching deals without a record in the directory are skipped.
    pub fn deals_referencing(&self, entry_ids: &HashSet<String>) -> Vec<D::Deal> {
        self.matching_deal_ids(entry_ids)
            .into_iter()
            .filter_map(|deal_id| {
                let deal = self.deals.deal(&deal_id);
                if deal.is_none() {
                    debug!(deal_id = %deal_id, "matched deal has no record");
                }
                deal
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{Value, ValueMap};
    use std::collections::{BTreeMap, HashMap};

    fn ids(items: &[&str]) -> HashSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn values(pairs: &[(&str, Value)]) -> ValueMap {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    fn fixture() -> (BTreeMap<String, ValueMap>, HashMap<String, String>) {
        let mut maps = BTreeMap::new();
        maps.insert("d1".to_string(), values(&[("contact", Value::text("p1"))]));
        maps.insert(
            "d2".to_string(),
            values(&[("contact", Value::text_list(["p1"])), ("company", Value::text("c1"))]),
        );
        maps.insert("d3".to_string(), values(&[("amount", Value::Number(5.0))]));
        maps.insert("d4".to_string(), values(&[("contact", Value::text("p9"))]));

        let deals = ["d1", "d2", "d3"]
            .iter()
            .map(|id| (id.to_string(), format!("deal {id}")))
            .collect();
        (maps, deals)
    }

    #[test]
    fn test_scalar_and_list_match_alike() {
        let (maps, deals) = fixture();
        let scanner = DealLinkageScanner::new(&maps, &deals);
        assert_eq!(scanner.matching_deal_ids(&ids(&["p1"])), vec!["d1", "d2"]);
    }

    #[test]
    fn test_no_duplicates_when_several_fields_match() {
        let (maps, deals) = fixture();
        let scanner = DealLinkageScanner::new(&maps, &deals);
        let found = scanner.deals_referencing(&ids(&["p1", "c1"]));
        assert_eq!(found, vec!["deal d1".to_string(), "deal d2".to_string()]);
    }

    #[test]
    fn test_empty_set_and_missing_records() {
        let (maps, deals) = fixture();
        let scanner = DealLinkageScanner::new(&maps, &deals);
        assert!(scanner.matching_deal_ids(&HashSet::new()).is_empty());

        assert_eq!(scanner.matching_deal_ids(&ids(&["p9"])), vec!["d4"]);
        assert!(scanner.deals_referencing(&ids(&["p9"])).is_empty());
    }

    #[test]
    fn test_numbers_never_match_ids() {
        let (maps, deals) = fixture();
        let scanner = DealLinkageScanner::new(&maps, &deals);
        assert!(scanner.matching_deal_ids(&ids(&["5"])).is_empty());
    }
}
