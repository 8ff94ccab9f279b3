//! Ranking, per-type fairness, and trimming of highlighted results

use ahash::AHashMap;

use crate::search::types::{HighlightedResult, ResultGroup, ResultSet};

/// Sort by title highlight count, then content highlight count, both
/// descending. Ties keep their candidate order.
pub fn rank(results: &mut [HighlightedResult]) {
    results.sort_by(|a, b| b.rank_key().cmp(&a.rank_key()));
}

/// Trim ranked results to `budget` and return them with their count.
///
/// Ungrouped, this is the first `budget` results. Grouped, every record type
/// gets an equal share of `budget` (rounded down, so groups may come back
/// empty), and groups are ordered by their trimmed size, largest first, ties
/// in order of first appearance.
pub fn shape(results: Vec<HighlightedResult>, budget: usize, grouped: bool) -> (ResultSet, usize) {
    if !grouped {
        let mut results = results;
        results.truncate(budget);
        let total = results.len();
        return (ResultSet::Flat(results), total);
    }

    let mut groups = group_by_doctype(results);
    if groups.is_empty() {
        return (ResultSet::Grouped(groups), 0);
    }

    let per_group = budget / groups.len();
    for group in &mut groups {
        group.results.truncate(per_group);
    }
    groups.sort_by(|a, b| b.results.len().cmp(&a.results.len()));

    let total = groups.iter().map(|g| g.results.len()).sum();
    (ResultSet::Grouped(groups), total)
}

/// Partition by record type, preserving order within and across groups
fn group_by_doctype(results: Vec<HighlightedResult>) -> Vec<ResultGroup> {
    let mut groups: Vec<ResultGroup> = Vec::new();
    let mut positions: AHashMap<String, usize> = AHashMap::new();

    for result in results {
        let position = *positions.entry(result.doctype.clone()).or_insert_with(|| {
            groups.push(ResultGroup {
                doctype: result.doctype.clone(),
                results: Vec::new(),
            });
            groups.len() - 1
        });
        groups[position].results.push(result);
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeMap;
    use tantivy::DocAddress;

    fn result(n: u32, doctype: &str, title_hits: usize, content_hits: usize) -> HighlightedResult {
        HighlightedResult {
            id: format!("{doctype}-{n}"),
            name: n.to_string(),
            title: String::new(),
            content: String::new(),
            doctype: doctype.to_string(),
            url: String::new(),
            extras: BTreeMap::new(),
            highlighted_title: String::new(),
            highlighted_content: String::new(),
            title_highlight_count: title_hits,
            content_highlight_count: content_hits,
            address: DocAddress::new(0, n),
        }
    }

    fn ids(results: &[HighlightedResult]) -> Vec<String> {
        results.iter().map(|r| r.id.clone()).collect()
    }

    #[test]
    fn rank_orders_by_title_then_content() {
        let mut results = vec![
            result(1, "Note", 0, 3),
            result(2, "Note", 1, 0),
            result(3, "Note", 1, 2),
            result(4, "Note", 0, 3),
        ];
        rank(&mut results);
        assert_eq!(ids(&results), ["Note-3", "Note-2", "Note-1", "Note-4"]);
    }

    #[test]
    fn grouped_shares_budget_between_types() {
        let results = vec![
            result(1, "Note", 1, 0),
            result(2, "Note", 1, 0),
            result(3, "Note", 1, 0),
            result(4, "Page", 1, 0),
            result(5, "Note", 1, 0),
        ];
        let (set, total) = shape(results, 4, true);
        assert_eq!(total, 3);
        assert_eq!(ids(set.group("Note").unwrap()), ["Note-1", "Note-2"]);
        assert_eq!(ids(set.group("Page").unwrap()), ["Page-4"]);

        let ResultSet::Grouped(groups) = set else {
            panic!("expected grouped results");
        };
        assert_eq!(groups[0].doctype, "Note");
    }

    #[test]
    fn equal_sized_groups_keep_first_appearance_order() {
        let results = vec![result(1, "Page", 0, 1), result(2, "Note", 0, 1)];
        let (ResultSet::Grouped(groups), _) = shape(results, 10, true) else {
            panic!("expected grouped results");
        };
        assert_eq!(groups[0].doctype, "Page");
        assert_eq!(groups[1].doctype, "Note");
    }

    #[test]
    fn budget_below_group_count_empties_every_group() {
        let results = vec![
            result(1, "Note", 0, 1),
            result(2, "Page", 0, 1),
            result(3, "Task", 0, 1),
        ];
        let (set, total) = shape(results, 2, true);
        assert_eq!(total, 0);
        assert!(set.is_empty());
    }

    #[test]
    fn flat_truncates_to_budget() {
        let results = vec![result(1, "Note", 0, 1), result(2, "Page", 0, 1)];
        let (set, total) = shape(results, 1, false);
        assert_eq!(total, 1);
        assert_eq!(ids(&set.iter().cloned().collect::<Vec<_>>()), ["Note-1"]);
    }

    fn arb_results() -> impl Strategy<Value = Vec<HighlightedResult>> {
        prop::collection::vec(
            (prop::sample::select(vec!["Note", "Page", "Task", "Event"]), 0usize..4, 0usize..4),
            0..40,
        )
        .prop_map(|specs| {
            specs
                .into_iter()
                .enumerate()
                .map(|(i, (doctype, t, c))| result(i as u32, doctype, t, c))
                .collect()
        })
    }

    proptest! {
        #[test]
        fn total_never_exceeds_budget(results in arb_results(), budget in 0usize..30, grouped in any::<bool>()) {
            let (set, total) = shape(results, budget, grouped);
            prop_assert!(total <= budget);
            prop_assert_eq!(total, set.len());
        }

        #[test]
        fn groups_are_fair_and_sorted(results in arb_results(), budget in 0usize..30) {
            let types: std::collections::HashSet<_> = results.iter().map(|r| r.doctype.clone()).collect();
            let (set, _) = shape(results, budget, true);
            let ResultSet::Grouped(groups) = set else {
                panic!("expected grouped results");
            };
            prop_assert_eq!(groups.len(), types.len());
            if !groups.is_empty() {
                let share = budget / groups.len();
                prop_assert!(groups.iter().all(|g| g.results.len() <= share));
                prop_assert!(groups.windows(2).all(|w| w[0].results.len() >= w[1].results.len()));
                prop_assert!(groups.iter().all(|g| g.results.iter().all(|r| r.doctype == g.doctype)));
            }
        }

        #[test]
        fn rank_is_sorted_and_stable(mut results in arb_results()) {
            rank(&mut results);
            for pair in results.windows(2) {
                prop_assert!(pair[0].rank_key() >= pair[1].rank_key());
                if pair[0].rank_key() == pair[1].rank_key() {
                    prop_assert!(pair[0].address < pair[1].address);
                }
            }
        }
    }
}
