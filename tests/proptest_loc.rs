//! Property tests for location relations and list operations.

use loc_tags::loclist::{binary_search, merge_list, minus, rm_intervals};
use loc_tags::Loc;
use proptest::prelude::*;

fn arb_loc() -> impl Strategy<Value = Loc> {
    (0usize..50, 1usize..10).prop_map(|(start, len)| Loc::new(start, start + len, 0).unwrap())
}

fn arb_locs() -> impl Strategy<Value = Vec<Loc>> {
    proptest::collection::vec(arb_loc(), 0..12)
}

fn covers(locs: &[Loc], point: usize) -> bool {
    locs.iter().any(|loc| loc.start() <= point && point < loc.end())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(512))]

    /// Exactly one of Allen's thirteen relations holds for two non empty
    /// locations.
    #[test]
    fn allen_relations_partition(a in arb_loc(), b in arb_loc()) {
        let holding = [
            a.before(&b), b.before(&a),
            a.meets(&b), b.meets(&a),
            a.overlaps(&b), b.overlaps(&a),
            a.starts(&b), b.starts(&a),
            a.during(&b), b.during(&a),
            a.finishes(&b), b.finishes(&a),
            a.equals(&b),
        ]
        .iter()
        .filter(|holds| **holds)
        .count();
        prop_assert_eq!(holding, 1);
    }

    #[test]
    fn intersects_is_symmetric(a in arb_loc(), b in arb_loc()) {
        prop_assert_eq!(a.intersects(&b), b.intersects(&a));
        prop_assert_eq!(a.disjoint(&b), !a.intersects(&b));
        prop_assert_eq!(a.intersects(&b), a.intersect_len(&b) > 0);
    }

    #[test]
    fn merge_list_is_idempotent(locs in arb_locs()) {
        let merged = merge_list(&locs, false).unwrap();
        prop_assert_eq!(merge_list(&merged, false).unwrap(), merged.clone());
        for pair in merged.windows(2) {
            prop_assert!(pair[0] < pair[1]);
            prop_assert!(!pair[0].intersects(&pair[1]));
        }
        for point in 0..60 {
            prop_assert_eq!(covers(&merged, point), covers(&locs, point));
        }
    }

    #[test]
    fn rm_intervals_removes_exactly_the_discarded_points(
        locs in arb_locs(),
        discard in arb_locs(),
    ) {
        let kept = rm_intervals(&locs, &discard).unwrap();
        for point in 0..60 {
            prop_assert_eq!(
                covers(&kept, point),
                covers(&locs, point) && !covers(&discard, point)
            );
        }
        prop_assert!(kept.iter().all(|loc| !loc.is_empty()));
        prop_assert_eq!(rm_intervals(&locs, &[]).unwrap(), merge_list(&locs, false).unwrap());
        prop_assert!(rm_intervals(&locs, &locs).unwrap().is_empty());
    }

    #[test]
    fn minus_drops_exact_matches(locs in arb_locs(), discard in arb_locs()) {
        let kept = minus(&locs, &discard);
        prop_assert!(kept.iter().all(|loc| locs.contains(loc) && !discard.contains(loc)));
        let dropped = locs.iter().filter(|loc| discard.contains(loc)).count();
        prop_assert_eq!(kept.len() + dropped, locs.len());
        prop_assert!(minus(&locs, &locs).is_empty());
        prop_assert_eq!(minus(&locs, &[]), locs.clone());
    }

    #[test]
    fn binary_search_finds_insertion_points(mut locs in arb_locs(), target in arb_loc()) {
        locs.sort();
        locs.dedup();
        match binary_search(&locs, &target) {
            Ok(i) => prop_assert_eq!(locs[i], target),
            Err(i) => {
                prop_assert!(!locs.contains(&target));
                locs.insert(i, target);
                prop_assert!(locs.windows(2).all(|pair| pair[0] < pair[1]));
            }
        }
    }
}
