use framesheet_engine::{GroupOrder, find_runs, group_runs};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        rng_seed: proptest::test_runner::RngSeed::Fixed(0),
        failure_persistence: None,
        .. ProptestConfig::default()
    })]

    #[test]
    fn intervals_partition_the_input(keys in prop::collection::vec(0u8..4, 0..80)) {
        let index = group_runs(&keys, GroupOrder::FirstOccurrence);
        let mut seen = vec![0u32; keys.len()];
        for group in &index {
            for iv in &group.intervals {
                for pos in iv.start..=iv.end {
                    prop_assert_eq!(keys[pos as usize], group.key);
                    seen[pos as usize] += 1;
                }
            }
        }
        prop_assert!(seen.iter().all(|&n| n == 1));
    }

    #[test]
    fn runs_of_one_key_never_touch(keys in prop::collection::vec(0u8..3, 1..80)) {
        let index = group_runs(&keys, GroupOrder::Sorted);
        for group in &index {
            for pair in group.intervals.windows(2) {
                prop_assert!(pair[1].start > pair[0].end + 1);
            }
        }
        let total: usize = index.iter().map(|g| g.intervals.len()).sum();
        prop_assert_eq!(total, find_runs(&keys).len());
    }

    #[test]
    fn order_policies_agree_on_content(keys in prop::collection::vec(0u8..5, 0..60)) {
        let first = group_runs(&keys, GroupOrder::FirstOccurrence);
        let sorted = group_runs(&keys, GroupOrder::Sorted);

        let starts: Vec<u32> = first.iter().map(|g| g.intervals[0].start).collect();
        prop_assert!(starts.windows(2).all(|w| w[0] < w[1]));
        let keys_sorted: Vec<u8> = sorted.keys().copied().collect();
        prop_assert!(keys_sorted.windows(2).all(|w| w[0] < w[1]));

        prop_assert_eq!(first.len(), sorted.len());
        for group in &first {
            prop_assert_eq!(sorted.get(&group.key), Some(group.intervals.as_slice()));
        }
    }
}

#[test]
fn shifted_positions_become_sheet_rows() {
    let keys = [1, 1, 1, 2, 2, 1, 1];
    let rows = group_runs(&keys, GroupOrder::FirstOccurrence).shifted(5);
    let ones: Vec<(u32, u32)> = rows
        .get(&1)
        .unwrap()
        .iter()
        .map(|iv| (iv.start, iv.end))
        .collect();
    assert_eq!(ones, [(5, 7), (10, 11)]);
}
