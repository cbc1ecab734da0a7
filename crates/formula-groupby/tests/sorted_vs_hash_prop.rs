use formula_groupby::{
    Aggregation, AggregationRequest, Column, Groupby, GroupbyOptions, Interpolation, Table,
};
use proptest::prelude::*;

type Row = (Option<i8>, Option<i32>);

/// One line per group: the key followed by every statistic, sorted so group order is ignored.
fn group_statistics(rows: &[Row], options: GroupbyOptions) -> Vec<String> {
    let keys = Table::new(vec![Column::from_options(
        rows.iter().map(|(k, _)| k.map(i32::from)).collect(),
    )])
    .unwrap();
    let values = Column::from_options(rows.iter().map(|(_, v)| *v).collect());
    let groupby = Groupby::new(keys.view(), options).unwrap();

    let (labels, results) = groupby
        .aggregate(&[AggregationRequest::new(
            values.view(),
            vec![
                Aggregation::count(),
                Aggregation::sum(),
                Aggregation::min(),
                Aggregation::max(),
                Aggregation::mean(),
                Aggregation::quantile([0.3, 0.5], Interpolation::Nearest),
            ],
        )])
        .unwrap();
    let unique = groupby.groups(labels).unwrap();

    let mut lines: Vec<String> = (0..unique.num_rows())
        .map(|g| {
            let mut line = unique.row(g)[0].to_string();
            for output in &results[0].results {
                for column in &output.columns {
                    line.push_str(&format!(" {}", column.get(g)));
                }
            }
            line
        })
        .collect();
    lines.sort();
    lines
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        rng_seed: proptest::test_runner::RngSeed::Fixed(0),
        failure_persistence: None,
        .. ProptestConfig::default()
    })]

    #[test]
    fn sorted_and_hash_paths_agree(
        rows in proptest::collection::vec(
            (
                proptest::option::of(-4i8..4),
                proptest::option::weighted(0.8, -1000i32..1000),
            ),
            0..200,
        ),
        ignore_null_keys in any::<bool>(),
    ) {
        let hashed = group_statistics(
            &rows,
            GroupbyOptions::default().ignore_null_keys(ignore_null_keys),
        );

        // `Option` orders `None` first, matching the default nulls-before precedence.
        let mut sorted_rows = rows.clone();
        sorted_rows.sort_by_key(|(k, _)| *k);
        let sorted = group_statistics(
            &sorted_rows,
            GroupbyOptions::default()
                .ignore_null_keys(ignore_null_keys)
                .keys_are_sorted(true),
        );

        prop_assert_eq!(hashed, sorted);
    }
}
