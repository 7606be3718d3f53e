//! Comprehensive property-based tests for the analysis stages
//!
//! Designed to run in a few seconds as a pre-commit quality gate.
//!
//! Core properties tested:
//! 1. Cleaning is idempotent and its output parses back
//! 2. Aggregated cells are numbers or explicitly undefined
//! 3. The correlation matrix is symmetric with a unit diagonal
//! 4. Coefficients stay in [-1, 1]; p-values stay in [0, 1]
//! 5. Identical and constant columns behave as the degenerate cases they are

use innostat::aggregate::{Segment, SegmentRow, SegmentTable};
use innostat::config::CleaningConfig;
use innostat::correlation::{correlate, pearson, Coefficient, MissingPolicy};
use innostat::significance::{two_tailed_p_value, t_statistic, SignificanceTester, TStatistic};
use proptest::prelude::*;

fn table_from_columns(columns: &[Vec<Option<f64>>]) -> SegmentTable {
    let n = columns.iter().map(Vec::len).min().unwrap_or(0);
    SegmentTable {
        indicators: (0..columns.len()).map(|c| format!("ind{}", c)).collect(),
        rows: (0..n)
            .map(|r| SegmentRow {
                segment: Segment::new("Size", format!("s{:02}", r)),
                cells: columns.iter().map(|col| col[r]).collect(),
            })
            .collect(),
    }
}

/// Raw survey rows: some in population, some not, some with bad values
fn raw_row() -> impl Strategy<Value = String> {
    (
        prop::sample::select(vec!["Viet Nam2023", "VIET NAM2023", "Thailand2016"]),
        prop::sample::select(vec!["2023", "2023.0", "2016"]),
        prop::sample::select(vec!["Size", "Sector"]),
        prop::sample::select(vec!["Small (5-19)", "Large (100+)", "Retail"]),
        prop::sample::select(vec!["t5", "t 7", "perf1", "_sample", "fieldworkdate"]),
        prop_oneof![
            (-1000.0f64..1000.0).prop_map(|v| format!("{}", v)),
            Just(".".to_string()),
            Just(String::new()),
            Just("n/a".to_string()),
        ],
        prop_oneof![
            (0.0f64..10.0).prop_map(|v| format!("{}", v)),
            Just(".".to_string()),
        ],
    )
        .prop_map(|(country, year, cut, subcut, indicator, value, se)| {
            format!(
                "{},VNM,{},{},\"{}\",{},,,{},{},100,weighted",
                country, year, cut, subcut, indicator, value, se
            )
        })
}

const HEADER: &str = "country,cabr,year,cut,subcut,indicator,Topic,EnglishName,value,se,N,method";

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_cleaning_is_idempotent(rows in prop::collection::vec(raw_row(), 0..40)) {
        use innostat::cleaner::clean;
        use innostat::csv_input::parse_raw_table;
        use innostat::csv_output::records_to_csv;

        let input = format!("{}\n{}\n", HEADER, rows.join("\n"));
        let config = CleaningConfig::default();

        let first = clean(&parse_raw_table(input.as_bytes()).unwrap(), &config, None).unwrap();
        let rendered = records_to_csv(&first.records);
        let second = clean(&parse_raw_table(rendered.as_bytes()).unwrap(), &config, None).unwrap();

        // Property: cleaning cleaned data changes nothing
        prop_assert_eq!(&first.records, &second.records);
        prop_assert_eq!(second.stats.dropped(), 0);
        prop_assert_eq!(records_to_csv(&second.records), rendered);
    }

    #[test]
    fn prop_cleaned_numeric_fields_parse(rows in prop::collection::vec(raw_row(), 0..40)) {
        use innostat::cleaner::clean;
        use innostat::csv_input::parse_raw_table;

        let input = format!("{}\n{}\n", HEADER, rows.join("\n"));
        let raw = parse_raw_table(input.as_bytes()).unwrap();
        let outcome = clean(&raw, &CleaningConfig::default(), None).unwrap();

        // Property: every surviving record is in the population with a finite value
        for record in &outcome.records {
            prop_assert!(record.value.is_finite());
            prop_assert_eq!(record.year, 2023);
            prop_assert!(record.country.to_lowercase().contains("viet nam"));
            prop_assert!(!record.indicator.contains(' '));
            prop_assert!(record.indicator != "_sample" && record.indicator != "fieldworkdate");
        }
        prop_assert_eq!(outcome.stats.kept + outcome.stats.dropped(), rows.len());
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_pearson_bounded_and_symmetric(
        pairs in prop::collection::vec((-1e6f64..1e6, -1e6f64..1e6), 0..40)
    ) {
        let (xs, ys): (Vec<f64>, Vec<f64>) = pairs.into_iter().unzip();
        let r_xy = pearson(&xs, &ys);
        let r_yx = pearson(&ys, &xs);

        prop_assert_eq!(r_xy, r_yx);
        if let Coefficient::Value(r) = r_xy {
            prop_assert!((-1.0..=1.0).contains(&r));
        }
    }

    #[test]
    fn prop_identical_columns_correlate_to_one(
        xs in prop::collection::vec(-1e3f64..1e3, 3..30)
    ) {
        prop_assume!(xs.windows(2).any(|w| w[0] != w[1]));
        prop_assert_eq!(pearson(&xs, &xs), Coefficient::Value(1.0));
        prop_assert_eq!(t_statistic(1.0, xs.len()), TStatistic::Saturated { positive: true });
    }

    #[test]
    fn prop_constant_column_undefined(
        c in -1e3f64..1e3,
        ys in prop::collection::vec(-1e3f64..1e3, 2..30)
    ) {
        let xs = vec![c; ys.len()];
        prop_assert!(!pearson(&xs, &ys).is_defined());
    }

    #[test]
    fn prop_matrix_symmetric_unit_diagonal(
        columns in prop::collection::vec(
            prop::collection::vec(prop::option::weighted(0.9, -100.0f64..100.0), 6),
            1..6
        ),
        pairwise in any::<bool>()
    ) {
        let policy = if pairwise { MissingPolicy::Pairwise } else { MissingPolicy::Propagate };
        let matrix = correlate(&table_from_columns(&columns), policy);

        prop_assert!(matrix.is_symmetric());
        for i in 0..matrix.size() {
            let diagonal = matrix.get(i, i).coefficient;
            prop_assert!(diagonal == Coefficient::Value(1.0) || !diagonal.is_defined());
            for j in 0..matrix.size() {
                if let Coefficient::Value(r) = matrix.get(i, j).coefficient {
                    prop_assert!((-1.0..=1.0).contains(&r));
                }
            }
        }
    }

    #[test]
    fn prop_p_value_in_unit_interval(t in -50.0f64..50.0, df in 1usize..200) {
        let p = two_tailed_p_value(t, df).unwrap();
        prop_assert!((0.0..=1.0).contains(&p));
        // Property: larger |t| never raises p
        let further = two_tailed_p_value(t.abs() + 1.0, df).unwrap();
        prop_assert!(further <= p);
    }

    #[test]
    fn prop_significance_results_sorted(
        columns in prop::collection::vec(prop::collection::vec(-100.0f64..100.0, 8), 2..6)
    ) {
        let columns: Vec<Vec<Option<f64>>> = columns
            .into_iter()
            .map(|c| c.into_iter().map(Some).collect())
            .collect();
        let matrix = correlate(&table_from_columns(&columns), MissingPolicy::Propagate);
        let results = SignificanceTester::default().test_matrix(&matrix).unwrap();

        let k = matrix.size();
        prop_assert_eq!(results.len(), k * (k - 1) / 2);
        for pair in results.windows(2) {
            prop_assert!(pair[0].t_statistic.magnitude() >= pair[1].t_statistic.magnitude());
        }
        for result in &results {
            if let Some(p) = result.p_value {
                prop_assert!((0.0..=1.0).contains(&p));
                prop_assert_eq!(result.significant, Some(p < 0.05));
            }
        }
    }
}
