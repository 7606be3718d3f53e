// Statistical sanity checks for the significance tester
//
// Reference critical values come from published two-tailed t-tables; the
// p-value at each must land on the table's alpha to 4 decimals.

use innostat::aggregate::{Segment, SegmentRow, SegmentTable};
use innostat::config::AnalysisConfig;
use innostat::correlation::{correlate, Coefficient, MissingPolicy};
use innostat::csv_input::{indicator_metadata, read_raw_table};
use innostat::pipeline::analyze;
use innostat::significance::{
    critical_t, two_tailed_p_value, SignificanceLevel, SignificanceTester, TStatistic,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::PathBuf;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn two_column_table(xs: &[f64], ys: &[f64]) -> SegmentTable {
    SegmentTable {
        indicators: vec!["x".to_string(), "y".to_string()],
        rows: xs
            .iter()
            .zip(ys)
            .enumerate()
            .map(|(i, (x, y))| SegmentRow {
                segment: Segment::new("Segment", format!("{:02}", i)),
                cells: vec![Some(*x), Some(*y)],
            })
            .collect(),
    }
}

#[test]
fn test_p_values_match_t_table() {
    // (df, two-tailed critical t, alpha)
    let table = [
        (5, 4.032_143, 0.01),
        (10, 2.228_139, 0.05),
        (21, 2.079_614, 0.05),
        (21, 2.831_360, 0.01),
        (21, 3.819_277, 0.001),
        (30, 2.042_272, 0.05),
    ];
    for (df, t, alpha) in table {
        let p = two_tailed_p_value(t, df).unwrap();
        assert!(
            (p - alpha).abs() < 1e-4,
            "df={} t={} expected p={} got {}",
            df,
            t,
            alpha,
            p
        );
    }
}

#[test]
fn test_critical_t_matches_t_table() {
    assert!((critical_t(0.05, 21).unwrap() - 2.079_614).abs() < 1e-3);
    assert!((critical_t(0.01, 21).unwrap() - 2.831_360).abs() < 1e-3);
    assert!((critical_t(0.05, 10).unwrap() - 2.228_139).abs() < 1e-3);
}

#[test]
fn test_perfect_negative_over_23_segments() {
    let xs: Vec<f64> = (1..=23).map(f64::from).collect();
    let ys: Vec<f64> = (1..=23).rev().map(f64::from).collect();
    let matrix = correlate(&two_column_table(&xs, &ys), MissingPolicy::Propagate);

    let results = SignificanceTester::default().test_matrix(&matrix).unwrap();
    assert_eq!(results[0].coefficient, Coefficient::Value(-1.0));
    assert_eq!(results[0].degrees_of_freedom, Some(21));
    assert_eq!(
        results[0].t_statistic,
        TStatistic::Saturated { positive: false }
    );
    assert_eq!(results[0].significant, Some(true));
}

/// Independent columns: the false-positive rate should sit near alpha
#[test]
fn test_independent_columns_mostly_not_significant() {
    let mut rng = StdRng::seed_from_u64(20230);
    let tester = SignificanceTester::default();
    let trials = 200;

    let mut significant = 0;
    for _ in 0..trials {
        let xs: Vec<f64> = (0..23).map(|_| rng.gen::<f64>()).collect();
        let ys: Vec<f64> = (0..23).map(|_| rng.gen::<f64>()).collect();
        let matrix = correlate(&two_column_table(&xs, &ys), MissingPolicy::Propagate);
        let results = tester.test_matrix(&matrix).unwrap();
        if results[0].significant == Some(true) {
            significant += 1;
        }
    }

    // expected about 10 of 200 at alpha = 0.05
    assert!(
        significant <= trials / 10,
        "{} of {} independent pairs flagged significant",
        significant,
        trials
    );
}

#[test]
fn test_survey_sample_end_to_end() {
    let raw = read_raw_table(fixture("survey_sample.csv")).unwrap();
    let metadata = indicator_metadata(&read_raw_table(fixture("indicator_metadata.csv")).unwrap())
        .unwrap();
    let config = AnalysisConfig::default();

    let run = analyze(&raw, Some(&metadata), &config).unwrap();
    assert_eq!(run.table.num_segments(), 23);
    assert_eq!(run.table.num_indicators(), 10);
    assert!(run.matrix.is_symmetric());

    let significance = &run.significance;
    assert_eq!(significance.pairs.len(), 45);
    assert_eq!(significance.relationships.len(), 17);
    assert_eq!(significance.summary.degrees_of_freedom, Some(21));

    let strongest = &significance.pairs[0];
    assert_eq!(
        (strongest.first.as_str(), strongest.second.as_str()),
        ("bready_fin28", "bready_fin31")
    );
    assert_eq!(strongest.level, SignificanceLevel::HighlySignificant);

    // Process innovation and bank loans are unrelated in the sample
    let loans = significance
        .relationships
        .iter()
        .find(|r| r.first == "t9" && r.second == "fin14")
        .unwrap();
    assert_eq!(loans.level, SignificanceLevel::NotSignificant);
    assert!(loans
        .interpretation()
        .ends_with("correlation, not significant"));

    let total: usize = significance.summary.level_counts.iter().map(|(_, c)| c).sum();
    assert_eq!(total, 45);
}
