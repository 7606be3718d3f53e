//! Group aggregation: records → segment × indicator table
//!
//! A segment is one `(cut, subcut)` pair such as `("Size", "Small (5-19)")`.
//! Each indicator column is computed over the records of a segment that
//! carry the indicator's code. A cell with no eligible records is
//! *undefined* (`None`), never zero.

use crate::config::AnalysisConfig;
use crate::record::{NumericColumn, Record};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use tracing::{debug, info, warn};

/// A subgroup of enterprises sharing one categorical trait
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Segment {
    pub cut: String,
    pub subcut: String,
}

impl Segment {
    pub fn new(cut: impl Into<String>, subcut: impl Into<String>) -> Self {
        Self {
            cut: cut.into(),
            subcut: subcut.into(),
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {}", self.cut, self.subcut)
    }
}

/// How an indicator is summarized over a segment's records
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    /// Value of the first record (the survey already publishes group statistics)
    #[default]
    First,
    /// Arithmetic mean of the values
    Mean,
    /// Number of records, always >= 0
    Count,
    /// Share of records whose value exceeds the threshold, in [0, 1]
    ProportionAbove(f64),
}

impl Aggregation {
    /// Apply to the values of one segment; `None` when there are none.
    /// An empty segment is undefined for every aggregation, `Count` included.
    pub fn apply(&self, values: &[f64]) -> Option<f64> {
        let first = *values.first()?;
        let n = values.len() as f64;
        let result = match self {
            Aggregation::First => first,
            Aggregation::Mean => values.iter().sum::<f64>() / n,
            Aggregation::Count => n,
            Aggregation::ProportionAbove(threshold) => {
                values.iter().filter(|v| **v > *threshold).count() as f64 / n
            }
        };
        Some(result)
    }
}

/// One column of the segment table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorDef {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub aggregation: Aggregation,
}

/// One row of the segment table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentRow {
    pub segment: Segment,
    /// One cell per indicator, `None` = undefined / insufficient data
    pub cells: Vec<Option<f64>>,
}

impl SegmentRow {
    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(Option::is_none)
    }
}

/// Segment × indicator table with stable row and column order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentTable {
    /// Indicator codes, in column order
    pub indicators: Vec<String>,
    pub rows: Vec<SegmentRow>,
}

impl SegmentTable {
    pub fn num_segments(&self) -> usize {
        self.rows.len()
    }

    pub fn num_indicators(&self) -> usize {
        self.indicators.len()
    }

    pub fn indicator_index(&self, code: &str) -> Option<usize> {
        self.indicators.iter().position(|c| c == code)
    }

    /// Cells of one indicator across all segments, in row order
    pub fn column(&self, index: usize) -> Vec<Option<f64>> {
        self.rows
            .iter()
            .map(|row| row.cells.get(index).copied().flatten())
            .collect()
    }

    pub fn get(&self, segment: &Segment, code: &str) -> Option<f64> {
        let col = self.indicator_index(code)?;
        self.rows
            .iter()
            .find(|row| &row.segment == segment)
            .and_then(|row| row.cells[col])
    }
}

/// Index of record values keyed by (cut, subcut, indicator), in input order
struct RecordIndex<'a> {
    values: HashMap<(&'a str, &'a str, &'a str), Vec<&'a Record>>,
}

impl<'a> RecordIndex<'a> {
    fn build(records: &'a [Record]) -> Self {
        let mut values: HashMap<(&str, &str, &str), Vec<&Record>> = HashMap::new();
        for record in records {
            let (cut, subcut) = record.segment_key();
            values
                .entry((cut, subcut, record.indicator.as_str()))
                .or_default()
                .push(record);
        }
        Self { values }
    }

    fn records<'b>(&'b self, segment: &'b Segment, indicator: &'b str) -> &'b [&'b Record] {
        self.values
            .get(&(segment.cut.as_str(), segment.subcut.as_str(), indicator))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// All distinct segments in the records, sorted, excluding empty subcuts
pub fn discover_segments(records: &[Record]) -> Vec<Segment> {
    records
        .iter()
        .filter(|r| !r.subcut.trim().is_empty())
        .map(|r| Segment::new(r.cut.clone(), r.subcut.clone()))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Build the segment × indicator table
///
/// Configured segments are kept in configuration order, and a configured
/// segment with no records yields a row of undefined cells. Without
/// configured segments, every segment present in the data is used (sorted by
/// cut, then subcut) and rows where every indicator is undefined are dropped.
#[tracing::instrument(level = "info", skip_all, fields(records = records.len()))]
pub fn aggregate(records: &[Record], config: &AnalysisConfig) -> SegmentTable {
    let index = RecordIndex::build(records);
    let explicit = !config.segment.is_empty();
    let segments = if explicit {
        config.segment.clone()
    } else {
        discover_segments(records)
    };
    debug!(
        segments = segments.len(),
        explicit, "aggregating indicators per segment"
    );

    let mut rows = Vec::with_capacity(segments.len());
    for segment in segments {
        let cells: Vec<Option<f64>> = config
            .indicator
            .iter()
            .map(|ind| {
                let values: Vec<f64> = index
                    .records(&segment, &ind.code)
                    .iter()
                    .map(|r| r.value)
                    .collect();
                ind.aggregation.apply(&values)
            })
            .collect();

        let row = SegmentRow { segment, cells };
        if row.is_empty() {
            if explicit {
                warn!(segment = %row.segment, "segment has no data; every indicator is undefined");
            } else {
                debug!(segment = %row.segment, "dropping segment without indicator data");
                continue;
            }
        }
        rows.push(row);
    }

    let table = SegmentTable {
        indicators: config.indicator.iter().map(|i| i.code.clone()).collect(),
        rows,
    };
    info!(
        segments = table.num_segments(),
        indicators = table.num_indicators(),
        "segment table built"
    );
    table
}

/// One (subcut, indicator) cell of the breakdown table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakdownCell {
    pub value: Option<f64>,
    pub se: Option<f64>,
    pub n: Option<f64>,
}

/// Indicator values, standard errors and sample counts across the subcuts of one cut
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakdownTable {
    pub cut: String,
    pub subcuts: Vec<String>,
    /// (indicator code, one cell per subcut)
    pub rows: Vec<(String, Vec<BreakdownCell>)>,
}

/// Build the firm-size breakdown of the innovation indicators
#[tracing::instrument(level = "info", skip_all, fields(cut = %config.breakdown.cut))]
pub fn breakdown(records: &[Record], config: &AnalysisConfig) -> BreakdownTable {
    let plan = &config.breakdown;
    let index = RecordIndex::build(records);

    let rows = plan
        .indicators
        .iter()
        .map(|code| {
            let cells = plan
                .subcuts
                .iter()
                .map(|subcut| {
                    let segment = Segment::new(plan.cut.clone(), subcut.clone());
                    match index.records(&segment, code).first() {
                        Some(r) => BreakdownCell {
                            value: r.numeric(NumericColumn::Value),
                            se: r.numeric(NumericColumn::StandardError),
                            n: r.numeric(NumericColumn::SampleCount),
                        },
                        None => BreakdownCell {
                            value: None,
                            se: None,
                            n: None,
                        },
                    }
                })
                .collect();
            (code.clone(), cells)
        })
        .collect();

    BreakdownTable {
        cut: plan.cut.clone(),
        subcuts: plan.subcuts.clone(),
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(cut: &str, subcut: &str, indicator: &str, value: f64) -> Record {
        Record {
            country: "Viet Nam2023".to_string(),
            cabr: None,
            year: 2023,
            cut: cut.to_string(),
            subcut: subcut.to_string(),
            indicator: indicator.to_string(),
            topic: None,
            english_name: None,
            value,
            se: Some(1.0),
            n: Some(100.0),
            method: None,
        }
    }

    fn two_indicator_config() -> AnalysisConfig {
        let mut config = AnalysisConfig::default();
        config.indicator = vec![
            IndicatorDef {
                code: "t5".to_string(),
                name: "Website adoption".to_string(),
                aggregation: Aggregation::First,
            },
            IndicatorDef {
                code: "t7".to_string(),
                name: "Product innovation".to_string(),
                aggregation: Aggregation::First,
            },
        ];
        config.relationship.clear();
        config
    }

    #[test]
    fn test_aggregation_first_mean_count() {
        let values = [10.0, 20.0, 60.0];
        assert_eq!(Aggregation::First.apply(&values), Some(10.0));
        assert_eq!(Aggregation::Mean.apply(&values), Some(30.0));
        assert_eq!(Aggregation::Count.apply(&values), Some(3.0));
    }

    #[test]
    fn test_aggregation_proportion_in_unit_interval() {
        let values = [10.0, 20.0, 60.0, 80.0];
        assert_eq!(Aggregation::ProportionAbove(50.0).apply(&values), Some(0.5));
        assert_eq!(Aggregation::ProportionAbove(100.0).apply(&values), Some(0.0));
        assert_eq!(Aggregation::ProportionAbove(0.0).apply(&values), Some(1.0));
    }

    #[test]
    fn test_aggregation_empty_is_undefined() {
        assert_eq!(Aggregation::First.apply(&[]), None);
        assert_eq!(Aggregation::Mean.apply(&[]), None);
        assert_eq!(Aggregation::Count.apply(&[]), None);
    }

    #[test]
    fn test_discover_segments_sorted_and_skips_empty_subcut() {
        let records = vec![
            record("Size", "Small (5-19)", "t5", 1.0),
            record("All", "All", "t5", 2.0),
            record("Size", "Large (100+)", "t5", 3.0),
            record("Size", "", "t5", 4.0),
            record("Size", "Small (5-19)", "t7", 5.0),
        ];
        let segments = discover_segments(&records);
        assert_eq!(
            segments,
            vec![
                Segment::new("All", "All"),
                Segment::new("Size", "Large (100+)"),
                Segment::new("Size", "Small (5-19)"),
            ]
        );
    }

    #[test]
    fn test_aggregate_pivots_first_value() {
        let records = vec![
            record("Size", "Small (5-19)", "t5", 40.0),
            record("Size", "Small (5-19)", "t5", 99.0), // duplicate, first wins
            record("Size", "Small (5-19)", "t7", 12.0),
            record("Size", "Large (100+)", "t5", 80.0),
        ];
        let table = aggregate(&records, &two_indicator_config());

        assert_eq!(table.indicators, vec!["t5", "t7"]);
        assert_eq!(table.num_segments(), 2);
        let small = Segment::new("Size", "Small (5-19)");
        let large = Segment::new("Size", "Large (100+)");
        assert_eq!(table.get(&small, "t5"), Some(40.0));
        assert_eq!(table.get(&small, "t7"), Some(12.0));
        assert_eq!(table.get(&large, "t5"), Some(80.0));
        assert_eq!(table.get(&large, "t7"), None);
    }

    #[test]
    fn test_aggregate_drops_discovered_segment_without_indicator_data() {
        let records = vec![
            record("Size", "Small (5-19)", "t5", 40.0),
            record("Region", "North", "other", 1.0),
        ];
        let table = aggregate(&records, &two_indicator_config());
        assert_eq!(table.num_segments(), 1);
        assert_eq!(table.rows[0].segment, Segment::new("Size", "Small (5-19)"));
    }

    #[test]
    fn test_aggregate_explicit_empty_segment_is_undefined_row() {
        let records = vec![record("Size", "Small (5-19)", "t5", 40.0)];
        let mut config = two_indicator_config();
        config.segment = vec![
            Segment::new("Size", "Small (5-19)"),
            Segment::new("Exporter Type", "Non-exporter"),
        ];

        let table = aggregate(&records, &config);
        assert_eq!(table.num_segments(), 2);
        assert_eq!(table.rows[0].segment, config.segment[0]);
        assert!(table.rows[1].is_empty());
        assert_eq!(table.rows[1].cells, vec![None, None]);
    }

    #[test]
    fn test_aggregate_order_is_deterministic() {
        let mut records = vec![
            record("B", "x", "t5", 1.0),
            record("A", "y", "t5", 2.0),
            record("A", "x", "t5", 3.0),
        ];
        let config = two_indicator_config();
        let first = aggregate(&records, &config);
        records.reverse();
        let second = aggregate(&records, &config);
        let order = |t: &SegmentTable| t.rows.iter().map(|r| r.segment.clone()).collect::<Vec<_>>();
        assert_eq!(order(&first), order(&second));
    }

    #[test]
    fn test_column_extraction() {
        let records = vec![
            record("A", "x", "t5", 1.0),
            record("A", "y", "t5", 2.0),
            record("A", "y", "t7", 5.0),
        ];
        let table = aggregate(&records, &two_indicator_config());
        assert_eq!(table.column(0), vec![Some(1.0), Some(2.0)]);
        assert_eq!(table.column(1), vec![None, Some(5.0)]);
    }

    #[test]
    fn test_breakdown_reports_value_se_and_n() {
        let records = vec![
            record("Size", "Small (5-19)", "t5", 40.0),
            record("Size", "Medium (20-99)", "t5", 55.0),
            record("Size", "Large (100+)", "t7", 30.0),
        ];
        let table = breakdown(&records, &AnalysisConfig::default());

        assert_eq!(table.cut, "Size");
        assert_eq!(table.subcuts.len(), 3);
        assert_eq!(table.rows.len(), 4);

        let (code, cells) = &table.rows[0];
        assert_eq!(code, "t5");
        assert_eq!(cells[0].value, Some(40.0));
        assert_eq!(cells[0].se, Some(1.0));
        assert_eq!(cells[0].n, Some(100.0));
        assert_eq!(cells[1].value, Some(55.0));
        assert_eq!(cells[2].value, None);

        let (code, cells) = &table.rows[1];
        assert_eq!(code, "t7");
        assert_eq!(cells[2].value, Some(30.0));
    }

    #[test]
    fn test_record_index_lookup_with_temporary_keys() {
        let records = vec![
            record("Size", "Small (5-19)", "t5", 40.0),
            record("Size", "Small (5-19)", "t5", 42.0),
            record("Size", "Large (100+)", "t5", 60.0),
        ];
        let index = RecordIndex::build(&records);

        // keys owned by this scope, not borrowed from the records
        let segment = Segment::new("Size", "Small (5-19)");
        let code = String::from("t5");
        let small = index.records(&segment, &code);
        assert_eq!(small.len(), 2);
        assert_eq!(small[0].value, 40.0);

        let medium = Segment::new("Size", "Medium (20-99)");
        assert!(index.records(&medium, &code).is_empty());
    }
}
