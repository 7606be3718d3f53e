//! Data cleaning: raw survey export → typed records
//!
//! Rows outside the target population, bookkeeping indicators, and rows
//! whose required numeric columns are missing or unparseable are dropped
//! silently. Each drop is counted in [`CleanStats`] so the caller can report
//! it; none of them is an error.

use crate::config::CleaningConfig;
use crate::csv_input::{IndicatorMetadata, RawTable};
use crate::error::AnalysisError;
use crate::record::{CellValue, NumericColumn, Record};
use std::collections::HashMap;
use tracing::{debug, info};

const TABLE: &str = "survey export";

/// Why rows were dropped, and how many survived
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanStats {
    pub input_rows: usize,
    /// Wrong country or year
    pub outside_population: usize,
    pub excluded_indicator: usize,
    /// A required numeric column was empty or the missing marker
    pub missing_numeric: usize,
    /// A required numeric column held something other than a number
    pub unparseable_numeric: usize,
    pub kept: usize,
}

impl CleanStats {
    pub fn dropped(&self) -> usize {
        self.input_rows - self.kept
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CleanOutcome {
    pub records: Vec<Record>,
    pub stats: CleanStats,
}

/// Column positions resolved once per table
struct Columns {
    country: usize,
    cabr: Option<usize>,
    year: usize,
    cut: usize,
    subcut: usize,
    indicator: usize,
    topic: Option<usize>,
    english_name: Option<usize>,
    value: usize,
    se: Option<usize>,
    n: Option<usize>,
    method: Option<usize>,
}

impl Columns {
    fn resolve(raw: &RawTable) -> Result<Self, AnalysisError> {
        Ok(Self {
            country: raw.require_column("country", TABLE)?,
            cabr: raw.column("cabr"),
            year: raw.require_column("year", TABLE)?,
            cut: raw.require_column("cut", TABLE)?,
            subcut: raw.require_column("subcut", TABLE)?,
            indicator: raw.require_column("indicator", TABLE)?,
            topic: raw.column("Topic"),
            english_name: raw.column("EnglishName"),
            value: raw.require_column("value", TABLE)?,
            se: raw.column("se"),
            n: raw.column("N"),
            method: raw.column("method"),
        })
    }

    fn numeric(&self, column: NumericColumn) -> Option<usize> {
        match column {
            NumericColumn::Value => Some(self.value),
            NumericColumn::StandardError => self.se,
            NumericColumn::SampleCount => self.n,
        }
    }
}

/// Parse an integral year; Stata exports sometimes write `2023.0`
fn parse_year(raw: &str, missing_marker: &str) -> Option<i32> {
    match CellValue::parse(raw, missing_marker) {
        CellValue::Number(v) if v.fract() == 0.0 && v.abs() < i32::MAX as f64 => Some(v as i32),
        _ => None,
    }
}

/// Clean a raw survey export
///
/// `metadata`, when given, replaces the `Topic` and `EnglishName` columns by
/// a left join on the indicator code.
#[tracing::instrument(level = "info", skip_all, fields(rows = raw.rows.len()))]
pub fn clean(
    raw: &RawTable,
    config: &CleaningConfig,
    metadata: Option<&HashMap<String, IndicatorMetadata>>,
) -> Result<CleanOutcome, AnalysisError> {
    let cols = Columns::resolve(raw)?;
    let marker = config.missing_marker.as_str();
    let country = config.country.to_lowercase();

    let text = |row: &[String], idx: Option<usize>| -> Option<String> {
        let cell = row[idx?].trim();
        if cell.is_empty() || cell == marker {
            None
        } else {
            Some(cell.to_string())
        }
    };

    let mut stats = CleanStats {
        input_rows: raw.rows.len(),
        ..CleanStats::default()
    };
    let mut records = Vec::new();

    'rows: for row in &raw.rows {
        let year = parse_year(&row[cols.year], marker);
        if !row[cols.country].to_lowercase().contains(&country) || year != Some(config.year) {
            stats.outside_population += 1;
            continue;
        }

        let indicator = row[cols.indicator].replace(' ', "");
        if config.excluded_indicators.iter().any(|e| *e == indicator) {
            stats.excluded_indicator += 1;
            continue;
        }

        let mut numbers: HashMap<NumericColumn, Option<f64>> = HashMap::new();
        for column in [
            NumericColumn::Value,
            NumericColumn::StandardError,
            NumericColumn::SampleCount,
        ] {
            let cell = match cols.numeric(column) {
                Some(idx) => CellValue::parse(&row[idx], marker),
                None => CellValue::Missing,
            };
            if config.required_numeric.contains(&column) {
                match cell {
                    CellValue::Number(_) => {}
                    CellValue::Missing => {
                        stats.missing_numeric += 1;
                        continue 'rows;
                    }
                    CellValue::Unparseable => {
                        stats.unparseable_numeric += 1;
                        continue 'rows;
                    }
                }
            }
            numbers.insert(column, cell.as_number());
        }
        let Some(value) = numbers[&NumericColumn::Value] else {
            // value is always required; validated configs never get here
            stats.missing_numeric += 1;
            continue;
        };

        let (topic, english_name) = match metadata {
            Some(lookup) => match lookup.get(&indicator) {
                Some(meta) => (meta.topic.clone(), meta.english_name.clone()),
                None => (None, None),
            },
            None => (text(row, cols.topic), text(row, cols.english_name)),
        };

        records.push(Record {
            country: row[cols.country].trim().to_string(),
            cabr: text(row, cols.cabr),
            year: config.year,
            cut: row[cols.cut].trim().to_string(),
            subcut: row[cols.subcut].trim().to_string(),
            indicator,
            topic,
            english_name,
            value,
            se: numbers[&NumericColumn::StandardError],
            n: numbers[&NumericColumn::SampleCount],
            method: text(row, cols.method),
        });
    }

    stats.kept = records.len();
    debug!(?stats, "cleaning finished");
    info!(
        kept = stats.kept,
        dropped = stats.dropped(),
        "cleaned {} of {} rows",
        stats.kept,
        stats.input_rows
    );
    Ok(CleanOutcome { records, stats })
}
