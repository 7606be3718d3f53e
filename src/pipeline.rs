//! Stage orchestration
//!
//! Each stage is a pure function of the previous stage's output and the
//! configuration. [`analyze`] chains all four; [`write_outputs`] renders the
//! results into a directory.

use crate::aggregate::{aggregate, breakdown, BreakdownTable, SegmentTable};
use crate::cleaner::{clean, CleanOutcome};
use crate::config::AnalysisConfig;
use crate::correlation::{correlate, CorrelationMatrix};
use crate::csv_input::{IndicatorMetadata, RawTable};
use crate::csv_output;
use crate::error::AnalysisError;
use crate::json_output::JsonSignificanceReport;
use crate::overview::{overview, DatasetOverview};
use crate::significance::{SignificanceResult, SignificanceSummary, SignificanceTester};
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Output of the significance stage
#[derive(Debug, Clone)]
pub struct SignificanceOutcome {
    /// All unordered pairs, strongest first
    pub pairs: Vec<SignificanceResult>,
    /// Configured key relationships, strongest first
    pub relationships: Vec<SignificanceResult>,
    pub summary: SignificanceSummary,
}

/// Run the significance stage over a correlation matrix of `segments` rows
pub fn test_significance(
    matrix: &CorrelationMatrix,
    segments: usize,
    config: &AnalysisConfig,
) -> Result<SignificanceOutcome, AnalysisError> {
    let tester = SignificanceTester::from_config(&config.significance)
        .with_names(&config.indicator);
    let pairs = tester.test_matrix(matrix)?;

    // Relationships naming indicators absent from this matrix are skipped;
    // a segment table read from disk may carry a subset of the columns
    let known: Vec<_> = config
        .relationship
        .iter()
        .filter(|r| matrix.index_of(&r.first).is_some() && matrix.index_of(&r.second).is_some())
        .cloned()
        .collect();
    let relationships = tester.test_relationships(matrix, &known)?;

    let summary = SignificanceSummary::new(
        tester.alpha,
        segments,
        &pairs,
        &relationships,
        config.significance.top_pairs,
    )?;
    Ok(SignificanceOutcome {
        pairs,
        relationships,
        summary,
    })
}

/// Every intermediate and final result of one analysis
#[derive(Debug, Clone)]
pub struct AnalysisRun {
    pub cleaned: CleanOutcome,
    pub overview: DatasetOverview,
    pub table: SegmentTable,
    pub breakdown: BreakdownTable,
    pub matrix: CorrelationMatrix,
    pub significance: SignificanceOutcome,
}

/// Clean, aggregate, correlate and test
#[tracing::instrument(level = "info", skip_all)]
pub fn analyze(
    raw: &RawTable,
    metadata: Option<&HashMap<String, IndicatorMetadata>>,
    config: &AnalysisConfig,
) -> Result<AnalysisRun, AnalysisError> {
    config.validate()?;

    let cleaned = clean(raw, &config.cleaning, metadata)?;
    let overview = overview(&cleaned.records, config);
    let table = aggregate(&cleaned.records, config);
    let breakdown = breakdown(&cleaned.records, config);
    let matrix = correlate(&table, config.correlation.missing);
    let significance = test_significance(&matrix, table.num_segments(), config)?;

    info!(
        records = cleaned.records.len(),
        segments = table.num_segments(),
        pairs = significance.pairs.len(),
        "analysis finished"
    );
    Ok(AnalysisRun {
        cleaned,
        overview,
        table,
        breakdown,
        matrix,
        significance,
    })
}

pub const CLEANED_FILE: &str = "cleaned.csv";
pub const SEGMENTS_FILE: &str = "segments.csv";
pub const BREAKDOWN_FILE: &str = "breakdown.csv";
pub const MATRIX_FILE: &str = "correlation_matrix.csv";
pub const SIGNIFICANCE_FILE: &str = "significance.csv";
pub const RELATIONSHIPS_FILE: &str = "key_relationships.csv";
pub const REPORT_FILE: &str = "significance.json";
pub const SUMMARY_FILE: &str = "summary.txt";
pub const OVERVIEW_FILE: &str = "overview.txt";

fn write_file(dir: &Path, name: &str, contents: &str) -> Result<PathBuf> {
    let path = dir.join(name);
    fs::write(&path, contents).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

/// Write every table of a run into `dir`, creating it if needed
pub fn write_outputs(
    run: &AnalysisRun,
    dir: &Path,
    config: &AnalysisConfig,
) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;

    let significance = &run.significance;
    let report =
        JsonSignificanceReport::new(config, &run.matrix, &significance.pairs, &significance.summary)
            .to_json()
            .context("Failed to serialize significance report")?;

    let written = vec![
        write_file(dir, CLEANED_FILE, &csv_output::records_to_csv(&run.cleaned.records))?,
        write_file(dir, SEGMENTS_FILE, &csv_output::segment_table_to_csv(&run.table))?,
        write_file(dir, BREAKDOWN_FILE, &csv_output::breakdown_to_csv(&run.breakdown))?,
        write_file(dir, MATRIX_FILE, &csv_output::matrix_to_csv(&run.matrix))?,
        write_file(
            dir,
            SIGNIFICANCE_FILE,
            &csv_output::significance_to_csv(&significance.pairs),
        )?,
        write_file(
            dir,
            RELATIONSHIPS_FILE,
            &csv_output::significance_to_csv(&significance.relationships),
        )?,
        write_file(dir, REPORT_FILE, &report)?,
        write_file(dir, SUMMARY_FILE, &significance.summary.to_report_string())?,
        write_file(dir, OVERVIEW_FILE, &run.overview.to_report_string())?,
    ];

    info!(dir = %dir.display(), files = written.len(), "outputs written");
    Ok(written)
}
