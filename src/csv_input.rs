//! Delimited-text readers for the survey export and intermediate tables
//!
//! Survey exports are not reliably UTF-8: fields that fail UTF-8 decoding are
//! decoded as Latin-1 instead of aborting the read.

use crate::aggregate::{Segment, SegmentRow, SegmentTable};
use crate::error::AnalysisError;
use crate::record::CellValue;
use anyhow::{Context, Result};
use csv::ReaderBuilder;
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// A header row plus string rows, before any typing
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    /// Position of a header, ignoring surrounding whitespace
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h.trim() == name)
    }

    /// Position of a header that must exist
    pub fn require_column(&self, name: &str, table: &str) -> Result<usize, AnalysisError> {
        self.column(name).ok_or_else(|| AnalysisError::MissingColumn {
            column: name.to_string(),
            table: table.to_string(),
        })
    }
}

fn decode_field(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        // Latin-1 maps every byte to the code point of the same value
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

/// Parse a comma-delimited table with a header row
pub fn parse_raw_table<R: Read>(reader: R) -> Result<RawTable> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = rdr
        .byte_headers()
        .context("Failed to read CSV header")?
        .iter()
        .map(decode_field)
        .collect();

    let mut rows = Vec::new();
    for (idx, result) in rdr.byte_records().enumerate() {
        let record = result.with_context(|| format!("CSV parse error at record {}", idx + 1))?;
        let mut row: Vec<String> = record.iter().map(decode_field).collect();
        // Short rows are padded so column lookups never go out of bounds
        if row.len() < headers.len() {
            row.resize(headers.len(), String::new());
        }
        rows.push(row);
    }

    debug!(columns = headers.len(), rows = rows.len(), "parsed raw table");
    Ok(RawTable { headers, rows })
}

/// Read a comma-delimited file with a header row
pub fn read_raw_table<P: AsRef<Path>>(path: P) -> Result<RawTable> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    parse_raw_table(file).with_context(|| format!("Failed to read {}", path.display()))
}

/// Topic and English name of an indicator code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndicatorMetadata {
    pub topic: Option<String>,
    pub english_name: Option<String>,
}

/// Build the indicator metadata lookup from a `FieldName, Topic, EnglishName` table
///
/// Field names are keyed with all spaces removed, matching how indicator
/// codes are normalized during cleaning. The first entry for a code wins.
pub fn indicator_metadata(
    table: &RawTable,
) -> Result<HashMap<String, IndicatorMetadata>, AnalysisError> {
    const TABLE: &str = "indicator metadata";
    let field = table.require_column("FieldName", TABLE)?;
    let topic = table.column("Topic");
    let english = table.column("EnglishName");

    let non_empty = |row: &Vec<String>, idx: Option<usize>| {
        idx.map(|i| row[i].trim().to_string())
            .filter(|s| !s.is_empty())
    };

    let mut lookup = HashMap::new();
    for row in &table.rows {
        let code = row[field].replace(' ', "");
        if code.is_empty() {
            continue;
        }
        lookup.entry(code).or_insert_with(|| IndicatorMetadata {
            topic: non_empty(row, topic),
            english_name: non_empty(row, english),
        });
    }
    Ok(lookup)
}

/// Parse a segment table written by [`crate::csv_output::segment_table_to_csv`]
///
/// The header is `cut,subcut,<indicator codes...>`. Cells that are empty,
/// equal to `undefined`, or equal to the missing marker are undefined.
pub fn parse_segment_table<R: Read>(reader: R, missing_marker: &str) -> Result<SegmentTable> {
    let raw = parse_raw_table(reader)?;
    const TABLE: &str = "segment table";
    let cut = raw.require_column("cut", TABLE)?;
    let subcut = raw.require_column("subcut", TABLE)?;
    if cut != 0 || subcut != 1 {
        return Err(AnalysisError::MalformedSegmentTable {
            line: 1,
            reason: "first two columns must be cut,subcut".to_string(),
        }
        .into());
    }

    let indicators: Vec<String> = raw.headers[2..].iter().map(|h| h.trim().to_string()).collect();
    if indicators.is_empty() {
        return Err(AnalysisError::MalformedSegmentTable {
            line: 1,
            reason: "no indicator columns".to_string(),
        }
        .into());
    }

    let mut rows = Vec::with_capacity(raw.rows.len());
    for (idx, row) in raw.rows.iter().enumerate() {
        let line = idx + 2;
        let mut cells = Vec::with_capacity(indicators.len());
        for (offset, cell) in row[2..raw.headers.len()].iter().enumerate() {
            let value = if cell.trim() == "undefined" {
                None
            } else {
                match CellValue::parse(cell, missing_marker) {
                    CellValue::Number(v) => Some(v),
                    CellValue::Missing => None,
                    CellValue::Unparseable => {
                        return Err(AnalysisError::MalformedSegmentTable {
                            line,
                            reason: format!(
                                "cell '{}' in column '{}' is not a number",
                                cell, indicators[offset]
                            ),
                        }
                        .into());
                    }
                }
            };
            cells.push(value);
        }
        rows.push(SegmentRow {
            segment: Segment::new(row[0].clone(), row[1].clone()),
            cells,
        });
    }

    Ok(SegmentTable { indicators, rows })
}

/// Read a segment table file
pub fn read_segment_table<P: AsRef<Path>>(path: P, missing_marker: &str) -> Result<SegmentTable> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    parse_segment_table(file, missing_marker)
        .with_context(|| format!("Failed to read segment table {}", path.display()))
}
