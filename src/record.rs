//! Survey records and the tagged cell values they are parsed from
//!
//! The survey export is in long format: one row per
//! (segment, indicator) observation. Raw cells mix strings, numbers and a
//! literal missing-value marker; [`CellValue`] resolves that once during
//! cleaning so nothing downstream ever sees a raw string number.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A raw cell resolved against the missing-value marker
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CellValue {
    /// A finite number
    Number(f64),
    /// Empty, or equal to the missing-value marker
    Missing,
    /// Present but not a finite number
    Unparseable,
}

impl CellValue {
    /// Resolve a raw string cell
    ///
    /// Surrounding whitespace is ignored. `NaN` and infinities are rejected as
    /// unparseable even though `f64::from_str` accepts them.
    ///
    /// # Example
    /// ```
    /// use innostat::record::CellValue;
    ///
    /// assert_eq!(CellValue::parse(" 42.5 ", "."), CellValue::Number(42.5));
    /// assert_eq!(CellValue::parse(".", "."), CellValue::Missing);
    /// assert_eq!(CellValue::parse("n/a", "."), CellValue::Unparseable);
    /// ```
    pub fn parse(raw: &str, missing_marker: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed == missing_marker {
            return CellValue::Missing;
        }
        match trimmed.parse::<f64>() {
            Ok(v) if v.is_finite() => CellValue::Number(v),
            _ => CellValue::Unparseable,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(v) => Some(*v),
            _ => None,
        }
    }
}

/// Numeric columns of the survey export that cleaning can require
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NumericColumn {
    #[serde(rename = "value")]
    Value,
    #[serde(rename = "se")]
    StandardError,
    #[serde(rename = "N")]
    SampleCount,
}

impl NumericColumn {
    /// Header name in the survey export
    pub fn header(&self) -> &'static str {
        match self {
            NumericColumn::Value => "value",
            NumericColumn::StandardError => "se",
            NumericColumn::SampleCount => "N",
        }
    }
}

impl fmt::Display for NumericColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.header())
    }
}

/// One cleaned enterprise observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub country: String,
    /// Country abbreviation
    pub cabr: Option<String>,
    pub year: i32,
    /// Category type, e.g. `Size`
    pub cut: String,
    /// Category value, e.g. `Small (5-19)`
    pub subcut: String,
    /// Indicator code with all spaces removed, e.g. `bready_t1`
    pub indicator: String,
    pub topic: Option<String>,
    pub english_name: Option<String>,
    pub value: f64,
    /// Standard error of `value`
    pub se: Option<f64>,
    /// Number of firms behind `value`
    pub n: Option<f64>,
    pub method: Option<String>,
}

impl Record {
    /// Segment key of this record
    pub fn segment_key(&self) -> (&str, &str) {
        (&self.cut, &self.subcut)
    }

    pub fn numeric(&self, column: NumericColumn) -> Option<f64> {
        match column {
            NumericColumn::Value => Some(self.value),
            NumericColumn::StandardError => self.se,
            NumericColumn::SampleCount => self.n,
        }
    }
}
