//! Analysis configuration loaded from `innostat.toml`
//!
//! Every section is optional; missing sections fall back to the reference
//! analysis of the Viet Nam 2023 enterprise survey.
//!
//! # Example innostat.toml
//!
//! ```toml
//! [cleaning]
//! country = "Viet Nam"
//! year = 2023
//! missing_marker = "."
//!
//! [significance]
//! alpha = 0.01
//!
//! [[indicator]]
//! code = "t5"
//! name = "Website adoption"
//!
//! [[indicator]]
//! code = "t7"
//! name = "Product innovation"
//! aggregation = "mean"
//!
//! [[relationship]]
//! first = "t5"
//! second = "t7"
//! label = "Website ↔ Product innovation"
//! ```

use crate::aggregate::{Aggregation, IndicatorDef, Segment};
use crate::correlation::MissingPolicy;
use crate::error::{AnalysisError, Result as AnalysisResult};
use crate::record::NumericColumn;
use crate::significance::Relationship;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Root configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default)]
    pub cleaning: CleaningConfig,

    #[serde(default)]
    pub correlation: CorrelationConfig,

    #[serde(default)]
    pub significance: SignificanceConfig,

    #[serde(default)]
    pub breakdown: BreakdownConfig,

    /// Indicators forming the columns of the segment table, in order
    #[serde(default = "default_indicators")]
    pub indicator: Vec<IndicatorDef>,

    /// Explicit segments (rows). Empty means discover them from the data.
    #[serde(default)]
    pub segment: Vec<Segment>,

    /// Key relationships reported separately by the significance stage
    #[serde(default = "default_relationships")]
    pub relationship: Vec<Relationship>,
}

/// Row filtering and numeric coercion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleaningConfig {
    /// Case-insensitive substring matched against the `country` column
    pub country: String,
    pub year: i32,
    pub missing_marker: String,
    /// Numeric columns a record must carry to survive cleaning
    pub required_numeric: Vec<NumericColumn>,
    /// Indicator codes removed before analysis (bookkeeping rows)
    pub excluded_indicators: Vec<String>,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            country: "Viet Nam".to_string(),
            year: 2023,
            missing_marker: ".".to_string(),
            required_numeric: vec![NumericColumn::Value],
            excluded_indicators: vec!["_sample".to_string(), "fieldworkdate".to_string()],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrelationConfig {
    pub missing: MissingPolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignificanceConfig {
    /// Two-tailed significance level
    pub alpha: f64,

    /// Round r to this many decimals before computing t (off when absent)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coefficient_decimals: Option<u32>,

    /// Number of strongest pairs listed in the summary report
    pub top_pairs: usize,
}

impl Default for SignificanceConfig {
    fn default() -> Self {
        Self {
            alpha: 0.05,
            coefficient_decimals: None,
            top_pairs: 10,
        }
    }
}

/// Indicator values broken down across the subcuts of one cut
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BreakdownConfig {
    pub cut: String,
    pub subcuts: Vec<String>,
    pub indicators: Vec<String>,
}

impl Default for BreakdownConfig {
    fn default() -> Self {
        Self {
            cut: "Size".to_string(),
            subcuts: vec![
                "Small (5-19)".to_string(),
                "Medium (20-99)".to_string(),
                "Large (100+)".to_string(),
            ],
            indicators: ["t5", "t7", "t9", "bready_t1"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            cleaning: CleaningConfig::default(),
            correlation: CorrelationConfig::default(),
            significance: SignificanceConfig::default(),
            breakdown: BreakdownConfig::default(),
            indicator: default_indicators(),
            segment: Vec::new(),
            relationship: default_relationships(),
        }
    }
}

fn default_indicators() -> Vec<IndicatorDef> {
    [
        ("t5", "Website adoption"),
        ("t7", "Product innovation"),
        ("t9", "Process innovation"),
        ("perf1", "Sales growth"),
        ("perf2", "Employment growth"),
        ("perf3", "Productivity growth"),
        ("bready_t1", "Quality certification"),
        ("fin14", "Bank loan access"),
        ("bready_fin28", "E-payment sales"),
        ("bready_fin31", "E-payment purchases"),
    ]
    .iter()
    .map(|(code, name)| IndicatorDef {
        code: code.to_string(),
        name: name.to_string(),
        aggregation: Aggregation::First,
    })
    .collect()
}

fn default_relationships() -> Vec<Relationship> {
    [
        ("bready_fin28", "perf3", "E-payment sales ↔ Productivity growth"),
        ("bready_fin31", "perf3", "E-payment purchases ↔ Productivity growth"),
        ("perf1", "perf3", "Sales growth ↔ Productivity growth"),
        ("bready_fin28", "bready_fin31", "E-payment sales ↔ E-payment purchases"),
        ("bready_fin28", "perf1", "E-payment sales ↔ Sales growth"),
        ("t7", "t9", "Product innovation ↔ Process innovation"),
        ("t9", "fin14", "Process innovation ↔ Bank loan access"),
        ("t5", "bready_t1", "Website ↔ Quality certification"),
        ("bready_fin31", "perf1", "E-payment purchases ↔ Sales growth"),
        ("t5", "perf3", "Website ↔ Productivity growth"),
        ("t5", "bready_fin28", "Website ↔ E-payment sales"),
        ("t5", "perf2", "Website ↔ Employment growth"),
        ("perf2", "perf3", "Employment growth ↔ Productivity growth"),
        ("bready_fin31", "perf2", "E-payment purchases ↔ Employment growth"),
        ("t7", "perf3", "Product innovation ↔ Productivity growth"),
        ("t7", "perf1", "Product innovation ↔ Sales growth"),
        ("t5", "t7", "Website ↔ Product innovation"),
    ]
    .iter()
    .map(|(first, second, label)| Relationship {
        first: first.to_string(),
        second: second.to_string(),
        label: label.to_string(),
    })
    .collect()
}

impl AnalysisConfig {
    /// Load and validate a configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        let config = Self::from_toml_str(&content)
            .with_context(|| format!("Failed to load {}", path.display()))?;
        Ok(config)
    }

    /// Parse and validate a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).context("Failed to parse TOML")?;
        config.validate()?;
        Ok(config)
    }

    /// Render as TOML (used by `innostat config`)
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }

    /// Indicator codes in column order
    pub fn indicator_codes(&self) -> Vec<&str> {
        self.indicator.iter().map(|i| i.code.as_str()).collect()
    }

    /// Human name for an indicator code, falling back to the code itself
    pub fn indicator_name<'a>(&'a self, code: &'a str) -> &'a str {
        self.indicator
            .iter()
            .find(|i| i.code == code)
            .map(|i| i.name.as_str())
            .unwrap_or(code)
    }

    /// Validate configuration
    pub fn validate(&self) -> AnalysisResult<()> {
        let invalid = |msg: String| Err(AnalysisError::InvalidConfig(msg));

        if self.cleaning.country.trim().is_empty() {
            return invalid("cleaning.country must not be empty".to_string());
        }
        if self.cleaning.missing_marker.is_empty() {
            return invalid("cleaning.missing_marker must not be empty".to_string());
        }
        if !self
            .cleaning
            .required_numeric
            .contains(&NumericColumn::Value)
        {
            return invalid("cleaning.required_numeric must include \"value\"".to_string());
        }

        if !(self.significance.alpha > 0.0 && self.significance.alpha < 1.0) {
            return invalid(format!(
                "significance.alpha must be in (0, 1), got {}",
                self.significance.alpha
            ));
        }
        if let Some(decimals) = self.significance.coefficient_decimals {
            if decimals > 15 {
                return invalid(format!(
                    "significance.coefficient_decimals must be <= 15, got {}",
                    decimals
                ));
            }
        }

        if self.indicator.is_empty() {
            return invalid("at least one [[indicator]] is required".to_string());
        }
        let mut codes = HashSet::new();
        for ind in &self.indicator {
            if ind.code.trim().is_empty() {
                return invalid("indicator code must not be empty".to_string());
            }
            if !codes.insert(ind.code.as_str()) {
                return invalid(format!("duplicate indicator '{}'", ind.code));
            }
            if let Aggregation::ProportionAbove(threshold) = ind.aggregation {
                if !threshold.is_finite() {
                    return invalid(format!(
                        "indicator '{}' has a non-finite proportion threshold",
                        ind.code
                    ));
                }
            }
        }

        let mut segments = HashSet::new();
        for seg in &self.segment {
            if seg.cut.trim().is_empty() {
                return invalid("segment cut must not be empty".to_string());
            }
            if !segments.insert((seg.cut.as_str(), seg.subcut.as_str())) {
                return invalid(format!("duplicate segment {}", seg));
            }
        }

        for rel in &self.relationship {
            for code in [&rel.first, &rel.second] {
                if !codes.contains(code.as_str()) {
                    return Err(AnalysisError::UnknownIndicator(code.clone()));
                }
            }
            if rel.first == rel.second {
                return invalid(format!(
                    "relationship '{}' pairs '{}' with itself",
                    rel.label, rel.first
                ));
            }
        }

        Ok(())
    }
}
