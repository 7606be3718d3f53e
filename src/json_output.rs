//! JSON output for the significance stage

use crate::config::AnalysisConfig;
use crate::correlation::{Coefficient, CorrelationMatrix};
use crate::significance::{SignificanceResult, SignificanceSummary, TStatistic};
use serde::{Deserialize, Serialize};

/// An indicator column of the analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonIndicator {
    pub code: String,
    pub name: String,
}

/// One tested pair
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonPair {
    pub first: String,
    pub second: String,
    pub first_name: String,
    pub second_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Pearson r, `null` when undefined
    pub r: Option<f64>,
    /// Why r is undefined (e.g. "zero variance")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub undefined_reason: Option<String>,
    pub observations: usize,
    pub df: Option<usize>,
    /// t-statistic, `null` when undefined or saturated
    pub t: Option<f64>,
    /// |r| = 1: t is unbounded and p is 0
    pub t_saturated: bool,
    pub p: Option<f64>,
    pub significant: Option<bool>,
    /// "***", "**", "*", "ns" or "undefined"
    pub level: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strength: Option<String>,
    pub interpretation: String,
}

impl From<&SignificanceResult> for JsonPair {
    fn from(result: &SignificanceResult) -> Self {
        let (r, undefined_reason) = match result.coefficient {
            Coefficient::Value(r) => (Some(r), None),
            Coefficient::Undefined(reason) => (None, Some(reason.to_string())),
        };
        Self {
            first: result.first.clone(),
            second: result.second.clone(),
            first_name: result.first_name.clone(),
            second_name: result.second_name.clone(),
            label: result.label.clone(),
            r,
            undefined_reason,
            observations: result.observations,
            df: result.degrees_of_freedom,
            t: result.t_statistic.value(),
            t_saturated: matches!(result.t_statistic, TStatistic::Saturated { .. }),
            p: result.p_value,
            significant: result.significant,
            level: result.level.symbol().to_string(),
            strength: result.strength.map(|s| s.label().to_string()),
            interpretation: result.interpretation(),
        }
    }
}

/// Count of pairs per significance level
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonLevelCount {
    pub level: String,
    pub description: String,
    pub count: usize,
}

/// Complete significance report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonSignificanceReport {
    pub version: String,
    pub alpha: f64,
    pub segments: usize,
    pub df: Option<usize>,
    pub critical_t: Option<f64>,
    pub indicators: Vec<JsonIndicator>,
    /// Row-major coefficients, `null` where undefined
    pub matrix: Vec<Vec<Option<f64>>>,
    pub level_counts: Vec<JsonLevelCount>,
    pub pairs: Vec<JsonPair>,
    pub relationships: Vec<JsonPair>,
}

impl JsonSignificanceReport {
    pub fn new(
        config: &AnalysisConfig,
        matrix: &CorrelationMatrix,
        pairs: &[SignificanceResult],
        summary: &SignificanceSummary,
    ) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            alpha: summary.alpha,
            segments: summary.segments,
            df: summary.degrees_of_freedom,
            critical_t: summary.critical_t,
            indicators: matrix
                .labels
                .iter()
                .map(|code| JsonIndicator {
                    code: code.clone(),
                    name: config.indicator_name(code).to_string(),
                })
                .collect(),
            matrix: (0..matrix.size())
                .map(|i| {
                    (0..matrix.size())
                        .map(|j| matrix.get(i, j).coefficient.value())
                        .collect()
                })
                .collect(),
            level_counts: summary
                .level_counts
                .iter()
                .map(|(level, count)| JsonLevelCount {
                    level: level.symbol().to_string(),
                    description: level.description().to_string(),
                    count: *count,
                })
                .collect(),
            pairs: pairs.iter().map(JsonPair::from).collect(),
            relationships: summary.relationships.iter().map(JsonPair::from).collect(),
        }
    }

    /// Serialize to pretty-printed JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
