// Significance verdicts for correlation pairs
//
// Each pair of the correlation matrix gets a t-statistic, a two-tailed
// p-value, a significance level (***, **, *, ns), a strength class and a
// one-line interpretation. Results are ordered strongest first by |t|.

use crate::aggregate::IndicatorDef;
use crate::config::SignificanceConfig;
use crate::correlation::{Coefficient, CorrelationMatrix};
use crate::error::{AnalysisError, Result};
use crate::significance::statistics::{
    critical_t, degrees_of_freedom, p_value, round_to, t_statistic, TStatistic,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, info, warn};

/// Significance band of a p-value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignificanceLevel {
    /// p < 0.001
    HighlySignificant,
    /// p < 0.01
    Significant,
    /// p < 0.05
    MarginallySignificant,
    NotSignificant,
    /// No p-value could be computed
    Undefined,
}

impl SignificanceLevel {
    pub const ALL: [SignificanceLevel; 5] = [
        SignificanceLevel::HighlySignificant,
        SignificanceLevel::Significant,
        SignificanceLevel::MarginallySignificant,
        SignificanceLevel::NotSignificant,
        SignificanceLevel::Undefined,
    ];

    pub fn from_p(p: Option<f64>) -> Self {
        match p {
            Some(p) if p < 0.001 => SignificanceLevel::HighlySignificant,
            Some(p) if p < 0.01 => SignificanceLevel::Significant,
            Some(p) if p < 0.05 => SignificanceLevel::MarginallySignificant,
            Some(_) => SignificanceLevel::NotSignificant,
            None => SignificanceLevel::Undefined,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            SignificanceLevel::HighlySignificant => "***",
            SignificanceLevel::Significant => "**",
            SignificanceLevel::MarginallySignificant => "*",
            SignificanceLevel::NotSignificant => "ns",
            SignificanceLevel::Undefined => "undefined",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            SignificanceLevel::HighlySignificant => "highly significant",
            SignificanceLevel::Significant => "significant",
            SignificanceLevel::MarginallySignificant => "marginally significant",
            SignificanceLevel::NotSignificant => "not significant",
            SignificanceLevel::Undefined => "undefined",
        }
    }
}

impl fmt::Display for SignificanceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Strength class of |r|
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strength {
    /// |r| > 0.70
    VeryStrong,
    /// 0.50 < |r| <= 0.70
    Strong,
    /// 0.30 < |r| <= 0.50
    Moderate,
    Weak,
}

impl Strength {
    pub const ALL: [Strength; 4] = [
        Strength::VeryStrong,
        Strength::Strong,
        Strength::Moderate,
        Strength::Weak,
    ];

    pub fn from_r(r: f64) -> Self {
        let abs_r = r.abs();
        if abs_r > 0.70 {
            Strength::VeryStrong
        } else if abs_r > 0.50 {
            Strength::Strong
        } else if abs_r > 0.30 {
            Strength::Moderate
        } else {
            Strength::Weak
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Strength::VeryStrong => "Very strong",
            Strength::Strong => "Strong",
            Strength::Moderate => "Moderate",
            Strength::Weak => "Weak",
        }
    }
}

/// A labelled indicator pair reported on its own
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub first: String,
    pub second: String,
    pub label: String,
}

/// Test outcome for one indicator pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignificanceResult {
    pub first: String,
    pub second: String,
    /// Indicator names; the codes when no name is configured
    pub first_name: String,
    pub second_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Coefficient as tested (after optional rounding)
    pub coefficient: Coefficient,
    pub observations: usize,
    pub degrees_of_freedom: Option<usize>,
    pub t_statistic: TStatistic,
    pub p_value: Option<f64>,
    /// p < alpha; `None` when the pair is undefined
    pub significant: Option<bool>,
    pub level: SignificanceLevel,
    pub strength: Option<Strength>,
}

impl SignificanceResult {
    /// "[Strength] [direction] correlation, [significance]"
    pub fn interpretation(&self) -> String {
        match (self.coefficient, self.strength) {
            (Coefficient::Value(r), Some(strength)) => {
                let direction = if r < 0.0 { "negative" } else { "positive" };
                format!(
                    "{} {} correlation, {}",
                    strength.label(),
                    direction,
                    self.level.description()
                )
            }
            (Coefficient::Undefined(reason), _) => {
                format!("Undefined correlation ({})", reason)
            }
            (Coefficient::Value(_), None) => "Undefined correlation".to_string(),
        }
    }

    /// Name shown in reports: the label, or the two indicator names
    pub fn display_name(&self) -> String {
        match &self.label {
            Some(label) => label.clone(),
            None => format!("{} ↔ {}", self.first_name, self.second_name),
        }
    }
}

/// p-value as printed in publication tables
pub fn format_p_value(p: Option<f64>) -> String {
    match p {
        Some(p) if p < 0.001 => "<0.001".to_string(),
        Some(p) if p < 0.01 => "<0.01".to_string(),
        Some(p) if p < 0.05 => "<0.05".to_string(),
        Some(p) => format!("{:.3}", p),
        None => "undefined".to_string(),
    }
}

/// Strongest first by |t|; saturated before finite, undefined last
fn sort_by_strength(results: &mut [SignificanceResult]) {
    results.sort_by(|a, b| {
        b.t_statistic
            .magnitude()
            .total_cmp(&a.t_statistic.magnitude())
    });
}

/// Applies the t-test to correlation pairs
#[derive(Debug, Clone, PartialEq)]
pub struct SignificanceTester {
    pub alpha: f64,
    pub coefficient_decimals: Option<u32>,
    /// Indicator code -> human name, for reports
    pub names: HashMap<String, String>,
}

impl Default for SignificanceTester {
    fn default() -> Self {
        Self::from_config(&SignificanceConfig::default())
    }
}

impl SignificanceTester {
    pub fn from_config(config: &SignificanceConfig) -> Self {
        Self {
            alpha: config.alpha,
            coefficient_decimals: config.coefficient_decimals,
            names: HashMap::new(),
        }
    }

    /// Report indicators by their configured names
    pub fn with_names(mut self, indicators: &[IndicatorDef]) -> Self {
        self.names = indicators
            .iter()
            .map(|ind| (ind.code.clone(), ind.name.clone()))
            .collect();
        self
    }

    fn name_of(&self, code: &str) -> String {
        self.names
            .get(code)
            .cloned()
            .unwrap_or_else(|| code.to_string())
    }

    /// Test a single coefficient over `observations` paired values
    pub fn test(
        &self,
        first: &str,
        second: &str,
        coefficient: Coefficient,
        observations: usize,
    ) -> Result<SignificanceResult> {
        let coefficient = match (coefficient, self.coefficient_decimals) {
            (Coefficient::Value(r), Some(decimals)) => Coefficient::Value(round_to(r, decimals)),
            (c, _) => c,
        };

        let df = degrees_of_freedom(observations);
        let t = match coefficient {
            Coefficient::Value(r) => t_statistic(r, observations),
            Coefficient::Undefined(_) => TStatistic::Undefined,
        };
        let p = match df {
            Some(df) => p_value(&t, df)?,
            None => None,
        };

        Ok(SignificanceResult {
            first: first.to_string(),
            second: second.to_string(),
            first_name: self.name_of(first),
            second_name: self.name_of(second),
            label: None,
            coefficient,
            observations,
            degrees_of_freedom: df,
            t_statistic: t,
            p_value: p,
            significant: p.map(|p| p < self.alpha),
            level: SignificanceLevel::from_p(p),
            strength: coefficient.value().map(Strength::from_r),
        })
    }

    /// Test every unordered off-diagonal pair of the matrix
    #[tracing::instrument(
        level = "info",
        skip_all,
        fields(size = matrix.size(), alpha = self.alpha)
    )]
    pub fn test_matrix(&self, matrix: &CorrelationMatrix) -> Result<Vec<SignificanceResult>> {
        let mut results = Vec::new();
        for (i, j) in matrix.pairs() {
            let cell = matrix.get(i, j);
            results.push(self.test(
                &matrix.labels[i],
                &matrix.labels[j],
                cell.coefficient,
                cell.observations,
            )?);
        }
        sort_by_strength(&mut results);

        let significant = results.iter().filter(|r| r.significant == Some(true)).count();
        info!(
            pairs = results.len(),
            significant, "significance tests finished"
        );
        Ok(results)
    }

    /// Test the configured key relationships, labelled
    pub fn test_relationships(
        &self,
        matrix: &CorrelationMatrix,
        relationships: &[Relationship],
    ) -> Result<Vec<SignificanceResult>> {
        let mut results = Vec::with_capacity(relationships.len());
        for rel in relationships {
            let index = |code: &str| {
                matrix
                    .index_of(code)
                    .ok_or_else(|| AnalysisError::UnknownIndicator(code.to_string()))
            };
            let cell = matrix.get(index(&rel.first)?, index(&rel.second)?);

            let mut result =
                self.test(&rel.first, &rel.second, cell.coefficient, cell.observations)?;
            if result.level == SignificanceLevel::Undefined {
                warn!(relationship = %rel.label, "key relationship is undefined");
            }
            result.label = Some(rel.label.clone());
            results.push(result);
        }
        sort_by_strength(&mut results);
        debug!(relationships = results.len(), "key relationships tested");
        Ok(results)
    }
}

/// Aggregate view over a set of results, rendered for the terminal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignificanceSummary {
    pub alpha: f64,
    pub segments: usize,
    pub degrees_of_freedom: Option<usize>,
    pub critical_t: Option<f64>,
    pub total_pairs: usize,
    /// Count per level, in [`SignificanceLevel::ALL`] order
    pub level_counts: Vec<(SignificanceLevel, usize)>,
    /// Strength distribution of the key relationships
    pub relationship_strengths: Vec<(Strength, usize)>,
    pub top_pairs: Vec<SignificanceResult>,
    pub relationships: Vec<SignificanceResult>,
}

impl SignificanceSummary {
    /// `pairs` must already be sorted strongest first
    pub fn new(
        alpha: f64,
        segments: usize,
        pairs: &[SignificanceResult],
        relationships: &[SignificanceResult],
        top_n: usize,
    ) -> Result<Self> {
        let df = degrees_of_freedom(segments);
        let critical = match df {
            Some(df) => Some(critical_t(alpha, df)?),
            None => None,
        };

        let level_counts = SignificanceLevel::ALL
            .iter()
            .map(|level| (*level, pairs.iter().filter(|p| p.level == *level).count()))
            .collect();
        let relationship_strengths = Strength::ALL
            .iter()
            .map(|s| {
                (
                    *s,
                    relationships.iter().filter(|r| r.strength == Some(*s)).count(),
                )
            })
            .collect();

        Ok(Self {
            alpha,
            segments,
            degrees_of_freedom: df,
            critical_t: critical,
            total_pairs: pairs.len(),
            level_counts,
            relationship_strengths,
            top_pairs: pairs.iter().take(top_n).cloned().collect(),
            relationships: relationships.to_vec(),
        })
    }

    pub fn count(&self, level: SignificanceLevel) -> usize {
        self.level_counts
            .iter()
            .find(|(l, _)| *l == level)
            .map(|(_, c)| *c)
            .unwrap_or(0)
    }

    /// Generate human-readable report
    pub fn to_report_string(&self) -> String {
        let mut report = String::new();

        report.push_str("📊 CORRELATION SIGNIFICANCE\n\n");
        match (self.degrees_of_freedom, self.critical_t) {
            (Some(df), Some(t)) => {
                report.push_str(&format!(
                    "Based on {} segments with {} degrees of freedom\n",
                    self.segments, df
                ));
                report.push_str(&format!(
                    "Critical value (α={}, two-tailed): |t| > {:.2}\n",
                    self.alpha, t
                ));
            }
            _ => {
                report.push_str(&format!(
                    "⚠️  INSUFFICIENT DATA: {} segments, at least 3 needed\n",
                    self.segments
                ));
            }
        }

        report.push_str(&format!("\nPairs analyzed: {}\n", self.total_pairs));
        for (level, count) in &self.level_counts {
            if *level == SignificanceLevel::Undefined && *count == 0 {
                continue;
            }
            report.push_str(&format!(
                "  {:<9} {:<24} {}\n",
                level.symbol(),
                level.description(),
                count
            ));
        }

        if !self.relationships.is_empty() {
            report.push_str("\n🔑 Key relationships:\n");
            for result in &self.relationships {
                report.push_str(&result_line(result));
            }
            report.push_str("\nKey relationships by strength:\n");
            for (strength, count) in &self.relationship_strengths {
                report.push_str(&format!("  {}: {}\n", strength.label(), count));
            }
        }

        if !self.top_pairs.is_empty() {
            report.push_str(&format!(
                "\n🏆 Strongest {} pairs:\n",
                self.top_pairs.len()
            ));
            for result in &self.top_pairs {
                report.push_str(&result_line(result));
            }
        }

        report
    }
}

fn result_line(result: &SignificanceResult) -> String {
    let r = match result.coefficient {
        Coefficient::Value(r) => format!("{:+.2}", r),
        Coefficient::Undefined(_) => "undefined".to_string(),
    };
    let t = match result.t_statistic {
        TStatistic::Value(t) => format!("{:+.2}", t),
        other => other.to_string(),
    };
    format!(
        "  {} (r={}, t={}, p={}) {}: {}\n",
        result.display_name(),
        r,
        t,
        format_p_value(result.p_value),
        result.level.symbol(),
        result.interpretation()
    )
}
