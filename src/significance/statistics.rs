// Student-t machinery for testing a Pearson coefficient against r = 0
//
// Under the null hypothesis of no linear association, for n paired
// observations the statistic t = r * sqrt((n - 2) / (1 - r^2)) follows a
// Student t-distribution with n - 2 degrees of freedom.
//
// The distribution itself comes from statrs; the p-value is taken from the
// lower tail at -|t| so large statistics do not lose precision to 1 - CDF.

use crate::error::{AnalysisError, Result};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, StudentsT};
use std::fmt;

/// t-statistic of a correlation coefficient
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TStatistic {
    Value(f64),
    /// |r| = 1: the formula divides by zero; maximally significant
    Saturated { positive: bool },
    /// Coefficient undefined or fewer than three observations
    Undefined,
}

impl TStatistic {
    pub fn value(&self) -> Option<f64> {
        match self {
            TStatistic::Value(t) => Some(*t),
            _ => None,
        }
    }

    /// Ordering key for "strongest first": saturated above any finite |t|,
    /// undefined below everything
    pub fn magnitude(&self) -> f64 {
        match self {
            TStatistic::Value(t) => t.abs(),
            TStatistic::Saturated { .. } => f64::INFINITY,
            TStatistic::Undefined => -1.0,
        }
    }
}

impl fmt::Display for TStatistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TStatistic::Value(t) => write!(f, "{}", t),
            TStatistic::Saturated { positive: true } => f.write_str("inf"),
            TStatistic::Saturated { positive: false } => f.write_str("-inf"),
            TStatistic::Undefined => f.write_str("undefined"),
        }
    }
}

/// Degrees of freedom for n paired observations; `None` below three
pub fn degrees_of_freedom(n: usize) -> Option<usize> {
    n.checked_sub(2).filter(|df| *df >= 1)
}

/// t = r * sqrt((n - 2) / (1 - r^2))
///
/// # Example
/// ```
/// use innostat::significance::{t_statistic, TStatistic};
///
/// // r = 0.5 over 23 segments: t = 0.5 * sqrt(21 / 0.75) = sqrt(7)
/// let t = t_statistic(0.5, 23).value().unwrap();
/// assert!((t - 7f64.sqrt()).abs() < 1e-12);
///
/// assert_eq!(t_statistic(-1.0, 23), TStatistic::Saturated { positive: false });
/// ```
pub fn t_statistic(r: f64, n: usize) -> TStatistic {
    let Some(df) = degrees_of_freedom(n) else {
        return TStatistic::Undefined;
    };
    if !r.is_finite() {
        return TStatistic::Undefined;
    }
    if r.abs() >= 1.0 {
        return TStatistic::Saturated {
            positive: r > 0.0,
        };
    }
    TStatistic::Value(r * (df as f64 / (1.0 - r * r)).sqrt())
}

fn students_t(df: usize) -> Result<StudentsT> {
    if df == 0 {
        return Err(AnalysisError::Distribution {
            df,
            reason: "degrees of freedom must be positive".to_string(),
        });
    }
    StudentsT::new(0.0, 1.0, df as f64).map_err(|e| AnalysisError::Distribution {
        df,
        reason: e.to_string(),
    })
}

/// Two-tailed p-value: 2 * (1 - CDF_t(|t|, df))
///
/// Evaluated as 2 * CDF_t(-|t|, df), which is the same quantity by symmetry.
pub fn two_tailed_p_value(t: f64, df: usize) -> Result<f64> {
    let dist = students_t(df)?;
    if t.is_infinite() {
        return Ok(0.0);
    }
    Ok((2.0 * dist.cdf(-t.abs())).clamp(0.0, 1.0))
}

/// p-value of a t-statistic; saturated statistics are exactly 0
pub fn p_value(t: &TStatistic, df: usize) -> Result<Option<f64>> {
    match t {
        TStatistic::Value(t) => two_tailed_p_value(*t, df).map(Some),
        TStatistic::Saturated { .. } => Ok(Some(0.0)),
        TStatistic::Undefined => Ok(None),
    }
}

/// Two-tailed critical value: |t| above it is significant at `alpha`
pub fn critical_t(alpha: f64, df: usize) -> Result<f64> {
    if !(alpha > 0.0 && alpha < 1.0) {
        return Err(AnalysisError::InvalidConfig(format!(
            "alpha must be in (0, 1), got {}",
            alpha
        )));
    }
    Ok(students_t(df)?.inverse_cdf(1.0 - alpha / 2.0))
}

/// Round half away from zero to `decimals` places
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let scale = 10f64.powi(decimals as i32);
    (value * scale).round() / scale
}
