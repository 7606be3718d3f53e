//! Pearson correlation across segments
//!
//! Each indicator column of the segment table is one variable, each segment
//! one observation. A coefficient that cannot be computed is carried as
//! [`Coefficient::Undefined`] with its cause; it is never coerced to 0 or 1.

use crate::aggregate::SegmentTable;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

/// How undefined segment cells are handled when pairing two columns
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingPolicy {
    /// Any undefined cell in either column makes the pair undefined
    #[default]
    Propagate,
    /// Use only segments where both cells are defined
    Pairwise,
}

/// Why a coefficient is undefined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UndefinedReason {
    /// A column is constant, so r = 0/0
    ZeroVariance,
    /// A cell is undefined under [`MissingPolicy::Propagate`]
    MissingData,
    /// Fewer than two paired observations
    InsufficientObservations,
    /// An observation is infinite or NaN
    NonFinite,
}

impl fmt::Display for UndefinedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UndefinedReason::ZeroVariance => "zero variance",
            UndefinedReason::MissingData => "missing data",
            UndefinedReason::InsufficientObservations => "insufficient observations",
            UndefinedReason::NonFinite => "non-finite value",
        };
        f.write_str(s)
    }
}

/// A Pearson coefficient, or the explicit undefined marker
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Coefficient {
    Value(f64),
    Undefined(UndefinedReason),
}

impl Coefficient {
    pub fn value(&self) -> Option<f64> {
        match self {
            Coefficient::Value(r) => Some(*r),
            Coefficient::Undefined(_) => None,
        }
    }

    pub fn is_defined(&self) -> bool {
        matches!(self, Coefficient::Value(_))
    }
}

impl fmt::Display for Coefficient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Coefficient::Value(r) => write!(f, "{}", r),
            Coefficient::Undefined(_) => f.write_str("undefined"),
        }
    }
}

/// One cell of the correlation matrix
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Correlation {
    pub coefficient: Coefficient,
    /// Paired observations behind the coefficient
    pub observations: usize,
}

/// Pearson product-moment correlation of two equally long series
///
/// r = Σ(xᵢ−x̄)(yᵢ−ȳ) / sqrt(Σ(xᵢ−x̄)² · Σ(yᵢ−ȳ)²)
///
/// A series whose values are all identical has zero variance and yields
/// `Undefined(ZeroVariance)`. The result is clamped to [-1, 1].
///
/// # Example
/// ```
/// use innostat::correlation::{pearson, Coefficient};
///
/// let x = [1.0, 2.0, 3.0, 4.0];
/// let y = [8.0, 6.0, 4.0, 2.0];
/// assert_eq!(pearson(&x, &y), Coefficient::Value(-1.0));
/// ```
pub fn pearson(xs: &[f64], ys: &[f64]) -> Coefficient {
    debug_assert_eq!(xs.len(), ys.len());
    let n = xs.len().min(ys.len());
    if n < 2 {
        return Coefficient::Undefined(UndefinedReason::InsufficientObservations);
    }
    let (xs, ys) = (&xs[..n], &ys[..n]);

    if xs.iter().chain(ys).any(|v| !v.is_finite()) {
        return Coefficient::Undefined(UndefinedReason::NonFinite);
    }
    // Compare values, not the computed variance, which rounding can leave tiny
    if is_constant(xs) || is_constant(ys) {
        return Coefficient::Undefined(UndefinedReason::ZeroVariance);
    }

    // Power-of-two scaling is exact, so r is unchanged for ordinary data while
    // the sums of squares can no longer overflow or underflow
    let (scale_x, scale_y) = (power_of_two_scale(xs), power_of_two_scale(ys));
    let mean_x = xs.iter().map(|x| x / scale_x).sum::<f64>() / n as f64;
    let mean_y = ys.iter().map(|y| y / scale_y).sum::<f64>() / n as f64;

    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (x, y) in xs.iter().zip(ys) {
        let dx = x / scale_x - mean_x;
        let dy = y / scale_y - mean_y;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }

    if sxx == 0.0 || syy == 0.0 {
        return Coefficient::Undefined(UndefinedReason::ZeroVariance);
    }

    let r = sxy / (sxx * syy).sqrt();
    if !r.is_finite() {
        return Coefficient::Undefined(UndefinedReason::NonFinite);
    }
    Coefficient::Value(r.clamp(-1.0, 1.0))
}

/// Largest power of two not above max |v|, within the normal range
fn power_of_two_scale(values: &[f64]) -> f64 {
    let max = values.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
    if max == 0.0 {
        return 1.0;
    }
    let exponent = max.log2().floor().clamp(-1022.0, 1023.0) as i32;
    2.0_f64.powi(exponent)
}

fn is_constant(values: &[f64]) -> bool {
    values.windows(2).all(|w| w[0] == w[1])
}

/// Correlate two table columns under a missing-data policy
pub fn correlate_columns(
    xs: &[Option<f64>],
    ys: &[Option<f64>],
    policy: MissingPolicy,
) -> Correlation {
    let pairs: Vec<(f64, f64)> = xs
        .iter()
        .zip(ys)
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .collect();

    if policy == MissingPolicy::Propagate && pairs.len() < xs.len().min(ys.len()) {
        return Correlation {
            coefficient: Coefficient::Undefined(UndefinedReason::MissingData),
            observations: xs.len().min(ys.len()),
        };
    }

    let (px, py): (Vec<f64>, Vec<f64>) = pairs.into_iter().unzip();
    Correlation {
        coefficient: pearson(&px, &py),
        observations: px.len(),
    }
}

/// Symmetric k × k correlation matrix over the indicator columns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    /// Indicator codes, in row/column order
    pub labels: Vec<String>,
    cells: Vec<Vec<Correlation>>,
}

impl CorrelationMatrix {
    pub fn size(&self) -> usize {
        self.labels.len()
    }

    pub fn get(&self, i: usize, j: usize) -> &Correlation {
        &self.cells[i][j]
    }

    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.labels.iter().position(|l| l == label)
    }

    /// Look up a cell by indicator codes
    pub fn by_label(&self, first: &str, second: &str) -> Option<&Correlation> {
        Some(self.get(self.index_of(first)?, self.index_of(second)?))
    }

    pub fn is_symmetric(&self) -> bool {
        (0..self.size()).all(|i| (0..self.size()).all(|j| self.cells[i][j] == self.cells[j][i]))
    }

    /// Upper-triangle pairs (i < j)
    pub fn pairs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        let k = self.size();
        (0..k).flat_map(move |i| (i + 1..k).map(move |j| (i, j)))
    }
}

/// Compute the full correlation matrix of a segment table
///
/// The diagonal is exactly 1.0 for every column with defined, non-constant
/// data; otherwise it carries the same undefined reason as the column.
#[tracing::instrument(
    level = "info",
    skip_all,
    fields(segments = table.num_segments(), indicators = table.num_indicators())
)]
pub fn correlate(table: &SegmentTable, policy: MissingPolicy) -> CorrelationMatrix {
    let k = table.num_indicators();
    let columns: Vec<Vec<Option<f64>>> = (0..k).map(|c| table.column(c)).collect();

    let placeholder = Correlation {
        coefficient: Coefficient::Undefined(UndefinedReason::InsufficientObservations),
        observations: 0,
    };
    let mut cells = vec![vec![placeholder; k]; k];

    for i in 0..k {
        for j in i..k {
            let mut cell = correlate_columns(&columns[i], &columns[j], policy);
            if i == j && cell.coefficient.is_defined() {
                cell.coefficient = Coefficient::Value(1.0);
            }
            if let Coefficient::Undefined(reason) = cell.coefficient {
                debug!(
                    first = %table.indicators[i],
                    second = %table.indicators[j],
                    %reason,
                    "coefficient undefined"
                );
            }
            cells[i][j] = cell;
            cells[j][i] = cell;
        }
    }

    let matrix = CorrelationMatrix {
        labels: table.indicators.clone(),
        cells,
    };
    let undefined = matrix
        .pairs()
        .filter(|&(i, j)| !matrix.get(i, j).coefficient.is_defined())
        .count();
    info!(size = k, undefined_pairs = undefined, "correlation matrix computed");
    matrix
}
