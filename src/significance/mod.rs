// Statistical significance of correlations across enterprise segments
//
// A Pearson r over n segments is tested against the null hypothesis of no
// linear association with a two-tailed Student t-test on n - 2 degrees of
// freedom. The distribution comes from statrs; nothing here approximates it.
//
// |r| = 1 is reported as a saturated t-statistic with p = 0 rather than an
// infinite float, and an undefined coefficient stays undefined through the
// whole test.

mod statistics;
mod verdict;

pub use statistics::{
    critical_t, degrees_of_freedom, p_value, round_to, t_statistic, two_tailed_p_value,
    TStatistic,
};
pub use verdict::{
    format_p_value, Relationship, SignificanceLevel, SignificanceResult, SignificanceSummary,
    SignificanceTester, Strength,
};
