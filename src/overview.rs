//! Dataset overview of the cleaned survey records
//!
//! Summarizes what the analysis runs on before any aggregation: record and
//! indicator counts, records per cut, the most covered topics, the firm
//! distribution by size and the description of each configured indicator.

use crate::config::AnalysisConfig;
use crate::record::Record;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

/// Number of topics listed in the report
pub const TOP_TOPICS: usize = 5;

/// Firm counts per subcut, read from the `N` column of one indicator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FirmDistribution {
    pub cut: String,
    /// Indicator whose sample counts were used
    pub indicator: String,
    /// (subcut, firms), in input order
    pub categories: Vec<(String, f64)>,
}

impl FirmDistribution {
    pub fn total(&self) -> f64 {
        self.categories.iter().map(|(_, firms)| firms).sum()
    }

    /// Percentage of all firms, in [0, 100]
    pub fn share(&self, firms: f64) -> f64 {
        let total = self.total();
        if total > 0.0 {
            firms / total * 100.0
        } else {
            0.0
        }
    }
}

/// A configured indicator as found in the data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyIndicator {
    pub code: String,
    pub english_name: Option<String>,
    pub records: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetOverview {
    pub total_records: usize,
    pub unique_indicators: usize,
    /// Records per cut, in order of first appearance
    pub cut_counts: Vec<(String, usize)>,
    pub topic_count: usize,
    /// Most frequent topics, largest first
    pub top_topics: Vec<(String, usize)>,
    pub firm_distribution: Option<FirmDistribution>,
    /// Configured indicators present in the data, in configuration order
    pub key_indicators: Vec<KeyIndicator>,
}

/// Occurrence counts in order of first appearance
fn counts_in_order<'a>(keys: impl Iterator<Item = &'a str>) -> Vec<(String, usize)> {
    let mut counts: Vec<(String, usize)> = Vec::new();
    let mut position: HashMap<&str, usize> = HashMap::new();
    for key in keys {
        match position.get(key).copied() {
            Some(i) => counts[i].1 += 1,
            None => {
                position.insert(key, counts.len());
                counts.push((key.to_string(), 1));
            }
        }
    }
    counts
}

/// Sample counts of the first breakdown indicator that has any for the cut
fn firm_distribution(records: &[Record], config: &AnalysisConfig) -> Option<FirmDistribution> {
    let cut = &config.breakdown.cut;
    config.breakdown.indicators.iter().find_map(|code| {
        let mut seen = HashSet::new();
        let categories: Vec<(String, f64)> = records
            .iter()
            .filter(|r| &r.cut == cut && &r.indicator == code)
            .filter_map(|r| Some((r.subcut.clone(), r.n?)))
            .filter(|(subcut, _)| seen.insert(subcut.clone()))
            .collect();

        if categories.is_empty() {
            debug!(indicator = %code, "no sample counts, trying next indicator");
            None
        } else {
            Some(FirmDistribution {
                cut: cut.clone(),
                indicator: code.clone(),
                categories,
            })
        }
    })
}

/// Summarize the cleaned records
#[tracing::instrument(level = "info", skip_all, fields(records = records.len()))]
pub fn overview(records: &[Record], config: &AnalysisConfig) -> DatasetOverview {
    let unique_indicators = records
        .iter()
        .map(|r| r.indicator.as_str())
        .collect::<HashSet<_>>()
        .len();

    let mut topics = counts_in_order(records.iter().filter_map(|r| r.topic.as_deref()));
    let topic_count = topics.len();
    // stable: ties keep first-appearance order
    topics.sort_by(|a, b| b.1.cmp(&a.1));
    topics.truncate(TOP_TOPICS);

    let key_indicators = config
        .indicator
        .iter()
        .filter_map(|ind| {
            let matching: Vec<&Record> =
                records.iter().filter(|r| r.indicator == ind.code).collect();
            let first = matching.first()?;
            Some(KeyIndicator {
                code: ind.code.clone(),
                english_name: first.english_name.clone(),
                records: matching.len(),
            })
        })
        .collect();

    let overview = DatasetOverview {
        total_records: records.len(),
        unique_indicators,
        cut_counts: counts_in_order(records.iter().map(|r| r.cut.as_str())),
        topic_count,
        top_topics: topics,
        firm_distribution: firm_distribution(records, config),
        key_indicators,
    };
    info!(
        records = overview.total_records,
        indicators = overview.unique_indicators,
        "dataset overview built"
    );
    overview
}

fn truncate(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

impl DatasetOverview {
    /// Generate human-readable report
    pub fn to_report_string(&self) -> String {
        let mut report = String::new();

        report.push_str("📋 DATASET OVERVIEW\n\n");
        report.push_str(&format!("Records: {}\n", self.total_records));
        report.push_str(&format!("Unique indicators: {}\n", self.unique_indicators));

        match &self.firm_distribution {
            Some(dist) => {
                report.push_str(&format!(
                    "\nFirm distribution by {} (N of {}):\n",
                    dist.cut, dist.indicator
                ));
                for (subcut, firms) in &dist.categories {
                    report.push_str(&format!(
                        "  {}: {:>5} firms ({:>5.1}%)\n",
                        subcut,
                        firms,
                        dist.share(*firms)
                    ));
                }
                report.push_str(&format!("  Total: {} firms\n", dist.total()));
            }
            None => report.push_str("\nFirm distribution: no sample counts found\n"),
        }

        report.push_str("\nCategory types (cut):\n");
        for (cut, count) in &self.cut_counts {
            report.push_str(&format!("  - {}: {} records\n", cut, count));
        }

        if self.topic_count > 0 {
            report.push_str(&format!("\nTopics covered: {}\n", self.topic_count));
            report.push_str(&format!(
                "Top {} topics by record count:\n",
                self.top_topics.len()
            ));
            for (i, (topic, count)) in self.top_topics.iter().enumerate() {
                report.push_str(&format!(
                    "  {}. {}: {} records\n",
                    i + 1,
                    truncate(topic, 50),
                    count
                ));
            }
        }

        if !self.key_indicators.is_empty() {
            report.push_str("\nKey indicators:\n");
            for ind in &self.key_indicators {
                let description = match &ind.english_name {
                    Some(name) => truncate(name, 60),
                    None => format!("{} records", ind.records),
                };
                report.push_str(&format!("  {}: {}\n", ind.code, description));
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(cut: &str, subcut: &str, indicator: &str, topic: &str, n: Option<f64>) -> Record {
        Record {
            country: "Viet Nam2023".to_string(),
            cabr: None,
            year: 2023,
            cut: cut.to_string(),
            subcut: subcut.to_string(),
            indicator: indicator.to_string(),
            topic: Some(topic.to_string()),
            english_name: Some(format!("Description of {}", indicator)),
            value: 1.0,
            se: None,
            n,
            method: None,
        }
    }

    fn records() -> Vec<Record> {
        vec![
            record("All", "All", "t5", "Innovation", Some(500.0)),
            record("Size", "Small (5-19)", "t7", "Innovation", Some(300.0)),
            record("Size", "Large (100+)", "t7", "Innovation", Some(100.0)),
            record("Size", "Small (5-19)", "perf1", "Performance", Some(290.0)),
            record("Region", "North", "fin14", "Finance", None),
            record("Region", "South", "fin14", "Finance", None),
        ]
    }

    #[test]
    fn test_overview_counts() {
        let overview = overview(&records(), &AnalysisConfig::default());

        assert_eq!(overview.total_records, 6);
        assert_eq!(overview.unique_indicators, 4);
        assert_eq!(
            overview.cut_counts,
            vec![
                ("All".to_string(), 1),
                ("Size".to_string(), 3),
                ("Region".to_string(), 2)
            ]
        );
        assert_eq!(overview.topic_count, 3);
        assert_eq!(overview.top_topics[0], ("Innovation".to_string(), 3));
        assert_eq!(overview.top_topics[1], ("Finance".to_string(), 2));
    }

    #[test]
    fn test_firm_distribution_falls_back_to_next_indicator() {
        // no Size rows for t5, so the counts come from t7
        let overview = overview(&records(), &AnalysisConfig::default());
        let dist = overview.firm_distribution.unwrap();

        assert_eq!(dist.indicator, "t7");
        assert_eq!(
            dist.categories,
            vec![
                ("Small (5-19)".to_string(), 300.0),
                ("Large (100+)".to_string(), 100.0)
            ]
        );
        assert_eq!(dist.total(), 400.0);
        assert_eq!(dist.share(300.0), 75.0);
    }

    #[test]
    fn test_firm_distribution_absent_without_counts() {
        let records = vec![record("Size", "Small (5-19)", "t5", "Innovation", None)];
        let overview = overview(&records, &AnalysisConfig::default());
        assert_eq!(overview.firm_distribution, None);
        assert!(overview
            .to_report_string()
            .contains("Firm distribution: no sample counts found"));
    }

    #[test]
    fn test_key_indicators_follow_configuration_order() {
        let overview = overview(&records(), &AnalysisConfig::default());
        let codes: Vec<&str> = overview
            .key_indicators
            .iter()
            .map(|k| k.code.as_str())
            .collect();
        // default order: t5, t7, t9, perf1, ..., fin14; t9 has no records
        assert_eq!(codes, vec!["t5", "t7", "perf1", "fin14"]);
        assert_eq!(overview.key_indicators[1].records, 2);
    }

    #[test]
    fn test_top_topics_limited() {
        let records: Vec<Record> = (0..8)
            .map(|i| record("All", "All", "t5", &format!("Topic {}", i), None))
            .collect();
        let overview = overview(&records, &AnalysisConfig::default());
        assert_eq!(overview.topic_count, 8);
        assert_eq!(overview.top_topics.len(), TOP_TOPICS);
        // all tied: first appearance wins
        assert_eq!(overview.top_topics[0].0, "Topic 0");
    }

    #[test]
    fn test_overview_report() {
        let report = overview(&records(), &AnalysisConfig::default()).to_report_string();

        assert!(report.contains("Records: 6"));
        assert!(report.contains("Firm distribution by Size (N of t7):"));
        assert!(report.contains("  Small (5-19):   300 firms ( 75.0%)"));
        assert!(report.contains("  Total: 400 firms"));
        assert!(report.contains("  - Region: 2 records"));
        assert!(report.contains("  1. Innovation: 3 records"));
        assert!(report.contains("  t7: Description of t7"));
    }
}
