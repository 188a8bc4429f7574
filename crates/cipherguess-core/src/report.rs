//! Display-ready view of a prediction
//!
//! [`PredictionReport`] is what a presentation layer renders: confidence as a
//! percentage, the probability distribution sorted best-first with its total,
//! and one row per text statistic where a missing value stays visibly missing.

use std::cmp::Ordering;
use std::fmt;

use crate::types::{PredictionResult, Score, TextStatistics};

/// Placeholder rendered for a statistic the backend did not compute
pub const MISSING_PLACEHOLDER: &str = "N/A";

const BAR_WIDTH: usize = 30;

/// One bar of the probability distribution
#[derive(Debug, Clone, PartialEq)]
pub struct DistributionEntry {
    pub algorithm: String,
    /// Percentage in `[0, 100]`
    pub percent: f64,
}

/// Value of a single statistic row
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FeatureValue {
    Count(u64),
    Measure { value: f64, precision: usize },
    Missing,
}

impl FeatureValue {
    fn from_score(score: Option<&Score>, precision: usize) -> Self {
        score.map_or(Self::Missing, |s| Self::Measure {
            value: s.value(),
            precision,
        })
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }
}

impl fmt::Display for FeatureValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Count(n) => write!(f, "{n}"),
            Self::Measure { value, precision } => write!(f, "{value:.precision$}"),
            Self::Missing => f.write_str(MISSING_PLACEHOLDER),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    pub label: &'static str,
    pub value: FeatureValue,
}

/// Consumer-side rendering of a [`PredictionResult`]
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionReport {
    pub algorithm: String,
    /// Confidence rescaled from `[0, 1]` to `[0, 100]`
    pub confidence_percent: f64,
    /// Sorted by descending percentage, ties by name
    pub distribution: Vec<DistributionEntry>,
    /// Sum of every distribution entry, shown so a reader can spot gaps
    pub total_percent: f64,
    /// Empty when the backend sent no `features` object at all
    pub features: Vec<FeatureRow>,
}

impl PredictionReport {
    pub fn new(result: &PredictionResult) -> Self {
        let mut distribution: Vec<DistributionEntry> = result
            .algorithm_probabilities
            .iter()
            .flatten()
            .map(|(algorithm, score)| DistributionEntry {
                algorithm: algorithm.clone(),
                percent: score.value(),
            })
            .collect();

        distribution.sort_by(|a, b| {
            b.percent
                .partial_cmp(&a.percent)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.algorithm.cmp(&b.algorithm))
        });

        let total_percent = distribution.iter().map(|e| e.percent).sum();

        Self {
            algorithm: result.algorithm.clone(),
            confidence_percent: result.confidence.value() * 100.0,
            distribution,
            total_percent,
            features: result.features.as_ref().map(feature_rows).unwrap_or_default(),
        }
    }
}

impl From<&PredictionResult> for PredictionReport {
    fn from(result: &PredictionResult) -> Self {
        Self::new(result)
    }
}

fn feature_rows(stats: &TextStatistics) -> Vec<FeatureRow> {
    vec![
        FeatureRow {
            label: "Length",
            value: stats.length.map_or(FeatureValue::Missing, FeatureValue::Count),
        },
        FeatureRow {
            label: "Alpha Ratio",
            value: FeatureValue::from_score(stats.alpha_ratio.as_ref(), 2),
        },
        FeatureRow {
            label: "Digit Ratio",
            value: FeatureValue::from_score(stats.digit_ratio.as_ref(), 2),
        },
        FeatureRow {
            label: "Symbol Ratio",
            value: FeatureValue::from_score(stats.symbol_ratio.as_ref(), 2),
        },
        FeatureRow {
            label: "Entropy",
            value: FeatureValue::from_score(stats.entropy.as_ref(), 2),
        },
        FeatureRow {
            label: "Index of Coincidence",
            value: FeatureValue::from_score(stats.ic.as_ref(), 3),
        },
        FeatureRow {
            label: "Chi-Square",
            value: FeatureValue::from_score(stats.chi_square.as_ref(), 1),
        },
    ]
}

fn bar(percent: f64) -> String {
    let filled = ((percent.clamp(0.0, 100.0) / 100.0) * BAR_WIDTH as f64).round() as usize;
    format!("{}{}", "#".repeat(filled), ".".repeat(BAR_WIDTH - filled))
}

impl fmt::Display for PredictionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Algorithm:  {}", self.algorithm)?;
        writeln!(f, "Confidence: {:.0}%", self.confidence_percent)?;

        if !self.distribution.is_empty() {
            let width = self
                .distribution
                .iter()
                .map(|e| e.algorithm.chars().count())
                .max()
                .unwrap_or(0);

            writeln!(f)?;
            writeln!(f, "Algorithm Probability Distribution")?;
            for entry in &self.distribution {
                writeln!(
                    f,
                    "  {:<width$}  [{}] {}%",
                    entry.algorithm,
                    bar(entry.percent),
                    entry.percent
                )?;
            }
            writeln!(f, "  Total: {}%", self.total_percent)?;
        }

        if !self.features.is_empty() {
            writeln!(f)?;
            writeln!(f, "Text Statistics")?;
            for row in &self.features {
                writeln!(f, "  {:<22}{}", format!("{}:", row.label), row.value)?;
            }
        }

        Ok(())
    }
}
