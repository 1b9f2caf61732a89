//! Overall quality score from the missing, duplicate, outlier and
//! inconsistency reports.

use super::{DuplicatesReport, InconsistenciesReport, MissingValuesReport, OutliersReport};
use serde::{Deserialize, Serialize};

const MAX_MISSING_PENALTY: u32 = 30;

/// Penalty points deducted per category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub missing_data_impact: u32,
    pub duplicate_impact: u32,
    pub outlier_impact: u32,
    pub inconsistency_impact: u32,
}

impl ScoreBreakdown {
    pub fn total(&self) -> u32 {
        self.missing_data_impact
            + self.duplicate_impact
            + self.outlier_impact
            + self.inconsistency_impact
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Grade {
    Excellent,
    Good,
    Fair,
    Poor,
    Critical,
}

impl Grade {
    pub fn from_score(score: u32) -> Self {
        match score {
            90.. => Self::Excellent,
            75..=89 => Self::Good,
            60..=74 => Self::Fair,
            40..=59 => Self::Poor,
            _ => Self::Critical,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Excellent => "Excellent",
            Self::Good => "Good",
            Self::Fair => "Fair",
            Self::Poor => "Poor",
            Self::Critical => "Critical",
        }
    }
}

impl std::fmt::Display for Grade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityScore {
    /// 0 to 100.
    pub score: u32,
    pub grade: Grade,
    pub breakdown: ScoreBreakdown,
}

pub struct QualityScorer;

impl QualityScorer {
    pub fn score(
        missing: &MissingValuesReport,
        duplicates: &DuplicatesReport,
        outliers: &OutliersReport,
        inconsistencies: &InconsistenciesReport,
    ) -> QualityScore {
        let missing_penalty: u32 = missing
            .details
            .values()
            .map(|d| match d.percentage {
                p if p > 20.0 => 10,
                p if p > 5.0 => 5,
                p if p > 0.0 => 2,
                _ => 0,
            })
            .sum();

        let duplicate_impact = match duplicates.duplicate_percent {
            p if p > 5.0 => 15,
            p if p > 1.0 => 8,
            p if p > 0.0 => 3,
            _ => 0,
        };

        let outlier_impact = match outliers.total_outliers {
            n if n > 100 => 10,
            n if n > 50 => 5,
            _ => 0,
        };

        // Only whitespace, casing and symbol findings weigh on the score.
        let text_issues = inconsistencies.strip_issues.len()
            + inconsistencies.case_issues.len()
            + inconsistencies.special_char_issues.len();
        let inconsistency_impact = match text_issues {
            n if n > 5 => 15,
            n if n > 2 => 8,
            n if n > 0 => 4,
            _ => 0,
        };

        let breakdown = ScoreBreakdown {
            missing_data_impact: missing_penalty.min(MAX_MISSING_PENALTY),
            duplicate_impact,
            outlier_impact,
            inconsistency_impact,
        };
        let score = 100u32.saturating_sub(breakdown.total());

        QualityScore {
            score,
            grade: Grade::from_score(score),
            breakdown,
        }
    }
}
