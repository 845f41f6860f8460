// src/domain/scoring.rs

//! Scoring policy: point budgets, score bounds and band classification.
//!
//! Every screen that shows a badge, a colour or a statistic derives it from
//! [`classify`], so grading and results views always agree.

use serde::Serialize;

use super::error::{DomainError, DomainResult};

/// Maximum number of points an exam can distribute over its questions.
pub const MAX_TOTAL_POINTS: f64 = 20.0;

/// Lowest and highest score a submission can be given.
pub const MIN_SCORE: f64 = 0.0;
pub const MAX_SCORE: f64 = 20.0;

/// Slack for float sums such as 0.1 + 0.2.
const TOLERANCE: f64 = 1e-9;

/// Qualitative score range used for consistent display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Band {
    Excellent,
    Good,
    Satisfactory,
    Insufficient,
}

impl Band {
    pub fn label(&self) -> &'static str {
        match self {
            Band::Excellent => "Excellent",
            Band::Good => "Good",
            Band::Satisfactory => "Satisfactory",
            Band::Insufficient => "Insufficient",
        }
    }
}

/// Sums the points of a question list.
pub fn total_points<'a>(points: impl IntoIterator<Item = &'a f64>) -> f64 {
    points.into_iter().sum()
}

/// True when `total` stays within the exam point budget.
pub fn within_budget(total: f64) -> bool {
    total <= MAX_TOTAL_POINTS + TOLERANCE
}

/// Checks a single question's point value.
pub fn check_points(points: f64) -> DomainResult<()> {
    if !points.is_finite() || points <= 0.0 {
        return Err(DomainError::validation(
            "question points must be a positive number",
        ));
    }
    Ok(())
}

/// Checks that `points` can be added to a list currently totalling `current`.
pub fn check_budget(current: f64, points: f64) -> DomainResult<()> {
    check_points(points)?;
    let total = current + points;
    if !within_budget(total) {
        return Err(DomainError::Validation(format!(
            "total points would be {total}, exceeding the maximum of {MAX_TOTAL_POINTS}"
        )));
    }
    Ok(())
}

/// Checks a score against the closed interval [0, 20].
pub fn check_score(score: f64) -> DomainResult<()> {
    if !score.is_finite() || !(MIN_SCORE..=MAX_SCORE).contains(&score) {
        return Err(DomainError::Validation(format!(
            "score must be between {MIN_SCORE} and {MAX_SCORE}"
        )));
    }
    Ok(())
}

/// Maps a score to its band.
///
/// * `>= 16` Excellent
/// * `[14, 16)` Good
/// * `[10, 14)` Satisfactory
/// * `< 10` Insufficient
pub fn classify(score: f64) -> Band {
    if score >= 16.0 {
        Band::Excellent
    } else if score >= 14.0 {
        Band::Good
    } else if score >= 10.0 {
        Band::Satisfactory
    } else {
        Band::Insufficient
    }
}

/// Count of scores falling into each band.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BandDistribution {
    pub excellent: usize,
    pub good: usize,
    pub satisfactory: usize,
    pub insufficient: usize,
}

impl BandDistribution {
    fn record(&mut self, band: Band) {
        match band {
            Band::Excellent => self.excellent += 1,
            Band::Good => self.good += 1,
            Band::Satisfactory => self.satisfactory += 1,
            Band::Insufficient => self.insufficient += 1,
        }
    }
}

/// Aggregate statistics over a set of scores.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScoreSummary {
    pub count: usize,
    pub average: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub bands: BandDistribution,
}

pub fn summarize(scores: impl IntoIterator<Item = f64>) -> ScoreSummary {
    let mut summary = ScoreSummary::default();
    let mut sum = 0.0;

    for score in scores {
        summary.count += 1;
        sum += score;
        summary.min = Some(summary.min.map_or(score, |m: f64| m.min(score)));
        summary.max = Some(summary.max.map_or(score, |m: f64| m.max(score)));
        summary.bands.record(classify(score));
    }

    if summary.count > 0 {
        summary.average = Some(sum / summary.count as f64);
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_documented_bands() {
        assert_eq!(classify(17.0), Band::Excellent);
        assert_eq!(classify(16.0), Band::Excellent);
        assert_eq!(classify(15.0), Band::Good);
        assert_eq!(classify(14.0), Band::Good);
        assert_eq!(classify(12.0), Band::Satisfactory);
        assert_eq!(classify(10.0), Band::Satisfactory);
        assert_eq!(classify(9.9), Band::Insufficient);
        assert_eq!(classify(0.0), Band::Insufficient);
    }

    #[test]
    fn test_budget_allows_exactly_twenty() {
        assert!(check_budget(12.0, 8.0).is_ok());
        assert!(check_budget(19.5, 0.5).is_ok());
        assert!(check_budget(0.1 + 0.2, 19.7).is_ok());
    }

    #[test]
    fn test_budget_rejects_overflow() {
        let err = check_budget(12.0, 10.0).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn test_points_must_be_positive() {
        assert!(check_points(0.0).is_err());
        assert!(check_points(-1.0).is_err());
        assert!(check_points(f64::NAN).is_err());
        assert!(check_points(0.5).is_ok());
    }

    #[test]
    fn test_score_bounds_are_inclusive() {
        assert!(check_score(0.0).is_ok());
        assert!(check_score(20.0).is_ok());
        assert!(check_score(-0.5).is_err());
        assert!(check_score(20.5).is_err());
        assert!(check_score(f64::INFINITY).is_err());
    }

    #[test]
    fn test_summarize() {
        let summary = summarize([17.0, 15.0, 12.0, 9.0]);
        assert_eq!(summary.count, 4);
        assert_eq!(summary.average, Some(13.25));
        assert_eq!(summary.min, Some(9.0));
        assert_eq!(summary.max, Some(17.0));
        assert_eq!(
            summary.bands,
            BandDistribution {
                excellent: 1,
                good: 1,
                satisfactory: 1,
                insufficient: 1,
            }
        );

        let empty = summarize(std::iter::empty());
        assert_eq!(empty.count, 0);
        assert_eq!(empty.average, None);
    }
}
