// src/domain/grading.rs

//! Grade inputs. Manual and automatic grades converge on
//! [`Submission::grade`]; the source is only used for error reporting and
//! logging, it is never stored.

use chrono::{DateTime, Utc};

use super::error::{DomainError, DomainResult};
use super::scoring::{self, Band};
use super::submission::Submission;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GradeSource {
    Manual,
    Automatic,
}

impl GradeSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Automatic => "automatic",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GradeInput {
    pub score: f64,
    pub feedback: Option<String>,
    pub source: GradeSource,
}

impl GradeInput {
    pub fn manual(score: f64, feedback: Option<String>) -> Self {
        Self {
            score,
            feedback,
            source: GradeSource::Manual,
        }
    }

    pub fn automatic(score: f64, feedback: Option<String>) -> Self {
        Self {
            score,
            feedback,
            source: GradeSource::Automatic,
        }
    }

    /// A manual score out of range is the caller's mistake; an automatic one
    /// means the corrector misbehaved.
    pub fn check(&self) -> DomainResult<()> {
        match (scoring::check_score(self.score), self.source) {
            (Ok(()), _) => Ok(()),
            (Err(err), GradeSource::Manual) => Err(err),
            (Err(_), GradeSource::Automatic) => Err(DomainError::Upstream(format!(
                "corrector returned an out-of-range score {}",
                self.score
            ))),
        }
    }
}

/// Applies a grade to a submission and returns the resulting band.
/// On error the submission is untouched.
pub fn apply(
    submission: &mut Submission,
    input: GradeInput,
    now: DateTime<Utc>,
) -> DomainResult<Band> {
    input.check()?;
    submission.grade(input.score, input.feedback, now)?;
    Ok(scoring::classify(input.score))
}
