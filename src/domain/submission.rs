// src/domain/submission.rs

//! A student's relationship to one exam.
//!
//! Status only moves forward: `InProgress -> Completed -> Graded`. A graded
//! submission may be graded again, which overwrites score and feedback.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use super::error::{ConflictKind, DomainError, DomainResult};
use super::exam::{Exam, ParseEnumError};
use super::scoring::{self, Band};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubmissionStatus {
    /// Assigned to the student, nothing handed in yet.
    #[default]
    InProgress,
    /// Handed in, waiting for a grade.
    Completed,
    /// Score and feedback recorded.
    Graded,
}

impl SubmissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InProgress => "IN_PROGRESS",
            Self::Completed => "COMPLETED",
            Self::Graded => "GRADED",
        }
    }
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubmissionStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "IN_PROGRESS" => Ok(Self::InProgress),
            "COMPLETED" => Ok(Self::Completed),
            "GRADED" => Ok(Self::Graded),
            _ => Err(ParseEnumError::new("submission status", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub id: i64,
    pub exam_id: i64,
    pub student_id: i64,
    pub status: SubmissionStatus,
    pub file_url: Option<String>,
    pub score: Option<f64>,
    pub feedback: Option<String>,
    pub ended_at: Option<DateTime<Utc>>,
    pub graded_at: Option<DateTime<Utc>>,
}

impl Submission {
    /// A fresh assignment of `exam_id` to `student_id`.
    pub fn new(exam_id: i64, student_id: i64) -> Self {
        Self {
            id: 0,
            exam_id,
            student_id,
            status: SubmissionStatus::InProgress,
            file_url: None,
            score: None,
            feedback: None,
            ended_at: None,
            graded_at: None,
        }
    }

    /// True once the student has handed in, whether or not it was graded.
    pub fn is_gradable(&self) -> bool {
        self.status != SubmissionStatus::InProgress
    }

    pub fn band(&self) -> Option<Band> {
        match self.status {
            SubmissionStatus::Graded => self.score.map(scoring::classify),
            _ => None,
        }
    }

    /// Hands in the answer document.
    ///
    /// Already-submitted is reported before a missed deadline so that a
    /// student who submitted on time is never told they were late.
    pub fn submit(&mut self, exam: &Exam, file_url: &str, now: DateTime<Utc>) -> DomainResult<()> {
        if exam.id != self.exam_id {
            return Err(DomainError::validation(
                "submission does not belong to this exam",
            ));
        }
        if self.status != SubmissionStatus::InProgress {
            return Err(ConflictKind::AlreadySubmitted.into());
        }
        if !exam.is_published() {
            return Err(ConflictKind::ExamNotPublished.into());
        }
        if !exam.is_open(now) {
            return Err(ConflictKind::DeadlineExceeded.into());
        }

        let url = parse_file_url(file_url)?;

        self.file_url = Some(url.to_string());
        self.ended_at = Some(now);
        self.status = SubmissionStatus::Completed;
        Ok(())
    }

    /// Records a score and feedback. Regrading overwrites the previous grade.
    pub fn grade(
        &mut self,
        score: f64,
        feedback: Option<String>,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        scoring::check_score(score)?;
        if !self.is_gradable() {
            return Err(ConflictKind::NotSubmitted.into());
        }

        self.score = Some(score);
        self.feedback = feedback;
        self.graded_at = Some(now);
        self.status = SubmissionStatus::Graded;
        Ok(())
    }
}

fn parse_file_url(raw: &str) -> DomainResult<Url> {
    let url = Url::parse(raw.trim())
        .map_err(|e| DomainError::Validation(format!("invalid file url: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(DomainError::validation("file url must use http or https"));
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::domain::exam::{ExamDraft, QuestionDraft, Subject};
    use crate::domain::files::FileCandidate;

    fn published_exam(now: DateTime<Utc>) -> Exam {
        let mut exam = Exam::create(
            ExamDraft {
                title: Some("Sorting".to_string()),
                subject: Some(Subject::Algorithm),
                class_id: Some(3),
                end_date: Some(now + Duration::hours(2)),
                questions: vec![QuestionDraft {
                    points: 20.0,
                    content: None,
                }],
                ..Default::default()
            },
            1,
            now,
        )
        .unwrap();
        exam.id = 10;
        exam.attach_file(
            &FileCandidate::new("application/pdf", 1000),
            "https://files/sorting.pdf".to_string(),
        )
        .unwrap();
        exam.publish().unwrap();
        exam
    }

    #[test]
    fn test_submit_then_resubmit_conflicts() {
        let now = Utc::now();
        let exam = published_exam(now);
        let mut sub = Submission::new(exam.id, 42);

        sub.submit(&exam, "https://x/y.pdf", now).unwrap();
        assert_eq!(sub.status, SubmissionStatus::Completed);
        assert_eq!(sub.ended_at, Some(now));
        assert_eq!(sub.file_url.as_deref(), Some("https://x/y.pdf"));

        let before = sub.clone();
        let later = now + Duration::minutes(5);
        let err = sub.submit(&exam, "https://x/other.pdf", later).unwrap_err();
        assert!(matches!(
            err,
            DomainError::Conflict(ConflictKind::AlreadySubmitted)
        ));
        assert_eq!(sub, before);
    }

    #[test]
    fn test_submit_after_deadline() {
        let now = Utc::now();
        let exam = published_exam(now);
        let mut sub = Submission::new(exam.id, 42);

        sub.submit(&exam, "https://x/y.pdf", exam.end_date).unwrap();

        let mut late = Submission::new(exam.id, 43);
        let err = late
            .submit(&exam, "https://x/y.pdf", exam.end_date + Duration::seconds(1))
            .unwrap_err();
        assert!(matches!(
            err,
            DomainError::Conflict(ConflictKind::DeadlineExceeded)
        ));
        assert_eq!(late.status, SubmissionStatus::InProgress);
    }

    #[test]
    fn test_already_submitted_wins_over_deadline() {
        let now = Utc::now();
        let exam = published_exam(now);
        let mut sub = Submission::new(exam.id, 42);
        sub.submit(&exam, "https://x/y.pdf", now).unwrap();

        let err = sub
            .submit(&exam, "https://x/y.pdf", exam.end_date + Duration::days(1))
            .unwrap_err();
        assert!(matches!(
            err,
            DomainError::Conflict(ConflictKind::AlreadySubmitted)
        ));
    }

    #[test]
    fn test_submit_rejects_bad_urls_and_drafts() {
        let now = Utc::now();
        let mut exam = published_exam(now);
        let mut sub = Submission::new(exam.id, 42);

        assert!(matches!(
            sub.submit(&exam, "not a url", now),
            Err(DomainError::Validation(_))
        ));
        assert!(matches!(
            sub.submit(&exam, "ftp://x/y.pdf", now),
            Err(DomainError::Validation(_))
        ));
        assert_eq!(sub.status, SubmissionStatus::InProgress);

        exam.status = crate::domain::exam::ExamStatus::Draft;
        assert!(matches!(
            sub.submit(&exam, "https://x/y.pdf", now),
            Err(DomainError::Conflict(ConflictKind::ExamNotPublished))
        ));
    }

    #[test]
    fn test_grade_flow() {
        let now = Utc::now();
        let exam = published_exam(now);
        let mut sub = Submission::new(exam.id, 42);

        let err = sub.grade(12.0, None, now).unwrap_err();
        assert!(matches!(err, DomainError::Conflict(ConflictKind::NotSubmitted)));

        sub.submit(&exam, "https://x/y.pdf", now).unwrap();
        sub.grade(15.0, Some("Good job".to_string()), now).unwrap();
        assert_eq!(sub.status, SubmissionStatus::Graded);
        assert_eq!(sub.band(), Some(Band::Good));

        sub.grade(17.0, Some("Regraded".to_string()), now).unwrap();
        assert_eq!(sub.score, Some(17.0));
        assert_eq!(sub.band(), Some(Band::Excellent));
    }

    #[test]
    fn test_out_of_range_grade_leaves_submission_unchanged() {
        let now = Utc::now();
        let exam = published_exam(now);
        let mut sub = Submission::new(exam.id, 42);
        sub.submit(&exam, "https://x/y.pdf", now).unwrap();
        let before = sub.clone();

        for score in [-1.0, 20.5, f64::NAN] {
            let err = sub.grade(score, Some("x".to_string()), now).unwrap_err();
            assert!(matches!(err, DomainError::Validation(_)));
            assert_eq!(sub.status, before.status);
            assert_eq!(sub.score, before.score);
            assert_eq!(sub.feedback, before.feedback);
        }
    }

    #[test]
    fn test_status_strings() {
        assert_eq!(
            "IN_PROGRESS".parse::<SubmissionStatus>().unwrap(),
            SubmissionStatus::InProgress
        );
        assert_eq!(SubmissionStatus::Graded.to_string(), "GRADED");
        assert!("DONE".parse::<SubmissionStatus>().is_err());
    }
}
