// src/models/submission.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::domain::{
    Band, Subject, Submission, SubmissionStatus,
    scoring::ScoreSummary,
};

/// DTO for handing in an exam.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    #[validate(length(min = 1, max = 2048, message = "fileUrl is required"))]
    pub file_url: String,
}

/// DTO for a manual grade. The score range is enforced by the domain.
#[derive(Debug, Deserialize, Validate)]
pub struct GradeRequest {
    pub score: f64,
    #[validate(length(max = 10000))]
    pub feedback: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionResponse {
    pub id: i64,
    pub exam_id: i64,
    pub student_id: i64,
    pub status: SubmissionStatus,
    pub file_url: Option<String>,
    pub score: Option<f64>,
    pub feedback: Option<String>,
    pub band: Option<Band>,
    pub ended_at: Option<DateTime<Utc>>,
    pub graded_at: Option<DateTime<Utc>>,
}

impl From<&Submission> for SubmissionResponse {
    fn from(sub: &Submission) -> Self {
        Self {
            id: sub.id,
            exam_id: sub.exam_id,
            student_id: sub.student_id,
            status: sub.status,
            file_url: sub.file_url.clone(),
            score: sub.score,
            feedback: sub.feedback.clone(),
            band: sub.band(),
            ended_at: sub.ended_at,
            graded_at: sub.graded_at,
        }
    }
}

/// Number of submissions in each status.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCounts {
    pub in_progress: usize,
    pub completed: usize,
    pub graded: usize,
}

impl StatusCounts {
    pub fn tally<'a>(subs: impl IntoIterator<Item = &'a Submission>) -> Self {
        let mut counts = Self::default();
        for sub in subs {
            match sub.status {
                SubmissionStatus::InProgress => counts.in_progress += 1,
                SubmissionStatus::Completed => counts.completed += 1,
                SubmissionStatus::Graded => counts.graded += 1,
            }
        }
        counts
    }
}

/// Roster of one exam with its grade statistics.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterResponse {
    pub exam_id: i64,
    pub counts: StatusCounts,
    pub statistics: ScoreSummary,
    pub submissions: Vec<SubmissionResponse>,
}

/// One graded exam in a student's results list.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultEntry {
    pub exam_id: i64,
    pub exam_title: String,
    pub subject: Subject,
    pub score: f64,
    pub band: Band,
    pub band_label: &'static str,
    pub feedback: Option<String>,
    pub graded_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub file_url: String,
}
