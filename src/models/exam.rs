// src/models/exam.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use validator::Validate;

use crate::domain::{
    Exam, ExamDraft, ExamFormat, ExamPatch, ExamStatus, Question, QuestionDraft, Subject,
};

use super::submission::SubmissionResponse;

/// DTO for one question in a create request.
#[derive(Debug, Deserialize, Validate)]
pub struct QuestionInput {
    pub points: f64,
    #[validate(length(max = 5000))]
    pub content: Option<String>,
}

/// DTO for creating an exam.
///
/// Required fields are optional at the JSON level so the domain can report
/// every missing one in a single error.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateExamRequest {
    #[validate(length(max = 200))]
    pub title: Option<String>,
    pub subject: Option<Subject>,
    #[validate(length(max = 20000))]
    pub description: Option<String>,
    pub format: Option<ExamFormat>,
    pub class_id: Option<i64>,
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    #[validate(nested)]
    pub questions: Vec<QuestionInput>,
}

impl From<CreateExamRequest> for ExamDraft {
    fn from(req: CreateExamRequest) -> Self {
        ExamDraft {
            title: req.title,
            subject: req.subject,
            description: req.description,
            format: req.format,
            class_id: req.class_id,
            end_date: req.end_date,
            questions: req
                .questions
                .into_iter()
                .map(|q| QuestionDraft {
                    points: q.points,
                    content: q.content,
                })
                .collect(),
        }
    }
}

/// DTO for editing exam metadata. Absent fields are left untouched.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateExamRequest {
    #[validate(length(max = 200))]
    pub title: Option<String>,
    #[validate(length(max = 20000))]
    pub description: Option<String>,
    pub subject: Option<Subject>,
    pub format: Option<ExamFormat>,
    pub class_id: Option<i64>,
    pub end_date: Option<DateTime<Utc>>,
}

impl From<UpdateExamRequest> for ExamPatch {
    fn from(req: UpdateExamRequest) -> Self {
        ExamPatch {
            title: req.title,
            description: req.description,
            subject: req.subject,
            format: req.format,
            class_id: req.class_id,
            end_date: req.end_date,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct AddQuestionRequest {
    pub points: f64,
    #[validate(length(max = 5000))]
    pub content: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateQuestionRequest {
    pub points: Option<f64>,
    /// Absent leaves the text alone, `null` clears it.
    #[serde(default, deserialize_with = "present")]
    #[validate(length(max = 5000))]
    pub content: Option<Option<String>>,
}

/// Maps a field that is present in the JSON (even as `null`) to `Some`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceSolutionRequest {
    #[validate(length(max = 100000))]
    pub referenced_solution: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamResponse {
    pub id: i64,
    pub title: String,
    pub subject: Subject,
    pub description: String,
    pub format: ExamFormat,
    pub status: ExamStatus,
    pub file_url: Option<String>,
    pub class_id: i64,
    pub end_date: DateTime<Utc>,
    pub total_points: f64,
    pub questions: Vec<Question>,
    /// Only shown to staff.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referenced_solution: Option<String>,
    pub created_by: i64,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ExamResponse {
    /// Staff view, including the reference solution.
    pub fn full(exam: &Exam) -> Self {
        Self {
            id: exam.id,
            title: exam.title.clone(),
            subject: exam.subject,
            description: exam.description.clone(),
            format: exam.format,
            status: exam.status,
            file_url: exam.file_url.clone(),
            class_id: exam.class_id,
            end_date: exam.end_date,
            total_points: exam.total_points(),
            questions: exam.questions().to_vec(),
            referenced_solution: exam.referenced_solution.clone(),
            created_by: exam.created_by,
            version: exam.version,
            created_at: exam.created_at,
            updated_at: exam.updated_at,
        }
    }

    /// Student view, the reference solution is withheld.
    pub fn public(exam: &Exam) -> Self {
        Self {
            referenced_solution: None,
            ..Self::full(exam)
        }
    }
}

/// An exam together with the requesting student's submission.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentExamResponse {
    #[serde(flatten)]
    pub exam: ExamResponse,
    pub submission: Option<SubmissionResponse>,
    pub is_open: bool,
    pub remaining_seconds: i64,
}
