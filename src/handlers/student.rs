// src/handlers/student.rs

use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use validator::Validate;

use super::read_upload;
use crate::{
    domain::Actor,
    error::AppError,
    models::{
        exam::{ExamResponse, StudentExamResponse},
        submission::{ResultEntry, SubmitRequest, SubmissionResponse, UploadResponse},
    },
    services::Lifecycle,
};

/// One assigned exam with the caller's submission and deadline state.
pub async fn get_exam(
    State(lifecycle): State<Arc<Lifecycle>>,
    Extension(actor): Extension<Actor>,
    Path(exam_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let (exam, submission) = lifecycle.student_exam(&actor, exam_id).await?;
    let now = Utc::now();

    Ok(Json(StudentExamResponse {
        exam: ExamResponse::public(&exam),
        submission: Some(SubmissionResponse::from(&submission)),
        is_open: exam.is_open(now),
        remaining_seconds: exam.remaining_seconds(now),
    }))
}

/// Stores a PDF answer (multipart field `file`) and returns its URL.
pub async fn upload_answer(
    State(lifecycle): State<Arc<Lifecycle>>,
    Extension(actor): Extension<Actor>,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let upload = read_upload(multipart).await?;

    let file_url = lifecycle
        .upload_answer(&actor, upload.candidate, &upload.file_name, &upload.bytes)
        .await?;
    Ok((StatusCode::CREATED, Json(UploadResponse { file_url })))
}

/// Hands in the exam. Only once, and not after the deadline.
pub async fn submit_exam(
    State(lifecycle): State<Arc<Lifecycle>>,
    Extension(actor): Extension<Actor>,
    Path(exam_id): Path<i64>,
    Json(payload): Json<SubmitRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let submission = lifecycle
        .submit(&actor, exam_id, payload.file_url.trim())
        .await?;
    Ok(Json(SubmissionResponse::from(&submission)))
}

/// Graded results of a student. The path segment is the student's user id.
pub async fn results(
    State(lifecycle): State<Arc<Lifecycle>>,
    Extension(actor): Extension<Actor>,
    Path(student_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let graded = lifecycle.results(&actor, student_id).await?;

    let body: Vec<ResultEntry> = graded
        .iter()
        .filter_map(|(exam, submission)| {
            let score = submission.score?;
            let band = submission.band()?;
            Some(ResultEntry {
                exam_id: exam.id,
                exam_title: exam.title.clone(),
                subject: exam.subject,
                score,
                band,
                band_label: band.label(),
                feedback: submission.feedback.clone(),
                graded_at: submission.graded_at,
            })
        })
        .collect();

    Ok(Json(body))
}
