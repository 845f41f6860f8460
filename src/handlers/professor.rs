// src/handlers/professor.rs

//! Grading and reference solutions. Sits behind `staff_middleware`; the
//! per-exam author check happens in the grading workflow.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Path, State},
    response::IntoResponse,
};
use validator::Validate;

use crate::{
    domain::Actor,
    error::AppError,
    models::{
        exam::{ExamResponse, ReferenceSolutionRequest},
        submission::{GradeRequest, SubmissionResponse},
    },
    services::Lifecycle,
};

pub async fn get_submission(
    State(lifecycle): State<Arc<Lifecycle>>,
    Extension(actor): Extension<Actor>,
    Path((exam_id, student_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    let (_, submission) = lifecycle
        .grading()
        .submission_for(&actor, exam_id, student_id)
        .await?;
    Ok(Json(SubmissionResponse::from(&submission)))
}

pub async fn auto_correct(
    State(lifecycle): State<Arc<Lifecycle>>,
    Extension(actor): Extension<Actor>,
    Path((exam_id, student_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    let submission = lifecycle
        .grading()
        .auto_correct(&actor, exam_id, student_id)
        .await?;
    Ok(Json(SubmissionResponse::from(&submission)))
}

pub async fn grade(
    State(lifecycle): State<Arc<Lifecycle>>,
    Extension(actor): Extension<Actor>,
    Path((exam_id, student_id)): Path<(i64, i64)>,
    Json(payload): Json<GradeRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let submission = lifecycle
        .grading()
        .grade(&actor, exam_id, student_id, payload.score, payload.feedback)
        .await?;
    Ok(Json(SubmissionResponse::from(&submission)))
}

pub async fn generate_solution(
    State(lifecycle): State<Arc<Lifecycle>>,
    Extension(actor): Extension<Actor>,
    Path(exam_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let exam = lifecycle
        .grading()
        .generate_solution(&actor, exam_id)
        .await?;
    Ok(Json(ExamResponse::full(&exam)))
}

pub async fn set_reference_solution(
    State(lifecycle): State<Arc<Lifecycle>>,
    Extension(actor): Extension<Actor>,
    Path(exam_id): Path<i64>,
    Json(payload): Json<ReferenceSolutionRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let exam = lifecycle
        .grading()
        .set_solution(&actor, exam_id, payload.referenced_solution)
        .await?;
    Ok(Json(ExamResponse::full(&exam)))
}
