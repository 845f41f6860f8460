// src/handlers/exams.rs

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
    domain::{Actor, scoring},
    error::AppError,
    models::{
        exam::{
            AddQuestionRequest, CreateExamRequest, ExamResponse, StudentExamResponse,
            UpdateExamRequest, UpdateQuestionRequest,
        },
        submission::{RosterResponse, StatusCounts, SubmissionResponse},
    },
    services::Lifecycle,
};

/// Creates a draft exam. Professors and admins only.
pub async fn create_exam(
    State(lifecycle): State<Arc<Lifecycle>>,
    Extension(actor): Extension<Actor>,
    Json(payload): Json<CreateExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let exam = lifecycle.create_exam(&actor, payload.into()).await?;
    Ok((StatusCode::CREATED, Json(ExamResponse::full(&exam))))
}

/// Lists the exams visible to the caller.
pub async fn list_exams(
    State(lifecycle): State<Arc<Lifecycle>>,
    Extension(actor): Extension<Actor>,
) -> Result<impl IntoResponse, AppError> {
    let exams = lifecycle.list_exams(&actor).await?;
    let view = if actor.is_staff() {
        ExamResponse::full
    } else {
        ExamResponse::public
    };

    Ok(Json(exams.iter().map(view).collect::<Vec<_>>()))
}

pub async fn professor_exams(
    State(lifecycle): State<Arc<Lifecycle>>,
    Extension(actor): Extension<Actor>,
) -> Result<impl IntoResponse, AppError> {
    let exams = lifecycle.professor_exams(&actor).await?;
    Ok(Json(exams.iter().map(ExamResponse::full).collect::<Vec<_>>()))
}

/// The caller's assigned exams, each with its submission and time left.
pub async fn student_exams(
    State(lifecycle): State<Arc<Lifecycle>>,
    Extension(actor): Extension<Actor>,
) -> Result<impl IntoResponse, AppError> {
    let now = Utc::now();
    let entries = lifecycle.student_exams(&actor).await?;

    let body: Vec<StudentExamResponse> = entries
        .iter()
        .map(|(exam, submission)| StudentExamResponse {
            exam: ExamResponse::public(exam),
            submission: Some(SubmissionResponse::from(submission)),
            is_open: exam.is_open(now),
            remaining_seconds: exam.remaining_seconds(now),
        })
        .collect();

    Ok(Json(body))
}

pub async fn get_exam(
    State(lifecycle): State<Arc<Lifecycle>>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let exam = lifecycle.get_exam(&actor, id).await?;
    let body = if actor.is_staff() {
        ExamResponse::full(&exam)
    } else {
        ExamResponse::public(&exam)
    };
    Ok(Json(body))
}

/// Edits exam metadata. Absent fields are left untouched.
pub async fn update_exam(
    State(lifecycle): State<Arc<Lifecycle>>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let exam = lifecycle.update_exam(&actor, id, payload.into()).await?;
    Ok(Json(ExamResponse::full(&exam)))
}

pub async fn delete_exam(
    State(lifecycle): State<Arc<Lifecycle>>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    lifecycle.delete_exam(&actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_question(
    State(lifecycle): State<Arc<Lifecycle>>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i64>,
    Json(payload): Json<AddQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let exam = lifecycle
        .add_question(&actor, id, payload.points, payload.content)
        .await?;
    Ok((StatusCode::CREATED, Json(ExamResponse::full(&exam))))
}

pub async fn update_question(
    State(lifecycle): State<Arc<Lifecycle>>,
    Extension(actor): Extension<Actor>,
    Path((id, question_id)): Path<(i64, i64)>,
    Json(payload): Json<UpdateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let exam = lifecycle
        .update_question(&actor, id, question_id, payload.points, payload.content)
        .await?;
    Ok(Json(ExamResponse::full(&exam)))
}

pub async fn remove_question(
    State(lifecycle): State<Arc<Lifecycle>>,
    Extension(actor): Extension<Actor>,
    Path((id, question_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    let exam = lifecycle.remove_question(&actor, id, question_id).await?;
    Ok(Json(ExamResponse::full(&exam)))
}

/// Uploads the exam document (multipart field `file`) and attaches it.
pub async fn upload_exam_file(
    State(lifecycle): State<Arc<Lifecycle>>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let upload = read_upload(multipart).await?;

    let exam = lifecycle
        .attach_file(
            &actor,
            id,
            upload.candidate,
            &upload.file_name,
            &upload.bytes,
        )
        .await?;
    Ok(Json(ExamResponse::full(&exam)))
}

pub async fn publish_exam(
    State(lifecycle): State<Arc<Lifecycle>>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let exam = lifecycle.publish(&actor, id).await?;
    Ok(Json(ExamResponse::full(&exam)))
}

/// Roster of one exam with status counts and grade statistics.
pub async fn exam_submissions(
    State(lifecycle): State<Arc<Lifecycle>>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let (exam, submissions) = lifecycle.roster(&actor, id).await?;

    Ok(Json(RosterResponse {
        exam_id: exam.id,
        counts: StatusCounts::tally(&submissions),
        statistics: scoring::summarize(submissions.iter().filter_map(|s| s.score)),
        submissions: submissions.iter().map(SubmissionResponse::from).collect(),
    }))
}
