// src/services/mod.rs

pub mod corrector;
pub mod grading;
pub mod lifecycle;
pub mod storage;

pub use corrector::{Corrector, DisabledCorrector, HttpCorrector};
pub use grading::GradingWorkflow;
pub use lifecycle::Lifecycle;
pub use storage::{LocalObjectStorage, ObjectStorage};

use crate::domain::{DomainError, DomainResult, Exam, Submission};
use crate::store::Store;

pub(crate) async fn load_exam(store: &dyn Store, exam_id: i64) -> DomainResult<Exam> {
    store
        .find_exam(exam_id)
        .await?
        .ok_or_else(|| DomainError::not_found(format!("exam {exam_id}")))
}

pub(crate) async fn load_submission(
    store: &dyn Store,
    exam_id: i64,
    student_id: i64,
) -> DomainResult<Submission> {
    store
        .find_submission(exam_id, student_id)
        .await?
        .ok_or_else(|| {
            DomainError::not_found(format!(
                "submission of student {student_id} for exam {exam_id}"
            ))
        })
}
