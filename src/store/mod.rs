// src/store/mod.rs

//! Persistence collaborator.
//!
//! Writes that guard an invariant are conditional: exams on their `version`,
//! submissions on the status they were loaded with. A lost race surfaces as
//! [`StoreError::Stale`] or `Ok(false)` instead of overwriting.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{Exam, Submission, SubmissionStatus};
use crate::models::{
    class::Class,
    user::{NewUser, User},
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} already exists")]
    Duplicate(String),

    #[error("record was modified concurrently")]
    Stale,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("corrupt record: {0}")]
    Corrupt(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Which exams a listing covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExamScope {
    All,
    CreatedBy(i64),
    Class(i64),
    /// Exams the student holds a submission for.
    AssignedTo(i64),
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn insert_user(&self, user: NewUser) -> StoreResult<User>;
    async fn find_user(&self, id: i64) -> StoreResult<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    async fn list_users(&self) -> StoreResult<Vec<User>>;
    /// Returns `false` when no such user existed.
    async fn delete_user(&self, id: i64) -> StoreResult<bool>;

    async fn insert_class(&self, name: &str) -> StoreResult<Class>;
    async fn find_class(&self, id: i64) -> StoreResult<Option<Class>>;
    async fn list_classes(&self) -> StoreResult<Vec<Class>>;
    /// Deleting a class removes its exams and their submissions.
    async fn delete_class(&self, id: i64) -> StoreResult<bool>;
    /// Fails with [`StoreError::Duplicate`] when already enrolled.
    async fn enroll_student(&self, class_id: i64, student_id: i64) -> StoreResult<()>;
    async fn class_students(&self, class_id: i64) -> StoreResult<Vec<i64>>;

    /// Stores a new exam and returns it with its id and version 1.
    async fn insert_exam(&self, exam: &Exam) -> StoreResult<Exam>;
    async fn find_exam(&self, id: i64) -> StoreResult<Option<Exam>>;
    async fn list_exams(&self, scope: ExamScope) -> StoreResult<Vec<Exam>>;
    /// Writes `exam` if its `version` is still current and returns the stored
    /// copy with the bumped version.
    async fn update_exam(&self, exam: &Exam) -> StoreResult<Exam>;
    async fn delete_exam(&self, id: i64) -> StoreResult<bool>;

    /// Creates an in-progress submission for every listed student that does
    /// not have one yet. Returns how many were created.
    async fn assign_exam(&self, exam_id: i64, student_ids: &[i64]) -> StoreResult<usize>;
    async fn find_submission(&self, exam_id: i64, student_id: i64)
    -> StoreResult<Option<Submission>>;
    async fn list_exam_submissions(&self, exam_id: i64) -> StoreResult<Vec<Submission>>;
    async fn list_student_submissions(&self, student_id: i64) -> StoreResult<Vec<Submission>>;
    /// Writes `submission` only if the stored status still equals `expected`.
    /// Returns `false` when the guard did not match.
    async fn update_submission(
        &self,
        submission: &Submission,
        expected: SubmissionStatus,
    ) -> StoreResult<bool>;
}
