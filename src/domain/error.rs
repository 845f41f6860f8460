// src/domain/error.rs

use std::fmt;

use thiserror::Error;

use crate::store::StoreError;

/// Reasons a request is refused because of the current state of the data.
/// None of these are retryable without a state change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictKind {
    AlreadySubmitted,
    DeadlineExceeded,
    AlreadyPublished,
    ExamNotPublished,
    /// Grading was attempted before the student submitted.
    NotSubmitted,
    /// The exam's class cannot change once its roster has submissions.
    ClassLocked,
    Duplicate(String),
    ConcurrentModification,
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadySubmitted => f.write_str("exam already submitted"),
            Self::DeadlineExceeded => f.write_str("submission deadline has passed"),
            Self::AlreadyPublished => f.write_str("exam is already published"),
            Self::ExamNotPublished => f.write_str("exam is not published"),
            Self::NotSubmitted => f.write_str("submission has not been handed in yet"),
            Self::ClassLocked => f.write_str("class cannot change after publication"),
            Self::Duplicate(what) => write!(f, "{what} already exists"),
            Self::ConcurrentModification => {
                f.write_str("resource was modified concurrently, reload and retry")
            }
        }
    }
}

/// The single error taxonomy shared by every domain operation.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("{0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Conflict(ConflictKind),

    #[error("{0}")]
    Unauthorized(String),

    #[error("upstream failure: {0}")]
    Upstream(String),

    #[error(transparent)]
    Persistence(StoreError),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn upstream(msg: impl Into<String>) -> Self {
        Self::Upstream(msg.into())
    }
}

impl From<ConflictKind> for DomainError {
    fn from(kind: ConflictKind) -> Self {
        Self::Conflict(kind)
    }
}

impl From<StoreError> for DomainError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate(what) => Self::Conflict(ConflictKind::Duplicate(what)),
            StoreError::Stale => Self::Conflict(ConflictKind::ConcurrentModification),
            other => Self::Persistence(other),
        }
    }
}

pub type DomainResult<T> = Result<T, DomainError>;
