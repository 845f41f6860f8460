// src/domain/mod.rs

//! Pure exam and submission rules. Nothing here performs I/O; every
//! time-dependent check takes `now` from the caller.

pub mod actor;
pub mod error;
pub mod exam;
pub mod files;
pub mod grading;
pub mod scoring;
pub mod submission;

pub use actor::{Actor, Role};
pub use error::{ConflictKind, DomainError, DomainResult};
pub use exam::{Exam, ExamDraft, ExamFormat, ExamPatch, ExamStatus, Question, QuestionDraft, Subject};
pub use files::FileCandidate;
pub use scoring::Band;
pub use submission::{Submission, SubmissionStatus};
