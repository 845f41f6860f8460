// src/services/grading.rs

//! Manual and automatic grading of submissions, and reference solutions.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::timeout;

use super::corrector::{CorrectionRequest, Corrector, CorrectorError, SolutionRequest};
use super::{load_exam, load_submission};
use crate::domain::{
    Actor, ConflictKind, DomainError, DomainResult, Exam, Submission,
    grading::{self, GradeInput},
};
use crate::store::Store;
use crate::utils::html::clean_feedback;

pub struct GradingWorkflow {
    store: Arc<dyn Store>,
    corrector: Arc<dyn Corrector>,
    corrector_timeout: Duration,
}

impl GradingWorkflow {
    pub fn new(
        store: Arc<dyn Store>,
        corrector: Arc<dyn Corrector>,
        corrector_timeout: Duration,
    ) -> Self {
        Self {
            store,
            corrector,
            corrector_timeout,
        }
    }

    /// Loads one student's submission for an exam the actor manages.
    pub async fn submission_for(
        &self,
        actor: &Actor,
        exam_id: i64,
        student_id: i64,
    ) -> DomainResult<(Exam, Submission)> {
        let exam = load_exam(self.store.as_ref(), exam_id).await?;
        actor.require_manager_of(&exam)?;
        let submission = load_submission(self.store.as_ref(), exam_id, student_id).await?;
        Ok((exam, submission))
    }

    /// Records a grade typed in by staff.
    pub async fn grade(
        &self,
        actor: &Actor,
        exam_id: i64,
        student_id: i64,
        score: f64,
        feedback: Option<String>,
    ) -> DomainResult<Submission> {
        let (_, submission) = self.submission_for(actor, exam_id, student_id).await?;
        self.record(submission, GradeInput::manual(score, feedback))
            .await
    }

    /// Asks the corrector for a grade and records it.
    ///
    /// Any corrector failure leaves the submission untouched.
    pub async fn auto_correct(
        &self,
        actor: &Actor,
        exam_id: i64,
        student_id: i64,
    ) -> DomainResult<Submission> {
        let (exam, submission) = self.submission_for(actor, exam_id, student_id).await?;
        if !submission.is_gradable() {
            return Err(ConflictKind::NotSubmitted.into());
        }

        let request = CorrectionRequest {
            exam_id,
            student_id,
            submission_url: submission.file_url.clone().unwrap_or_default(),
            exam_url: exam.file_url.clone(),
            reference_solution: exam.referenced_solution.clone(),
            total_points: exam.total_points(),
        };

        tracing::info!(
            "Auto-correcting exam {} for student {}",
            exam_id,
            student_id
        );
        let outcome = match timeout(self.corrector_timeout, self.corrector.auto_correct(&request))
            .await
        {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                tracing::warn!("Auto-correction of exam {} failed: {}", exam_id, e);
                return Err(upstream(e));
            }
            Err(_) => {
                tracing::warn!(
                    "Auto-correction of exam {} timed out after {:?}",
                    exam_id,
                    self.corrector_timeout
                );
                return Err(DomainError::upstream("auto-correction timed out"));
            }
        };

        self.record(
            submission,
            GradeInput::automatic(outcome.score, outcome.feedback),
        )
        .await
    }

    async fn record(
        &self,
        mut submission: Submission,
        mut input: GradeInput,
    ) -> DomainResult<Submission> {
        input.feedback = input
            .feedback
            .map(|f| clean_feedback(&f))
            .filter(|f| !f.trim().is_empty());

        let expected = submission.status;
        let source = input.source;
        let band = grading::apply(&mut submission, input, Utc::now())?;

        if !self.store.update_submission(&submission, expected).await? {
            return Err(ConflictKind::ConcurrentModification.into());
        }

        tracing::info!(
            "Submission {} graded ({}): {:?} -> {}",
            submission.id,
            source.as_str(),
            submission.score,
            band.label()
        );
        Ok(submission)
    }

    /// Asks the corrector for a reference solution text.
    pub async fn draft_solution(&self, exam: &Exam) -> DomainResult<String> {
        let request = SolutionRequest::from(exam);
        match timeout(
            self.corrector_timeout,
            self.corrector.generate_reference_solution(&request),
        )
        .await
        {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(e)) => Err(upstream(e)),
            Err(_) => Err(DomainError::upstream(
                "reference solution generation timed out",
            )),
        }
    }

    /// Generates and stores a reference solution, replacing any existing one.
    pub async fn generate_solution(&self, actor: &Actor, exam_id: i64) -> DomainResult<Exam> {
        let mut exam = load_exam(self.store.as_ref(), exam_id).await?;
        actor.require_manager_of(&exam)?;

        let text = self.draft_solution(&exam).await?;
        exam.set_reference_solution(Some(text));
        let saved = self.store.update_exam(&exam).await?;
        tracing::info!("Reference solution generated for exam {}", exam_id);
        Ok(saved)
    }

    /// Hand-edits the reference solution. Blank text clears it.
    pub async fn set_solution(
        &self,
        actor: &Actor,
        exam_id: i64,
        text: Option<String>,
    ) -> DomainResult<Exam> {
        let mut exam = load_exam(self.store.as_ref(), exam_id).await?;
        actor.require_manager_of(&exam)?;

        exam.set_reference_solution(text);
        Ok(self.store.update_exam(&exam).await?)
    }
}

fn upstream(err: CorrectorError) -> DomainError {
    DomainError::upstream(err.to_string())
}
