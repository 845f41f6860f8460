// src/services/lifecycle.rs

//! Sequences an exam from draft to publication and a submission from
//! hand-in to grading. Every operation takes the acting user explicitly.

use std::sync::Arc;

use chrono::Utc;

use super::grading::GradingWorkflow;
use super::storage::ObjectStorage;
use super::{load_exam, load_submission};
use crate::domain::{
    Actor, ConflictKind, DomainError, DomainResult, Exam, ExamDraft, ExamPatch, FileCandidate,
    Role, Submission, SubmissionStatus, files,
};
use crate::store::{ExamScope, Store};

pub struct Lifecycle {
    store: Arc<dyn Store>,
    storage: Arc<dyn ObjectStorage>,
    grading: GradingWorkflow,
}

impl Lifecycle {
    pub fn new(
        store: Arc<dyn Store>,
        storage: Arc<dyn ObjectStorage>,
        grading: GradingWorkflow,
    ) -> Self {
        Self {
            store,
            storage,
            grading,
        }
    }

    pub fn grading(&self) -> &GradingWorkflow {
        &self.grading
    }

    pub async fn create_exam(&self, actor: &Actor, draft: ExamDraft) -> DomainResult<Exam> {
        actor.require_staff()?;
        if let Some(class_id) = draft.class_id {
            self.ensure_class(class_id).await?;
        }

        let exam = Exam::create(draft, actor.user_id, Utc::now())?;
        let exam = self.store.insert_exam(&exam).await?;
        tracing::info!(
            "Exam {} '{}' created by user {}",
            exam.id,
            exam.title,
            actor.user_id
        );
        Ok(exam)
    }

    /// Exams visible to the actor: all for admins, own for professors,
    /// assigned and published for students.
    pub async fn list_exams(&self, actor: &Actor) -> DomainResult<Vec<Exam>> {
        let scope = match actor.role {
            Role::Admin => ExamScope::All,
            Role::Professor => ExamScope::CreatedBy(actor.user_id),
            Role::Student => ExamScope::AssignedTo(actor.user_id),
        };
        let mut exams = self.store.list_exams(scope).await?;
        if actor.role == Role::Student {
            exams.retain(Exam::is_published);
        }
        Ok(exams)
    }

    pub async fn professor_exams(&self, actor: &Actor) -> DomainResult<Vec<Exam>> {
        actor.require_staff()?;
        self.list_exams(actor).await
    }

    /// Reads an exam. Staff must manage it; students must be assigned to it.
    pub async fn get_exam(&self, actor: &Actor, exam_id: i64) -> DomainResult<Exam> {
        let exam = load_exam(self.store.as_ref(), exam_id).await?;
        if actor.is_staff() {
            actor.require_manager_of(&exam)?;
        } else {
            self.student_exam(actor, exam_id).await?;
        }
        Ok(exam)
    }

    pub async fn update_exam(
        &self,
        actor: &Actor,
        exam_id: i64,
        patch: ExamPatch,
    ) -> DomainResult<Exam> {
        if let Some(class_id) = patch.class_id {
            self.ensure_class(class_id).await?;
        }

        self.mutate_exam(actor, exam_id, |exam| {
            let identity_changed = patch.subject.is_some_and(|s| s != exam.subject)
                || patch.format.is_some_and(|f| f != exam.format);
            if exam.is_published() && identity_changed {
                tracing::warn!(
                    "Subject or format of published exam {} edited, existing hand-ins keep their old format",
                    exam.id
                );
            }
            exam.apply_patch(patch, Utc::now())
        })
        .await
    }

    pub async fn add_question(
        &self,
        actor: &Actor,
        exam_id: i64,
        points: f64,
        content: Option<String>,
    ) -> DomainResult<Exam> {
        self.mutate_exam(actor, exam_id, |exam| {
            exam.add_question(points, content).map(|_| ())
        })
        .await
    }

    pub async fn update_question(
        &self,
        actor: &Actor,
        exam_id: i64,
        question_id: i64,
        points: Option<f64>,
        content: Option<Option<String>>,
    ) -> DomainResult<Exam> {
        if points.is_none() && content.is_none() {
            return Err(DomainError::validation(
                "nothing to update, give points or content",
            ));
        }

        self.mutate_exam(actor, exam_id, |exam| {
            if let Some(points) = points {
                exam.update_question_points(question_id, points)?;
            }
            if let Some(content) = content {
                exam.update_question_content(question_id, content)?;
            }
            Ok(())
        })
        .await
    }

    pub async fn remove_question(
        &self,
        actor: &Actor,
        exam_id: i64,
        question_id: i64,
    ) -> DomainResult<Exam> {
        self.mutate_exam(actor, exam_id, |exam| exam.remove_question(question_id))
            .await
    }

    /// Validates, uploads and attaches the exam document.
    ///
    /// If the final write fails the uploaded object is left orphaned; the
    /// exam itself is never half-updated.
    pub async fn attach_file(
        &self,
        actor: &Actor,
        exam_id: i64,
        file: FileCandidate,
        file_name: &str,
        bytes: &[u8],
    ) -> DomainResult<Exam> {
        let mut exam = load_exam(self.store.as_ref(), exam_id).await?;
        actor.require_manager_of(&exam)?;
        exam.accepts_file(&file)?;

        let url = self
            .storage
            .upload(bytes, file_name)
            .await
            .map_err(|e| DomainError::upstream(e.to_string()))?;

        exam.attach_file(&file, url.clone())?;
        match self.store.update_exam(&exam).await {
            Ok(saved) => {
                tracing::info!("Document attached to exam {}: {}", exam_id, url);
                Ok(saved)
            }
            Err(e) => {
                tracing::warn!("Orphaned upload {} for exam {}: {}", url, exam_id, e);
                Err(e.into())
            }
        }
    }

    /// Publishes the exam, opens a submission for every enrolled student and
    /// tries to prepare a reference solution.
    ///
    /// Publishing an already published exam still opens any missing
    /// submissions before reporting the conflict, so a publish that failed
    /// after the status write can be completed by calling it again.
    pub async fn publish(&self, actor: &Actor, exam_id: i64) -> DomainResult<Exam> {
        let mut exam = load_exam(self.store.as_ref(), exam_id).await?;
        actor.require_manager_of(&exam)?;

        if exam.is_published() {
            self.open_roster(&exam).await?;
            return Err(ConflictKind::AlreadyPublished.into());
        }

        exam.publish()?;
        let published = self.store.update_exam(&exam).await?;
        self.open_roster(&published).await?;

        if published.referenced_solution.is_some() {
            return Ok(published);
        }
        Ok(self.prepare_solution(published).await)
    }

    /// Creates the missing IN_PROGRESS submissions for the exam's class.
    async fn open_roster(&self, exam: &Exam) -> DomainResult<usize> {
        let students = self.store.class_students(exam.class_id).await?;
        let created = self.store.assign_exam(exam.id, &students).await?;
        if created > 0 {
            tracing::info!(
                "Exam {} opened for class {} ({} submissions created)",
                exam.id,
                exam.class_id,
                created
            );
        }
        Ok(created)
    }

    /// Best effort: the exam stays published without a solution on failure.
    async fn prepare_solution(&self, mut exam: Exam) -> Exam {
        let text = match self.grading.draft_solution(&exam).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("No reference solution for exam {}: {}", exam.id, e);
                return exam;
            }
        };

        let fallback = exam.clone();
        exam.set_reference_solution(Some(text));
        match self.store.update_exam(&exam).await {
            Ok(saved) => saved,
            Err(e) => {
                tracing::warn!(
                    "Could not store reference solution for exam {}: {}",
                    exam.id,
                    e
                );
                fallback
            }
        }
    }

    pub async fn delete_exam(&self, actor: &Actor, exam_id: i64) -> DomainResult<()> {
        let exam = load_exam(self.store.as_ref(), exam_id).await?;
        actor.require_manager_of(&exam)?;

        if !self.store.delete_exam(exam_id).await? {
            return Err(DomainError::not_found(format!("exam {exam_id}")));
        }
        tracing::info!("Exam {} deleted by user {}", exam_id, actor.user_id);
        Ok(())
    }

    /// All submissions of one exam.
    pub async fn roster(
        &self,
        actor: &Actor,
        exam_id: i64,
    ) -> DomainResult<(Exam, Vec<Submission>)> {
        let exam = load_exam(self.store.as_ref(), exam_id).await?;
        actor.require_manager_of(&exam)?;
        let submissions = self.store.list_exam_submissions(exam_id).await?;
        Ok((exam, submissions))
    }

    /// Published exams assigned to the student, each with its submission.
    pub async fn student_exams(&self, actor: &Actor) -> DomainResult<Vec<(Exam, Submission)>> {
        actor.require_student()?;
        let exams = self.list_exams(actor).await?;
        let submissions = self.store.list_student_submissions(actor.user_id).await?;

        Ok(exams
            .into_iter()
            .filter_map(|exam| {
                let sub = submissions.iter().find(|s| s.exam_id == exam.id)?.clone();
                Some((exam, sub))
            })
            .collect())
    }

    pub async fn student_exam(
        &self,
        actor: &Actor,
        exam_id: i64,
    ) -> DomainResult<(Exam, Submission)> {
        actor.require_student()?;
        let exam = load_exam(self.store.as_ref(), exam_id).await?;
        let submission = self
            .store
            .find_submission(exam_id, actor.user_id)
            .await?
            .filter(|_| exam.is_published())
            .ok_or_else(|| DomainError::not_found(format!("exam {exam_id}")))?;
        Ok((exam, submission))
    }

    /// Stores an answer document and returns its URL for a later submit.
    pub async fn upload_answer(
        &self,
        actor: &Actor,
        file: FileCandidate,
        file_name: &str,
        bytes: &[u8],
    ) -> DomainResult<String> {
        actor.require_student()?;
        files::validate_submission(&file)?;

        let url = self
            .storage
            .upload(bytes, file_name)
            .await
            .map_err(|e| DomainError::upstream(e.to_string()))?;
        tracing::info!("Answer uploaded by student {}: {}", actor.user_id, url);
        Ok(url)
    }

    pub async fn submit(
        &self,
        actor: &Actor,
        exam_id: i64,
        file_url: &str,
    ) -> DomainResult<Submission> {
        actor.require_student()?;
        let exam = load_exam(self.store.as_ref(), exam_id).await?;
        let mut submission = load_submission(self.store.as_ref(), exam_id, actor.user_id).await?;

        let expected = submission.status;
        submission.submit(&exam, file_url, Utc::now())?;

        // Another hand-in won the race.
        if !self.store.update_submission(&submission, expected).await? {
            return Err(ConflictKind::AlreadySubmitted.into());
        }

        tracing::info!(
            "Student {} submitted exam {}",
            actor.user_id,
            exam_id
        );
        Ok(submission)
    }

    /// Graded exams of a student.
    pub async fn results(
        &self,
        actor: &Actor,
        student_id: i64,
    ) -> DomainResult<Vec<(Exam, Submission)>> {
        actor.require_self_or_admin(student_id)?;

        let submissions = self.store.list_student_submissions(student_id).await?;
        let mut results = Vec::new();
        for submission in submissions
            .into_iter()
            .filter(|s| s.status == SubmissionStatus::Graded)
        {
            if let Some(exam) = self.store.find_exam(submission.exam_id).await? {
                results.push((exam, submission));
            }
        }
        Ok(results)
    }

    /// Enrols a student and opens submissions for the class's published exams.
    pub async fn enroll_student(
        &self,
        actor: &Actor,
        class_id: i64,
        student_id: i64,
    ) -> DomainResult<usize> {
        actor.require_admin()?;
        self.ensure_class(class_id).await?;

        let user = self
            .store
            .find_user(student_id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("user {student_id}")))?;
        if user.role != Role::Student {
            return Err(DomainError::validation(format!(
                "user {student_id} is not a student"
            )));
        }

        self.store.enroll_student(class_id, student_id).await?;

        let mut opened = 0;
        for exam in self.store.list_exams(ExamScope::Class(class_id)).await? {
            if exam.is_published() {
                opened += self.store.assign_exam(exam.id, &[student_id]).await?;
            }
        }
        tracing::info!(
            "Student {} enrolled in class {} ({} submissions opened)",
            student_id,
            class_id,
            opened
        );
        Ok(opened)
    }

    async fn ensure_class(&self, class_id: i64) -> DomainResult<()> {
        self.store
            .find_class(class_id)
            .await?
            .map(|_| ())
            .ok_or_else(|| DomainError::not_found(format!("class {class_id}")))
    }

    /// Load, check rights, change, write back under the loaded version.
    async fn mutate_exam<F>(&self, actor: &Actor, exam_id: i64, change: F) -> DomainResult<Exam>
    where
        F: FnOnce(&mut Exam) -> DomainResult<()>,
    {
        let mut exam = load_exam(self.store.as_ref(), exam_id).await?;
        actor.require_manager_of(&exam)?;
        change(&mut exam)?;
        Ok(self.store.update_exam(&exam).await?)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::Duration as ChronoDuration;

    use super::*;
    use crate::domain::{QuestionDraft, Subject};
    use crate::models::class::Class;
    use crate::models::user::{NewUser, User};
    use crate::services::{DisabledCorrector, LocalObjectStorage};
    use crate::store::{MemoryStore, StoreError, StoreResult};

    /// Memory store whose next `assign_exam` fails.
    #[derive(Default)]
    struct FlakyStore {
        inner: MemoryStore,
        fail_assign: AtomicBool,
    }

    #[async_trait]
    impl Store for FlakyStore {
        async fn insert_user(&self, user: NewUser) -> StoreResult<User> {
            self.inner.insert_user(user).await
        }
        async fn find_user(&self, id: i64) -> StoreResult<Option<User>> {
            self.inner.find_user(id).await
        }
        async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
            self.inner.find_user_by_email(email).await
        }
        async fn list_users(&self) -> StoreResult<Vec<User>> {
            self.inner.list_users().await
        }
        async fn delete_user(&self, id: i64) -> StoreResult<bool> {
            self.inner.delete_user(id).await
        }
        async fn insert_class(&self, name: &str) -> StoreResult<Class> {
            self.inner.insert_class(name).await
        }
        async fn find_class(&self, id: i64) -> StoreResult<Option<Class>> {
            self.inner.find_class(id).await
        }
        async fn list_classes(&self) -> StoreResult<Vec<Class>> {
            self.inner.list_classes().await
        }
        async fn delete_class(&self, id: i64) -> StoreResult<bool> {
            self.inner.delete_class(id).await
        }
        async fn enroll_student(&self, class_id: i64, student_id: i64) -> StoreResult<()> {
            self.inner.enroll_student(class_id, student_id).await
        }
        async fn class_students(&self, class_id: i64) -> StoreResult<Vec<i64>> {
            self.inner.class_students(class_id).await
        }
        async fn insert_exam(&self, exam: &Exam) -> StoreResult<Exam> {
            self.inner.insert_exam(exam).await
        }
        async fn find_exam(&self, id: i64) -> StoreResult<Option<Exam>> {
            self.inner.find_exam(id).await
        }
        async fn list_exams(&self, scope: ExamScope) -> StoreResult<Vec<Exam>> {
            self.inner.list_exams(scope).await
        }
        async fn update_exam(&self, exam: &Exam) -> StoreResult<Exam> {
            self.inner.update_exam(exam).await
        }
        async fn delete_exam(&self, id: i64) -> StoreResult<bool> {
            self.inner.delete_exam(id).await
        }
        async fn assign_exam(&self, exam_id: i64, student_ids: &[i64]) -> StoreResult<usize> {
            if self.fail_assign.swap(false, Ordering::SeqCst) {
                return Err(StoreError::Corrupt("connection reset".to_string()));
            }
            self.inner.assign_exam(exam_id, student_ids).await
        }
        async fn find_submission(
            &self,
            exam_id: i64,
            student_id: i64,
        ) -> StoreResult<Option<Submission>> {
            self.inner.find_submission(exam_id, student_id).await
        }
        async fn list_exam_submissions(&self, exam_id: i64) -> StoreResult<Vec<Submission>> {
            self.inner.list_exam_submissions(exam_id).await
        }
        async fn list_student_submissions(&self, student_id: i64) -> StoreResult<Vec<Submission>> {
            self.inner.list_student_submissions(student_id).await
        }
        async fn update_submission(
            &self,
            submission: &Submission,
            expected: SubmissionStatus,
        ) -> StoreResult<bool> {
            self.inner.update_submission(submission, expected).await
        }
    }

    async fn lifecycle(store: Arc<FlakyStore>, dir: &tempfile::TempDir) -> Lifecycle {
        let storage = LocalObjectStorage::new(dir.path(), "http://localhost:3000")
            .await
            .unwrap();
        let grading = GradingWorkflow::new(
            store.clone(),
            Arc::new(DisabledCorrector),
            Duration::from_secs(1),
        );
        Lifecycle::new(store, Arc::new(storage), grading)
    }

    async fn documented_exam(lifecycle: &Lifecycle, professor: &Actor, class_id: i64) -> Exam {
        let exam = lifecycle
            .create_exam(
                professor,
                ExamDraft {
                    title: Some("Normal forms".to_string()),
                    subject: Some(Subject::Database),
                    class_id: Some(class_id),
                    end_date: Some(Utc::now() + ChronoDuration::days(3)),
                    questions: vec![QuestionDraft {
                        points: 20.0,
                        content: None,
                    }],
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        lifecycle
            .attach_file(
                professor,
                exam.id,
                FileCandidate::new("application/pdf", 4),
                "exam.pdf",
                b"%PDF",
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_publish_retry_opens_missing_submissions() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FlakyStore::default());
        let lifecycle = lifecycle(store.clone(), &dir).await;

        let professor = Actor::new(1, Role::Professor);
        let student = Actor::new(2, Role::Student);
        let class = store.insert_class("B2").await.unwrap();
        store.enroll_student(class.id, student.user_id).await.unwrap();
        let exam = documented_exam(&lifecycle, &professor, class.id).await;

        store.fail_assign.store(true, Ordering::SeqCst);
        assert!(lifecycle.publish(&professor, exam.id).await.is_err());
        assert!(store.find_exam(exam.id).await.unwrap().unwrap().is_published());
        assert!(store.find_submission(exam.id, 2).await.unwrap().is_none());

        // The retry still reports the conflict but completes the roster
        let err = lifecycle.publish(&professor, exam.id).await.unwrap_err();
        assert!(matches!(
            err,
            DomainError::Conflict(ConflictKind::AlreadyPublished)
        ));
        assert!(store.find_submission(exam.id, 2).await.unwrap().is_some());

        let submission = lifecycle
            .submit(&student, exam.id, "https://files.example.com/answer.pdf")
            .await
            .unwrap();
        assert_eq!(submission.status, SubmissionStatus::Completed);
    }

    #[tokio::test]
    async fn test_concurrent_submits_have_one_winner() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FlakyStore::default());
        let lifecycle = Arc::new(lifecycle(store.clone(), &dir).await);

        let professor = Actor::new(1, Role::Professor);
        let student = Actor::new(2, Role::Student);
        let class = store.insert_class("B2").await.unwrap();
        store.enroll_student(class.id, student.user_id).await.unwrap();
        let exam = documented_exam(&lifecycle, &professor, class.id).await;
        lifecycle.publish(&professor, exam.id).await.unwrap();
        let exam_id = exam.id;

        let tasks: Vec<_> = (0..8)
            .map(|i| {
                let lifecycle = lifecycle.clone();
                tokio::spawn(async move {
                    lifecycle
                        .submit(
                            &student,
                            exam_id,
                            &format!("https://files.example.com/answer-{i}.pdf"),
                        )
                        .await
                })
            })
            .collect();

        let mut accepted = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(_) => accepted += 1,
                Err(err) => assert!(matches!(
                    err,
                    DomainError::Conflict(ConflictKind::AlreadySubmitted)
                )),
            }
        }
        assert_eq!(accepted, 1);
    }
}
