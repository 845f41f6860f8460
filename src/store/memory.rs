// src/store/memory.rs

//! In-process store with the same conditional-write semantics as
//! [`PgStore`](super::PgStore). Used by tests and local experiments.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{ExamScope, Store, StoreError, StoreResult};
use crate::domain::{Exam, Submission, SubmissionStatus};
use crate::models::{
    class::Class,
    user::{NewUser, User},
};

#[derive(Default)]
struct Inner {
    next_id: i64,
    users: BTreeMap<i64, User>,
    classes: BTreeMap<i64, Class>,
    /// (class_id, student_id)
    enrolments: BTreeSet<(i64, i64)>,
    exams: BTreeMap<i64, Exam>,
    submissions: BTreeMap<i64, Submission>,
}

impl Inner {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn remove_exam(&mut self, exam_id: i64) -> bool {
        self.submissions.retain(|_, s| s.exam_id != exam_id);
        self.exams.remove(&exam_id).is_some()
    }
}

#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_user(&self, user: NewUser) -> StoreResult<User> {
        let mut inner = self.inner.write().await;
        if inner.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Duplicate(format!("user '{}'", user.email)));
        }

        let id = inner.next_id();
        let stored = User {
            id,
            email: user.email,
            name: user.name,
            password: user.password_hash,
            role: user.role,
            created_at: Utc::now(),
        };
        inner.users.insert(id, stored.clone());
        Ok(stored)
    }

    async fn find_user(&self, id: i64) -> StoreResult<Option<User>> {
        Ok(self.inner.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner.users.values().find(|u| u.email == email).cloned())
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let inner = self.inner.read().await;
        Ok(inner.users.values().rev().cloned().collect())
    }

    async fn delete_user(&self, id: i64) -> StoreResult<bool> {
        let mut inner = self.inner.write().await;
        if inner.users.remove(&id).is_none() {
            return Ok(false);
        }

        inner.enrolments.retain(|(_, student)| *student != id);
        inner.submissions.retain(|_, s| s.student_id != id);
        let authored: Vec<i64> = inner
            .exams
            .values()
            .filter(|e| e.created_by == id)
            .map(|e| e.id)
            .collect();
        for exam_id in authored {
            inner.remove_exam(exam_id);
        }
        Ok(true)
    }

    async fn insert_class(&self, name: &str) -> StoreResult<Class> {
        let mut inner = self.inner.write().await;
        if inner.classes.values().any(|c| c.name == name) {
            return Err(StoreError::Duplicate(format!("class '{name}'")));
        }

        let id = inner.next_id();
        let class = Class {
            id,
            name: name.to_string(),
            created_at: Utc::now(),
        };
        inner.classes.insert(id, class.clone());
        Ok(class)
    }

    async fn find_class(&self, id: i64) -> StoreResult<Option<Class>> {
        Ok(self.inner.read().await.classes.get(&id).cloned())
    }

    async fn list_classes(&self) -> StoreResult<Vec<Class>> {
        let inner = self.inner.read().await;
        let mut classes: Vec<Class> = inner.classes.values().cloned().collect();
        classes.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(classes)
    }

    async fn delete_class(&self, id: i64) -> StoreResult<bool> {
        let mut inner = self.inner.write().await;
        if inner.classes.remove(&id).is_none() {
            return Ok(false);
        }

        inner.enrolments.retain(|(class, _)| *class != id);
        let exams: Vec<i64> = inner
            .exams
            .values()
            .filter(|e| e.class_id == id)
            .map(|e| e.id)
            .collect();
        for exam_id in exams {
            inner.remove_exam(exam_id);
        }
        Ok(true)
    }

    async fn enroll_student(&self, class_id: i64, student_id: i64) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        if !inner.enrolments.insert((class_id, student_id)) {
            return Err(StoreError::Duplicate(format!(
                "enrolment of student {student_id}"
            )));
        }
        Ok(())
    }

    async fn class_students(&self, class_id: i64) -> StoreResult<Vec<i64>> {
        let inner = self.inner.read().await;
        Ok(inner
            .enrolments
            .iter()
            .filter(|(class, _)| *class == class_id)
            .map(|(_, student)| *student)
            .collect())
    }

    async fn insert_exam(&self, exam: &Exam) -> StoreResult<Exam> {
        let mut inner = self.inner.write().await;
        let mut stored = exam.clone();
        stored.id = inner.next_id();
        stored.version = 1;
        inner.exams.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn find_exam(&self, id: i64) -> StoreResult<Option<Exam>> {
        Ok(self.inner.read().await.exams.get(&id).cloned())
    }

    async fn list_exams(&self, scope: ExamScope) -> StoreResult<Vec<Exam>> {
        let inner = self.inner.read().await;
        let mut exams: Vec<Exam> = match scope {
            ExamScope::All => inner.exams.values().cloned().collect(),
            ExamScope::CreatedBy(user_id) => inner
                .exams
                .values()
                .filter(|e| e.created_by == user_id)
                .cloned()
                .collect(),
            ExamScope::Class(class_id) => inner
                .exams
                .values()
                .filter(|e| e.class_id == class_id)
                .cloned()
                .collect(),
            ExamScope::AssignedTo(student_id) => {
                let assigned: BTreeSet<i64> = inner
                    .submissions
                    .values()
                    .filter(|s| s.student_id == student_id)
                    .map(|s| s.exam_id)
                    .collect();
                assigned
                    .iter()
                    .filter_map(|id| inner.exams.get(id).cloned())
                    .collect()
            }
        };
        exams.sort_by(|a, b| b.end_date.cmp(&a.end_date).then(b.id.cmp(&a.id)));
        Ok(exams)
    }

    async fn update_exam(&self, exam: &Exam) -> StoreResult<Exam> {
        let mut inner = self.inner.write().await;
        let current = inner.exams.get_mut(&exam.id).ok_or(StoreError::Stale)?;
        if current.version != exam.version {
            return Err(StoreError::Stale);
        }

        let mut stored = exam.clone();
        stored.version += 1;
        stored.updated_at = Utc::now();
        *current = stored.clone();
        Ok(stored)
    }

    async fn delete_exam(&self, id: i64) -> StoreResult<bool> {
        Ok(self.inner.write().await.remove_exam(id))
    }

    async fn assign_exam(&self, exam_id: i64, student_ids: &[i64]) -> StoreResult<usize> {
        let mut inner = self.inner.write().await;
        let mut created = 0;
        for &student_id in student_ids {
            let exists = inner
                .submissions
                .values()
                .any(|s| s.exam_id == exam_id && s.student_id == student_id);
            if exists {
                continue;
            }
            let mut submission = Submission::new(exam_id, student_id);
            submission.id = inner.next_id();
            inner.submissions.insert(submission.id, submission);
            created += 1;
        }
        Ok(created)
    }

    async fn find_submission(
        &self,
        exam_id: i64,
        student_id: i64,
    ) -> StoreResult<Option<Submission>> {
        let inner = self.inner.read().await;
        Ok(inner
            .submissions
            .values()
            .find(|s| s.exam_id == exam_id && s.student_id == student_id)
            .cloned())
    }

    async fn list_exam_submissions(&self, exam_id: i64) -> StoreResult<Vec<Submission>> {
        let inner = self.inner.read().await;
        let mut subs: Vec<Submission> = inner
            .submissions
            .values()
            .filter(|s| s.exam_id == exam_id)
            .cloned()
            .collect();
        subs.sort_by_key(|s| s.student_id);
        Ok(subs)
    }

    async fn list_student_submissions(&self, student_id: i64) -> StoreResult<Vec<Submission>> {
        let inner = self.inner.read().await;
        let mut subs: Vec<Submission> = inner
            .submissions
            .values()
            .filter(|s| s.student_id == student_id)
            .cloned()
            .collect();
        subs.sort_by_key(|s| s.exam_id);
        Ok(subs)
    }

    async fn update_submission(
        &self,
        submission: &Submission,
        expected: SubmissionStatus,
    ) -> StoreResult<bool> {
        let mut inner = self.inner.write().await;
        match inner.submissions.get_mut(&submission.id) {
            Some(current) if current.status == expected => {
                *current = submission.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Role;

    fn student(email: &str) -> NewUser {
        NewUser {
            email: email.to_string(),
            name: "Student".to_string(),
            password_hash: "hash".to_string(),
            role: Role::Student,
        }
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let store = MemoryStore::new();
        store.insert_user(student("a@example.com")).await.unwrap();
        let err = store.insert_user(student("a@example.com")).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));
    }

    #[tokio::test]
    async fn test_assign_is_idempotent() {
        let store = MemoryStore::new();
        assert_eq!(store.assign_exam(1, &[10, 11]).await.unwrap(), 2);
        assert_eq!(store.assign_exam(1, &[10, 11, 12]).await.unwrap(), 1);
        assert_eq!(store.list_exam_submissions(1).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_status_guarded_update() {
        let store = MemoryStore::new();
        store.assign_exam(1, &[10]).await.unwrap();
        let mut sub = store.find_submission(1, 10).await.unwrap().unwrap();

        sub.status = SubmissionStatus::Completed;
        assert!(
            store
                .update_submission(&sub, SubmissionStatus::InProgress)
                .await
                .unwrap()
        );
        // A second writer that loaded the old status loses.
        assert!(
            !store
                .update_submission(&sub, SubmissionStatus::InProgress)
                .await
                .unwrap()
        );
    }
}
