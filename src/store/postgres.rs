// src/store/postgres.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, types::Json};

use super::{ExamScope, Store, StoreError, StoreResult};
use crate::domain::{Exam, Question, Submission, SubmissionStatus};
use crate::models::{
    class::Class,
    user::{NewUser, User},
};

const USER_COLUMNS: &str = "id, email, name, password, role, created_at";

const EXAM_COLUMNS: &str = "id, title, subject, description, format, status, file_url, \
     class_id, end_date, questions, next_question_id, referenced_solution, created_by, version, created_at, updated_at";

const SUBMISSION_COLUMNS: &str =
    "id, exam_id, student_id, status, file_url, score, feedback, ended_at, graded_at";

/// PostgreSQL-backed store.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct UserRow {
    id: i64,
    email: String,
    name: String,
    password: String,
    role: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: row.id,
            email: row.email,
            name: row.name,
            password: row.password,
            role: row.role.parse().map_err(corrupt)?,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct ClassRow {
    id: i64,
    name: String,
    created_at: DateTime<Utc>,
}

impl From<ClassRow> for Class {
    fn from(row: ClassRow) -> Self {
        Class {
            id: row.id,
            name: row.name,
            created_at: row.created_at,
        }
    }
}

#[derive(FromRow)]
struct ExamRow {
    id: i64,
    title: String,
    subject: String,
    description: String,
    format: String,
    status: String,
    file_url: Option<String>,
    class_id: i64,
    end_date: DateTime<Utc>,
    questions: Json<Vec<Question>>,
    next_question_id: i64,
    referenced_solution: Option<String>,
    created_by: i64,
    version: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ExamRow> for Exam {
    type Error = StoreError;

    fn try_from(row: ExamRow) -> Result<Self, Self::Error> {
        Ok(Exam {
            id: row.id,
            title: row.title,
            subject: row.subject.parse().map_err(corrupt)?,
            description: row.description,
            format: row.format.parse().map_err(corrupt)?,
            status: row.status.parse().map_err(corrupt)?,
            file_url: row.file_url,
            class_id: row.class_id,
            end_date: row.end_date,
            questions: row.questions.0,
            next_question_id: row.next_question_id,
            referenced_solution: row.referenced_solution,
            created_by: row.created_by,
            version: row.version,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct SubmissionRow {
    id: i64,
    exam_id: i64,
    student_id: i64,
    status: String,
    file_url: Option<String>,
    score: Option<f64>,
    feedback: Option<String>,
    ended_at: Option<DateTime<Utc>>,
    graded_at: Option<DateTime<Utc>>,
}

impl TryFrom<SubmissionRow> for Submission {
    type Error = StoreError;

    fn try_from(row: SubmissionRow) -> Result<Self, Self::Error> {
        Ok(Submission {
            id: row.id,
            exam_id: row.exam_id,
            student_id: row.student_id,
            status: row.status.parse().map_err(corrupt)?,
            file_url: row.file_url,
            score: row.score,
            feedback: row.feedback,
            ended_at: row.ended_at,
            graded_at: row.graded_at,
        })
    }
}

fn corrupt(err: impl std::fmt::Display) -> StoreError {
    StoreError::Corrupt(err.to_string())
}

/// Maps a unique-constraint violation to [`StoreError::Duplicate`].
fn unique_or_db(err: sqlx::Error, what: impl FnOnce() -> String) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Duplicate(what()),
        _ => StoreError::Database(err),
    }
}

fn convert_all<R, T>(rows: Vec<R>) -> StoreResult<Vec<T>>
where
    T: TryFrom<R, Error = StoreError>,
{
    rows.into_iter().map(T::try_from).collect()
}

#[async_trait]
impl Store for PgStore {
    async fn insert_user(&self, user: NewUser) -> StoreResult<User> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "INSERT INTO users (email, name, password, role) VALUES ($1, $2, $3, $4) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| unique_or_db(e, || format!("user '{}'", user.email)))?;

        row.try_into()
    }

    async fn find_user(&self, id: i64) -> StoreResult<Option<User>> {
        sqlx::query_as::<_, UserRow>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?
        .map(User::try_from)
        .transpose()
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY id DESC"
        ))
        .fetch_all(&self.pool)
        .await?;
        convert_all(rows)
    }

    async fn delete_user(&self, id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_class(&self, name: &str) -> StoreResult<Class> {
        let row = sqlx::query_as::<_, ClassRow>(
            "INSERT INTO classes (name) VALUES ($1) RETURNING id, name, created_at",
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| unique_or_db(e, || format!("class '{name}'")))?;
        Ok(row.into())
    }

    async fn find_class(&self, id: i64) -> StoreResult<Option<Class>> {
        let row = sqlx::query_as::<_, ClassRow>(
            "SELECT id, name, created_at FROM classes WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Class::from))
    }

    async fn list_classes(&self) -> StoreResult<Vec<Class>> {
        let rows =
            sqlx::query_as::<_, ClassRow>("SELECT id, name, created_at FROM classes ORDER BY name")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(Class::from).collect())
    }

    async fn delete_class(&self, id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM classes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn enroll_student(&self, class_id: i64, student_id: i64) -> StoreResult<()> {
        sqlx::query("INSERT INTO class_students (class_id, student_id) VALUES ($1, $2)")
            .bind(class_id)
            .bind(student_id)
            .execute(&self.pool)
            .await
            .map_err(|e| unique_or_db(e, || format!("enrolment of student {student_id}")))?;
        Ok(())
    }

    async fn class_students(&self, class_id: i64) -> StoreResult<Vec<i64>> {
        let ids = sqlx::query_scalar::<_, i64>(
            "SELECT student_id FROM class_students WHERE class_id = $1 ORDER BY student_id",
        )
        .bind(class_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    async fn insert_exam(&self, exam: &Exam) -> StoreResult<Exam> {
        let row = sqlx::query_as::<_, ExamRow>(&format!(
            r#"
            INSERT INTO exams (
                title, subject, description, format, status, file_url, class_id,
                end_date, questions, next_question_id, referenced_solution, created_by, version
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, 1)
            RETURNING {EXAM_COLUMNS}
            "#
        ))
        .bind(&exam.title)
        .bind(exam.subject.as_str())
        .bind(&exam.description)
        .bind(exam.format.as_str())
        .bind(exam.status.as_str())
        .bind(&exam.file_url)
        .bind(exam.class_id)
        .bind(exam.end_date)
        .bind(Json(exam.questions()))
        .bind(exam.next_question_id)
        .bind(&exam.referenced_solution)
        .bind(exam.created_by)
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    async fn find_exam(&self, id: i64) -> StoreResult<Option<Exam>> {
        sqlx::query_as::<_, ExamRow>(&format!("SELECT {EXAM_COLUMNS} FROM exams WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Exam::try_from)
            .transpose()
    }

    async fn list_exams(&self, scope: ExamScope) -> StoreResult<Vec<Exam>> {
        let rows = match scope {
            ExamScope::All => {
                sqlx::query_as::<_, ExamRow>(&format!(
                    "SELECT {EXAM_COLUMNS} FROM exams ORDER BY end_date DESC, id DESC"
                ))
                .fetch_all(&self.pool)
                .await?
            }
            ExamScope::CreatedBy(user_id) => {
                sqlx::query_as::<_, ExamRow>(&format!(
                    "SELECT {EXAM_COLUMNS} FROM exams WHERE created_by = $1 \
                     ORDER BY end_date DESC, id DESC"
                ))
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?
            }
            ExamScope::Class(class_id) => {
                sqlx::query_as::<_, ExamRow>(&format!(
                    "SELECT {EXAM_COLUMNS} FROM exams WHERE class_id = $1 \
                     ORDER BY end_date DESC, id DESC"
                ))
                .bind(class_id)
                .fetch_all(&self.pool)
                .await?
            }
            ExamScope::AssignedTo(student_id) => {
                sqlx::query_as::<_, ExamRow>(&format!(
                    "SELECT {EXAM_COLUMNS} FROM exams \
                     WHERE id IN (SELECT exam_id FROM submissions WHERE student_id = $1) \
                     ORDER BY end_date DESC, id DESC"
                ))
                .bind(student_id)
                .fetch_all(&self.pool)
                .await?
            }
        };
        convert_all(rows)
    }

    async fn update_exam(&self, exam: &Exam) -> StoreResult<Exam> {
        let row = sqlx::query_as::<_, ExamRow>(&format!(
            r#"
            UPDATE exams SET
                title = $1, subject = $2, description = $3, format = $4, status = $5,
                file_url = $6, class_id = $7, end_date = $8, questions = $9,
                next_question_id = $10, referenced_solution = $11,
                version = version + 1, updated_at = NOW()
            WHERE id = $12 AND version = $13
            RETURNING {EXAM_COLUMNS}
            "#
        ))
        .bind(&exam.title)
        .bind(exam.subject.as_str())
        .bind(&exam.description)
        .bind(exam.format.as_str())
        .bind(exam.status.as_str())
        .bind(&exam.file_url)
        .bind(exam.class_id)
        .bind(exam.end_date)
        .bind(Json(exam.questions()))
        .bind(exam.next_question_id)
        .bind(&exam.referenced_solution)
        .bind(exam.id)
        .bind(exam.version)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::Stale)?;

        row.try_into()
    }

    async fn delete_exam(&self, id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM exams WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn assign_exam(&self, exam_id: i64, student_ids: &[i64]) -> StoreResult<usize> {
        if student_ids.is_empty() {
            return Ok(0);
        }
        let result = sqlx::query(
            r#"
            INSERT INTO submissions (exam_id, student_id, status)
            SELECT $1, student_id, 'IN_PROGRESS' FROM UNNEST($2::BIGINT[]) AS t(student_id)
            ON CONFLICT (exam_id, student_id) DO NOTHING
            "#,
        )
        .bind(exam_id)
        .bind(student_ids.to_vec())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() as usize)
    }

    async fn find_submission(
        &self,
        exam_id: i64,
        student_id: i64,
    ) -> StoreResult<Option<Submission>> {
        sqlx::query_as::<_, SubmissionRow>(&format!(
            "SELECT {SUBMISSION_COLUMNS} FROM submissions WHERE exam_id = $1 AND student_id = $2"
        ))
        .bind(exam_id)
        .bind(student_id)
        .fetch_optional(&self.pool)
        .await?
        .map(Submission::try_from)
        .transpose()
    }

    async fn list_exam_submissions(&self, exam_id: i64) -> StoreResult<Vec<Submission>> {
        let rows = sqlx::query_as::<_, SubmissionRow>(&format!(
            "SELECT {SUBMISSION_COLUMNS} FROM submissions WHERE exam_id = $1 ORDER BY student_id"
        ))
        .bind(exam_id)
        .fetch_all(&self.pool)
        .await?;
        convert_all(rows)
    }

    async fn list_student_submissions(&self, student_id: i64) -> StoreResult<Vec<Submission>> {
        let rows = sqlx::query_as::<_, SubmissionRow>(&format!(
            "SELECT {SUBMISSION_COLUMNS} FROM submissions WHERE student_id = $1 ORDER BY exam_id"
        ))
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;
        convert_all(rows)
    }

    async fn update_submission(
        &self,
        submission: &Submission,
        expected: SubmissionStatus,
    ) -> StoreResult<bool> {
        // The status guard makes concurrent submits race on the row, only one wins.
        let result = sqlx::query(
            r#"
            UPDATE submissions SET
                status = $1, file_url = $2, score = $3, feedback = $4,
                ended_at = $5, graded_at = $6
            WHERE id = $7 AND status = $8
            "#,
        )
        .bind(submission.status.as_str())
        .bind(&submission.file_url)
        .bind(submission.score)
        .bind(&submission.feedback)
        .bind(submission.ended_at)
        .bind(submission.graded_at)
        .bind(submission.id)
        .bind(expected.as_str())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}
