// src/domain/exam.rs

//! The exam aggregate.
//!
//! Every mutation goes through a method that checks the point budget and the
//! required fields first and only then touches state, so a rejected call
//! leaves the exam exactly as it was.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::{ConflictKind, DomainError, DomainResult};
use super::files::{self, FileCandidate, FileRejection};
use super::scoring;

/// Error when parsing an invalid enum string read from storage or a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseEnumError {
    kind: &'static str,
    invalid: String,
}

impl ParseEnumError {
    pub(crate) fn new(kind: &'static str, invalid: &str) -> Self {
        Self {
            kind,
            invalid: invalid.to_string(),
        }
    }
}

impl fmt::Display for ParseEnumError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {} '{}'", self.kind, self.invalid)
    }
}

impl std::error::Error for ParseEnumError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Subject {
    Sql,
    Database,
    Algorithm,
    Programming,
}

impl Subject {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sql => "SQL",
            Self::Database => "DATABASE",
            Self::Algorithm => "ALGORITHM",
            Self::Programming => "PROGRAMMING",
        }
    }
}

impl FromStr for Subject {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SQL" => Ok(Self::Sql),
            "DATABASE" => Ok(Self::Database),
            "ALGORITHM" => Ok(Self::Algorithm),
            "PROGRAMMING" => Ok(Self::Programming),
            _ => Err(ParseEnumError::new("subject", s)),
        }
    }
}

/// Document format of the exam statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExamFormat {
    #[default]
    Pdf,
    Tex,
    Md,
    Txt,
}

impl ExamFormat {
    pub const ALL: &'static [ExamFormat] = &[Self::Pdf, Self::Tex, Self::Md, Self::Txt];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "PDF",
            Self::Tex => "TEX",
            Self::Md => "MD",
            Self::Txt => "TXT",
        }
    }
}

impl fmt::Display for ExamFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExamFormat {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PDF" => Ok(Self::Pdf),
            "TEX" => Ok(Self::Tex),
            "MD" => Ok(Self::Md),
            "TXT" => Ok(Self::Txt),
            _ => Err(ParseEnumError::new("format", s)),
        }
    }
}

/// Publication state. Only `Draft -> Published` exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExamStatus {
    #[default]
    Draft,
    Published,
}

impl ExamStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Published => "PUBLISHED",
        }
    }
}

impl FromStr for ExamStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DRAFT" => Ok(Self::Draft),
            "PUBLISHED" => Ok(Self::Published),
            _ => Err(ParseEnumError::new("exam status", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,
    pub points: f64,
    /// Zero-based position in the exam.
    pub order: u32,
    pub content: Option<String>,
}

/// A question as supplied by the author, before ids are assigned.
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionDraft {
    pub points: f64,
    pub content: Option<String>,
}

/// Input to [`Exam::create`]. Required fields are optional here so that
/// every missing one can be reported at once.
#[derive(Debug, Clone, Default)]
pub struct ExamDraft {
    pub title: Option<String>,
    pub subject: Option<Subject>,
    pub description: Option<String>,
    pub format: Option<ExamFormat>,
    pub class_id: Option<i64>,
    pub end_date: Option<DateTime<Utc>>,
    pub questions: Vec<QuestionDraft>,
}

/// Metadata edits. `None` leaves the field untouched.
#[derive(Debug, Clone, Default)]
pub struct ExamPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub subject: Option<Subject>,
    pub format: Option<ExamFormat>,
    pub class_id: Option<i64>,
    pub end_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Exam {
    /// Zero until the exam has been stored.
    pub id: i64,
    pub title: String,
    pub subject: Subject,
    pub description: String,
    pub format: ExamFormat,
    pub status: ExamStatus,
    pub file_url: Option<String>,
    pub class_id: i64,
    pub end_date: DateTime<Utc>,
    pub(crate) questions: Vec<Question>,
    /// Id for the next added question. Never reused after a removal.
    pub(crate) next_question_id: i64,
    pub referenced_solution: Option<String>,
    pub created_by: i64,
    /// Optimistic concurrency token, bumped by the store on every write.
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Exam {
    /// Builds a new draft exam authored by `created_by`.
    pub fn create(draft: ExamDraft, created_by: i64, now: DateTime<Utc>) -> DomainResult<Self> {
        let title = draft
            .title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());

        let mut missing = Vec::new();
        if title.is_none() {
            missing.push("title");
        }
        if draft.subject.is_none() {
            missing.push("subject");
        }
        if draft.class_id.is_none() {
            missing.push("classId");
        }
        if draft.end_date.is_none() {
            missing.push("endDate");
        }

        let (Some(title), Some(subject), Some(class_id), Some(end_date)) =
            (title, draft.subject, draft.class_id, draft.end_date)
        else {
            return Err(DomainError::Validation(format!(
                "missing required fields: {}",
                missing.join(", ")
            )));
        };

        ensure_future(end_date, now)?;

        if draft.questions.is_empty() {
            return Err(DomainError::validation(
                "an exam needs at least one question",
            ));
        }

        let mut exam = Self {
            id: 0,
            title,
            subject,
            description: draft.description.unwrap_or_default(),
            format: draft.format.unwrap_or_default(),
            status: ExamStatus::Draft,
            file_url: None,
            class_id,
            end_date,
            questions: Vec::with_capacity(draft.questions.len()),
            next_question_id: 1,
            referenced_solution: None,
            created_by,
            version: 0,
            created_at: now,
            updated_at: now,
        };

        for question in draft.questions {
            exam.add_question(question.points, question.content)?;
        }
        Ok(exam)
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn total_points(&self) -> f64 {
        scoring::total_points(self.questions.iter().map(|q| &q.points))
    }

    pub fn is_published(&self) -> bool {
        self.status == ExamStatus::Published
    }

    /// Submissions are accepted up to and including `end_date`.
    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        now <= self.end_date
    }

    pub fn remaining_seconds(&self, now: DateTime<Utc>) -> i64 {
        (self.end_date - now).num_seconds().max(0)
    }

    fn question_index(&self, question_id: i64) -> DomainResult<usize> {
        self.questions
            .iter()
            .position(|q| q.id == question_id)
            .ok_or_else(|| DomainError::NotFound(format!("question {question_id}")))
    }

    /// Appends a question, rejecting it if the total would exceed the budget.
    pub fn add_question(&mut self, points: f64, content: Option<String>) -> DomainResult<&Question> {
        scoring::check_budget(self.total_points(), points)?;

        let id = self.next_question_id;
        self.next_question_id += 1;
        self.questions.push(Question {
            id,
            points,
            order: self.questions.len() as u32,
            content,
        });
        Ok(&self.questions[self.questions.len() - 1])
    }

    /// Changes one question's points; the budget is checked without the
    /// question's current value.
    pub fn update_question_points(&mut self, question_id: i64, points: f64) -> DomainResult<()> {
        let index = self.question_index(question_id)?;
        let others = scoring::total_points(
            self.questions
                .iter()
                .filter(|q| q.id != question_id)
                .map(|q| &q.points),
        );
        scoring::check_budget(others, points)?;

        self.questions[index].points = points;
        Ok(())
    }

    pub fn update_question_content(
        &mut self,
        question_id: i64,
        content: Option<String>,
    ) -> DomainResult<()> {
        let index = self.question_index(question_id)?;
        self.questions[index].content = content;
        Ok(())
    }

    /// Removes a question. The last remaining question cannot be removed.
    pub fn remove_question(&mut self, question_id: i64) -> DomainResult<()> {
        let index = self.question_index(question_id)?;
        if self.questions.len() == 1 {
            return Err(DomainError::validation(
                "an exam must keep at least one question",
            ));
        }

        self.questions.remove(index);
        for (order, question) in self.questions.iter_mut().enumerate() {
            question.order = order as u32;
        }
        Ok(())
    }

    /// Checks a document against this exam's format before it is uploaded.
    pub fn accepts_file(&self, file: &FileCandidate) -> Result<(), FileRejection> {
        files::validate(file, self.format)
    }

    /// Records the public URL of an uploaded document.
    pub fn attach_file(&mut self, file: &FileCandidate, url: String) -> DomainResult<()> {
        self.accepts_file(file)?;
        if url.trim().is_empty() {
            return Err(DomainError::validation("file url is empty"));
        }
        self.file_url = Some(url);
        Ok(())
    }

    /// Applies metadata edits. Nothing changes unless every edit is valid.
    pub fn apply_patch(&mut self, patch: ExamPatch, now: DateTime<Utc>) -> DomainResult<()> {
        let title = match patch.title {
            Some(title) => {
                let title = title.trim().to_string();
                if title.is_empty() {
                    return Err(DomainError::validation("title cannot be empty"));
                }
                Some(title)
            }
            None => None,
        };

        if let Some(end_date) = patch.end_date {
            if end_date != self.end_date {
                ensure_future(end_date, now)?;
            }
        }

        if let Some(class_id) = patch.class_id {
            if class_id != self.class_id && self.is_published() {
                return Err(ConflictKind::ClassLocked.into());
            }
        }

        if let Some(title) = title {
            self.title = title;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(subject) = patch.subject {
            self.subject = subject;
        }
        if let Some(format) = patch.format {
            self.format = format;
        }
        if let Some(class_id) = patch.class_id {
            self.class_id = class_id;
        }
        if let Some(end_date) = patch.end_date {
            self.end_date = end_date;
        }
        Ok(())
    }

    /// Names the fields still needed before publication.
    pub fn missing_for_publication(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.title.trim().is_empty() {
            missing.push("title");
        }
        if self.file_url.as_deref().is_none_or(|url| url.trim().is_empty()) {
            missing.push("fileUrl");
        }
        missing
    }

    /// Moves the exam from draft to published. Irreversible.
    pub fn publish(&mut self) -> DomainResult<()> {
        if self.is_published() {
            return Err(ConflictKind::AlreadyPublished.into());
        }

        let missing = self.missing_for_publication();
        if !missing.is_empty() {
            return Err(DomainError::Validation(format!(
                "cannot publish, missing: {}",
                missing.join(", ")
            )));
        }

        self.status = ExamStatus::Published;
        Ok(())
    }

    /// Replaces the reference solution. Blank text clears it.
    pub fn set_reference_solution(&mut self, text: Option<String>) {
        self.referenced_solution = text.filter(|t| !t.trim().is_empty());
    }
}

fn ensure_future(end_date: DateTime<Utc>, now: DateTime<Utc>) -> DomainResult<()> {
    if end_date <= now {
        return Err(DomainError::validation("endDate must be in the future"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn draft(points: &[f64], now: DateTime<Utc>) -> ExamDraft {
        ExamDraft {
            title: Some("Joins and subqueries".to_string()),
            subject: Some(Subject::Sql),
            description: None,
            format: Some(ExamFormat::Pdf),
            class_id: Some(1),
            end_date: Some(now + Duration::days(7)),
            questions: points
                .iter()
                .map(|p| QuestionDraft {
                    points: *p,
                    content: None,
                })
                .collect(),
        }
    }

    fn pdf() -> FileCandidate {
        FileCandidate::new("application/pdf", 2048)
    }

    #[test]
    fn test_create_starts_as_draft() {
        let now = Utc::now();
        let exam = Exam::create(draft(&[5.0, 5.0], now), 7, now).unwrap();
        assert_eq!(exam.status, ExamStatus::Draft);
        assert_eq!(exam.total_points(), 10.0);
        assert_eq!(exam.created_by, 7);
        assert!(exam.file_url.is_none());
        assert_eq!(exam.questions()[1].order, 1);
    }

    #[test]
    fn test_create_reports_all_missing_fields() {
        let now = Utc::now();
        let err = Exam::create(
            ExamDraft {
                title: Some("   ".to_string()),
                questions: vec![QuestionDraft {
                    points: 1.0,
                    content: None,
                }],
                ..Default::default()
            },
            1,
            now,
        )
        .unwrap_err();

        let DomainError::Validation(msg) = err else {
            panic!("expected validation error");
        };
        for field in ["title", "subject", "classId", "endDate"] {
            assert!(msg.contains(field), "{msg} should mention {field}");
        }
    }

    #[test]
    fn test_create_rejects_past_or_present_end_date() {
        let now = Utc::now();
        let mut d = draft(&[5.0], now);
        d.end_date = Some(now);
        assert!(Exam::create(d, 1, now).is_err());
    }

    #[test]
    fn test_create_rejects_budget_overflow_and_empty_list() {
        let now = Utc::now();
        assert!(Exam::create(draft(&[12.0, 10.0], now), 1, now).is_err());
        assert!(Exam::create(draft(&[], now), 1, now).is_err());
    }

    #[test]
    fn test_point_budget_scenario() {
        let now = Utc::now();
        let mut exam = Exam::create(draft(&[12.0], now), 1, now).unwrap();
        let before = exam.clone();

        let err = exam.add_question(10.0, None).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert_eq!(exam, before);

        exam.add_question(8.0, Some("Bonus".to_string())).unwrap();
        assert_eq!(exam.total_points(), 20.0);

        assert!(exam.add_question(0.5, None).is_err());
        assert!(exam.update_question_points(2, 10.0).is_err());
        assert_eq!(exam.total_points(), 20.0);
    }

    #[test]
    fn test_update_points_excludes_current_value() {
        let now = Utc::now();
        let mut exam = Exam::create(draft(&[12.0, 8.0], now), 1, now).unwrap();
        exam.update_question_points(1, 12.0).unwrap();
        exam.update_question_points(2, 7.5).unwrap();
        assert_eq!(exam.total_points(), 19.5);
        assert!(exam.update_question_points(99, 1.0).is_err());
    }

    #[test]
    fn test_remove_keeps_at_least_one_question() {
        let now = Utc::now();
        let mut exam = Exam::create(draft(&[4.0, 6.0, 10.0], now), 1, now).unwrap();
        exam.remove_question(1).unwrap();
        assert_eq!(exam.questions().len(), 2);
        assert_eq!(exam.questions()[0].id, 2);
        assert_eq!(exam.questions()[0].order, 0);

        exam.remove_question(2).unwrap();
        let err = exam.remove_question(3).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert_eq!(exam.questions().len(), 1);
    }

    #[test]
    fn test_question_ids_are_never_reused() {
        let now = Utc::now();
        let mut exam = Exam::create(draft(&[4.0, 6.0], now), 1, now).unwrap();
        exam.remove_question(2).unwrap();
        let id = exam.add_question(1.0, None).unwrap().id;
        assert_eq!(id, 3);
        exam.remove_question(3).unwrap();
        let id = exam.add_question(1.0, None).unwrap().id;
        assert_eq!(id, 4);
        assert!(exam.update_question_points(2, 1.0).is_err());
        assert_eq!(exam.next_question_id, 5);
    }

    #[test]
    fn test_publish_requires_file() {
        let now = Utc::now();
        let mut exam = Exam::create(draft(&[10.0], now), 1, now).unwrap();

        let err = exam.publish().unwrap_err();
        assert!(matches!(err, DomainError::Validation(ref m) if m.contains("fileUrl")));
        assert_eq!(exam.status, ExamStatus::Draft);

        exam.attach_file(&pdf(), "https://files/exam.pdf".to_string())
            .unwrap();
        exam.publish().unwrap();
        assert!(exam.is_published());

        let err = exam.publish().unwrap_err();
        assert!(matches!(
            err,
            DomainError::Conflict(ConflictKind::AlreadyPublished)
        ));
    }

    #[test]
    fn test_attach_file_checks_exam_format() {
        let now = Utc::now();
        let mut d = draft(&[10.0], now);
        d.format = Some(ExamFormat::Md);
        let mut exam = Exam::create(d, 1, now).unwrap();

        assert!(exam.attach_file(&pdf(), "https://f/a.pdf".to_string()).is_err());
        assert!(exam.file_url.is_none());

        let md = FileCandidate::new("text/markdown", 100);
        exam.attach_file(&md, "https://f/a.md".to_string()).unwrap();
        assert_eq!(exam.file_url.as_deref(), Some("https://f/a.md"));
    }

    #[test]
    fn test_patch_is_all_or_nothing() {
        let now = Utc::now();
        let mut exam = Exam::create(draft(&[10.0], now), 1, now).unwrap();
        let before = exam.clone();

        let err = exam
            .apply_patch(
                ExamPatch {
                    description: Some("new".to_string()),
                    end_date: Some(now - Duration::days(1)),
                    ..Default::default()
                },
                now,
            )
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert_eq!(exam, before);

        exam.apply_patch(
            ExamPatch {
                title: Some("Indexes".to_string()),
                subject: Some(Subject::Database),
                ..Default::default()
            },
            now,
        )
        .unwrap();
        assert_eq!(exam.title, "Indexes");
        assert_eq!(exam.subject, Subject::Database);
    }

    #[test]
    fn test_class_locked_after_publish() {
        let now = Utc::now();
        let mut exam = Exam::create(draft(&[10.0], now), 1, now).unwrap();
        exam.attach_file(&pdf(), "https://f/e.pdf".to_string()).unwrap();
        exam.publish().unwrap();

        let err = exam
            .apply_patch(
                ExamPatch {
                    class_id: Some(2),
                    ..Default::default()
                },
                now,
            )
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(ConflictKind::ClassLocked)));

        exam.apply_patch(
            ExamPatch {
                format: Some(ExamFormat::Txt),
                ..Default::default()
            },
            now,
        )
        .unwrap();
        assert_eq!(exam.format, ExamFormat::Txt);
    }

    #[test]
    fn test_deadline_helpers() {
        let now = Utc::now();
        let exam = Exam::create(draft(&[10.0], now), 1, now).unwrap();
        assert!(exam.is_open(now));
        assert!(exam.is_open(exam.end_date));
        assert!(!exam.is_open(exam.end_date + Duration::seconds(1)));
        assert_eq!(exam.remaining_seconds(exam.end_date + Duration::days(1)), 0);
        assert_eq!(exam.remaining_seconds(now), 7 * 24 * 3600);
    }

    #[test]
    fn test_enum_strings() {
        for format in ExamFormat::ALL {
            assert_eq!(format.as_str().parse::<ExamFormat>().unwrap(), *format);
        }
        assert_eq!("SQL".parse::<Subject>().unwrap(), Subject::Sql);
        assert!("DOCX".parse::<ExamFormat>().is_err());
        assert_eq!(
            serde_json::to_string(&Subject::Programming).unwrap(),
            "\"PROGRAMMING\""
        );
    }
}
