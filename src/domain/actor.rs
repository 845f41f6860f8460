// src/domain/actor.rs

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::{DomainError, DomainResult};
use super::exam::{Exam, ParseEnumError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Professor,
    Student,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "ADMIN",
            Self::Professor => "PROFESSOR",
            Self::Student => "STUDENT",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ADMIN" => Ok(Self::Admin),
            "PROFESSOR" => Ok(Self::Professor),
            "STUDENT" => Ok(Self::Student),
            _ => Err(ParseEnumError::new("role", s)),
        }
    }
}

/// Who is performing a request. Built from a verified token and passed
/// explicitly into every service operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: i64,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: i64, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Professors and admins.
    pub fn is_staff(&self) -> bool {
        matches!(self.role, Role::Admin | Role::Professor)
    }

    pub fn require_admin(&self) -> DomainResult<()> {
        if !self.is_admin() {
            return Err(DomainError::unauthorized("administrator role required"));
        }
        Ok(())
    }

    pub fn require_staff(&self) -> DomainResult<()> {
        if !self.is_staff() {
            return Err(DomainError::unauthorized(
                "professor or administrator role required",
            ));
        }
        Ok(())
    }

    pub fn require_student(&self) -> DomainResult<()> {
        if self.role != Role::Student {
            return Err(DomainError::unauthorized("student role required"));
        }
        Ok(())
    }

    /// Admins manage every exam, professors only their own.
    pub fn can_manage(&self, exam: &Exam) -> bool {
        self.is_admin() || (self.role == Role::Professor && exam.created_by == self.user_id)
    }

    pub fn require_manager_of(&self, exam: &Exam) -> DomainResult<()> {
        if !self.can_manage(exam) {
            return Err(DomainError::unauthorized(
                "only the exam's author or an administrator can do this",
            ));
        }
        Ok(())
    }

    /// Students may only read their own data; admins read anyone's.
    pub fn require_self_or_admin(&self, user_id: i64) -> DomainResult<()> {
        if self.user_id != user_id && !self.is_admin() {
            return Err(DomainError::unauthorized("access denied"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;
    use crate::domain::exam::{ExamDraft, QuestionDraft, Subject};

    fn exam_by(author: i64) -> Exam {
        let now = Utc::now();
        Exam::create(
            ExamDraft {
                title: Some("Graphs".to_string()),
                subject: Some(Subject::Algorithm),
                class_id: Some(1),
                end_date: Some(now + Duration::days(1)),
                questions: vec![QuestionDraft {
                    points: 10.0,
                    content: None,
                }],
                ..Default::default()
            },
            author,
            now,
        )
        .unwrap()
    }

    #[test]
    fn test_exam_management_rights() {
        let exam = exam_by(5);
        assert!(Actor::new(5, Role::Professor).can_manage(&exam));
        assert!(Actor::new(1, Role::Admin).can_manage(&exam));
        assert!(!Actor::new(6, Role::Professor).can_manage(&exam));
        assert!(!Actor::new(5, Role::Student).can_manage(&exam));
    }

    #[test]
    fn test_role_checks() {
        let student = Actor::new(9, Role::Student);
        assert!(student.require_staff().is_err());
        assert!(student.require_admin().is_err());
        assert!(student.require_self_or_admin(9).is_ok());
        assert!(student.require_self_or_admin(10).is_err());
        assert!(Actor::new(1, Role::Admin).require_self_or_admin(10).is_ok());
        assert_eq!("PROFESSOR".parse::<Role>().unwrap(), Role::Professor);
    }
}
