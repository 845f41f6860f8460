// src/services/corrector.rs

//! Client for the external auto-correction service.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{Exam, Question, Subject};

#[derive(Debug, Error)]
pub enum CorrectorError {
    #[error("auto-correction is not configured")]
    Disabled,

    #[error("corrector request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("corrector returned an unusable answer: {0}")]
    Malformed(String),
}

/// What the corrector needs to grade one hand-in.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrectionRequest {
    pub exam_id: i64,
    pub student_id: i64,
    pub submission_url: String,
    pub exam_url: Option<String>,
    pub reference_solution: Option<String>,
    pub total_points: f64,
}

impl CorrectionRequest {
    /// Retries of the same correction carry the same key.
    pub fn idempotency_key(&self) -> String {
        format!("exam-{}-student-{}", self.exam_id, self.student_id)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CorrectionOutcome {
    pub score: f64,
    #[serde(default)]
    pub feedback: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SolutionRequest {
    pub exam_id: i64,
    pub title: String,
    pub subject: Subject,
    pub description: String,
    pub exam_url: Option<String>,
    pub questions: Vec<Question>,
}

impl From<&Exam> for SolutionRequest {
    fn from(exam: &Exam) -> Self {
        Self {
            exam_id: exam.id,
            title: exam.title.clone(),
            subject: exam.subject,
            description: exam.description.clone(),
            exam_url: exam.file_url.clone(),
            questions: exam.questions().to_vec(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SolutionResponse {
    #[serde(alias = "referencedSolution")]
    solution: String,
}

/// Opaque grading oracle.
#[async_trait]
pub trait Corrector: Send + Sync {
    async fn auto_correct(
        &self,
        request: &CorrectionRequest,
    ) -> Result<CorrectionOutcome, CorrectorError>;

    async fn generate_reference_solution(
        &self,
        request: &SolutionRequest,
    ) -> Result<String, CorrectorError>;
}

/// Talks JSON over HTTP to `{base_url}/auto-correct` and
/// `{base_url}/generate-solution`.
pub struct HttpCorrector {
    client: reqwest::Client,
    base_url: String,
}

impl HttpCorrector {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl Corrector for HttpCorrector {
    async fn auto_correct(
        &self,
        request: &CorrectionRequest,
    ) -> Result<CorrectionOutcome, CorrectorError> {
        let outcome = self
            .client
            .post(format!("{}/auto-correct", self.base_url))
            .header("Idempotency-Key", request.idempotency_key())
            .json(request)
            .send()
            .await?
            .error_for_status()?
            .json::<CorrectionOutcome>()
            .await?;

        Ok(outcome)
    }

    async fn generate_reference_solution(
        &self,
        request: &SolutionRequest,
    ) -> Result<String, CorrectorError> {
        let response = self
            .client
            .post(format!("{}/generate-solution", self.base_url))
            .json(request)
            .send()
            .await?
            .error_for_status()?
            .json::<SolutionResponse>()
            .await?;

        if response.solution.trim().is_empty() {
            return Err(CorrectorError::Malformed("empty solution".to_string()));
        }
        Ok(response.solution)
    }
}

/// Stands in when no corrector URL is configured.
pub struct DisabledCorrector;

#[async_trait]
impl Corrector for DisabledCorrector {
    async fn auto_correct(
        &self,
        _request: &CorrectionRequest,
    ) -> Result<CorrectionOutcome, CorrectorError> {
        Err(CorrectorError::Disabled)
    }

    async fn generate_reference_solution(
        &self,
        _request: &SolutionRequest,
    ) -> Result<String, CorrectorError> {
        Err(CorrectorError::Disabled)
    }
}
