// tests/common/mod.rs

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use classmatrix::{
    config::Config,
    domain::Role,
    models::user::NewUser,
    routes,
    services::{
        LocalObjectStorage,
        corrector::{
            CorrectionOutcome, CorrectionRequest, Corrector, CorrectorError, SolutionRequest,
        },
    },
    state::AppState,
    store::{MemoryStore, Store},
    utils::jwt::sign_jwt,
};
use serde_json::{Value, json};
use tempfile::TempDir;

pub const JWT_SECRET: &str = "test_secret_for_integration_tests";

/// Corrector double. `None` makes the corresponding call fail; `delay`
/// makes every call sleep first.
#[derive(Default)]
pub struct StubCorrector {
    pub score: Option<f64>,
    pub solution: Option<String>,
    pub delay: Option<Duration>,
    pub calls: AtomicUsize,
}

#[async_trait]
impl Corrector for StubCorrector {
    async fn auto_correct(
        &self,
        _request: &CorrectionRequest,
    ) -> Result<CorrectionOutcome, CorrectorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match self.score {
            Some(score) => Ok(CorrectionOutcome {
                score,
                feedback: Some("<p>Automatic <script>x()</script>review</p>".to_string()),
            }),
            None => Err(CorrectorError::Malformed("corrector offline".to_string())),
        }
    }

    async fn generate_reference_solution(
        &self,
        _request: &SolutionRequest,
    ) -> Result<String, CorrectorError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.solution
            .clone()
            .ok_or_else(|| CorrectorError::Malformed("corrector offline".to_string()))
    }
}

pub struct TestApp {
    pub address: String,
    pub store: Arc<MemoryStore>,
    pub corrector: Arc<StubCorrector>,
    pub client: reqwest::Client,
    _upload_dir: TempDir,
}

/// Spawns the app on a random port over an in-memory store.
pub async fn spawn_app() -> TestApp {
    spawn_app_with(StubCorrector {
        score: Some(14.5),
        solution: Some("Reference answer".to_string()),
        ..Default::default()
    })
    .await
}

pub async fn spawn_app_with(corrector: StubCorrector) -> TestApp {
    spawn_app_with_timeout(corrector, Duration::from_secs(5)).await
}

pub async fn spawn_app_with_timeout(corrector: StubCorrector, corrector_timeout: Duration) -> TestApp {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let address = format!("http://127.0.0.1:{}", listener.local_addr().unwrap().port());

    let upload_dir = tempfile::tempdir().expect("Failed to create upload dir");

    let config = Config {
        database_url: "unused".to_string(),
        jwt_secret: JWT_SECRET.to_string(),
        jwt_expiration: 600,
        rust_log: "error".to_string(),
        bind_addr: "127.0.0.1:0".to_string(),
        upload_dir: upload_dir.path().to_string_lossy().into_owned(),
        public_base_url: address.clone(),
        corrector_url: None,
        corrector_timeout,
        admin_email: None,
        admin_password: None,
    };

    let store = Arc::new(MemoryStore::new());
    let corrector = Arc::new(corrector);
    let storage = LocalObjectStorage::new(upload_dir.path(), address.clone())
        .await
        .expect("Failed to create storage");

    let state = AppState::new(config, store.clone(), Arc::new(storage), corrector.clone());
    let app = routes::create_router(state);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        address,
        store,
        corrector,
        client: reqwest::Client::new(),
        _upload_dir: upload_dir,
    }
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    /// Inserts a user directly and returns its id with a signed token.
    pub async fn user(&self, email: &str, role: Role) -> (i64, String) {
        let user = self
            .store
            .insert_user(NewUser {
                email: email.to_string(),
                name: email.split('@').next().unwrap().to_string(),
                password_hash: "not-a-real-hash".to_string(),
                role,
            })
            .await
            .unwrap();
        let token = sign_jwt(user.id, role, JWT_SECRET, 600).unwrap();
        (user.id, token)
    }

    pub async fn class_with(&self, name: &str, students: &[i64]) -> i64 {
        let class = self.store.insert_class(name).await.unwrap();
        for &student in students {
            self.store.enroll_student(class.id, student).await.unwrap();
        }
        class.id
    }

    pub async fn create_exam(&self, token: &str, class_id: i64, points: &[f64]) -> Value {
        let questions: Vec<Value> = points.iter().map(|p| json!({ "points": p })).collect();
        let response = self
            .client
            .post(self.url("/api/exams"))
            .bearer_auth(token)
            .json(&json!({
                "title": "Graph algorithms",
                "subject": "ALGORITHM",
                "description": "Shortest paths",
                "classId": class_id,
                "endDate": (Utc::now() + chrono::Duration::days(7)).to_rfc3339(),
                "questions": questions,
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 201);
        response.json().await.unwrap()
    }

    pub async fn upload(
        &self,
        path: &str,
        token: &str,
        file_name: &str,
        mime: &str,
        bytes: Vec<u8>,
    ) -> reqwest::Response {
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(mime)
            .unwrap();
        let form = reqwest::multipart::Form::new().part("file", part);

        self.client
            .post(self.url(path))
            .bearer_auth(token)
            .multipart(form)
            .send()
            .await
            .unwrap()
    }

    /// Creates, documents and publishes an exam worth `points`.
    pub async fn published_exam(&self, token: &str, class_id: i64, points: &[f64]) -> i64 {
        let exam = self.create_exam(token, class_id, points).await;
        let exam_id = exam["id"].as_i64().unwrap();

        let response = self
            .upload(
                &format!("/api/exams/{exam_id}/file"),
                token,
                "exam.pdf",
                "application/pdf",
                b"%PDF-1.4 exam".to_vec(),
            )
            .await;
        assert_eq!(response.status().as_u16(), 200);

        let response = self
            .client
            .post(self.url(&format!("/api/exams/{exam_id}/publish")))
            .bearer_auth(token)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 200);
        exam_id
    }

    pub async fn submit(&self, token: &str, exam_id: i64, file_url: &str) -> reqwest::Response {
        self.client
            .post(self.url(&format!("/api/student/exams/{exam_id}/submit")))
            .bearer_auth(token)
            .json(&json!({ "fileUrl": file_url }))
            .send()
            .await
            .unwrap()
    }
}
