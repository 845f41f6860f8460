// src/routes.rs

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{delete, get, post, put},
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::{
    domain::files::MAX_FILE_SIZE,
    handlers::{admin, auth, exams, professor, student},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware, staff_middleware},
};

/// Room for multipart framing around a maximum-size file.
const UPLOAD_BODY_LIMIT: usize = MAX_FILE_SIZE as usize + 64 * 1024;

/// Assembles the main application router.
///
/// * Public: auth and the `/uploads` file server.
/// * Authenticated: exams, student and professor routes (role checks in the services).
/// * Admin: user and class management.
pub fn create_router(state: AppState) -> Router {
    let origins: Vec<HeaderValue> = [
        state.config.public_base_url.as_str(),
        "http://localhost:3000",
        "http://127.0.0.1:3000",
    ]
    .iter()
    .filter_map(|origin| origin.parse().ok())
    .collect();

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let auth_layer = middleware::from_fn_with_state(state.clone(), auth_middleware);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login));

    let exam_routes = Router::new()
        .route("/", get(exams::list_exams).post(exams::create_exam))
        .route("/professor/all", get(exams::professor_exams))
        .route("/student/all", get(exams::student_exams))
        .route(
            "/{id}",
            get(exams::get_exam)
                .put(exams::update_exam)
                .delete(exams::delete_exam),
        )
        .route("/{id}/questions", post(exams::add_question))
        .route(
            "/{id}/questions/{question_id}",
            put(exams::update_question).delete(exams::remove_question),
        )
        .route(
            "/{id}/file",
            post(exams::upload_exam_file).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route("/{id}/publish", post(exams::publish_exam))
        .route("/{id}/submissions", get(exams::exam_submissions))
        .layer(auth_layer.clone());

    let student_routes = Router::new()
        .route("/exams/{id}", get(student::get_exam))
        .route("/exams/{id}/submit", post(student::submit_exam))
        .route("/exams/{id}/results", get(student::results))
        .route(
            "/uploads",
            post(student::upload_answer).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .layer(auth_layer.clone());

    let professor_routes = Router::new()
        .route(
            "/exams/{id}/students/{student_id}",
            get(professor::get_submission),
        )
        .route(
            "/exams/{id}/students/{student_id}/auto-correct",
            post(professor::auto_correct),
        )
        .route("/exams/{id}/grade/{student_id}", post(professor::grade))
        .route(
            "/exams/{id}/generate-solution",
            post(professor::generate_solution),
        )
        .route(
            "/exams/{id}/reference-solution",
            put(professor::set_reference_solution),
        )
        // Auth first, then the role check
        .layer(middleware::from_fn(staff_middleware))
        .layer(auth_layer.clone());

    let admin_routes = Router::new()
        .route("/users", get(admin::list_users).post(admin::create_user))
        .route("/users/{id}", delete(admin::delete_user))
        .route("/classes", get(admin::list_classes).post(admin::create_class))
        .route("/classes/{id}", delete(admin::delete_class))
        .route("/classes/{id}/students", post(admin::enroll_student))
        .layer(middleware::from_fn(admin_middleware))
        .layer(auth_layer);

    let upload_dir = state.config.upload_dir.clone();

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/exams", exam_routes)
        .nest("/api/student", student_routes)
        .nest("/api/professor", professor_routes)
        .nest("/api/admin", admin_routes)
        .nest_service("/uploads", ServeDir::new(upload_dir))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
