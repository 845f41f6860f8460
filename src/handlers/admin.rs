// src/handlers/admin.rs

//! User and class management. Every route here sits behind
//! `admin_middleware`.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use validator::Validate;

use super::auth::normalize_email;
use crate::{
    domain::Actor,
    error::AppError,
    models::{
        class::{CreateClassRequest, EnrollStudentRequest},
        user::{AdminCreateUserRequest, NewUser},
    },
    services::Lifecycle,
    store::Store,
    utils::hash::hash_password,
};

/// Lists all users in the system.
pub async fn list_users(
    State(store): State<Arc<dyn Store>>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(store.list_users().await?))
}

/// Creates a new user with a specific role.
pub async fn create_user(
    State(store): State<Arc<dyn Store>>,
    Json(payload): Json<AdminCreateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let user = store
        .insert_user(NewUser {
            email: normalize_email(&payload.email),
            name: payload.name.trim().to_string(),
            password_hash: hash_password(&payload.password)?,
            role: payload.role,
        })
        .await?;

    tracing::info!("Admin created user {} with role {}", user.id, user.role);
    Ok((StatusCode::CREATED, Json(user)))
}

/// Deletes a user along with their submissions and authored exams.
pub async fn delete_user(
    State(store): State<Arc<dyn Store>>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    if id == actor.user_id {
        return Err(AppError::BadRequest(
            "You cannot delete your own account".to_string(),
        ));
    }

    if !store.delete_user(id).await? {
        return Err(AppError::NotFound(format!("user {id} not found")));
    }

    tracing::info!("Admin {} deleted user {}", actor.user_id, id);
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_classes(
    State(store): State<Arc<dyn Store>>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(store.list_classes().await?))
}

pub async fn create_class(
    State(store): State<Arc<dyn Store>>,
    Json(payload): Json<CreateClassRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let class = store.insert_class(payload.name.trim()).await?;
    tracing::info!("Class {} '{}' created", class.id, class.name);
    Ok((StatusCode::CREATED, Json(class)))
}

/// Deletes a class. Its exams and their submissions go with it.
pub async fn delete_class(
    State(store): State<Arc<dyn Store>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    if !store.delete_class(id).await? {
        return Err(AppError::NotFound(format!("class {id} not found")));
    }

    tracing::info!("Class {} deleted", id);
    Ok(StatusCode::NO_CONTENT)
}

/// Enrols a student. Published exams of the class are assigned right away.
pub async fn enroll_student(
    State(lifecycle): State<Arc<Lifecycle>>,
    Extension(actor): Extension<Actor>,
    Path(class_id): Path<i64>,
    Json(payload): Json<EnrollStudentRequest>,
) -> Result<impl IntoResponse, AppError> {
    let opened = lifecycle
        .enroll_student(&actor, class_id, payload.student_id)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "classId": class_id,
            "studentId": payload.student_id,
            "examsAssigned": opened,
        })),
    ))
}
