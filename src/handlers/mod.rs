// src/handlers/mod.rs

pub mod admin;
pub mod auth;
pub mod exams;
pub mod professor;
pub mod student;

use axum::{body::Bytes, extract::Multipart};

use crate::{domain::FileCandidate, error::AppError};

/// A file received in the `file` field of a multipart form.
pub struct Upload {
    pub file_name: String,
    pub candidate: FileCandidate,
    pub bytes: Bytes,
}

/// Pulls the `file` field out of a multipart body. Other fields are ignored.
pub async fn read_upload(mut multipart: Multipart) -> Result<Upload, AppError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().unwrap_or("upload").to_string();
        let mime_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field.bytes().await?;

        return Ok(Upload {
            file_name,
            candidate: FileCandidate::new(mime_type, bytes.len() as u64),
            bytes,
        });
    }

    Err(AppError::BadRequest(
        "multipart field 'file' is required".to_string(),
    ))
}
