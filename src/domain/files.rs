// src/domain/files.rs

//! Upload checks run before any bytes reach object storage.

use std::fmt;

use super::error::DomainError;
use super::exam::ExamFormat;

/// Size ceiling for any uploaded document (5 MiB, inclusive).
pub const MAX_FILE_SIZE: u64 = 5 * 1024 * 1024;

/// Metadata of an uploaded file as reported by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileCandidate {
    pub mime_type: String,
    pub size: u64,
}

impl FileCandidate {
    pub fn new(mime_type: impl Into<String>, size: u64) -> Self {
        Self {
            mime_type: mime_type.into(),
            size,
        }
    }

    /// Lowercased MIME type without parameters (`text/plain; charset=utf-8` -> `text/plain`).
    fn essence(&self) -> String {
        self.mime_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase()
    }
}

/// Why a file was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileRejection {
    UnsupportedType { mime_type: String, format: ExamFormat },
    TooLarge { size: u64, limit: u64 },
    Empty,
}

impl fmt::Display for FileRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedType { mime_type, format } => write!(
                f,
                "file type '{mime_type}' is not allowed for {format} documents (accepted: {})",
                allowed_mime_types(*format).join(", ")
            ),
            Self::TooLarge { size, limit } => {
                write!(f, "file is {size} bytes, the limit is {limit} bytes")
            }
            Self::Empty => f.write_str("file is empty"),
        }
    }
}

impl std::error::Error for FileRejection {}

impl From<FileRejection> for DomainError {
    fn from(rejection: FileRejection) -> Self {
        DomainError::Validation(rejection.to_string())
    }
}

/// MIME whitelist per document format.
pub fn allowed_mime_types(format: ExamFormat) -> &'static [&'static str] {
    match format {
        ExamFormat::Pdf => &["application/pdf"],
        ExamFormat::Tex => &["application/x-tex", "text/x-tex"],
        ExamFormat::Md => &["text/markdown", "text/x-markdown"],
        ExamFormat::Txt => &["text/plain"],
    }
}

/// Checks a file against the whitelist of `expected` and the size ceiling.
pub fn validate(file: &FileCandidate, expected: ExamFormat) -> Result<(), FileRejection> {
    if file.size == 0 {
        return Err(FileRejection::Empty);
    }
    if file.size > MAX_FILE_SIZE {
        return Err(FileRejection::TooLarge {
            size: file.size,
            limit: MAX_FILE_SIZE,
        });
    }

    let essence = file.essence();
    if !allowed_mime_types(expected).contains(&essence.as_str()) {
        return Err(FileRejection::UnsupportedType {
            mime_type: file.mime_type.clone(),
            format: expected,
        });
    }
    Ok(())
}

/// Student answers are PDF only, whatever the exam's own format is.
pub fn validate_submission(file: &FileCandidate) -> Result<(), FileRejection> {
    validate(file, ExamFormat::Pdf)
}
