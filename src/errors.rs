use serde::Serialize;
use thiserror::Error;

/// Failures produced by the `name(arg1,arg2,...)` codec and the strict
/// scoring-function parser. These carry the exact diagnostic text shown
/// when a stored encoding cannot be read back.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("Missing opening bracket in \"{0}\"")]
    MissingOpeningBracket(String),

    #[error("Missing closing bracket in \"{0}\"")]
    MissingClosingBracket(String),

    #[error("Text after closing bracket of function: \"{0}\"")]
    TrailingText(String),

    #[error("Unknown scoring function \"{0}\"")]
    UnknownScoringFunction(String),

    #[error("{0}")]
    InvalidArguments(String),
}

#[derive(Debug, Clone, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl AppError {
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::Format(_) => "FORMAT_ERROR",
            AppError::StorageError(_) => "STORAGE_ERROR",
            AppError::InternalError(_) => "INTERNAL_ERROR",
        }
    }
}

/// Serializable shape handed to the web layer when a request fails.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
}

impl From<&AppError> for ErrorResponse {
    fn from(err: &AppError) -> Self {
        ErrorResponse {
            error: err.to_string(),
            code: err.error_code(),
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
