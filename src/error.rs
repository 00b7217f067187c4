// src/error.rs
use thiserror::Error;

/// Failures raised by the persistence and blob-storage collaborators.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid stored value: {0}")]
    Corrupt(String),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("persistence failed: {0}")]
    Persistence(#[from] StoreError),

    #[error("upload failed: {0}")]
    Upload(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(String),

    /// A pipeline continuation fired after its run was superseded.
    #[error("processing run was cancelled")]
    Cancelled,
}

impl WorkflowError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// Stable machine-readable code used by the HTTP error envelope.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Persistence(_) => "PERSISTENCE_ERROR",
            Self::Upload(_) => "UPLOAD_ERROR",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Cancelled => "CANCELLED",
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
pub type WorkflowResult<T> = Result<T, WorkflowError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            WorkflowError::from(StoreError::Unavailable("down".into())).code(),
            "PERSISTENCE_ERROR"
        );
        assert_eq!(WorkflowError::validation("x").code(), "VALIDATION_ERROR");
        assert_eq!(WorkflowError::not_found("position").to_string(), "position not found");
    }
}
