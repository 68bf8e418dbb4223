use crate::model::DocId;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FolioError {
    #[error("Store not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Document not found: {0}")]
    DocumentNotFound(DocId),

    #[error("Validation failed: {}", .0.join("; "))]
    ValidationFailed(Vec<String>),

    #[error("Revision {generation} of {id} failed {field} hash check")]
    IntegrityViolation {
        id: DocId,
        generation: i64,
        field: &'static str,
    },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("SQLite error: {0}")]
    Sql(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Background task failed: {0}")]
    Task(String),
}

impl FolioError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, FolioError::Cancelled)
    }
}

impl From<tokio::task::JoinError> for FolioError {
    fn from(err: tokio::task::JoinError) -> Self {
        if err.is_cancelled() {
            FolioError::Cancelled
        } else {
            FolioError::Task(err.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, FolioError>;
