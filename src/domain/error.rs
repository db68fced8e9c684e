use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    /// The record changed between read and write; the caller may reload and retry.
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn is_conflict(err: &anyhow::Error) -> bool {
        matches!(err.downcast_ref::<DomainError>(), Some(DomainError::Conflict(_)))
    }
}
