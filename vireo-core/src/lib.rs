pub mod apis;
pub mod boarding;
pub mod payment;
pub mod sequence;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    ValidationError(String),
    #[error("Internal service error: {0}")]
    InternalError(String),
    #[error("Collaborator failure: {0}")]
    CollaboratorError(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
