//! Task lifecycle errors.

#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error("storage: {0}")]
    Storage(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("task already terminal")]
    AlreadyTerminal,
}
