use thiserror::Error;

/// Result type for key-value operations.
pub type KvResult<T> = Result<T, KvError>;

/// Key-value layer errors. Absence of a key is not an error; point reads
/// return `Option` instead.
#[derive(Debug, Error)]
pub enum KvError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("backend error: {0}")]
    Backend(String),
}
