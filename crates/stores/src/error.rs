use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Unknown {role} adapter '{value}' (valid: {valid})")]
    UnknownAdapter {
        role: &'static str,
        value: String,
        valid: String,
    },

    #[error("Invalid vector dimension: expected {expected}, got {actual}")]
    InvalidDimension { expected: usize, actual: usize },

    #[error("Invalid store config: {0}")]
    InvalidConfig(String),
}
