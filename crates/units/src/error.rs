use thiserror::Error;

/// Result type for unit operations
pub type Result<T> = std::result::Result<T, UnitError>;

/// Errors that can occur while loading units
#[derive(Error, Debug)]
pub enum UnitError {
    /// Unit payload was not valid JSON or did not match the unit shape
    #[error("Invalid unit payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),

    /// A unit was supplied without an identifier
    #[error("Unit at position {0} has an empty identifier")]
    EmptyIdentifier(usize),
}
