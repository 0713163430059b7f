use thiserror::Error;

pub type Result<T> = std::result::Result<T, SearchError>;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Store error: {0}")]
    Store(#[from] codectx_stores::StoreError),

    #[error("Invalid retrieval config: {0}")]
    InvalidConfig(String),
}
