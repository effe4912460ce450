use thiserror::Error;

#[derive(Error, Debug)]
pub enum StreamwatchError {
    #[error("Invalid input: {0}")]
    Input(String),

    #[error("Invalid query window: {0}")]
    Query(String),
}

/// Result alias for core operations.
pub type Result<T> = std::result::Result<T, StreamwatchError>;
