use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid project ref: {0:?}")]
    InvalidProjectRef(String),

    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    #[error("document error: {0}")]
    Document(String),

    #[error("invalid config: {0}")]
    Config(String),
}
