use thiserror::Error;

/// Persistent store errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to persist value for {key}: {source}")]
    Persist {
        key: String,
        #[source]
        source: tempfile::PersistError,
    },
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
