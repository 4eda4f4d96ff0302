use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid table config: {0}")]
    Config(String),

    #[error(transparent)]
    Key(#[from] webtable_core::Error),

    #[error("Table lock poisoned")]
    Poisoned,
}

pub type Result<T> = std::result::Result<T, StoreError>;
