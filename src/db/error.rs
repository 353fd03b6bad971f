use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Database connection lock poisoned")]
    Poisoned,

    #[error("Database task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("Corrupt row: {0}")]
    CorruptRow(String),
}
