use flavors_shared::ValidationError;
use thiserror::Error;

/// Errors produced by the store layer.
#[derive(Error, Debug)]
pub enum StoreError {
    /// SQLite error (medium unreachable, schema violation, ...).
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Failed to determine a platform data directory.
    #[error("Could not determine application data directory")]
    NoDataDir,

    /// Generic I/O error (database directory, credential file).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The credential file is not valid JSON.
    #[error("Credential file error: {0}")]
    Json(#[from] serde_json::Error),

    /// A query expected exactly one row but found none.
    #[error("Record not found")]
    NotFound,

    /// A recipe with the same submitter and dish already exists.
    #[error("A recipe with this dish name already exists under this name")]
    Duplicate,

    /// Migration failure.
    #[error("Migration error: {0}")]
    Migration(String),

    /// Required input was missing.
    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationError),

    /// Another thread panicked while holding the credential lock.
    #[error("Credential store lock poisoned")]
    LockPoisoned,
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Map a rusqlite error, turning a unique-constraint failure into
/// [`StoreError::Duplicate`].
pub(crate) fn map_insert_error(e: rusqlite::Error) -> StoreError {
    match e {
        rusqlite::Error::SqliteFailure(ref err, _)
            if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            StoreError::Duplicate
        }
        other => StoreError::Sqlite(other),
    }
}
