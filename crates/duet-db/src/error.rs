use thiserror::Error;

pub type Result<T> = std::result::Result<T, DbError>;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Username '{0}' is already taken")]
    UsernameTaken(String),

    #[error("Message content is empty")]
    EmptyContent,

    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Database lock poisoned: {0}")]
    LockPoisoned(String),

    #[error("Corrupt row: {0}")]
    Corrupt(String),
}

impl DbError {
    /// True when `err` is a UNIQUE constraint violation (not a primary key one).
    pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
        matches!(
            err,
            rusqlite::Error::SqliteFailure(e, _)
                if e.code == rusqlite::ErrorCode::ConstraintViolation
                    && e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
        )
    }
}
