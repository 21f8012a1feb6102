use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    ConnectionError(#[from] sqlx::Error),

    #[error("Database migration failed: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("An error occurred during JSON serialization/deserialization: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Failed to prepare the database location: {0}")]
    Io(#[from] std::io::Error),

    #[error("No {0} matches the given id.")]
    NotFound(String),

    #[error("The id prefix '{0}' matches more than one record; use more characters.")]
    Ambiguous(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Corrupt value in column '{column}': {reason}")]
    Corrupt { column: &'static str, reason: String },
}
