use model::password::PasswordError;
use thiserror::Error;

/// Error types for the administrative console
#[derive(Error, Debug)]
pub enum AdminError {
    /// Error from the database operations
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// No user row with the given primary key
    #[error("User with ID {0} not found")]
    NotFound(i32),

    /// No bulk action registered under the given name
    #[error("Unknown action: {0}")]
    UnknownAction(String),

    /// Attempt to write a field listed in `readonly_fields`
    #[error("Field '{0}' is read-only")]
    ReadOnlyField(String),

    /// Rejected form input or list parameters
    #[error("Validation error: {0}")]
    Validation(String),

    /// Failure while hashing a new password
    #[error("Password error: {0}")]
    Password(#[from] PasswordError),
}

impl From<validator::ValidationErrors> for AdminError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AdminError::Validation(errors.to_string())
    }
}
