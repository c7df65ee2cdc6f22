use admin::AdminError;
use axum::{http::StatusCode, response::Json};
use sea_orm::{DbErr, SqlErr};
use tracing::{error, warn};

use crate::schemas::ErrorResponse;

/// Error half of every handler result
pub type HandlerError = (StatusCode, Json<ErrorResponse>);

pub fn error_response(status: StatusCode, code: &str, message: impl Into<String>) -> HandlerError {
    (status, Json(ErrorResponse::new(code, message)))
}

/// Map a persistence failure. The only unique column is `username`.
pub fn database_error(err: &DbErr) -> HandlerError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(detail)) => {
            warn!("Unique constraint violated: {}", detail);
            error_response(
                StatusCode::CONFLICT,
                "USERNAME_ALREADY_EXISTS",
                "A user with that username already exists",
            )
        }
        _ => {
            error!("Database error: {}", err);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "DATABASE_ERROR",
                "Internal server error while accessing users",
            )
        }
    }
}

pub fn admin_error(err: AdminError) -> HandlerError {
    match err {
        AdminError::Database(db_error) => database_error(&db_error),
        AdminError::NotFound(id) => error_response(
            StatusCode::NOT_FOUND,
            "USER_NOT_FOUND",
            format!("User with ID {} not found", id),
        ),
        AdminError::UnknownAction(name) => error_response(
            StatusCode::NOT_FOUND,
            "UNKNOWN_ACTION",
            format!("No bulk action named '{}'", name),
        ),
        AdminError::ReadOnlyField(field) => error_response(
            StatusCode::BAD_REQUEST,
            "READ_ONLY_FIELD",
            format!("Field '{}' is read-only", field),
        ),
        AdminError::Validation(message) => {
            error_response(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", message)
        }
        AdminError::Password(e) => {
            error!("Password hashing failed: {}", e);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "PASSWORD_ERROR",
                "Failed to store password",
            )
        }
    }
}
