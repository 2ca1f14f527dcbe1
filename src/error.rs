use std::fmt::Display;

use axum::{Json, http::StatusCode, response::IntoResponse};
use axum_valid::ValidRejection;
use serde::Serialize;
use thiserror::Error;

use crate::{dao::storage::StorageError, services::openid::OpenIdError, state::game::InvalidDigit};

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Storage backend is unavailable or returned unusable data.
    #[error("storage unavailable")]
    Unavailable(#[source] StorageError),
    /// Application is running in degraded mode without storage.
    #[error("storage unavailable (degraded mode)")]
    Degraded,
    /// Submitted guess is not a digit between 0 and 9.
    #[error("invalid guess: {0}")]
    InvalidGuess(#[from] InvalidDigit),
    /// Invalid input provided by the client.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Requested game does not exist.
    #[error("game `{0}` not found")]
    NotFound(String),
    /// The game was won before this guess landed.
    #[error("game `{0}` is already won")]
    AlreadyWon(String),
    /// The identity provider refused or could not complete the login.
    #[error("Authentication failed: {0}")]
    Unauthorized(#[from] OpenIdError),
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        ServiceError::Unavailable(err)
    }
}

/// Application-level errors that are converted to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad request with invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Login rejected.
    #[error("{0}")]
    Unauthorized(String),
    /// Requested resource not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Conflict with current state.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Service unavailable or degraded.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Unavailable(StorageError::Corrupted { id, reason }) => {
                AppError::Internal(format!("stored game `{id}` is unreadable: {reason}"))
            }
            ServiceError::Unavailable(source) => AppError::ServiceUnavailable(source.to_string()),
            ServiceError::Degraded => AppError::ServiceUnavailable("degraded mode".into()),
            err @ ServiceError::InvalidGuess(_) => AppError::BadRequest(err.to_string()),
            ServiceError::InvalidInput(message) => AppError::BadRequest(message),
            err @ ServiceError::NotFound(_) => AppError::NotFound(err.to_string()),
            err @ ServiceError::AlreadyWon(_) => AppError::Conflict(err.to_string()),
            err @ ServiceError::Unauthorized(_) => AppError::Unauthorized(err.to_string()),
        }
    }
}

/// Undecodable or invalid form bodies become a JSON 400 like every other client error.
impl<E: Display> From<ValidRejection<E>> for AppError {
    fn from(rejection: ValidRejection<E>) -> Self {
        match rejection {
            ValidRejection::Valid(errors) => {
                AppError::BadRequest(format!("validation failed: {errors}"))
            }
            ValidRejection::Inner(inner) => AppError::BadRequest(inner.to_string()),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let payload = Json(ErrorBody {
            message: self.to_string(),
        });

        (status, payload).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: ServiceError) -> StatusCode {
        AppError::from(err).status()
    }

    #[test]
    fn service_errors_map_to_http_statuses() {
        assert_eq!(
            status_of(ServiceError::InvalidGuess(InvalidDigit::OutOfRange(10))),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(ServiceError::NotFound("nonexistent-id".into())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(ServiceError::AlreadyWon("abc".into())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(ServiceError::Degraded),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_of(ServiceError::Unauthorized(OpenIdError::Rejected)),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_of(StorageError::corrupted("abc", "secret out of range").into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn unauthorized_message_names_the_reason() {
        let err = AppError::from(ServiceError::Unauthorized(OpenIdError::Cancelled));
        assert_eq!(
            err.to_string(),
            "Authentication failed: authentication was cancelled at the provider"
        );
    }
}
