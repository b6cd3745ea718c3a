use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde_json::json;

use crate::backend::{AuthError, BackendError};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Shown inline on the login / sign-up form.
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Data(#[from] BackendError),

    #[error("Upload failed: {0}")]
    Storage(BackendError),

    #[error("{0}")]
    Forbidden(&'static str),

    #[error("{0} is already in progress")]
    Busy(&'static str),

    #[error("{0}")]
    Conflict(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Not signed in")]
    Unauthenticated,
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Auth(AuthError::InvalidCredentials) => StatusCode::UNAUTHORIZED,
            AppError::Auth(AuthError::AlreadyRegistered) => StatusCode::CONFLICT,
            AppError::Auth(AuthError::Rejected(_)) => StatusCode::BAD_REQUEST,
            AppError::Auth(AuthError::Backend(_)) => StatusCode::BAD_GATEWAY,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Data(_) | AppError::Storage(_) => StatusCode::BAD_GATEWAY,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Busy(_) | AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({ "error": self.to_string() }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_errors_map_to_form_statuses() {
        assert_eq!(
            AppError::from(AuthError::InvalidCredentials).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::from(AuthError::AlreadyRegistered).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(AppError::Busy("Check-in").to_string(), "Check-in is already in progress");
    }
}
