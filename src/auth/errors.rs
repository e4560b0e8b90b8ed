//! Authentication Errors
//! Typed failures of the auth core and their HTTP rendering.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Failures surfaced by the credential store
#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique constraint rejected the write. `column` is the offending column when known.
    #[error("unique constraint violated on {column}")]
    Conflict { column: String },
    #[error("record not found")]
    NotFound,
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Failures of the auth core. Every variant is returned to the caller as-is.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Unknown email or wrong password. The two are deliberately indistinguishable.
    #[error("Incorrect email or password")]
    InvalidCredentials,
    #[error("Inactive user")]
    AccountInactive,
    #[error("Email already registered")]
    DuplicateEmail,
    #[error("Username already taken")]
    DuplicateUsername,
    #[error("{rule}")]
    Validation { field: &'static str, rule: String },
    #[error("Invalid refresh token")]
    InvalidRefreshToken,
    #[error("Incorrect current password")]
    IncorrectPassword,
    #[error("Could not validate credentials")]
    Unauthenticated,
    #[error("Insufficient permissions")]
    Forbidden,
    /// A concurrent write won the race on a unique column we could not attribute.
    #[error("Conflicting write, please retry")]
    StoreConflict,
    #[error("User not found")]
    UserNotFound,
    #[error("Invalid role ID")]
    InvalidRole,
    #[error("Cannot {0} your own account")]
    CannotModifySelf(&'static str),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AuthError {
    pub fn validation(field: &'static str, rule: impl Into<String>) -> Self {
        AuthError::Validation {
            field,
            rule: rule.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::InvalidCredentials
            | AuthError::InvalidRefreshToken
            | AuthError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AuthError::AccountInactive | AuthError::Forbidden => StatusCode::FORBIDDEN,
            AuthError::DuplicateEmail
            | AuthError::DuplicateUsername
            | AuthError::Validation { .. }
            | AuthError::IncorrectPassword
            | AuthError::InvalidRole
            | AuthError::CannotModifySelf(_) => StatusCode::BAD_REQUEST,
            AuthError::StoreConflict => StatusCode::CONFLICT,
            AuthError::UserNotFound => StatusCode::NOT_FOUND,
            AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict { column } => match column.as_str() {
                "email" => AuthError::DuplicateEmail,
                "username" => AuthError::DuplicateUsername,
                _ => AuthError::StoreConflict,
            },
            StoreError::NotFound => AuthError::UserNotFound,
            StoreError::Backend(e) => AuthError::Internal(e),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let body = match &self {
            AuthError::Internal(e) => {
                error!("Internal auth error: {:#}", e);
                json!({ "detail": "Internal server error" })
            }
            AuthError::Validation { field, rule } => json!({ "detail": rule, "field": field }),
            other => json!({ "detail": other.to_string() }),
        };

        if status == StatusCode::UNAUTHORIZED {
            (status, [(header::WWW_AUTHENTICATE, "Bearer")], Json(body)).into_response()
        } else {
            (status, Json(body)).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_error_responses() {
        let invalid = AuthError::InvalidCredentials.into_response();
        assert_eq!(invalid.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            invalid.headers().get(header::WWW_AUTHENTICATE).unwrap(),
            "Bearer"
        );

        let inactive = AuthError::AccountInactive.into_response();
        assert_eq!(inactive.status(), StatusCode::FORBIDDEN);

        let forbidden = AuthError::Forbidden.into_response();
        assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);
        assert!(forbidden.headers().get(header::WWW_AUTHENTICATE).is_none());

        let conflict = AuthError::StoreConflict.into_response();
        assert_eq!(conflict.status(), StatusCode::CONFLICT);

        let not_found = AuthError::UserNotFound.into_response();
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);

        let internal = AuthError::Internal(anyhow::anyhow!("disk gone")).into_response();
        assert_eq!(internal.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_store_conflict_mapping() {
        let email: AuthError = StoreError::Conflict {
            column: "email".to_string(),
        }
        .into();
        assert!(matches!(email, AuthError::DuplicateEmail));

        let username: AuthError = StoreError::Conflict {
            column: "username".to_string(),
        }
        .into();
        assert!(matches!(username, AuthError::DuplicateUsername));

        let other: AuthError = StoreError::Conflict {
            column: "name".to_string(),
        }
        .into();
        assert!(matches!(other, AuthError::StoreConflict));

        let missing: AuthError = StoreError::NotFound.into();
        assert!(matches!(missing, AuthError::UserNotFound));
    }

    #[test]
    fn test_validation_message() {
        let err = AuthError::validation("password", "Password must be at least 6 characters long");
        assert_eq!(err.to_string(), "Password must be at least 6 characters long");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }
}
