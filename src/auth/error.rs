// Authentication and authorization error types

use axum::response::{IntoResponse, Response};

use crate::auth::models::Role;
use crate::error::ApiError;

/// Authentication and authorization error types
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid token")]
    InvalidToken,

    #[error("Token has expired")]
    ExpiredToken,

    #[error("Missing authentication token")]
    MissingToken,

    #[error("Token generation error: {0}")]
    TokenGenerationError(String),

    /// User lacks required permissions for the operation
    #[error("Insufficient permissions: requires one of [{required}], user has role '{actual}'")]
    InsufficientPermissions { required: String, actual: Role },
}

impl AuthError {
    /// Build an `InsufficientPermissions` error from the accepted roles
    pub fn insufficient(allowed: &[Role], actual: Role) -> Self {
        let required = allowed
            .iter()
            .map(Role::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        AuthError::InsufficientPermissions { required, actual }
    }
}

impl From<AuthError> for ApiError {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::InvalidToken | AuthError::ExpiredToken | AuthError::MissingToken => {
                ApiError::Unauthorized(error.to_string())
            }
            AuthError::TokenGenerationError(msg) => ApiError::InternalError(msg),
            AuthError::InsufficientPermissions { ref required, .. } => {
                ApiError::Forbidden(format!("Insufficient permissions: requires one of [{}]", required))
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_token_errors_are_unauthorized() {
        for error in [AuthError::InvalidToken, AuthError::ExpiredToken, AuthError::MissingToken] {
            assert_eq!(ApiError::from(error).status_code(), StatusCode::UNAUTHORIZED);
        }
    }

    #[test]
    fn test_insufficient_permissions_is_forbidden() {
        let error = AuthError::insufficient(&[Role::Owner, Role::Admin], Role::Customer);
        assert_eq!(
            error.to_string(),
            "Insufficient permissions: requires one of [owner, admin], user has role 'customer'"
        );
        assert_eq!(ApiError::from(error).status_code(), StatusCode::FORBIDDEN);
    }
}
