// Bearer-token extractor for protected routes

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use tracing::{debug, warn};

use crate::auth::{error::AuthError, models::Role, token::TokenService};

/// Authenticated caller, extracted from the `Authorization: Bearer` header
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: i32,
    pub email: String,
    pub role: Role,
}

impl AuthenticatedUser {
    /// Reject the request unless the caller holds one of `allowed`
    pub fn require_role(&self, allowed: &[Role]) -> Result<(), AuthError> {
        if allowed.contains(&self.role) {
            Ok(())
        } else {
            warn!(
                "Authorization failed: user_id={}, role={}, allowed={:?}",
                self.user_id, self.role, allowed
            );
            Err(AuthError::insufficient(allowed, self.role))
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
    TokenService: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .ok_or(AuthError::MissingToken)?
            .to_str()
            .map_err(|_| AuthError::InvalidToken)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(AuthError::InvalidToken)?;

        let tokens = TokenService::from_ref(state);
        let claims = tokens.validate_access_token(token)?;

        debug!("Authenticated user_id={} role={}", claims.sub, claims.role);
        Ok(AuthenticatedUser {
            user_id: claims.sub,
            email: claims.email,
            role: claims.role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    #[derive(Clone)]
    struct TestState {
        tokens: TokenService,
    }

    impl FromRef<TestState> for TokenService {
        fn from_ref(state: &TestState) -> Self {
            state.tokens.clone()
        }
    }

    fn test_state() -> TestState {
        TestState {
            tokens: TokenService::new("test_secret_key_for_testing_purposes"),
        }
    }

    fn parts_with_auth(auth_value: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/");
        if let Some(value) = auth_value {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        let (parts, _) = builder.body(()).unwrap().into_parts();
        parts
    }

    #[tokio::test]
    async fn test_valid_bearer_token_extracts_user() {
        let state = test_state();
        let token = state
            .tokens
            .issue_access_token(5, "five@example.com", Role::Customer)
            .unwrap();
        let mut parts = parts_with_auth(Some(&format!("Bearer {}", token)));

        let user = AuthenticatedUser::from_request_parts(&mut parts, &state)
            .await
            .unwrap();
        assert_eq!(user.user_id, 5);
        assert_eq!(user.role, Role::Customer);
    }

    #[tokio::test]
    async fn test_missing_header_is_rejected() {
        let mut parts = parts_with_auth(None);
        let result = AuthenticatedUser::from_request_parts(&mut parts, &test_state()).await;
        assert!(matches!(result, Err(AuthError::MissingToken)));
    }

    #[tokio::test]
    async fn test_non_bearer_scheme_is_rejected() {
        let mut parts = parts_with_auth(Some("Basic dXNlcjpwYXNz"));
        let result = AuthenticatedUser::from_request_parts(&mut parts, &test_state()).await;
        assert!(matches!(result, Err(AuthError::InvalidToken)));
    }

    #[test]
    fn test_require_role() {
        let owner = AuthenticatedUser {
            user_id: 1,
            email: "owner@example.com".to_string(),
            role: Role::Owner,
        };
        assert!(owner.require_role(&[Role::Owner, Role::Admin]).is_ok());
        assert!(owner.require_role(&[Role::Admin]).is_err());
    }
}
