// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Request admission errors.

use axum::response::{IntoResponse, Response};

use super::TokenError;
use crate::error::ApiError;

/// Failure in the authentication or authorization stage of a request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// No authorization header present
    #[error("Authorization header is required")]
    MissingAuthHeader,
    /// Header present but not exactly `Bearer <token>`
    #[error("Invalid authorization header format (expected 'Bearer <token>')")]
    InvalidAuthHeader,
    /// Token signature, structure or expiry claim is invalid
    #[error("Token is invalid")]
    InvalidToken,
    /// Token expired beyond the grace window
    #[error("Token has expired")]
    TokenExpired,
    /// Caller is authenticated but lacks the required role
    #[error("Insufficient permissions for this operation")]
    InsufficientPermissions,
    /// Authorization ran on a route without the authentication stage
    #[error("Authorization guard installed without authentication")]
    MissingAuthContext,
}

impl AuthError {
    /// Fine-grained reason, carried as the error detail.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingAuthHeader => "missing_auth_header",
            AuthError::InvalidAuthHeader => "invalid_auth_header",
            AuthError::InvalidToken => "invalid_token",
            AuthError::TokenExpired => "token_expired",
            AuthError::InsufficientPermissions => "insufficient_permissions",
            AuthError::MissingAuthContext => "missing_auth_context",
        }
    }
}

impl From<TokenError> for AuthError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::TokenExpired => AuthError::TokenExpired,
            TokenError::InvalidToken | TokenError::Signing(_) => AuthError::InvalidToken,
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::MissingAuthHeader
            | AuthError::InvalidAuthHeader
            | AuthError::InvalidToken
            | AuthError::TokenExpired => ApiError::unauthorized(e.to_string()),
            AuthError::InsufficientPermissions => ApiError::forbidden(e.to_string()),
            AuthError::MissingAuthContext => return ApiError::internal(e.to_string()),
        }
        .with_detail(e.error_code())
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
    use axum::{body::to_bytes, http::StatusCode};

    #[tokio::test]
    async fn missing_auth_returns_401() {
        let response = AuthError::MissingAuthHeader.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();
        assert_eq!(body["error"]["code"], "UNAUTHORIZED");
        assert_eq!(body["error"]["detail"], "missing_auth_header");
    }

    #[tokio::test]
    async fn insufficient_permissions_returns_403() {
        let response = AuthError::InsufficientPermissions.into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn missing_context_is_a_server_fault() {
        assert_eq!(
            ApiError::from(AuthError::MissingAuthContext).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn token_errors_map_to_gate_errors() {
        assert_eq!(AuthError::from(TokenError::TokenExpired), AuthError::TokenExpired);
        assert_eq!(AuthError::from(TokenError::InvalidToken), AuthError::InvalidToken);
    }
}
