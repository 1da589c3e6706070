// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractors for authenticated callers.
//!
//! ```rust,ignore
//! async fn profile(Auth(user): Auth, State(state): State<AppState>) -> ... {
//!     // user is AuthenticatedUser
//! }
//! ```
//!
//! Both extractors reuse the user placed in the request extensions by
//! [`authenticate`](super::middleware::authenticate) and fall back to
//! verifying the `Authorization` header themselves on routes without it.

use std::sync::Arc;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};

use super::{
    middleware::{authenticate_headers, check_role},
    AuthError, AuthenticatedUser, Role, TokenCodec,
};

/// Extractor for any authenticated caller.
pub struct Auth(pub AuthenticatedUser);

impl<S> FromRequestParts<S> for Auth
where
    S: Send + Sync,
    Arc<TokenCodec>: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<AuthenticatedUser>().cloned() {
            return Ok(Auth(user));
        }

        let tokens = Arc::<TokenCodec>::from_ref(state);
        let user = authenticate_headers(&parts.headers, &tokens)?;
        parts.extensions.insert(user.clone());
        Ok(Auth(user))
    }
}

/// Extractor that requires the admin role.
pub struct AdminOnly(pub AuthenticatedUser);

impl<S> FromRequestParts<S> for AdminOnly
where
    S: Send + Sync,
    Arc<TokenCodec>: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Auth(user) = Auth::from_request_parts(parts, state).await?;
        check_role(Some(&user), Role::Admin)?;
        Ok(AdminOnly(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Principal;
    use axum::http::Request;
    use chrono::Duration;

    fn codec() -> Arc<TokenCodec> {
        Arc::new(TokenCodec::new(b"extractor-test-secret-at-least-32-bytes!"))
    }

    fn parts_with(auth: Option<String>) -> Parts {
        let mut builder = Request::builder().uri("/test");
        if let Some(value) = auth {
            builder = builder.header("Authorization", value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    fn user(role: Role) -> AuthenticatedUser {
        AuthenticatedUser {
            user_id: 3,
            role,
            wallet_address: None,
        }
    }

    #[tokio::test]
    async fn auth_extractor_requires_auth_header() {
        let mut parts = parts_with(None);
        let result = Auth::from_request_parts(&mut parts, &codec()).await;
        assert!(matches!(result, Err(AuthError::MissingAuthHeader)));
    }

    #[tokio::test]
    async fn auth_extractor_verifies_token() {
        let tokens = codec();
        let token = tokens
            .issue(
                &Principal {
                    user_id: 12,
                    role: Role::Regular,
                    wallet_address: None,
                },
                Duration::hours(1),
            )
            .unwrap();
        let mut parts = parts_with(Some(format!("Bearer {token}")));

        let Auth(user) = Auth::from_request_parts(&mut parts, &tokens).await.unwrap();
        assert_eq!(user.user_id, 12);
        assert_eq!(user.role, Role::Regular);
    }

    #[tokio::test]
    async fn auth_extractor_rejects_forged_token() {
        let other = Arc::new(TokenCodec::new(b"some-other-secret-that-is-32-bytes-long"));
        let token = other
            .issue(
                &Principal {
                    user_id: 12,
                    role: Role::Admin,
                    wallet_address: None,
                },
                Duration::hours(1),
            )
            .unwrap();
        let mut parts = parts_with(Some(format!("Bearer {token}")));

        let result = Auth::from_request_parts(&mut parts, &codec()).await;
        assert!(matches!(result, Err(AuthError::InvalidToken)));
    }

    #[tokio::test]
    async fn auth_extractor_prefers_extensions() {
        let mut parts = parts_with(None);
        parts.extensions.insert(user(Role::Admin));

        let Auth(found) = Auth::from_request_parts(&mut parts, &codec()).await.unwrap();
        assert_eq!(found.user_id, 3);
    }

    #[tokio::test]
    async fn admin_only_rejects_non_admin() {
        let mut parts = parts_with(None);
        parts.extensions.insert(user(Role::Regular));

        let result = AdminOnly::from_request_parts(&mut parts, &codec()).await;
        assert!(matches!(result, Err(AuthError::InsufficientPermissions)));
    }

    #[tokio::test]
    async fn admin_only_admits_admin() {
        let mut parts = parts_with(None);
        parts.extensions.insert(user(Role::Admin));

        let AdminOnly(found) = AdminOnly::from_request_parts(&mut parts, &codec()).await.unwrap();
        assert!(found.is_admin());
    }
}
