// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Request admission middleware for Axum.
//!
//! Two stages, installed as layers on protected routers:
//!
//! 1. [`authenticate`] verifies the bearer token and stores an
//!    [`AuthenticatedUser`] in the request extensions.
//! 2. [`require_admin`] reads that user and rejects non-admin callers.
//!
//! Neither stage touches the credential store. Axum runs the layer added
//! last first, so `authenticate` must be added after `require_admin`:
//!
//! ```rust,ignore
//! let admin = Router::new()
//!     .route("/users", get(list_users))
//!     .layer(axum::middleware::from_fn(require_admin))
//!     .layer(axum::middleware::from_fn_with_state(
//!         state.tokens.clone(),
//!         authenticate,
//!     ));
//! ```

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::{AuthError, AuthenticatedUser, Role, TokenCodec};

const BEARER_SCHEME: &str = "Bearer";

/// Extract the token from an `Authorization: Bearer <token>` header.
///
/// The scheme is matched exactly and the token must be a single
/// non-empty word; anything else is rejected before the codec sees it.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingAuthHeader)?
        .to_str()
        .map_err(|_| AuthError::InvalidAuthHeader)?;

    let (scheme, token) = value
        .split_once(' ')
        .ok_or(AuthError::InvalidAuthHeader)?;

    if scheme != BEARER_SCHEME || token.is_empty() || token.contains(char::is_whitespace) {
        return Err(AuthError::InvalidAuthHeader);
    }

    Ok(token)
}

/// Run the authentication stage against a set of request headers.
pub fn authenticate_headers(
    headers: &HeaderMap,
    tokens: &TokenCodec,
) -> Result<AuthenticatedUser, AuthError> {
    let token = bearer_token(headers)?;
    let claims = tokens.parse(token)?;
    Ok(AuthenticatedUser::from_claims(claims))
}

/// Authentication stage.
pub async fn authenticate(
    State(tokens): State<Arc<TokenCodec>>,
    mut request: Request,
    next: Next,
) -> Response {
    match authenticate_headers(request.headers(), &tokens) {
        Ok(user) => {
            tracing::debug!(user_id = user.user_id, role = %user.role, "request authenticated");
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(e) => {
            tracing::debug!(reason = e.error_code(), path = %request.uri().path(), "authentication failed");
            e.into_response()
        }
    }
}

/// Authorization stage for admin-only routes.
pub async fn require_admin(request: Request, next: Next) -> Response {
    match check_role(request.extensions().get::<AuthenticatedUser>(), Role::Admin) {
        Ok(()) => next.run(request).await,
        Err(AuthError::MissingAuthContext) => {
            tracing::error!(
                path = %request.uri().path(),
                "require_admin installed without authenticate; rejecting request"
            );
            AuthError::MissingAuthContext.into_response()
        }
        Err(e) => {
            tracing::warn!(path = %request.uri().path(), "non-admin caller rejected");
            e.into_response()
        }
    }
}

/// Role check shared by middleware and extractors.
pub fn check_role(user: Option<&AuthenticatedUser>, required: Role) -> Result<(), AuthError> {
    let user = user.ok_or(AuthError::MissingAuthContext)?;
    if user.has_role(required) {
        Ok(())
    } else {
        Err(AuthError::InsufficientPermissions)
    }
}
