// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HS256 session token codec.
//!
//! Tokens are standard three-segment JWTs signed with the process-wide
//! secret. Expiry is checked here rather than by `jsonwebtoken` so that the
//! grace window is applied at verification time only and never written into
//! the token.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use super::claims::{Principal, SessionClaims};

/// Tolerance for clock skew between issuing and verifying nodes.
///
/// A token is rejected as expired only once `now - exp` exceeds this value.
pub const GRACE_WINDOW_SECS: i64 = 300;

/// Token codec failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    /// Bad signature, wrong algorithm, malformed segments or missing expiry.
    #[error("Token is invalid")]
    InvalidToken,
    /// Expired for longer than the grace window.
    #[error("Token has expired")]
    TokenExpired,
    /// Signing infrastructure failure while issuing.
    #[error("Token signing failed: {0}")]
    Signing(String),
}

/// Signs and verifies session tokens with a symmetric secret.
///
/// Holds no mutable state; share it behind an `Arc`.
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("algorithm", &Algorithm::HS256)
            .field("grace_window_secs", &GRACE_WINDOW_SECS)
            .finish_non_exhaustive()
    }
}

impl TokenCodec {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.required_spec_claims.clear();

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Issue a token for `principal` valid for `ttl` from now.
    pub fn issue(&self, principal: &Principal, ttl: Duration) -> Result<String, TokenError> {
        self.issue_at(principal, ttl, Utc::now().timestamp())
    }

    /// Issue a token as if the current time were `now` (seconds since epoch).
    pub fn issue_at(
        &self,
        principal: &Principal,
        ttl: Duration,
        now: i64,
    ) -> Result<String, TokenError> {
        let claims = SessionClaims {
            user_id: principal.user_id,
            role: principal.role,
            wallet_address: principal.wallet_address.clone(),
            issued_at: now,
            expires_at: now + ttl.num_seconds(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Verify a token against the current time.
    pub fn parse(&self, token: &str) -> Result<SessionClaims, TokenError> {
        self.parse_at(token, Utc::now().timestamp())
    }

    /// Verify a token as if the current time were `now`.
    pub fn parse_at(&self, token: &str, now: i64) -> Result<SessionClaims, TokenError> {
        let data = decode::<SessionClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| {
                tracing::debug!(error = %e, "token rejected");
                TokenError::InvalidToken
            })?;
        let claims = data.claims;

        // An absent expiry decodes as 0 and must never mean "no expiry".
        if claims.expires_at <= 0 {
            return Err(TokenError::InvalidToken);
        }

        if now - claims.expires_at > GRACE_WINDOW_SECS {
            return Err(TokenError::TokenExpired);
        }

        Ok(claims)
    }
}
