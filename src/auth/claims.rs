// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session claims and the authenticated caller representation.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::roles::Role;

/// The identity facts a token is issued for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: u64,
    pub role: Role,
    pub wallet_address: Option<String>,
}

/// Payload of a session token.
///
/// Constructed by the token codec on verification and dropped at the end of
/// the request. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Identity identifier
    pub user_id: u64,

    /// Role at issue time
    pub role: Role,

    /// Bound wallet address, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wallet_address: Option<String>,

    /// Issued at (seconds since epoch)
    #[serde(rename = "iat", default)]
    pub issued_at: i64,

    /// Expires at (seconds since epoch). Absent decodes as 0.
    #[serde(rename = "exp", default)]
    pub expires_at: i64,
}

impl SessionClaims {
    pub fn principal(&self) -> Principal {
        Principal {
            user_id: self.user_id,
            role: self.role,
            wallet_address: self.wallet_address.clone(),
        }
    }
}

/// Authenticated caller, attached to request extensions by the auth
/// middleware and read by handlers through the `Auth` extractor.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthenticatedUser {
    /// Identity identifier
    pub user_id: u64,

    /// Role carried in the token
    pub role: Role,

    /// Wallet address carried in the token
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wallet_address: Option<String>,
}

impl AuthenticatedUser {
    pub fn from_claims(claims: SessionClaims) -> Self {
        Self {
            user_id: claims.user_id,
            role: claims.role,
            wallet_address: claims.wallet_address,
        }
    }

    pub fn has_role(&self, required: Role) -> bool {
        self.role.has_privilege(required)
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}
