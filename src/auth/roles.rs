// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Identity roles for authorization.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Coarse-grained role carried in session claims.
///
/// ## Role Hierarchy
///
/// - `Admin` - Storefront operator, may manage every identity
/// - `Regular` - Shopper account, may only act on itself
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Normal storefront account
    Regular,
    /// Full administrative access
    Admin,
}

impl Role {
    /// Check if this role has at least the privileges of the required role.
    pub fn has_privilege(&self, required: Role) -> bool {
        match (self, required) {
            (Role::Admin, _) => true,
            (Role::Regular, Role::Regular) => true,
            _ => false,
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }

    /// Wire representation used in claims and JSON bodies.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Regular => "regular",
            Role::Admin => "admin",
        }
    }
}

impl Default for Role {
    /// New identities start without privileges.
    fn default() -> Self {
        Role::Regular
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
