// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Data Models
//!
//! Identity records, API request/response types and input normalisation.
//!
//! ## Normalisation
//!
//! Every identity key is canonicalised before lookup or storage so that
//! uniqueness holds regardless of how a client spells it:
//!
//! - emails: trimmed, NFKC, lower-cased
//! - usernames: trimmed, NFKC; compared case-insensitively
//! - wallet addresses: `0x` + 40 hex digits, lower-cased
//!
//! [`Identity`] deliberately does not implement `Serialize`; the only
//! outward representation is [`IdentityResponse`], which has no password
//! hash field.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use unicode_normalization::UnicodeNormalization;
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidateEmail};

use crate::auth::{Principal, Role};
use crate::error::ApiError;

pub const USERNAME_MIN_CHARS: u64 = 3;
pub const USERNAME_MAX_CHARS: u64 = 50;

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

// =============================================================================
// Wallet Address Type
// =============================================================================

/// EVM wallet address in canonical lower-case form.
///
/// Format: `0x` followed by 40 hexadecimal characters (20 bytes).
///
/// # Example
///
/// ```rust,ignore
/// let addr = WalletAddress::parse("0x742d35Cc6634C0532925a3b844Bc9e7595f4aB12")?;
/// assert_eq!(addr.as_str(), "0x742d35cc6634c0532925a3b844bc9e7595f4ab12");
/// ```
#[derive(Debug, Clone, Serialize, ToSchema, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WalletAddress(String);

impl WalletAddress {
    pub fn parse(raw: &str) -> Result<Self, ApiError> {
        let trimmed = raw.trim();
        let well_formed = trimmed.len() == 42
            && trimmed.starts_with("0x")
            && alloy::primitives::Address::from_str(trimmed).is_ok();

        if !well_formed {
            return Err(ApiError::validation("Invalid wallet address").with_detail("wallet_address"));
        }
        Ok(WalletAddress(trimmed.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<'de> Deserialize<'de> for WalletAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        WalletAddress::parse(&raw).map_err(|e| serde::de::Error::custom(e.message))
    }
}

impl From<WalletAddress> for String {
    fn from(value: WalletAddress) -> Self {
        value.0
    }
}

// =============================================================================
// Normalisation helpers
// =============================================================================

pub fn normalize_email(raw: &str) -> String {
    raw.trim().nfkc().collect::<String>().to_lowercase()
}

pub fn normalize_username(raw: &str) -> String {
    raw.trim().nfkc().collect()
}

/// Key under which username uniqueness is enforced.
pub fn username_key(username: &str) -> String {
    normalize_username(username).to_lowercase()
}

// =============================================================================
// Identity
// =============================================================================

/// A durable principal record.
#[derive(Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: u64,
    pub username: String,
    pub email: String,
    /// Argon2id PHC string. Never leaves the service.
    pub password_hash: String,
    pub wallet_address: Option<WalletAddress>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl std::fmt::Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Identity")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password_hash", &"[REDACTED]")
            .field("wallet_address", &self.wallet_address)
            .field("role", &self.role)
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

impl Identity {
    pub fn principal(&self) -> Principal {
        Principal {
            user_id: self.id,
            role: self.role,
            wallet_address: self.wallet_address.as_ref().map(|w| w.as_str().to_string()),
        }
    }
}

/// Identity fields supplied on creation; the store assigns id and timestamps.
#[derive(Clone, PartialEq, Eq)]
pub struct NewIdentity {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub wallet_address: Option<WalletAddress>,
    pub role: Role,
}

impl std::fmt::Debug for NewIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewIdentity")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("wallet_address", &self.wallet_address)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Responses
// =============================================================================

/// Public view of an identity.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct IdentityResponse {
    pub id: u64,
    pub username: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub wallet_address: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Identity> for IdentityResponse {
    fn from(identity: &Identity) -> Self {
        Self {
            id: identity.id,
            username: identity.username.clone(),
            email: identity.email.clone(),
            wallet_address: identity.wallet_address.clone().map(String::from),
            role: identity.role,
            created_at: identity.created_at,
            updated_at: identity.updated_at,
        }
    }
}

impl From<Identity> for IdentityResponse {
    fn from(identity: Identity) -> Self {
        IdentityResponse::from(&identity)
    }
}

/// Identity plus a freshly issued session token.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthResponse {
    #[serde(flatten)]
    pub identity: IdentityResponse,
    /// Bearer token for the `Authorization` header
    pub token: String,
}

/// Paginated identity listing.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserPage {
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
    pub users: Vec<IdentityResponse>,
}

/// Identity counts for the admin dashboard.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct SystemOverview {
    pub total_users: u64,
    pub admin_users: u64,
    pub wallet_bound_users: u64,
}

// =============================================================================
// Requests
// =============================================================================

/// Registration request.
#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 3, max = 50))]
    #[schema(example = "satoshi")]
    pub username: String,

    #[validate(email)]
    #[schema(example = "satoshi@example.com")]
    pub email: String,

    #[validate(length(min = 8, max = 128))]
    pub password: String,

    #[serde(default)]
    #[schema(example = "0x742d35cc6634c0532925a3b844bc9e7595f4ab12")]
    pub wallet_address: Option<String>,
}

/// A registration whose fields have been normalised and validated.
#[derive(Clone)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
    pub wallet_address: Option<WalletAddress>,
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("wallet_address", &self.wallet_address)
            .finish_non_exhaustive()
    }
}

impl RegisterRequest {
    pub fn into_registration(self) -> Result<Registration, ApiError> {
        let normalized = RegisterRequest {
            username: normalize_username(&self.username),
            email: normalize_email(&self.email),
            password: self.password,
            wallet_address: self.wallet_address,
        };
        normalized.validate()?;

        let wallet_address = match normalized.wallet_address.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(WalletAddress::parse(raw)?),
        };

        Ok(Registration {
            username: normalized.username,
            email: normalized.email,
            password: normalized.password,
            wallet_address,
        })
    }
}

/// Login request as received on the wire.
///
/// Exactly one of the two credential shapes must be filled:
/// `email` + `password`, or `wallet_address` + `message` + `signature`.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub wallet_address: Option<String>,
    /// Message the wallet signed (EIP-191 `personal_sign`)
    pub message: Option<String>,
    /// 65-byte hex signature over `message`
    pub signature: Option<String>,
}

/// Login credentials, one case per accepted shape.
#[derive(Clone)]
pub enum LoginCredentials {
    Password {
        email: String,
        password: String,
    },
    /// Proves control of the key behind `wallet_address` only. The message
    /// is chosen by the caller and carries no nonce, so a signature captured
    /// earlier verifies again.
    Wallet {
        wallet_address: WalletAddress,
        message: String,
        signature: String,
    },
}

impl std::fmt::Debug for LoginCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoginCredentials::Password { email, .. } => {
                f.debug_struct("Password").field("email", email).finish_non_exhaustive()
            }
            LoginCredentials::Wallet { wallet_address, .. } => f
                .debug_struct("Wallet")
                .field("wallet_address", wallet_address)
                .finish_non_exhaustive(),
        }
    }
}

impl TryFrom<LoginRequest> for LoginCredentials {
    type Error = ApiError;

    fn try_from(req: LoginRequest) -> Result<Self, Self::Error> {
        fn present(field: Option<String>) -> Option<String> {
            field.filter(|v| !v.trim().is_empty())
        }

        let email = present(req.email);
        let password = req.password.filter(|p| !p.is_empty());
        let wallet = present(req.wallet_address);
        let message = req.message.filter(|m| !m.is_empty());
        let signature = present(req.signature);

        let any_password_field = email.is_some() || password.is_some();
        let any_wallet_field = wallet.is_some() || message.is_some() || signature.is_some();

        match (email, password, wallet, message, signature) {
            (Some(email), Some(password), None, None, None) => Ok(LoginCredentials::Password {
                email: normalize_email(&email),
                password,
            }),
            (None, None, Some(wallet), Some(message), Some(signature)) => {
                Ok(LoginCredentials::Wallet {
                    wallet_address: WalletAddress::parse(&wallet).map_err(|_| {
                        ApiError::web3_signature("Malformed wallet address")
                            .with_detail("wallet_address")
                    })?,
                    message,
                    signature: signature.trim().to_string(),
                })
            }
            _ if any_password_field && any_wallet_field => Err(ApiError::bad_request(
                "Provide either email and password or wallet credentials, not both",
            )),
            _ => Err(ApiError::bad_request(
                "Provide email and password, or wallet_address, message and signature",
            )),
        }
    }
}

/// Partial update of an identity by an administrator.
///
/// Absent fields are left unchanged. `wallet_address` distinguishes
/// absent (unchanged), `null` (unbind) and a value (rebind).
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct IdentityPatch {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub wallet_address: Option<Option<String>>,
}

impl IdentityPatch {
    pub fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.email.is_none()
            && self.role.is_none()
            && self.wallet_address.is_none()
    }

    /// Apply the patch to `identity`, validating every changed field.
    pub fn apply_to(self, identity: &mut Identity) -> Result<(), ApiError> {
        if let Some(username) = self.username {
            let username = normalize_username(&username);
            let chars = username.chars().count() as u64;
            if !(USERNAME_MIN_CHARS..=USERNAME_MAX_CHARS).contains(&chars) {
                return Err(ApiError::validation("Invalid username length").with_detail("username"));
            }
            identity.username = username;
        }

        if let Some(email) = self.email {
            let email = normalize_email(&email);
            if !email.validate_email() {
                return Err(ApiError::validation("Invalid email address").with_detail("email"));
            }
            identity.email = email;
        }

        if let Some(role) = self.role {
            identity.role = role;
        }

        match self.wallet_address {
            None => {}
            Some(None) => identity.wallet_address = None,
            Some(Some(raw)) if raw.trim().is_empty() => identity.wallet_address = None,
            Some(Some(raw)) => identity.wallet_address = Some(WalletAddress::parse(&raw)?),
        }

        Ok(())
    }
}

fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Pagination query for identity listings.
#[derive(Debug, Clone, Copy, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    /// 1-based page number (default 1)
    pub page: Option<u32>,
    /// Page size (default 10, max 100)
    pub page_size: Option<u32>,
}

impl PageQuery {
    /// Resolve to `(page, page_size)` with defaults and caps applied.
    pub fn resolve(self) -> (u32, u32) {
        let page = self.page.filter(|p| *p > 0).unwrap_or(1);
        let page_size = self
            .page_size
            .filter(|s| *s > 0)
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .min(MAX_PAGE_SIZE);
        (page, page_size)
    }
}
