// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Credential verification, session tokens and request admission.
//!
//! ## Auth Flow
//!
//! 1. Client registers or logs in with email + password, or with a wallet
//!    address + signed message.
//! 2. The session authenticator verifies the credential and issues an
//!    HS256 session token carrying `user_id`, `role` and `wallet_address`.
//! 3. Client sends `Authorization: Bearer <token>` on later requests.
//! 4. The admission gate verifies the token and attaches an
//!    [`AuthenticatedUser`] to the request; admin routes additionally
//!    require [`Role::Admin`].
//!
//! ## Security
//!
//! - Passwords are stored as Argon2id PHC strings only
//! - Login failures never reveal which credential part was wrong
//! - Tokens are accepted up to [`GRACE_WINDOW_SECS`] past expiry
//! - The gate never reads the credential store

pub mod claims;
pub mod error;
pub mod extractor;
pub mod middleware;
pub mod password;
pub mod roles;
pub mod token;
pub mod wallet;

pub use claims::{AuthenticatedUser, Principal, SessionClaims};
pub use error::AuthError;
pub use extractor::{AdminOnly, Auth};
pub use password::{HashParams, PasswordError, PasswordHasher};
pub use roles::Role;
pub use token::{TokenCodec, TokenError, GRACE_WINDOW_SECS};
pub use wallet::{Eip191Verifier, WalletSignatureError, WalletSignatureVerifier};
