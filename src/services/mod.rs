// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Request-scoped orchestration over the credential store.
//!
//! Services hold no mutable state of their own; everything durable lives in
//! the [`CredentialStore`](crate::storage::CredentialStore). Every failure
//! leaves a service as an [`ApiError`](crate::error::ApiError).

pub mod admin;
pub mod session;

pub use admin::AdminService;
pub use session::{Session, SessionAuthenticator};
