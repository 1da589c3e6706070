// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Commerce Auth Server - Credential & Session Authority
//!
//! Authenticates storefront principals by password or EVM wallet signature,
//! issues stateless HS256 session tokens and gates privileged routes by role.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum) and the OpenAPI document
//! - `auth` - Passwords, session tokens, wallet signatures and the request gate
//! - `services` - Session authenticator and admin identity management
//! - `storage` - Credential store trait with in-memory and redb backends

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod state;
pub mod storage;
pub mod telemetry;
