// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Registration and login endpoints.

use axum::{extract::rejection::JsonRejection, extract::State, http::StatusCode, Json};

use crate::{
    error::{ApiError, ErrorEnvelope},
    models::{AuthResponse, LoginCredentials, LoginRequest, RegisterRequest},
    state::AppState,
};

/// Register a new identity and issue its first session token.
#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    tag = "Auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Identity created", body = AuthResponse),
        (status = 400, description = "Malformed or invalid request", body = ErrorEnvelope),
        (status = 409, description = "Email, wallet or username already taken", body = ErrorEnvelope),
    )
)]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let Json(request) = payload?;
    let registration = request.into_registration()?;
    let session = state.sessions.register(registration).await?;

    Ok((StatusCode::CREATED, Json(session.into())))
}

/// Log in with a password or a wallet signature.
///
/// Every credential mismatch yields the same 401 body, whichever part was wrong.
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session issued", body = AuthResponse),
        (status = 400, description = "Malformed request or signature", body = ErrorEnvelope),
        (status = 401, description = "Invalid credentials", body = ErrorEnvelope),
    )
)]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>, ApiError> {
    let Json(request) = payload?;
    let credentials = LoginCredentials::try_from(request)?;
    let session = state.sessions.login(credentials).await?;

    Ok(Json(session.into()))
}
