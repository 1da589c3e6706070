// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User endpoints.

use axum::{
    extract::{rejection::PathRejection, Path, State},
    Json,
};

use crate::{
    auth::Auth,
    error::{ApiError, ErrorEnvelope},
    models::IdentityResponse,
    state::AppState,
};

/// Get the authenticated caller's identity.
#[utoipa::path(
    get,
    path = "/api/v1/users/profile",
    tag = "Users",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Caller identity", body = IdentityResponse),
        (status = 401, description = "Unauthorized - invalid or missing token", body = ErrorEnvelope),
        (status = 404, description = "Identity was deleted after the token was issued", body = ErrorEnvelope),
    )
)]
pub async fn get_profile(
    State(state): State<AppState>,
    Auth(user): Auth,
) -> Result<Json<IdentityResponse>, ApiError> {
    let identity = state.sessions.get_by_id(user.user_id).await?;
    Ok(Json(identity.into()))
}

/// Get an identity by id.
#[utoipa::path(
    get,
    path = "/api/v1/users/{id}",
    tag = "Users",
    security(("bearer" = [])),
    params(("id" = u64, Path, description = "Identity id")),
    responses(
        (status = 200, description = "Identity", body = IdentityResponse),
        (status = 401, description = "Unauthorized - invalid or missing token", body = ErrorEnvelope),
        (status = 404, description = "Identity not found", body = ErrorEnvelope),
    )
)]
pub async fn get_user(
    State(state): State<AppState>,
    path: Result<Path<u64>, PathRejection>,
) -> Result<Json<IdentityResponse>, ApiError> {
    let Path(id) = path?;
    let identity = state.sessions.get_by_id(id).await?;
    Ok(Json(identity.into()))
}
