// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Admin-only identity management endpoints.
//!
//! The router mounts these behind the authentication and admin gates; the
//! `AdminOnly` extractor additionally records which admin acted.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};

use crate::{
    auth::AdminOnly,
    error::{ApiError, ErrorEnvelope},
    models::{IdentityPatch, IdentityResponse, PageQuery, SystemOverview, UserPage},
    state::AppState,
};

/// List identities, oldest first.
#[utoipa::path(
    get,
    path = "/api/v1/admin/users",
    tag = "Admin",
    security(("bearer" = [])),
    params(PageQuery),
    responses(
        (status = 200, description = "One page of identities", body = UserPage),
        (status = 401, description = "Unauthorized", body = ErrorEnvelope),
        (status = 403, description = "Forbidden - admin role required", body = ErrorEnvelope),
    )
)]
pub async fn list_users(
    State(state): State<AppState>,
    AdminOnly(_admin): AdminOnly,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> Result<Json<UserPage>, ApiError> {
    let Query(query) = query?;
    Ok(Json(state.admin.list_users(query).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/users/{id}",
    tag = "Admin",
    security(("bearer" = [])),
    params(("id" = u64, Path, description = "Identity id")),
    responses(
        (status = 200, description = "Identity", body = IdentityResponse),
        (status = 403, description = "Forbidden - admin role required", body = ErrorEnvelope),
        (status = 404, description = "Identity not found", body = ErrorEnvelope),
    )
)]
pub async fn get_user(
    State(state): State<AppState>,
    AdminOnly(_admin): AdminOnly,
    path: Result<Path<u64>, PathRejection>,
) -> Result<Json<IdentityResponse>, ApiError> {
    let Path(id) = path?;
    let identity = state.admin.get_user(id).await?;
    Ok(Json(identity.into()))
}

/// Patch an identity. `wallet_address: null` unbinds the wallet.
#[utoipa::path(
    put,
    path = "/api/v1/admin/users/{id}",
    tag = "Admin",
    security(("bearer" = [])),
    params(("id" = u64, Path, description = "Identity id")),
    request_body = IdentityPatch,
    responses(
        (status = 200, description = "Updated identity", body = IdentityResponse),
        (status = 400, description = "Invalid field value", body = ErrorEnvelope),
        (status = 403, description = "Forbidden - admin role required", body = ErrorEnvelope),
        (status = 404, description = "Identity not found", body = ErrorEnvelope),
        (status = 409, description = "Email, wallet or username already taken", body = ErrorEnvelope),
    )
)]
pub async fn update_user(
    State(state): State<AppState>,
    AdminOnly(admin): AdminOnly,
    path: Result<Path<u64>, PathRejection>,
    payload: Result<Json<IdentityPatch>, JsonRejection>,
) -> Result<Json<IdentityResponse>, ApiError> {
    let Path(id) = path?;
    let Json(patch) = payload?;
    tracing::debug!(admin_id = admin.user_id, user_id = id, "Admin identity update");
    let identity = state.admin.update_user(id, patch).await?;
    Ok(Json(identity.into()))
}

#[utoipa::path(
    delete,
    path = "/api/v1/admin/users/{id}",
    tag = "Admin",
    security(("bearer" = [])),
    params(("id" = u64, Path, description = "Identity id")),
    responses(
        (status = 204, description = "Identity deleted"),
        (status = 403, description = "Forbidden - admin role required", body = ErrorEnvelope),
        (status = 404, description = "Identity not found", body = ErrorEnvelope),
    )
)]
pub async fn delete_user(
    State(state): State<AppState>,
    AdminOnly(admin): AdminOnly,
    path: Result<Path<u64>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = path?;
    tracing::debug!(admin_id = admin.user_id, user_id = id, "Admin identity delete");
    state.admin.delete_user(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Identity counts.
#[utoipa::path(
    get,
    path = "/api/v1/admin/stats/overview",
    tag = "Admin",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "System overview", body = SystemOverview),
        (status = 403, description = "Forbidden - admin role required", body = ErrorEnvelope),
    )
)]
pub async fn system_overview(
    State(state): State<AppState>,
    AdminOnly(_admin): AdminOnly,
) -> Result<Json<SystemOverview>, ApiError> {
    Ok(Json(state.admin.system_overview().await?))
}
