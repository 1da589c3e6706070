// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::time::Duration;

use axum::{
    http::StatusCode,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::{middleware::authenticate, middleware::require_admin, Role},
    error::{ErrorBody, ErrorCode, ErrorEnvelope},
    models::{
        AuthResponse, IdentityPatch, IdentityResponse, LoginRequest, RegisterRequest,
        SystemOverview, UserPage,
    },
    state::AppState,
};

pub mod admin;
pub mod auth;
pub mod health;
pub mod users;

/// Build the full HTTP surface.
pub fn router(state: AppState, request_timeout: Duration) -> Router {
    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login));

    let user_routes = Router::new()
        .route("/profile", get(users::get_profile))
        .route("/{id}", get(users::get_user))
        .route_layer(from_fn_with_state(state.tokens.clone(), authenticate));

    // Layers run bottom-up: authenticate, then the admin guard.
    let admin_routes = Router::new()
        .route("/users", get(admin::list_users))
        .route(
            "/users/{id}",
            get(admin::get_user)
                .put(admin::update_user)
                .delete(admin::delete_user),
        )
        .route("/stats/overview", get(admin::system_overview))
        .route_layer(from_fn(require_admin))
        .route_layer(from_fn_with_state(state.tokens.clone(), authenticate));

    let v1_routes = Router::new()
        .nest("/auth", auth_routes)
        .nest("/users", user_routes)
        .nest("/admin", admin_routes);

    Router::new()
        .nest("/api/v1", v1_routes)
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(CorsLayer::permissive())
}

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::register,
        auth::login,
        users::get_profile,
        users::get_user,
        admin::list_users,
        admin::get_user,
        admin::update_user,
        admin::delete_user,
        admin::system_overview,
        health::health,
        health::liveness
    ),
    components(
        schemas(
            RegisterRequest,
            LoginRequest,
            AuthResponse,
            IdentityResponse,
            IdentityPatch,
            UserPage,
            SystemOverview,
            Role,
            ErrorEnvelope,
            ErrorBody,
            ErrorCode,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "Auth", description = "Registration and login"),
        (name = "Users", description = "Authenticated identity lookups"),
        (name = "Admin", description = "Identity management for administrators"),
        (name = "Health", description = "Liveness and readiness probes")
    )
)]
struct ApiDoc;
