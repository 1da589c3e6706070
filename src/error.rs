// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! API error taxonomy.
//!
//! Every failure that reaches an HTTP response is an [`ApiError`]. The
//! transport status is derived from the [`ErrorCode`] alone, so call sites
//! only choose a code and a message.

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::auth::{PasswordError, TokenError, WalletSignatureError};
use crate::storage::{StoreError, UniqueField};

/// Stable machine-readable error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    BadRequest,
    ValidationFailed,
    Unauthorized,
    Forbidden,
    NotFound,
    DuplicateEntity,
    Web3SignatureError,
    CryptoFailure,
    InternalServerError,
}

impl ErrorCode {
    pub fn status(&self) -> StatusCode {
        match self {
            ErrorCode::BadRequest
            | ErrorCode::ValidationFailed
            | ErrorCode::Web3SignatureError => StatusCode::BAD_REQUEST,
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::Forbidden => StatusCode::FORBIDDEN,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::DuplicateEntity => StatusCode::CONFLICT,
            ErrorCode::CryptoFailure | ErrorCode::InternalServerError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::BadRequest => "BAD_REQUEST",
            ErrorCode::ValidationFailed => "VALIDATION_FAILED",
            ErrorCode::Unauthorized => "UNAUTHORIZED",
            ErrorCode::Forbidden => "FORBIDDEN",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::DuplicateEntity => "DUPLICATE_ENTITY",
            ErrorCode::Web3SignatureError => "WEB3_SIGNATURE_ERROR",
            ErrorCode::CryptoFailure => "CRYPTO_FAILURE",
            ErrorCode::InternalServerError => "INTERNAL_SERVER_ERROR",
        }
    }

    /// Server-side failures never expose their detail to the caller.
    fn is_internal(&self) -> bool {
        self.status().is_server_error()
    }
}

/// Message shared by every failed login so callers cannot probe which
/// emails or wallets are registered.
pub const INVALID_CREDENTIALS: &str = "Invalid credentials";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}: {message}", .code.as_str())]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
    pub detail: Option<String>,
}

/// JSON envelope: `{"error": {...}}`.
#[derive(Serialize, ToSchema)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Serialize, ToSchema)]
pub struct ErrorBody {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn status(&self) -> StatusCode {
        self.code.status()
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationFailed, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    /// The single failure shape for any rejected login.
    pub fn invalid_credentials() -> Self {
        Self::unauthorized(INVALID_CREDENTIALS)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    pub fn duplicate(field: UniqueField) -> Self {
        Self::new(
            ErrorCode::DuplicateEntity,
            format!("{} is already registered", field.label()),
        )
        .with_detail(field.as_str())
    }

    pub fn web3_signature(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Web3SignatureError, message)
    }

    pub fn crypto(detail: impl Into<String>) -> Self {
        Self::new(ErrorCode::CryptoFailure, "Cryptographic operation failed").with_detail(detail)
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalServerError, "Internal server error").with_detail(detail)
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(id) => {
                ApiError::not_found("Identity not found").with_detail(format!("id: {id}"))
            }
            StoreError::Conflict(field) => ApiError::duplicate(field),
            other => ApiError::internal(other.to_string()),
        }
    }
}

impl From<PasswordError> for ApiError {
    fn from(e: PasswordError) -> Self {
        ApiError::crypto(e.to_string())
    }
}

impl From<TokenError> for ApiError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::Signing(_) => ApiError::crypto(e.to_string()),
            TokenError::InvalidToken | TokenError::TokenExpired => {
                ApiError::unauthorized(e.to_string())
            }
        }
    }
}

impl From<WalletSignatureError> for ApiError {
    fn from(e: WalletSignatureError) -> Self {
        ApiError::web3_signature("Wallet signature could not be verified").with_detail(e.to_string())
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(e: validator::ValidationErrors) -> Self {
        let mut fields: Vec<String> = e.field_errors().keys().map(|k| k.to_string()).collect();
        fields.sort();
        ApiError::validation("Request validation failed").with_detail(fields.join(", "))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(e: JsonRejection) -> Self {
        ApiError::bad_request("Malformed request body").with_detail(e.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(e: PathRejection) -> Self {
        ApiError::bad_request("Malformed path parameter").with_detail(e.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(e: QueryRejection) -> Self {
        ApiError::bad_request("Malformed query string").with_detail(e.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = if self.code.is_internal() {
            tracing::error!(
                code = self.code.as_str(),
                detail = self.detail.as_deref().unwrap_or(""),
                "{}",
                self.message
            );
            None
        } else {
            self.detail
        };

        let body = Json(ErrorEnvelope {
            error: ErrorBody {
                code: self.code,
                message: self.message,
                detail,
            },
        });
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[test]
    fn status_is_derived_from_code() {
        assert_eq!(ApiError::bad_request("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::validation("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::unauthorized("x").status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::forbidden("x").status(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::not_found("x").status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::duplicate(UniqueField::Email).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::crypto("rng").status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn duplicate_names_the_field() {
        let err = ApiError::duplicate(UniqueField::WalletAddress);
        assert_eq!(err.code, ErrorCode::DuplicateEntity);
        assert_eq!(err.detail.as_deref(), Some("wallet_address"));
    }

    #[test]
    fn store_conflict_becomes_duplicate() {
        let err: ApiError = StoreError::Conflict(UniqueField::Username).into();
        assert_eq!(err, ApiError::duplicate(UniqueField::Username));

        let err: ApiError = StoreError::NotFound(7).into();
        assert_eq!(err.code, ErrorCode::NotFound);

        let err: ApiError = StoreError::Cancelled.into();
        assert_eq!(err.code, ErrorCode::InternalServerError);
    }

    #[tokio::test]
    async fn into_response_returns_json_envelope() {
        let response = ApiError::bad_request("bad data")
            .with_detail("field x")
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();
        assert_eq!(body["error"]["code"], "BAD_REQUEST");
        assert_eq!(body["error"]["message"], "bad data");
        assert_eq!(body["error"]["detail"], "field x");
    }

    #[tokio::test]
    async fn internal_errors_hide_detail() {
        let response = ApiError::internal("redb: disk full").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();
        assert_eq!(body["error"]["code"], "INTERNAL_SERVER_ERROR");
        assert_eq!(body["error"]["message"], "Internal server error");
        assert!(body["error"].get("detail").is_none());
    }
}
