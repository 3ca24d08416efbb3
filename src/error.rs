/*
 * Responsibility
 * - アプリ共通の AppError 定義
 * - IntoResponse 実装 (HTTP status / JSON error body)
 * - DasvidError / ConfigError を統一的に変換
 */
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::config::ConfigError;
use crate::services::dasvid::DasvidError;
use crate::services::keys::KeyError;
use crate::services::token::TokenError;
use crate::services::zkp::ProofError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("issuer key unavailable")]
    KeyUnavailable,

    #[error("deadline exceeded")]
    Timeout,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("internal server error")]
    Internal,
}

#[derive(Serialize)]
struct ErrorResponseBody {
    error: ErrorBody,
}

#[derive(Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            AppError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            AppError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            AppError::KeyUnavailable => (StatusCode::BAD_GATEWAY, "KEY_UNAVAILABLE"),
            AppError::Timeout => (StatusCode::SERVICE_UNAVAILABLE, "TIMEOUT"),
            AppError::Config(_) | AppError::Internal => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL")
            }
        };

        let message = match &self {
            // Never echo configuration details to clients
            AppError::Config(_) => AppError::Internal.to_string(),
            _ => self.to_string(),
        };

        let body = ErrorResponseBody {
            error: ErrorBody { code, message },
        };

        (status, Json(body)).into_response()
    }
}

impl From<DasvidError> for AppError {
    fn from(e: DasvidError) -> Self {
        match e {
            DasvidError::Token(TokenError::Malformed(msg)) => AppError::InvalidRequest(msg),
            DasvidError::Token(TokenError::Signing(_)) => AppError::Internal,
            DasvidError::Token(e) => AppError::Unauthorized(e.to_string()),

            DasvidError::Key(KeyError::KeyUnavailable { .. }) => AppError::KeyUnavailable,
            DasvidError::Key(e @ KeyError::UnknownIssuer(_)) => AppError::Unauthorized(e.to_string()),
            DasvidError::Key(_) => AppError::Internal,

            DasvidError::Proof(ProofError::InvalidWitness) => {
                AppError::Unauthorized("token signature is invalid".to_string())
            }
            DasvidError::Proof(e) => AppError::InvalidRequest(e.to_string()),

            DasvidError::DeadlineExceeded(_) => AppError::Timeout,
            DasvidError::ProofSelfCheck => AppError::Internal,
            e => AppError::Unauthorized(e.to_string()),
        }
    }
}
