/*
 * Responsibility
 * - POST /mint: OAuth token → DA-SVID
 * - POST /validate: DA-SVID → accepted / rejected (どのチェックで落ちたか)
 * - proof の生成/検証は CPU バウンドなので spawn_blocking で実行
 */
use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use chrono::Utc;
use tracing::error;

use crate::api::v1::dto::{
    mint::{MintRequest, MintResponse},
    validate::{ValidateRequest, ValidateResponse},
};
use crate::error::AppError;
use crate::services::dasvid::Verdict;
use crate::state::AppState;

pub async fn mint(
    State(state): State<AppState>,
    Json(req): Json<MintRequest>,
) -> Result<(StatusCode, Json<MintResponse>), AppError> {
    if req.access_token.trim().is_empty() {
        return Err(AppError::InvalidRequest(
            "access_token is required".to_string(),
        ));
    }
    if req.sub.trim().is_empty() {
        return Err(AppError::InvalidRequest("sub is required".to_string()));
    }

    let asserter = state.asserter.clone();
    let deadline = state.deadline();

    let minted = tokio::task::spawn_blocking(move || {
        asserter.assert(&req.access_token, &req.sub, Utc::now(), deadline)
    })
    .await
    .map_err(|e| {
        error!(error = %e, "mint task failed");
        AppError::Internal
    })??;

    Ok((
        StatusCode::OK,
        Json(MintResponse {
            dasvid: minted.token,
            exp: minted.claims.exp,
            zkp: minted.claims.zkp.is_some(),
        }),
    ))
}

pub async fn validate(
    State(state): State<AppState>,
    Json(req): Json<ValidateRequest>,
) -> Result<(StatusCode, Json<ValidateResponse>), AppError> {
    if req.dasvid.trim().is_empty() {
        return Err(AppError::InvalidRequest("dasvid is required".to_string()));
    }

    let validator = state.validator.clone();
    let deadline = state.deadline();

    let verdict =
        tokio::task::spawn_blocking(move || validator.validate(&req.dasvid, Utc::now(), deadline))
            .await
            .map_err(|e| {
                error!(error = %e, "validate task failed");
                AppError::Internal
            })?;

    let (status, body) = match verdict {
        Verdict::Accepted(accepted) => (
            StatusCode::OK,
            ValidateResponse {
                result: "accepted".to_string(),
                check: None,
                reason: None,
                remaining_seconds: Some(accepted.remaining.num_seconds()),
                claims: Some(accepted.claims),
            },
        ),
        Verdict::Rejected(rejection) => (
            StatusCode::UNAUTHORIZED,
            ValidateResponse {
                result: "rejected".to_string(),
                check: Some(rejection.check.to_string()),
                reason: Some(rejection.error.to_string()),
                remaining_seconds: None,
                claims: None,
            },
        ),
    };

    Ok((status, Json(body)))
}
