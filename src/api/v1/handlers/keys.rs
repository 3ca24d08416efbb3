/*
 * Responsibility
 * - GET /keys: DA-SVID の署名鍵 (workload 公開鍵) を JWKS で返す
 */
use axum::Json;
use axum::extract::State;

use crate::services::keys::Jwks;
use crate::state::AppState;

pub async fn keys(State(state): State<AppState>) -> Json<Jwks> {
    Json(state.jwks.as_ref().clone())
}
