/*
 * Responsibility
 * - v1 の URL 構造を定義
 * - /mint, /validate, /keys
 */
use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

use crate::api::v1::handlers::{
    dasvid::{mint, validate},
    keys::keys,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/mint", post(mint))
        .route("/validate", post(validate))
        .route("/keys", get(keys))
}
