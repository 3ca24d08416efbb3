use serde::{Deserialize, Serialize};

use crate::services::token::DaSvidClaims;

#[derive(Debug, Clone, Deserialize)]
pub struct ValidateRequest {
    pub dasvid: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidateResponse {
    /// "accepted" or "rejected"
    pub result: String,

    /// Failed check (`claims`, `signature`, `expiry`, `issuer`, `proof`, `deadline`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remaining_seconds: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claims: Option<DaSvidClaims>,
}
