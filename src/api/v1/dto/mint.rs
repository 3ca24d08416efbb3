use serde::{Deserialize, Serialize};

/// Request body for `/mint`.
#[derive(Debug, Clone, Deserialize)]
pub struct MintRequest {
    /// OAuth/OIDC access token (RS256) issued to the caller.
    pub access_token: String,
    /// SPIFFE ID of the workload the DA-SVID is for.
    pub sub: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MintResponse {
    pub dasvid: String,
    /// Unix seconds.
    pub exp: i64,
    /// Whether the token carries a signature proof.
    pub zkp: bool,
}
