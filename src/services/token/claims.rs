use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::TokenError;
use super::signature::split_token;

/// Default DA-SVID lifetime. Delegation assertions are single-use and short-lived.
pub const DEFAULT_TTL_SECONDS: i64 = 120;

/// Longest lifetime a minter accepts: one day.
pub const MAX_TTL_SECONDS: i64 = 86_400;

/// DA-SVID claim set.
///
/// - `iss`: SPIFFE ID of the asserting (minting) workload
/// - `sub`: SPIFFE ID of the subject workload
/// - `aat`: when the asserting workload verified the assertion
/// - `dpa`: delegated authority, the original OAuth issuer
/// - `dpr`: delegated principal
/// - `zkp`: signature-less OAuth token and the proof over its signature
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaSvidClaims {
    pub iss: String,
    pub aat: i64,
    pub exp: i64,
    pub sub: String,
    pub dpa: String,
    pub dpr: String,
    pub iat: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zkp: Option<ZkpClaim>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZkpClaim {
    pub msg: String,
    pub proof: String,
}

impl DaSvidClaims {
    pub fn new(
        iss: impl Into<String>,
        sub: impl Into<String>,
        dpa: impl Into<String>,
        dpr: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        let now = now.timestamp();
        Self {
            iss: iss.into(),
            aat: now,
            exp: now + DEFAULT_TTL_SECONDS,
            sub: sub.into(),
            dpa: dpa.into(),
            dpr: dpr.into(),
            iat: now,
            zkp: None,
        }
    }

    pub fn with_expiry(mut self, exp: DateTime<Utc>) -> Self {
        self.exp = exp.timestamp();
        self
    }

    /// Expiry relative to `iat`.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.exp = self.iat.saturating_add(ttl.num_seconds());
        self
    }

    pub fn with_zkp(mut self, zkp: ZkpClaim) -> Self {
        self.zkp = Some(zkp);
        self
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }
}

/// The parts of an inbound OAuth/OIDC token the asserting workload reads.
#[derive(Debug, Clone, Deserialize)]
pub struct OAuthClaims {
    pub iss: String,
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub exp: Option<i64>,
}

/// Which claim names the OAuth issuer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssuerField {
    /// `iss` of an OAuth token.
    Iss,
    /// `dpa` of a DA-SVID.
    Dpa,
}

impl IssuerField {
    pub fn claim_name(self) -> &'static str {
        match self {
            Self::Iss => "iss",
            Self::Dpa => "dpa",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpiryStatus {
    pub valid: bool,
    /// Negative once expired.
    pub remaining: Duration,
}

impl ExpiryStatus {
    pub fn into_result(self) -> Result<Duration, TokenError> {
        if self.valid {
            Ok(self.remaining)
        } else {
            Err(TokenError::TokenExpired {
                expired_for_seconds: self.remaining.num_seconds().saturating_neg(),
            })
        }
    }
}

/// Valid iff `exp > now`.
pub fn check_expiry(claims: &DaSvidClaims, now: DateTime<Utc>) -> ExpiryStatus {
    let seconds = claims.exp.saturating_sub(now.timestamp());
    let remaining = Duration::try_seconds(seconds).unwrap_or(if seconds > 0 {
        Duration::MAX
    } else {
        Duration::MIN
    });
    ExpiryStatus {
        valid: seconds > 0,
        remaining,
    }
}

/// Decode the payload segment. No signature check of any kind.
pub fn parse_unchecked<T: DeserializeOwned>(token: &str) -> Result<T, TokenError> {
    let parts = split_token(token)?;
    let payload = URL_SAFE_NO_PAD
        .decode(parts.payload)
        .map_err(|e| TokenError::malformed(format!("payload is not base64url: {e}")))?;
    serde_json::from_slice(&payload)
        .map_err(|e| TokenError::malformed(format!("invalid claims: {e}")))
}

pub fn parse_claims_unchecked(token: &str) -> Result<DaSvidClaims, TokenError> {
    parse_unchecked(token)
}

/// Value of the issuer claim named by `field`.
pub fn issuer_claim(token: &str, field: IssuerField) -> Result<String, TokenError> {
    let claims: serde_json::Map<String, serde_json::Value> = parse_unchecked(token)?;
    match claims.get(field.claim_name()) {
        Some(serde_json::Value::String(issuer)) if !issuer.trim().is_empty() => {
            Ok(issuer.clone())
        }
        _ => Err(TokenError::malformed(format!(
            "missing '{}' claim",
            field.claim_name()
        ))),
    }
}
