use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use tracing::{error, info, warn};

use super::TokenError;
use super::claims::{DaSvidClaims, MAX_TTL_SECONDS};
use crate::services::keys::{Jwk, WorkloadKey};

/// Signs DA-SVIDs (RS256) with the asserting workload's own key.
#[derive(Clone)]
pub struct TokenMinter {
    issuer: String,
    ttl: Duration,
    kid: Option<String>,
    encoding_key: EncodingKey,
}

impl std::fmt::Debug for TokenMinter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Do not print key material
        f.debug_struct("TokenMinter")
            .field("issuer", &self.issuer)
            .field("ttl", &self.ttl)
            .field("kid", &self.kid)
            .finish()
    }
}

impl TokenMinter {
    /// `issuer` is the workload's SPIFFE ID, placed in `iss` of every token.
    pub fn new(key: &WorkloadKey, issuer: String, ttl_seconds: i64) -> Result<Self, TokenError> {
        let encoding_key = EncodingKey::from_rsa_pem(key.pem().as_bytes()).map_err(|e| {
            warn!(error = %e, "failed to load workload signing key (expected PKCS#1 RSA PEM)");
            TokenError::Signing(e.to_string())
        })?;

        let ttl = Duration::try_seconds(ttl_seconds)
            .filter(|_| (1..=MAX_TTL_SECONDS).contains(&ttl_seconds))
            .ok_or_else(|| {
                TokenError::Signing(format!(
                    "token lifetime must be 1..={MAX_TTL_SECONDS} seconds, got {ttl_seconds}"
                ))
            })?;

        Ok(Self {
            issuer,
            ttl,
            // Same kid as the workload's published JWK
            kid: Jwk::from_public_key(key.public_key()).kid,
            encoding_key,
        })
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Claims for a new assertion issued at `now` with this minter's lifetime.
    pub fn claims(&self, sub: &str, dpa: &str, dpr: &str, now: DateTime<Utc>) -> DaSvidClaims {
        DaSvidClaims::new(self.issuer.as_str(), sub, dpa, dpr, now).with_ttl(self.ttl)
    }

    pub fn mint(&self, claims: &DaSvidClaims) -> Result<String, TokenError> {
        let mut header = Header::new(Algorithm::RS256);
        header.typ = Some("JWT".to_string());
        header.kid = self.kid.clone();

        let token = jsonwebtoken::encode(&header, claims, &self.encoding_key).map_err(|e| {
            error!(error = %e, "failed to sign DA-SVID");
            TokenError::Signing(e.to_string())
        })?;

        info!(
            sub = %claims.sub,
            dpa = %claims.dpa,
            exp = claims.exp,
            zkp = claims.zkp.is_some(),
            "DA-SVID minted"
        );
        Ok(token)
    }
}
