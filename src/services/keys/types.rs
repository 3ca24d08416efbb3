use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::warn;

use super::KeyError;
use super::fetcher::KeyCandidate;
use crate::services::zkp::RsaPublicKey;

/// One entry of a published key set. Loaded verbatim; only `n`/`e` matter here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwk {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,
    pub kty: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub x5c: Vec<String>,
    #[serde(default)]
    pub n: String,
    #[serde(default)]
    pub e: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x5t: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwks {
    pub keys: Vec<Jwk>,
}

impl Jwk {
    /// Public RS256 JWK for `key`, with the RFC 7638 thumbprint as `kid`.
    pub fn from_public_key(key: &RsaPublicKey) -> Self {
        let (n, e) = key.to_jwk_components();
        let kid = rsa_thumbprint(&n, &e);
        Self {
            alg: Some("RS256".to_string()),
            kty: "RSA".to_string(),
            x5c: Vec::new(),
            n,
            e,
            kid: Some(kid),
            x5t: None,
        }
    }

    pub fn to_public_key(&self) -> Result<RsaPublicKey, KeyError> {
        if self.kty != "RSA" {
            return Err(KeyError::InvalidEncoding(format!(
                "expected kty RSA, found {}",
                self.kty
            )));
        }
        let n = decode_component(&self.n, "n")?;
        let e = decode_component(&self.e, "e")?;
        Ok(RsaPublicKey::from_be_bytes(&n, &e)?)
    }
}

impl Jwks {
    pub fn new(keys: Vec<Jwk>) -> Self {
        Self { keys }
    }

    /// RSA entries as key candidates. Entries of other key types, and RSA
    /// entries that do not decode, are skipped. Fails only when every RSA
    /// entry was unusable.
    pub fn candidates(&self) -> Result<Vec<KeyCandidate>, KeyError> {
        let mut candidates = Vec::new();
        let mut last_error = None;

        for jwk in self.keys.iter().filter(|jwk| jwk.kty == "RSA") {
            match jwk.to_public_key() {
                Ok(key) => candidates.push(KeyCandidate {
                    kid: jwk.kid.clone(),
                    key,
                }),
                Err(e) => {
                    warn!(kid = ?jwk.kid, error = %e, "skipping unusable JWK");
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) if candidates.is_empty() => Err(e),
            _ => Ok(candidates),
        }
    }
}

fn decode_component(value: &str, name: &'static str) -> Result<Vec<u8>, KeyError> {
    if value.is_empty() {
        return Err(KeyError::InvalidEncoding(format!("missing '{name}'")));
    }
    // Some issuers publish padded base64url.
    URL_SAFE_NO_PAD
        .decode(value.trim_end_matches('='))
        .map_err(|e| KeyError::InvalidEncoding(format!("'{name}' is not base64url: {e}")))
}

// RFC 7638 canonical JSON for RSA keys: e, kty, n in lexicographic order.
fn rsa_thumbprint(n: &str, e: &str) -> String {
    let canonical = format!("{{\"e\":\"{}\",\"kty\":\"RSA\",\"n\":\"{}\"}}", e, n);
    URL_SAFE_NO_PAD.encode(Sha256::digest(canonical.as_bytes()))
}
