use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use tracing::warn;

use super::TokenError;
use crate::services::zkp::RsaPublicKey;

/// Compact JWS split into its segments. `message` is `header.payload`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenParts<'a> {
    pub header: &'a str,
    pub payload: &'a str,
    pub signature: &'a str,
    pub message: &'a str,
}

impl TokenParts<'_> {
    pub fn signature_bytes(&self) -> Result<Vec<u8>, TokenError> {
        URL_SAFE_NO_PAD
            .decode(self.signature)
            .map_err(|e| TokenError::malformed(format!("signature is not base64url: {e}")))
    }
}

pub fn split_token(token: &str) -> Result<TokenParts<'_>, TokenError> {
    let mut segments = token.split('.');
    match (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) {
        (Some(header), Some(payload), Some(signature), None)
            if !header.is_empty() && !payload.is_empty() && !signature.is_empty() =>
        {
            Ok(TokenParts {
                header,
                payload,
                signature,
                message: &token[..header.len() + 1 + payload.len()],
            })
        }
        _ => Err(TokenError::malformed(
            "expected three non-empty dot-separated segments",
        )),
    }
}

/// `kid` from the header segment of a token or a signature-less message.
/// `None` when there is no decodable header or it names no key.
pub fn header_kid(token_or_message: &str) -> Option<String> {
    let header = token_or_message.split('.').next()?;
    let bytes = URL_SAFE_NO_PAD.decode(header).ok()?;
    let value: serde_json::Value = serde_json::from_slice(&bytes).ok()?;
    value.get("kid")?.as_str().map(str::to_string)
}

fn decoding_key(key: &RsaPublicKey) -> Result<DecodingKey, TokenError> {
    let (n, e) = key.to_jwk_components();
    DecodingKey::from_rsa_components(&n, &e)
        .map_err(|e| TokenError::malformed(format!("unusable RSA key: {e}")))
}

// RS256 signature over header.payload. Claims are not validated here.
fn verify_rs256(token: &str, key: &RsaPublicKey) -> Result<(), TokenError> {
    let decoding_key = decoding_key(key)?;

    let mut validation = Validation::new(Algorithm::RS256);
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    jsonwebtoken::decode::<serde_json::Value>(token, &decoding_key, &validation)
        .map(|_| ())
        .map_err(|e| match e.kind() {
            ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                TokenError::SignatureInvalid
            }
            _ => TokenError::malformed(e.to_string()),
        })
}

/// RS256 check of a DA-SVID against the minting workload's key. Any failure is `false`.
pub fn verify_outer_signature(token: &str, key: &RsaPublicKey) -> bool {
    match verify_rs256(token, key) {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "DA-SVID signature check failed");
            false
        }
    }
}

/// Plain signature check of the inbound OAuth token before proving over it.
pub fn verify_oauth_signature(token: &str, key: &RsaPublicKey) -> Result<(), TokenError> {
    verify_rs256(token, key)
}
