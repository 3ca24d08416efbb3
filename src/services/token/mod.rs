//! DA-SVID token lifecycle: claims, minting, unchecked parsing, signature checks.

pub mod claims;
pub mod minter;
pub mod signature;

use thiserror::Error;

pub use claims::{
    DEFAULT_TTL_SECONDS, DaSvidClaims, MAX_TTL_SECONDS, ExpiryStatus, IssuerField, OAuthClaims, ZkpClaim,
    check_expiry, issuer_claim, parse_claims_unchecked, parse_unchecked,
};
pub use minter::TokenMinter;
pub use signature::{
    TokenParts, header_kid, split_token, verify_oauth_signature, verify_outer_signature,
};

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("malformed token: {0}")]
    Malformed(String),

    #[error("token signature is invalid")]
    SignatureInvalid,

    #[error("token expired {expired_for_seconds}s ago")]
    TokenExpired { expired_for_seconds: i64 },

    #[error("cannot sign token: {0}")]
    Signing(String),
}

impl TokenError {
    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        Self::Malformed(msg.into())
    }
}
