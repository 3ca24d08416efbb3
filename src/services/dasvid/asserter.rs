use std::fmt;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use super::proof::prove_signature;
use super::{DasvidError, Deadline};
use crate::services::keys::IssuerKeys;
use crate::services::token::{
    DaSvidClaims, IssuerField, OAuthClaims, TokenError, TokenMinter, ZkpClaim, header_kid,
    issuer_claim, parse_unchecked, split_token, verify_oauth_signature,
};

#[derive(Debug, Clone)]
pub struct MintedDasvid {
    pub token: String,
    pub claims: DaSvidClaims,
}

/// Mint side: checks an inbound OAuth token and re-asserts it as a DA-SVID.
#[derive(Clone)]
pub struct Asserter {
    keys: IssuerKeys,
    minter: TokenMinter,
    proof_len: usize,
    mint_zkp: bool,
}

impl fmt::Debug for Asserter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Asserter")
            .field("minter", &self.minter)
            .field("proof_len", &self.proof_len)
            .field("mint_zkp", &self.mint_zkp)
            .finish_non_exhaustive()
    }
}

impl Asserter {
    pub fn new(keys: IssuerKeys, minter: TokenMinter, proof_len: usize, mint_zkp: bool) -> Self {
        Self {
            keys,
            minter,
            proof_len,
            mint_zkp,
        }
    }

    pub fn mint_zkp(&self) -> bool {
        self.mint_zkp
    }

    pub fn proof_len(&self) -> usize {
        self.proof_len
    }

    /// Mint a DA-SVID for `subject` from `oauth_token`.
    ///
    /// - `dpa` is the OAuth issuer, `dpr` the OAuth subject
    /// - the OAuth signature is checked once before anything is proved over it
    /// - with `mint_zkp` the token carries the signature-less message and a proof
    pub fn assert(
        &self,
        oauth_token: &str,
        subject: &str,
        now: DateTime<Utc>,
        deadline: Deadline,
    ) -> Result<MintedDasvid, DasvidError> {
        let parts = split_token(oauth_token)?;
        let issuer = issuer_claim(oauth_token, IssuerField::Iss)?;
        let oauth: OAuthClaims = parse_unchecked(oauth_token)?;

        let principal = oauth
            .sub
            .filter(|sub| !sub.is_empty())
            .ok_or_else(|| TokenError::malformed("missing 'sub' claim"))?;

        let kid = header_kid(oauth_token);
        let issuer_key = self.keys.public_key(&issuer, kid.as_deref())?;

        verify_oauth_signature(oauth_token, &issuer_key).inspect_err(|e| {
            warn!(iss = %issuer, error = %e, "OAuth token signature rejected");
        })?;

        // Claims are only trusted once the issuer signature holds.
        if let Some(exp) = oauth.exp
            && exp <= now.timestamp()
        {
            warn!(iss = %issuer, exp, "OAuth token already expired");
            return Err(TokenError::TokenExpired {
                expired_for_seconds: now.timestamp().saturating_sub(exp),
            }
            .into());
        }

        let mut claims = self.minter.claims(subject, &issuer, &principal, now);

        if self.mint_zkp {
            deadline.check("proof generation")?;
            let signature = parts.signature_bytes()?;
            let proof = prove_signature(parts.message, &signature, &issuer_key, self.proof_len)?;
            claims = claims.with_zkp(ZkpClaim {
                msg: parts.message.to_string(),
                proof,
            });
        }

        let token = self.minter.mint(&claims)?;
        info!(
            iss = %claims.iss,
            dpa = %claims.dpa,
            rounds = if self.mint_zkp { self.proof_len } else { 0 },
            "OAuth token re-asserted"
        );

        Ok(MintedDasvid { token, claims })
    }
}
