use std::fmt;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use super::proof::{message_issuer, verify_signature_proof};
use super::{AcceptedDasvid, DasvidError, Deadline, RejectedCheck, Rejection, Verdict};
use crate::services::keys::IssuerKeys;
use crate::services::token::{
    TokenError, check_expiry, header_kid, parse_claims_unchecked, verify_outer_signature,
};
use crate::services::zkp::RsaPublicKey;

/// Verify side.
///
/// `Received -> ClaimsParsed -> IssuerResolved -> ProofDecoded -> ProofVerified -> Accepted`,
/// with outer signature and expiry checked right after the claims are parsed.
/// The first failing step is terminal.
#[derive(Clone)]
pub struct Validator {
    keys: IssuerKeys,
    minter_key: RsaPublicKey,
    proof_len: usize,
    require_proof: bool,
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validator")
            .field("keys", &self.keys)
            .field("proof_len", &self.proof_len)
            .field("require_proof", &self.require_proof)
            .finish_non_exhaustive()
    }
}

impl Validator {
    /// `minter_key` is the public key of the workload trusted to mint DA-SVIDs.
    pub fn new(keys: IssuerKeys, minter_key: RsaPublicKey, proof_len: usize) -> Self {
        Self {
            keys,
            minter_key,
            proof_len,
            require_proof: true,
        }
    }

    /// Whether a token without a `zkp` claim is rejected.
    pub fn require_proof(mut self, require: bool) -> Self {
        self.require_proof = require;
        self
    }

    pub fn validate(&self, token: &str, now: DateTime<Utc>, deadline: Deadline) -> Verdict {
        match self.run(token, now, deadline) {
            Ok(accepted) => {
                info!(
                    sub = %accepted.claims.sub,
                    dpa = %accepted.claims.dpa,
                    remaining_seconds = accepted.remaining.num_seconds(),
                    proof_verified = accepted.proof_verified,
                    "DA-SVID accepted"
                );
                Verdict::Accepted(accepted)
            }
            Err(rejection) => {
                warn!(check = %rejection.check, error = %rejection.error, "DA-SVID rejected");
                Verdict::Rejected(rejection)
            }
        }
    }

    fn run(
        &self,
        token: &str,
        now: DateTime<Utc>,
        deadline: Deadline,
    ) -> Result<AcceptedDasvid, Rejection> {
        use RejectedCheck as Check;

        let claims =
            parse_claims_unchecked(token).map_err(|e| Rejection::new(Check::Claims, e))?;

        if !verify_outer_signature(token, &self.minter_key) {
            return Err(Rejection::new(Check::Signature, TokenError::SignatureInvalid));
        }

        let remaining = check_expiry(&claims, now)
            .into_result()
            .map_err(|e| Rejection::new(Check::Expiry, e))?;

        let Some(zkp) = claims.zkp.as_ref() else {
            if self.require_proof {
                return Err(Rejection::new(Check::Proof, DasvidError::MissingProof));
            }
            return Ok(AcceptedDasvid {
                claims,
                remaining,
                proof_verified: false,
            });
        };

        // A message that carries claims must come from the issuer named in `dpa`.
        if let Some(found) = message_issuer(&zkp.msg)
            && found != claims.dpa
        {
            return Err(Rejection::new(
                Check::Issuer,
                DasvidError::IssuerMismatch {
                    expected: claims.dpa.clone(),
                    found,
                },
            ));
        }

        let kid = header_kid(&zkp.msg);
        let issuer_key = self
            .keys
            .public_key(&claims.dpa, kid.as_deref())
            .map_err(|e| Rejection::new(Check::Issuer, e))?;

        deadline
            .check("proof verification")
            .map_err(|e| Rejection::new(Check::Deadline, e))?;

        let verified = verify_signature_proof(&zkp.msg, &zkp.proof, &issuer_key, self.proof_len)
            .map_err(|e| Rejection::new(Check::Proof, e))?;
        if !verified {
            return Err(Rejection::new(Check::Proof, DasvidError::ProofRejected));
        }

        Ok(AcceptedDasvid {
            claims,
            remaining,
            proof_verified: true,
        })
    }
}
