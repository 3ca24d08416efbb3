//! DA-SVID pipelines.
//!
//! - `asserter`: OAuth token in, DA-SVID (optionally carrying a signature proof) out
//! - `validator`: DA-SVID in, `Verdict` out
//! - `proof`: glue between token segments and the proof engine
//! - `factory`: wiring from `Config`

pub mod asserter;
pub mod factory;
pub mod proof;
pub mod validator;

use std::fmt;
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::services::keys::KeyError;
use crate::services::token::{DaSvidClaims, TokenError};
use crate::services::zkp::ProofError;

pub use asserter::{Asserter, MintedDasvid};
pub use factory::{DasvidServices, build_issuer_keys, build_services};
pub use proof::{message_issuer, prove_signature, verify_signature_proof};
pub use validator::Validator;

#[derive(Debug, Error)]
pub enum DasvidError {
    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Key(#[from] KeyError),

    #[error(transparent)]
    Proof(#[from] ProofError),

    #[error("deadline passed before {0}")]
    DeadlineExceeded(&'static str),

    #[error("generated proof failed self-verification")]
    ProofSelfCheck,

    #[error("proof does not verify against the issuer key")]
    ProofRejected,

    #[error("DA-SVID carries no zkp claim")]
    MissingProof,

    #[error("embedded message names issuer {found:?}, DA-SVID names {expected:?}")]
    IssuerMismatch { expected: String, found: String },
}

/// Caller-supplied bound on a resolution attempt.
///
/// Checked after key resolution and before the proof engine is invoked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Deadline {
    at: Option<Instant>,
}

impl Deadline {
    pub fn none() -> Self {
        Self { at: None }
    }

    pub fn after(timeout: Duration) -> Self {
        Self {
            at: Instant::now().checked_add(timeout),
        }
    }

    pub fn at(instant: Instant) -> Self {
        Self { at: Some(instant) }
    }

    pub fn is_expired(&self) -> bool {
        self.at.is_some_and(|at| Instant::now() >= at)
    }

    pub fn check(&self, stage: &'static str) -> Result<(), DasvidError> {
        if self.is_expired() {
            Err(DasvidError::DeadlineExceeded(stage))
        } else {
            Ok(())
        }
    }
}

/// Which validation step rejected a DA-SVID.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectedCheck {
    Claims,
    Signature,
    Expiry,
    Issuer,
    Proof,
    Deadline,
}

impl RejectedCheck {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Claims => "claims",
            Self::Signature => "signature",
            Self::Expiry => "expiry",
            Self::Issuer => "issuer",
            Self::Proof => "proof",
            Self::Deadline => "deadline",
        }
    }
}

impl fmt::Display for RejectedCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal rejection. Carries no signature or key material.
#[derive(Debug)]
pub struct Rejection {
    pub check: RejectedCheck,
    pub error: DasvidError,
}

impl Rejection {
    pub fn new(check: RejectedCheck, error: impl Into<DasvidError>) -> Self {
        Self {
            check,
            error: error.into(),
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} check failed: {}", self.check, self.error)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptedDasvid {
    pub claims: DaSvidClaims,
    pub remaining: chrono::Duration,
    /// `false` only for proofless tokens accepted under a lenient policy.
    pub proof_verified: bool,
}

#[derive(Debug)]
pub enum Verdict {
    Accepted(AcceptedDasvid),
    Rejected(Rejection),
}

impl Verdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted(_))
    }

    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            Self::Accepted(_) => None,
            Self::Rejected(rejection) => Some(rejection),
        }
    }
}
