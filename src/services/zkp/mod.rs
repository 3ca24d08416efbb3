//! Zero-knowledge proof of knowledge of an RSA signature.
//!
//! Relation: the prover knows `s` with `s^e ≡ y (mod N)`, where `y` is the
//! EMSA-PKCS1-v1_5 representative of `SHA-256(message)`. See `engine` for the
//! round structure and `codec` for the wire format carried in the `zkp` claim.

pub mod bigint;
pub mod codec;
pub mod engine;

use num_bigint::BigUint;
use thiserror::Error;

pub use bigint::{RsaPublicKey, message_digest_int, signature_to_int};
pub use codec::{decode, encode};
pub use engine::{prove, prove_with_rng, verify};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProofError {
    #[error("witness does not satisfy s^e = digest (mod N)")]
    InvalidWitness,

    #[error("malformed proof: {0}")]
    MalformedProof(String),

    #[error("arithmetic domain error: {0}")]
    ArithmeticDomain(&'static str),
}

impl ProofError {
    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedProof(msg.into())
    }
}

/// One commit/response pair. Both values are reduced modulo N.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProofRound {
    pub commitment: BigUint,
    pub response: BigUint,
}

/// Proof of signature knowledge: `rounds.len()` parallel rounds with binary
/// Fiat–Shamir challenges, soundness error `2^-rounds.len()`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignatureProof {
    rounds: Vec<ProofRound>,
    // Byte length of the modulus the proof was produced under; fixes the hex width.
    modulus_len: usize,
}

impl SignatureProof {
    pub(crate) fn new(rounds: Vec<ProofRound>, modulus_len: usize) -> Self {
        Self {
            rounds,
            modulus_len,
        }
    }

    pub fn rounds(&self) -> &[ProofRound] {
        &self.rounds
    }

    pub fn round_count(&self) -> usize {
        self.rounds.len()
    }

    pub fn modulus_len(&self) -> usize {
        self.modulus_len
    }
}
