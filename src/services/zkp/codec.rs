//! Proof wire format.
//!
//! ```json
//! {"proofc": ["<hex commitment>", ...], "proofp": ["<hex response>", ...]}
//! ```
//!
//! Values are lowercase hex, zero-padded to twice the modulus byte length. The
//! round count is the sequence length, never an out-of-band value.

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use super::bigint::{byte_len, to_fixed_be};
use super::{ProofError, ProofRound, SignatureProof};

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct WireProof {
    // commitments
    proofc: Vec<String>,
    // responses
    proofp: Vec<String>,
}

pub fn encode(proof: &SignatureProof) -> Result<String, ProofError> {
    let len = proof.modulus_len();
    let (proofc, proofp): (Vec<String>, Vec<String>) = proof
        .rounds()
        .iter()
        .map(|round| {
            (
                hex::encode(to_fixed_be(&round.commitment, len)),
                hex::encode(to_fixed_be(&round.response, len)),
            )
        })
        .unzip();

    serde_json::to_string(&WireProof { proofc, proofp })
        .map_err(|e| ProofError::malformed(format!("cannot serialize proof: {e}")))
}

/// Decode a proof produced under a modulus of `modulus_bits` bits.
pub fn decode(text: &str, modulus_bits: u64) -> Result<SignatureProof, ProofError> {
    let wire: WireProof = serde_json::from_str(text)
        .map_err(|e| ProofError::malformed(format!("invalid proof document: {e}")))?;

    if wire.proofc.len() != wire.proofp.len() {
        return Err(ProofError::malformed(format!(
            "{} commitments but {} responses",
            wire.proofc.len(),
            wire.proofp.len()
        )));
    }
    if wire.proofc.is_empty() {
        return Err(ProofError::malformed("proof carries no rounds"));
    }

    let len = byte_len(modulus_bits);
    let rounds = wire
        .proofc
        .iter()
        .zip(&wire.proofp)
        .map(|(commitment, response)| {
            Ok(ProofRound {
                commitment: decode_component(commitment, len, modulus_bits)?,
                response: decode_component(response, len, modulus_bits)?,
            })
        })
        .collect::<Result<Vec<_>, ProofError>>()?;

    Ok(SignatureProof::new(rounds, len))
}

fn decode_component(token: &str, len: usize, modulus_bits: u64) -> Result<BigUint, ProofError> {
    if token.len() != len * 2 {
        return Err(ProofError::malformed(format!(
            "component has {} hex digits, expected {}",
            token.len(),
            len * 2
        )));
    }
    // Canonical form only: a case flip must not decode to the same proof.
    if !token.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
        return Err(ProofError::malformed("component is not lowercase hex"));
    }
    let bytes = hex::decode(token)
        .map_err(|e| ProofError::malformed(format!("component is not hex: {e}")))?;

    let value = BigUint::from_bytes_be(&bytes);
    if value.bits() > modulus_bits {
        return Err(ProofError::malformed("component exceeds modulus size"));
    }
    Ok(value)
}
