use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use tracing::{debug, error};

use super::DasvidError;
use crate::services::zkp::{
    self, RsaPublicKey, message_digest_int, signature_to_int,
};

/// Prove knowledge of `signature` over `message` and return the encoded proof.
///
/// The encoded text is decoded and verified once before it is returned.
pub fn prove_signature(
    message: &str,
    signature: &[u8],
    issuer_key: &RsaPublicKey,
    rounds: usize,
) -> Result<String, DasvidError> {
    let witness = signature_to_int(signature, issuer_key)?;
    let digest = message_digest_int(message.as_bytes(), issuer_key)?;

    let proof = zkp::prove(&witness, &digest, issuer_key, rounds)?;
    let encoded = zkp::encode(&proof)?;

    let decoded = zkp::decode(&encoded, issuer_key.modulus_bits())?;
    if !zkp::verify(&decoded, &digest, issuer_key, rounds)? {
        error!(rounds, "freshly generated proof does not verify");
        return Err(DasvidError::ProofSelfCheck);
    }

    debug!(rounds, bytes = encoded.len(), "signature proof encoded");
    Ok(encoded)
}

/// Decode `proof` and verify it against `message` under `issuer_key`.
pub fn verify_signature_proof(
    message: &str,
    proof: &str,
    issuer_key: &RsaPublicKey,
    rounds: usize,
) -> Result<bool, DasvidError> {
    let decoded = zkp::decode(proof, issuer_key.modulus_bits())?;
    let digest = message_digest_int(message.as_bytes(), issuer_key)?;
    Ok(zkp::verify(&decoded, &digest, issuer_key, rounds)?)
}

/// `iss` of a signature-less `header.payload` message, if it carries one.
pub fn message_issuer(message: &str) -> Option<String> {
    let mut segments = message.split('.');
    let (Some(_), Some(payload), None) = (segments.next(), segments.next(), segments.next())
    else {
        return None;
    };
    let bytes = URL_SAFE_NO_PAD.decode(payload).ok()?;
    let value: serde_json::Value = serde_json::from_slice(&bytes).ok()?;
    value.get("iss")?.as_str().map(str::to_string)
}
