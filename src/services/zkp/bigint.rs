//! Big-integer bridge.
//!
//! Converts signatures, key components and message digests between byte strings
//! and `BigUint`, and carries the RSA public key type the proof engine works over.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use num_bigint::BigUint;
use num_integer::Integer;
use num_traits::{One, Zero};
use sha2::{Digest, Sha256};

use super::ProofError;

/// DER prefix of the `DigestInfo` structure for SHA-256 (RFC 8017, section 9.2 note 1).
const SHA256_DIGEST_INFO_PREFIX: [u8; 19] = [
    0x30, 0x31, 0x30, 0x0d, 0x06, 0x09, 0x60, 0x86, 0x48, 0x01, 0x65, 0x03, 0x04, 0x02, 0x01,
    0x05, 0x00, 0x04, 0x20,
];

/// RSA public key as the proof engine sees it.
///
/// Invariant: `modulus` is odd, `1 < exponent < modulus`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RsaPublicKey {
    modulus: BigUint,
    exponent: BigUint,
}

impl RsaPublicKey {
    pub fn new(modulus: BigUint, exponent: BigUint) -> Result<Self, ProofError> {
        if modulus.is_zero() || modulus.is_even() {
            return Err(ProofError::ArithmeticDomain("modulus must be odd and positive"));
        }
        if exponent <= BigUint::one() || exponent >= modulus {
            return Err(ProofError::ArithmeticDomain(
                "exponent must satisfy 1 < e < modulus",
            ));
        }
        Ok(Self { modulus, exponent })
    }

    /// Build a key from big-endian component bytes.
    pub fn from_be_bytes(modulus: &[u8], exponent: &[u8]) -> Result<Self, ProofError> {
        Self::new(
            BigUint::from_bytes_be(modulus),
            BigUint::from_bytes_be(exponent),
        )
    }

    pub fn modulus(&self) -> &BigUint {
        &self.modulus
    }

    pub fn exponent(&self) -> &BigUint {
        &self.exponent
    }

    pub fn modulus_bits(&self) -> u64 {
        self.modulus.bits()
    }

    /// Modulus length in bytes (`k` in RFC 8017).
    pub fn modulus_len(&self) -> usize {
        byte_len(self.modulus_bits())
    }

    /// `(n, e)` as unpadded base64url, the JWK representation.
    pub fn to_jwk_components(&self) -> (String, String) {
        (
            URL_SAFE_NO_PAD.encode(self.modulus.to_bytes_be()),
            URL_SAFE_NO_PAD.encode(self.exponent.to_bytes_be()),
        )
    }
}

impl TryFrom<&rsa::RsaPublicKey> for RsaPublicKey {
    type Error = ProofError;

    fn try_from(key: &rsa::RsaPublicKey) -> Result<Self, Self::Error> {
        use rsa::traits::PublicKeyParts;

        Self::from_be_bytes(&key.n().to_bytes_be(), &key.e().to_bytes_be())
    }
}

pub(crate) fn byte_len(bits: u64) -> usize {
    bits.div_ceil(8) as usize
}

/// Big-endian encoding left-padded with zeros to exactly `len` bytes.
///
/// Callers only pass values reduced modulo a modulus of `len` bytes.
pub fn to_fixed_be(value: &BigUint, len: usize) -> Vec<u8> {
    let raw = value.to_bytes_be();
    if raw.len() >= len {
        return raw;
    }
    let mut out = vec![0u8; len - raw.len()];
    out.extend_from_slice(&raw);
    out
}

/// Read a raw signature (RFC 8017 `OS2IP`).
pub fn signature_to_int(signature: &[u8], key: &RsaPublicKey) -> Result<BigUint, ProofError> {
    if signature.len() != key.modulus_len() {
        return Err(ProofError::ArithmeticDomain(
            "signature length does not match modulus length",
        ));
    }
    let s = BigUint::from_bytes_be(signature);
    if s.is_zero() || &s >= key.modulus() {
        return Err(ProofError::ArithmeticDomain("signature outside modulus domain"));
    }
    Ok(s)
}

/// The integer an RS256 signature over `message` raises to: EMSA-PKCS1-v1_5
/// encoding of `SHA-256(message)` at the modulus length, read big-endian.
pub fn message_digest_int(message: &[u8], key: &RsaPublicKey) -> Result<BigUint, ProofError> {
    let hash = Sha256::digest(message);
    let t_len = SHA256_DIGEST_INFO_PREFIX.len() + hash.len();
    let k = key.modulus_len();
    if k < t_len + 11 {
        return Err(ProofError::ArithmeticDomain(
            "modulus too short for EMSA-PKCS1-v1_5 with SHA-256",
        ));
    }

    let mut em = Vec::with_capacity(k);
    em.push(0x00);
    em.push(0x01);
    em.resize(k - t_len - 1, 0xff);
    em.push(0x00);
    em.extend_from_slice(&SHA256_DIGEST_INFO_PREFIX);
    em.extend_from_slice(&hash);

    Ok(BigUint::from_bytes_be(&em))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toy_key() -> RsaPublicKey {
        // 61 * 53
        RsaPublicKey::new(BigUint::from(3233u32), BigUint::from(17u32)).expect("valid key")
    }

    #[test]
    fn rejects_even_modulus_and_bad_exponent() {
        assert!(matches!(
            RsaPublicKey::new(BigUint::from(3234u32), BigUint::from(17u32)),
            Err(ProofError::ArithmeticDomain(_))
        ));
        assert!(matches!(
            RsaPublicKey::new(BigUint::from(3233u32), BigUint::from(1u32)),
            Err(ProofError::ArithmeticDomain(_))
        ));
        assert!(matches!(
            RsaPublicKey::new(BigUint::from(3233u32), BigUint::from(4000u32)),
            Err(ProofError::ArithmeticDomain(_))
        ));
    }

    #[test]
    fn fixed_width_pads_on_the_left() {
        assert_eq!(to_fixed_be(&BigUint::from(0x0102u32), 4), vec![0, 0, 1, 2]);
        assert_eq!(to_fixed_be(&BigUint::zero(), 2), vec![0, 0]);
    }

    #[test]
    fn signature_length_must_match_modulus() {
        let key = toy_key();
        assert!(signature_to_int(&[0x01], &key).is_err());
        assert_eq!(
            signature_to_int(&[0x00, 0x05], &key).expect("in range"),
            BigUint::from(5u32)
        );
    }

    #[test]
    fn digest_needs_a_real_sized_modulus() {
        assert!(matches!(
            message_digest_int(b"abc.def", &toy_key()),
            Err(ProofError::ArithmeticDomain(_))
        ));
    }

    #[test]
    fn digest_encoding_has_pkcs1_shape() {
        let modulus = (BigUint::one() << 2047u32) + BigUint::one();
        let key = RsaPublicKey::new(modulus, BigUint::from(65537u32)).expect("valid key");
        let em = message_digest_int(b"abc.def", &key).expect("digest");
        let bytes = to_fixed_be(&em, key.modulus_len());

        assert_eq!(bytes.len(), 256);
        assert_eq!(&bytes[..2], &[0x00, 0x01]);
        assert!(bytes[2..204].iter().all(|b| *b == 0xff));
        assert_eq!(bytes[204], 0x00);
        assert_eq!(&bytes[205..224], &SHA256_DIGEST_INFO_PREFIX);
        assert_eq!(&bytes[224..], Sha256::digest(b"abc.def").as_slice());
    }

    #[test]
    fn jwk_components_are_unpadded_base64url() {
        let (n, e) = toy_key().to_jwk_components();
        assert_eq!(n, "DKE");
        assert_eq!(e, "EQ");
    }
}
