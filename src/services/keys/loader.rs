//! Key material from local storage: PEM keys and cached JWKS documents.
//!
//! Only the expected PEM block labels are accepted; anything else is an error
//! naming the label that was found.

use std::fmt;
use std::fs;
use std::path::Path;

use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey};
use rsa::pkcs8::{DecodePublicKey, EncodePublicKey};

use super::KeyError;
use super::types::Jwks;
use crate::services::zkp::RsaPublicKey;

pub const RSA_PRIVATE_KEY_LABEL: &str = "RSA PRIVATE KEY";
pub const PUBLIC_KEY_LABEL: &str = "PUBLIC KEY";
pub const RSA_PUBLIC_KEY_LABEL: &str = "RSA PUBLIC KEY";

/// The workload's own signing key (PKCS#1) and its public half.
#[derive(Clone)]
pub struct WorkloadKey {
    pem: String,
    public: RsaPublicKey,
}

impl fmt::Debug for WorkloadKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Do not print key material
        f.debug_struct("WorkloadKey")
            .field("modulus_bits", &self.public.modulus_bits())
            .finish()
    }
}

impl WorkloadKey {
    pub fn pem(&self) -> &str {
        &self.pem
    }

    pub fn public_key(&self) -> &RsaPublicKey {
        &self.public
    }
}

/// Label of the first PEM block, e.g. `RSA PRIVATE KEY`.
pub fn pem_label(pem: &str) -> Result<&str, KeyError> {
    pem.lines()
        .map(str::trim)
        .find_map(|line| {
            line.strip_prefix("-----BEGIN ")
                .and_then(|rest| rest.strip_suffix("-----"))
        })
        .ok_or(KeyError::NoPemBlock)
}

pub fn parse_private_key_pem(pem: &str) -> Result<WorkloadKey, KeyError> {
    let label = pem_label(pem)?;
    if label != RSA_PRIVATE_KEY_LABEL {
        return Err(KeyError::UnsupportedPemLabel {
            expected: RSA_PRIVATE_KEY_LABEL,
            found: label.to_string(),
        });
    }

    let private = rsa::RsaPrivateKey::from_pkcs1_pem(pem)
        .map_err(|e| KeyError::InvalidEncoding(format!("PKCS#1 private key: {e}")))?;
    let public = RsaPublicKey::try_from(&private.to_public_key())?;

    Ok(WorkloadKey {
        pem: pem.to_string(),
        public,
    })
}

pub fn parse_public_key_pem(pem: &str) -> Result<RsaPublicKey, KeyError> {
    let key = match pem_label(pem)? {
        PUBLIC_KEY_LABEL => rsa::RsaPublicKey::from_public_key_pem(pem)
            .map_err(|e| KeyError::InvalidEncoding(format!("SPKI public key: {e}")))?,
        RSA_PUBLIC_KEY_LABEL => rsa::RsaPublicKey::from_pkcs1_pem(pem)
            .map_err(|e| KeyError::InvalidEncoding(format!("PKCS#1 public key: {e}")))?,
        other => {
            return Err(KeyError::UnsupportedPemLabel {
                expected: PUBLIC_KEY_LABEL,
                found: other.to_string(),
            });
        }
    };
    Ok(RsaPublicKey::try_from(&key)?)
}

/// SubjectPublicKeyInfo DER of `key`, as found inside a `PUBLIC KEY` PEM block.
pub fn to_public_key_der(key: &RsaPublicKey) -> Result<Vec<u8>, KeyError> {
    let key = rsa::RsaPublicKey::new(
        rsa::BigUint::from_bytes_be(&key.modulus().to_bytes_be()),
        rsa::BigUint::from_bytes_be(&key.exponent().to_bytes_be()),
    )
    .map_err(|e| KeyError::InvalidEncoding(format!("RSA public key: {e}")))?;
    let der = key
        .to_public_key_der()
        .map_err(|e| KeyError::InvalidEncoding(format!("SPKI public key: {e}")))?;
    Ok(der.as_bytes().to_vec())
}

pub fn parse_jwks(json: &str) -> Result<Jwks, KeyError> {
    Ok(serde_json::from_str(json)?)
}

pub fn read_private_key(path: &Path) -> Result<WorkloadKey, KeyError> {
    parse_private_key_pem(&read_file(path)?)
}

pub fn read_public_key(path: &Path) -> Result<RsaPublicKey, KeyError> {
    parse_public_key_pem(&read_file(path)?)
}

pub fn read_jwks(path: &Path) -> Result<Jwks, KeyError> {
    parse_jwks(&read_file(path)?)
}

fn read_file(path: &Path) -> Result<String, KeyError> {
    fs::read_to_string(path).map_err(|source| KeyError::Read {
        path: path.to_path_buf(),
        source,
    })
}
