//! Boundary to the key-fetching collaborator.
//!
//! Fetching a remote key set and converting it to key material happens outside
//! this crate. Implementations here read what that collaborator left on disk,
//! or hold keys in memory.

use std::collections::HashMap;
use std::path::PathBuf;

use tracing::debug;

use super::KeyError;
use super::loader::{read_jwks, read_public_key};
use crate::services::zkp::RsaPublicKey;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyCandidate {
    pub kid: Option<String>,
    pub key: RsaPublicKey,
}

/// Given a key endpoint, produce the issuer's candidate keys.
///
/// Failures are reported as `KeyError::KeyUnavailable`; no retries are made.
pub trait KeyFetcher: Send + Sync {
    fn fetch(&self, uri: &str) -> Result<Vec<KeyCandidate>, KeyError>;
}

/// Reads the PEM public key written to `PEM_PATH` for the resolved endpoint.
#[derive(Clone, Debug)]
pub struct PemFileFetcher {
    path: PathBuf,
}

impl PemFileFetcher {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl KeyFetcher for PemFileFetcher {
    fn fetch(&self, uri: &str) -> Result<Vec<KeyCandidate>, KeyError> {
        debug!(uri, path = %self.path.display(), "loading issuer key from PEM");
        let key = read_public_key(&self.path).map_err(|e| unavailable(uri, e))?;
        Ok(vec![KeyCandidate { kid: None, key }])
    }
}

/// Reads a cached key set document for the resolved endpoint.
#[derive(Clone, Debug)]
pub struct JwksFileFetcher {
    path: PathBuf,
}

impl JwksFileFetcher {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl KeyFetcher for JwksFileFetcher {
    fn fetch(&self, uri: &str) -> Result<Vec<KeyCandidate>, KeyError> {
        debug!(uri, path = %self.path.display(), "loading issuer keys from cached JWKS");
        read_jwks(&self.path)
            .and_then(|jwks| jwks.candidates())
            .map_err(|e| unavailable(uri, e))
    }
}

/// Keys held in memory, per endpoint.
#[derive(Clone, Debug, Default)]
pub struct StaticKeyFetcher {
    keys: HashMap<String, Vec<KeyCandidate>>,
}

impl StaticKeyFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key(mut self, uri: impl Into<String>, kid: Option<String>, key: RsaPublicKey) -> Self {
        self.keys
            .entry(uri.into())
            .or_default()
            .push(KeyCandidate { kid, key });
        self
    }
}

impl KeyFetcher for StaticKeyFetcher {
    fn fetch(&self, uri: &str) -> Result<Vec<KeyCandidate>, KeyError> {
        self.keys
            .get(uri)
            .cloned()
            .ok_or_else(|| KeyError::KeyUnavailable {
                uri: uri.to_string(),
                reason: "no keys registered for endpoint".to_string(),
            })
    }
}

/// Pick the key a token names by `kid`.
///
/// A single key without a `kid` (PEM source) matches any `kid`. Without a
/// `kid`, the set must contain exactly one key.
pub fn select_key(
    uri: &str,
    candidates: Vec<KeyCandidate>,
    kid: Option<&str>,
) -> Result<RsaPublicKey, KeyError> {
    let unavailable = |reason: String| KeyError::KeyUnavailable {
        uri: uri.to_string(),
        reason,
    };

    if candidates.is_empty() {
        return Err(unavailable("key set is empty".to_string()));
    }

    if let Some(kid) = kid
        && let Some(found) = candidates.iter().find(|c| c.kid.as_deref() == Some(kid))
    {
        return Ok(found.key.clone());
    }

    match candidates.as_slice() {
        [only] if only.kid.is_none() || kid.is_none() => Ok(only.key.clone()),
        _ => Err(unavailable(match kid {
            Some(kid) => format!("no key with kid {kid:?}"),
            None => format!("{} keys and no kid to choose by", candidates.len()),
        })),
    }
}

fn unavailable(uri: &str, err: KeyError) -> KeyError {
    KeyError::KeyUnavailable {
        uri: uri.to_string(),
        reason: err.to_string(),
    }
}
