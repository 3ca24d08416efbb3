//! Issuer key material: loading, issuer resolution and key fetching.

pub mod fetcher;
pub mod loader;
pub mod resolver;
pub mod types;

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use crate::services::zkp::{ProofError, RsaPublicKey};

pub use fetcher::{
    JwksFileFetcher, KeyCandidate, KeyFetcher, PemFileFetcher, StaticKeyFetcher, select_key,
};
pub use loader::WorkloadKey;
pub use resolver::{IssuerResolver, IssuerRule};
pub use types::{Jwk, Jwks};

#[derive(Debug, Error)]
pub enum KeyError {
    #[error("cannot read key material at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no PEM block found")]
    NoPemBlock,

    #[error("unsupported PEM block {found:?}, expected {expected:?}")]
    UnsupportedPemLabel {
        expected: &'static str,
        found: String,
    },

    #[error("invalid key encoding: {0}")]
    InvalidEncoding(String),

    #[error("invalid RSA public key: {0}")]
    InvalidKey(#[from] ProofError),

    #[error("invalid JWKS document: {0}")]
    Jwks(#[from] serde_json::Error),

    #[error("key unavailable from {uri}: {reason}")]
    KeyUnavailable { uri: String, reason: String },

    #[error("unknown issuer: {0:?}")]
    UnknownIssuer(String),
}

/// Issuer identifier (+ optional `kid`) -> issuer public key.
#[derive(Clone)]
pub struct IssuerKeys {
    resolver: IssuerResolver,
    fetcher: Arc<dyn KeyFetcher>,
}

impl fmt::Debug for IssuerKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuerKeys")
            .field("resolver", &self.resolver)
            .finish_non_exhaustive()
    }
}

impl IssuerKeys {
    pub fn new(resolver: IssuerResolver, fetcher: Arc<dyn KeyFetcher>) -> Self {
        Self { resolver, fetcher }
    }

    pub fn resolver(&self) -> &IssuerResolver {
        &self.resolver
    }

    pub fn public_key(&self, issuer: &str, kid: Option<&str>) -> Result<RsaPublicKey, KeyError> {
        let uri = self.resolver.resolve(issuer)?;
        let candidates = self.fetcher.fetch(&uri)?;
        select_key(&uri, candidates, kid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigUint;

    #[test]
    fn resolves_then_fetches() {
        let key = RsaPublicKey::new(BigUint::from(3233u32), BigUint::from(17u32)).expect("key");
        let fetcher = StaticKeyFetcher::new().with_key(
            "https://example.okta.com/v1/keys",
            Some("k1".to_string()),
            key.clone(),
        );
        let keys = IssuerKeys::new(IssuerResolver::well_known(), Arc::new(fetcher));

        assert_eq!(
            keys.public_key("https://example.okta.com", Some("k1"))
                .expect("key"),
            key
        );
        assert!(matches!(
            keys.public_key("accounts.google.com", None),
            Err(KeyError::KeyUnavailable { .. })
        ));
    }
}
