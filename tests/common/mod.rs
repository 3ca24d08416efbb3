#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::{Pkcs1v15Sign, RsaPrivateKey};
use serde_json::{Value, json};
use sha2::{Digest, Sha256};

use dasvid::services::dasvid::{Asserter, Validator};
use dasvid::services::keys::loader::parse_private_key_pem;
use dasvid::services::keys::{IssuerKeys, IssuerResolver, StaticKeyFetcher, WorkloadKey};
use dasvid::services::token::TokenMinter;
use dasvid::services::zkp::RsaPublicKey;

pub const ISSUER: &str = "https://example.okta.com";
pub const ISSUER_KEYS_URI: &str = "https://example.okta.com/v1/keys";
pub const ISSUER_KID: &str = "issuer-key-1";
pub const WORKLOAD_ID: &str = "spiffe://example.org/asserting-wl";
pub const SUBJECT_ID: &str = "spiffe://example.org/subject-wl";
pub const PROOF_LEN: usize = 16;

pub const ISSUER_PEM: &str = include_str!("../fixtures/issuer_rsa.pem");
pub const WORKLOAD_PEM: &str = include_str!("../fixtures/workload_rsa.pem");

pub fn issuer_key() -> RsaPublicKey {
    parse_private_key_pem(ISSUER_PEM)
        .expect("issuer key")
        .public_key()
        .clone()
}

pub fn workload_key() -> WorkloadKey {
    parse_private_key_pem(WORKLOAD_PEM).expect("workload key")
}

pub fn issuer_keys(resolver: IssuerResolver) -> IssuerKeys {
    let fetcher = StaticKeyFetcher::new().with_key(
        ISSUER_KEYS_URI,
        Some(ISSUER_KID.to_string()),
        issuer_key(),
    );
    IssuerKeys::new(resolver, Arc::new(fetcher))
}

pub fn minter() -> TokenMinter {
    TokenMinter::new(&workload_key(), WORKLOAD_ID.to_string(), 120).expect("minter")
}

pub fn asserter(mint_zkp: bool) -> Asserter {
    Asserter::new(
        issuer_keys(IssuerResolver::well_known()),
        minter(),
        PROOF_LEN,
        mint_zkp,
    )
}

pub fn validator() -> Validator {
    Validator::new(
        issuer_keys(IssuerResolver::well_known()),
        workload_key().public_key().clone(),
        PROOF_LEN,
    )
}

/// RSASSA-PKCS1-v1_5 / SHA-256 signature over `message` with `pem`.
pub fn sign_raw(pem: &str, message: &str) -> Vec<u8> {
    let key = RsaPrivateKey::from_pkcs1_pem(pem).expect("private key");
    key.sign(
        Pkcs1v15Sign::new::<Sha256>(),
        &Sha256::digest(message.as_bytes()),
    )
    .expect("sign")
}

pub fn oauth_claims(now: DateTime<Utc>) -> Value {
    json!({
        "iss": ISSUER,
        "sub": "alice@example.com",
        "aud": "api://default",
        "cid": "0oa1example",
        "iat": now.timestamp(),
        "exp": now.timestamp() + 600,
    })
}

/// RS256 OAuth access token signed by `pem`, header naming the issuer kid.
pub fn oauth_token_signed_by(pem: &str, claims: &Value) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(ISSUER_KID.to_string());
    let key = EncodingKey::from_rsa_pem(pem.as_bytes()).expect("encoding key");
    jsonwebtoken::encode(&header, claims, &key).expect("oauth token")
}

pub fn oauth_token(claims: &Value) -> String {
    oauth_token_signed_by(ISSUER_PEM, claims)
}
