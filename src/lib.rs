//! Delegated-authority SVIDs (DA-SVIDs).
//!
//! An asserting workload takes a signed OAuth/OIDC access token and mints a
//! short-lived DA-SVID that carries the signature-less token together with a
//! zero-knowledge proof that it holds a valid issuer RSA signature over it.
//! A verifier checks the proof against the issuer's public key without ever
//! seeing the signature.

pub mod api;
pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod services;
pub mod state;
