/// Factory: build the DA-SVID services from application `Config`.
use std::sync::Arc;

use tracing::info;

use super::{Asserter, DasvidError, Validator};
use crate::config::{Config, IssuerKeySource};
use crate::services::keys::loader::read_private_key;
use crate::services::keys::{
    IssuerKeys, IssuerResolver, JwksFileFetcher, KeyFetcher, PemFileFetcher, WorkloadKey,
};
use crate::services::token::TokenMinter;

#[derive(Clone, Debug)]
pub struct DasvidServices {
    pub workload_key: WorkloadKey,
    pub asserter: Arc<Asserter>,
    pub validator: Arc<Validator>,
}

pub fn build_issuer_keys(config: &Config) -> IssuerKeys {
    let resolver = IssuerResolver::from_policy(config.issuer_strict);
    let fetcher: Arc<dyn KeyFetcher> = match &config.issuer_keys {
        IssuerKeySource::Pem(path) => Arc::new(PemFileFetcher::new(path)),
        IssuerKeySource::Jwks(path) => Arc::new(JwksFileFetcher::new(path)),
    };
    IssuerKeys::new(resolver, fetcher)
}

pub fn build_services(config: &Config) -> Result<DasvidServices, DasvidError> {
    let workload_key = read_private_key(&config.workload_key_path)?;
    let keys = build_issuer_keys(config);

    let minter = TokenMinter::new(
        &workload_key,
        config.workload_id.clone(),
        config.dasvid_ttl_seconds,
    )?;

    let asserter = Asserter::new(keys.clone(), minter, config.proof_len, config.mint_zkp);
    let validator = Validator::new(keys, workload_key.public_key().clone(), config.proof_len)
        .require_proof(config.mint_zkp);

    info!(
        workload_id = %config.workload_id,
        proof_len = config.proof_len,
        mint_zkp = config.mint_zkp,
        issuer_strict = config.issuer_strict,
        "DA-SVID services ready"
    );

    Ok(DasvidServices {
        workload_key,
        asserter: Arc::new(asserter),
        validator: Arc::new(validator),
    })
}
