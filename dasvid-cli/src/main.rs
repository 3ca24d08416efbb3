use std::{fs, path::PathBuf, sync::Arc};

use anyhow::{Context, Result, bail};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use dasvid::services::dasvid::{
    Asserter, Deadline, Verdict, Validator, prove_signature, verify_signature_proof,
};
use dasvid::services::keys::loader::{read_private_key, read_public_key};
use dasvid::services::keys::{
    IssuerKeys, IssuerResolver, JwksFileFetcher, KeyFetcher, PemFileFetcher,
};
use dasvid::services::token::{DEFAULT_TTL_SECONDS, MAX_TTL_SECONDS, TokenMinter, split_token};
use dasvid::services::zkp::RsaPublicKey;

/// Mint and check DA-SVIDs, or prove/verify RSA signature knowledge, with local keys.
///
/// Token and proof arguments accept a literal value or `@path` to read it from a file.
#[derive(Parser, Debug)]
#[command(name = "dasvid-cli", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Re-assert an OAuth token as a DA-SVID signed with the workload key
    Mint(MintArgs),
    /// Validate a DA-SVID: outer signature, expiry, issuer, proof
    Validate(ValidateArgs),
    /// Prove knowledge of the signature of a JWT; prints {"msg", "proof"}
    Prove(ProveArgs),
    /// Verify an encoded proof against a signature-less message
    VerifyProof(VerifyProofArgs),
}

#[derive(Args, Debug)]
struct IssuerKeyArgs {
    /// Issuer public key PEM (SPKI or PKCS#1)
    #[arg(long, value_name = "FILE", conflicts_with = "issuer_jwks")]
    issuer_pem: Option<PathBuf>,

    /// Cached issuer JWKS document
    #[arg(long, value_name = "FILE")]
    issuer_jwks: Option<PathBuf>,

    /// Only resolve well-known issuers (no `/v1/keys` fallback)
    #[arg(long, default_value_t = false)]
    strict: bool,
}

#[derive(Args, Debug)]
struct MintArgs {
    /// OAuth access token (or @file)
    #[arg(long)]
    oauth_token: String,

    /// SPIFFE ID of the subject workload
    #[arg(long)]
    sub: String,

    /// SPIFFE ID of this (asserting) workload
    #[arg(long)]
    workload_id: String,

    /// Workload private key, PKCS#1 PEM
    #[arg(long, value_name = "FILE")]
    workload_key: PathBuf,

    #[command(flatten)]
    issuer: IssuerKeyArgs,

    /// Proof rounds
    #[arg(long, default_value_t = 16)]
    proof_len: usize,

    /// Mint without the zkp claim
    #[arg(long, default_value_t = false)]
    no_zkp: bool,

    /// DA-SVID lifetime in seconds
    #[arg(
        long,
        default_value_t = DEFAULT_TTL_SECONDS,
        value_parser = clap::value_parser!(i64).range(1..=MAX_TTL_SECONDS)
    )]
    ttl: i64,
}

#[derive(Args, Debug)]
struct ValidateArgs {
    /// DA-SVID (or @file)
    #[arg(long)]
    dasvid: String,

    /// Public key of the minting workload (SPKI or PKCS#1 PEM)
    #[arg(long, value_name = "FILE")]
    workload_pub: PathBuf,

    #[command(flatten)]
    issuer: IssuerKeyArgs,

    #[arg(long, default_value_t = 16)]
    proof_len: usize,

    /// Accept tokens without a zkp claim
    #[arg(long, default_value_t = false)]
    allow_proofless: bool,
}

#[derive(Args, Debug)]
struct ProveArgs {
    /// Signed JWT (or @file)
    #[arg(long)]
    token: String,

    /// Issuer public key PEM
    #[arg(long, value_name = "FILE")]
    issuer_pem: PathBuf,

    #[arg(long, default_value_t = 16)]
    proof_len: usize,
}

#[derive(Args, Debug)]
struct VerifyProofArgs {
    /// Signature-less `header.payload` message
    #[arg(long)]
    message: String,

    /// Encoded proof (or @file)
    #[arg(long)]
    proof: String,

    /// Issuer public key PEM
    #[arg(long, value_name = "FILE")]
    issuer_pem: PathBuf,

    #[arg(long, default_value_t = 16)]
    proof_len: usize,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// `@path` reads the value from a file.
fn read_arg(value: &str) -> Result<String> {
    match value.strip_prefix('@') {
        Some(path) => Ok(fs::read_to_string(path)
            .with_context(|| format!("reading {path}"))?
            .trim()
            .to_string()),
        None => Ok(value.trim().to_string()),
    }
}

fn issuer_keys(args: &IssuerKeyArgs) -> Result<IssuerKeys> {
    let fetcher: Arc<dyn KeyFetcher> = match (&args.issuer_pem, &args.issuer_jwks) {
        (Some(pem), _) => Arc::new(PemFileFetcher::new(pem)),
        (None, Some(jwks)) => Arc::new(JwksFileFetcher::new(jwks)),
        (None, None) => bail!("one of --issuer-pem or --issuer-jwks is required"),
    };
    Ok(IssuerKeys::new(
        IssuerResolver::from_policy(args.strict),
        fetcher,
    ))
}

fn mint(args: MintArgs) -> Result<()> {
    let oauth_token = read_arg(&args.oauth_token)?;
    let workload_key = read_private_key(&args.workload_key)?;
    let minter = TokenMinter::new(&workload_key, args.workload_id, args.ttl)?;
    let asserter = Asserter::new(
        issuer_keys(&args.issuer)?,
        minter,
        args.proof_len,
        !args.no_zkp,
    );

    let minted = asserter.assert(&oauth_token, &args.sub, Utc::now(), Deadline::none())?;
    println!("{}", minted.token);
    Ok(())
}

fn validate(args: ValidateArgs) -> Result<()> {
    let token = read_arg(&args.dasvid)?;
    let workload_pub = read_public_key(&args.workload_pub)?;
    let validator = Validator::new(issuer_keys(&args.issuer)?, workload_pub, args.proof_len)
        .require_proof(!args.allow_proofless);

    match validator.validate(&token, Utc::now(), Deadline::none()) {
        Verdict::Accepted(accepted) => {
            println!(
                "{}",
                serde_json::json!({
                    "result": "accepted",
                    "remaining_seconds": accepted.remaining.num_seconds(),
                    "proof_verified": accepted.proof_verified,
                    "claims": accepted.claims,
                })
            );
            Ok(())
        }
        Verdict::Rejected(rejection) => bail!("rejected: {rejection}"),
    }
}

fn prove(args: ProveArgs) -> Result<()> {
    let token = read_arg(&args.token)?;
    let issuer_key: RsaPublicKey = read_public_key(&args.issuer_pem)?;
    let parts = split_token(&token)?;

    let proof = prove_signature(
        parts.message,
        &parts.signature_bytes()?,
        &issuer_key,
        args.proof_len,
    )?;
    println!(
        "{}",
        serde_json::json!({ "msg": parts.message, "proof": proof })
    );
    Ok(())
}

fn verify_proof(args: VerifyProofArgs) -> Result<()> {
    let proof = read_arg(&args.proof)?;
    let issuer_key = read_public_key(&args.issuer_pem)?;

    if verify_signature_proof(&args.message, &proof, &issuer_key, args.proof_len)? {
        println!("proof verified ({} rounds)", args.proof_len);
        Ok(())
    } else {
        bail!("proof does not verify")
    }
}

fn main() -> Result<()> {
    init_tracing();

    match Cli::parse().command {
        Command::Mint(args) => mint(args),
        Command::Validate(args) => validate(args),
        Command::Prove(args) => prove(args),
        Command::VerifyProof(args) => verify_proof(args),
    }
}
