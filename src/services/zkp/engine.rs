//! Proof engine.
//!
//! Non-interactive (Fiat–Shamir) form of a parallel Guillou–Quisquater
//! identification protocol with binary challenges:
//!
//! - commit: `t_i = r_i^e mod N` for a fresh unit `r_i`
//! - challenge: bit `c_i` taken from SHA-256 over the statement and *all*
//!   commitments, so no round can be re-sampled on its own
//! - response: `z_i = r_i * s^{c_i} mod N`
//!
//! The verifier accepts iff `z_i^e ≡ t_i * y^{c_i} (mod N)` for every round.
//! Answering both challenges of one commitment yields `s = z_1 / z_0`, so a
//! prover without `s` passes each round with probability 1/2 and the whole
//! proof with probability `2^-k`. A transcript is simulated by choosing `z, c`
//! and setting `t = z^e * y^-c`, which keeps the proof zero-knowledge.

use std::time::Instant;

use num_bigint::{BigUint, RandBigInt};
use num_integer::Integer;
use num_traits::{One, Zero};
use rand::{CryptoRng, RngCore, rngs::OsRng};
use sha2::{Digest, Sha256};
use subtle::{Choice, ConstantTimeEq};
use tracing::debug;

use super::bigint::{RsaPublicKey, to_fixed_be};
use super::{ProofError, ProofRound, SignatureProof};

const TRANSCRIPT_DOMAIN: &[u8] = b"dasvid/rsa-signature-pok/v1";

/// Prove knowledge of `witness` such that `witness^e ≡ digest (mod N)`.
///
/// Masks are drawn from the operating system RNG.
pub fn prove(
    witness: &BigUint,
    digest: &BigUint,
    key: &RsaPublicKey,
    rounds: usize,
) -> Result<SignatureProof, ProofError> {
    prove_with_rng(witness, digest, key, rounds, &mut OsRng)
}

pub fn prove_with_rng<R: RngCore + CryptoRng>(
    witness: &BigUint,
    digest: &BigUint,
    key: &RsaPublicKey,
    rounds: usize,
    rng: &mut R,
) -> Result<SignatureProof, ProofError> {
    if rounds == 0 {
        return Err(ProofError::malformed("round count must be at least 1"));
    }

    let n = key.modulus();
    check_domain(digest, n, "digest outside modulus domain")?;
    check_domain(witness, n, "witness outside modulus domain")?;
    if !witness.gcd(n).is_one() {
        return Err(ProofError::ArithmeticDomain(
            "witness is not invertible modulo N",
        ));
    }
    // Never produce a proof for a signature that does not verify.
    if &witness.modpow(key.exponent(), n) != digest {
        return Err(ProofError::InvalidWitness);
    }

    let started = Instant::now();

    let masks: Vec<BigUint> = (0..rounds).map(|_| sample_unit(n, rng)).collect();
    let commitments: Vec<BigUint> = masks
        .iter()
        .map(|mask| mask.modpow(key.exponent(), n))
        .collect();
    let challenges = challenge_bits(key, digest, &commitments);

    let proof_rounds = masks
        .into_iter()
        .zip(commitments)
        .zip(challenges)
        .map(|((mask, commitment), challenge)| {
            let response = if challenge {
                (mask * witness) % n
            } else {
                mask
            };
            ProofRound {
                commitment,
                response,
            }
        })
        .collect();

    debug!(
        rounds,
        modulus_bits = key.modulus_bits(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "signature proof generated"
    );

    Ok(SignatureProof::new(proof_rounds, key.modulus_len()))
}

/// Verify `proof` against `digest` and `key`.
///
/// Structural problems (wrong round count, foreign modulus size, digest outside
/// the domain) are errors; an algebraic mismatch is `Ok(false)`. Every round is
/// evaluated regardless of earlier failures.
pub fn verify(
    proof: &SignatureProof,
    digest: &BigUint,
    key: &RsaPublicKey,
    expected_rounds: usize,
) -> Result<bool, ProofError> {
    if proof.round_count() == 0 {
        return Err(ProofError::malformed("proof carries no rounds"));
    }
    if proof.round_count() != expected_rounds {
        return Err(ProofError::malformed(format!(
            "expected {expected_rounds} rounds, proof carries {}",
            proof.round_count()
        )));
    }
    if proof.modulus_len() != key.modulus_len() {
        return Err(ProofError::malformed(
            "proof width does not match the issuer modulus",
        ));
    }

    let n = key.modulus();
    check_domain(digest, n, "digest outside modulus domain")?;

    let started = Instant::now();
    let len = key.modulus_len();
    let commitments: Vec<BigUint> = proof
        .rounds()
        .iter()
        .map(|round| round.commitment.clone())
        .collect();
    let challenges = challenge_bits(key, digest, &commitments);

    let mut accepted = Choice::from(1u8);
    for (round, challenge) in proof.rounds().iter().zip(challenges) {
        accepted &= in_domain(&round.commitment, n) & in_domain(&round.response, n);

        let lhs = round.response.modpow(key.exponent(), n);
        let rhs = if challenge {
            (&round.commitment * digest) % n
        } else {
            &round.commitment % n
        };
        accepted &= to_fixed_be(&lhs, len).ct_eq(&to_fixed_be(&rhs, len));
    }

    let accepted = bool::from(accepted);
    debug!(
        rounds = expected_rounds,
        accepted,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "signature proof checked"
    );
    Ok(accepted)
}

fn check_domain(value: &BigUint, n: &BigUint, what: &'static str) -> Result<(), ProofError> {
    if value.is_zero() || value >= n {
        return Err(ProofError::ArithmeticDomain(what));
    }
    Ok(())
}

fn in_domain(value: &BigUint, n: &BigUint) -> Choice {
    Choice::from((!value.is_zero() && value < n) as u8)
}

// Uniform element of Z_N^*.
fn sample_unit<R: RngCore + CryptoRng>(n: &BigUint, rng: &mut R) -> BigUint {
    let one = BigUint::one();
    loop {
        let candidate = rng.gen_biguint_range(&one, n);
        if candidate.gcd(n).is_one() {
            return candidate;
        }
    }
}

/// Fiat–Shamir challenge bits, one per commitment.
fn challenge_bits(key: &RsaPublicKey, digest: &BigUint, commitments: &[BigUint]) -> Vec<bool> {
    let len = key.modulus_len();
    let mut transcript = Sha256::new();
    transcript.update(TRANSCRIPT_DOMAIN);
    transcript.update((commitments.len() as u64).to_be_bytes());
    transcript.update(to_fixed_be(key.modulus(), len));
    transcript.update(to_fixed_be(key.exponent(), len));
    transcript.update(to_fixed_be(digest, len));
    for commitment in commitments {
        transcript.update(to_fixed_be(commitment, len));
    }
    let seed = transcript.finalize();

    let wanted = commitments.len();
    let mut bits = Vec::with_capacity(wanted);
    let mut counter: u32 = 0;
    while bits.len() < wanted {
        let block = Sha256::new()
            .chain_update(seed)
            .chain_update(counter.to_be_bytes())
            .finalize();
        let missing = wanted - bits.len();
        bits.extend(
            block
                .iter()
                .flat_map(|byte| (0..8).rev().map(move |i| (byte >> i) & 1 == 1))
                .take(missing),
        );
        counter += 1;
    }
    bits
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::zkp::bigint::{message_digest_int, signature_to_int};
    use rand::{SeedableRng, rngs::StdRng};
    use rsa::{Pkcs1v15Sign, RsaPrivateKey, pkcs1::DecodeRsaPrivateKey};

    // Textbook RSA: N = 61 * 53, e = 17, 65^17 mod N = 2790.
    fn toy() -> (RsaPublicKey, BigUint, BigUint) {
        let key = RsaPublicKey::new(BigUint::from(3233u32), BigUint::from(17u32)).expect("key");
        (key, BigUint::from(65u32), BigUint::from(2790u32))
    }

    #[test]
    fn honest_proofs_verify_for_any_round_count() {
        let (key, s, y) = toy();
        for k in [1usize, 2, 16, 64, 300] {
            let proof = prove(&s, &y, &key, k).expect("prove");
            assert_eq!(proof.round_count(), k);
            assert!(verify(&proof, &y, &key, k).expect("verify"), "k = {k}");
        }
    }

    #[test]
    fn wrong_witness_is_rejected_before_proving() {
        let (key, _, y) = toy();
        assert_eq!(
            prove(&BigUint::from(66u32), &y, &key, 8),
            Err(ProofError::InvalidWitness)
        );
    }

    #[test]
    fn witness_outside_domain_is_an_arithmetic_error() {
        let (key, _, y) = toy();
        assert!(matches!(
            prove(&BigUint::zero(), &y, &key, 8),
            Err(ProofError::ArithmeticDomain(_))
        ));
        assert!(matches!(
            prove(&BigUint::from(3233u32), &y, &key, 8),
            Err(ProofError::ArithmeticDomain(_))
        ));
        // 61 divides N
        assert!(matches!(
            prove(&BigUint::from(61u32), &y, &key, 8),
            Err(ProofError::ArithmeticDomain(_))
        ));
    }

    #[test]
    fn round_count_must_match() {
        let (key, s, y) = toy();
        assert!(matches!(
            prove(&s, &y, &key, 0),
            Err(ProofError::MalformedProof(_))
        ));
        let proof = prove(&s, &y, &key, 8).expect("prove");
        assert!(matches!(
            verify(&proof, &y, &key, 16),
            Err(ProofError::MalformedProof(_))
        ));
    }

    #[test]
    fn tampered_rounds_fail() {
        let (key, s, y) = toy();
        let n = key.modulus().clone();
        let proof = prove(&s, &y, &key, 64).expect("prove");

        let mut rounds = proof.rounds().to_vec();
        rounds[10].response = (&rounds[10].response + 1u32) % &n;
        let bad = SignatureProof::new(rounds, proof.modulus_len());
        assert!(!verify(&bad, &y, &key, 64).expect("verify"));

        let mut rounds = proof.rounds().to_vec();
        rounds[3].commitment = (&rounds[3].commitment + 1u32) % &n;
        let bad = SignatureProof::new(rounds, proof.modulus_len());
        assert!(!verify(&bad, &y, &key, 64).expect("verify"));

        let mut rounds = proof.rounds().to_vec();
        rounds[0].response = BigUint::zero();
        let bad = SignatureProof::new(rounds, proof.modulus_len());
        assert!(!verify(&bad, &y, &key, 64).expect("verify"));
    }

    #[test]
    fn proof_does_not_transfer_to_another_digest() {
        let (key, s, y) = toy();
        let proof = prove(&s, &y, &key, 32).expect("prove");
        assert!(!verify(&proof, &BigUint::from(2791u32), &key, 32).expect("verify"));
    }

    #[test]
    fn seeded_rng_gives_reproducible_proofs() {
        let (key, s, y) = toy();
        let a = prove_with_rng(&s, &y, &key, 16, &mut StdRng::seed_from_u64(7)).expect("a");
        let b = prove_with_rng(&s, &y, &key, 16, &mut StdRng::seed_from_u64(7)).expect("b");
        assert_eq!(a, b);
    }

    #[test]
    fn challenge_expansion_covers_more_than_one_block() {
        let (key, _, y) = toy();
        let commitments: Vec<BigUint> = (1u32..=300).map(BigUint::from).collect();
        let bits = challenge_bits(&key, &y, &commitments);
        assert_eq!(bits.len(), 300);
        assert!(bits.iter().any(|b| *b));
        assert!(bits.iter().any(|b| !*b));
    }

    #[test]
    fn proves_a_real_rs256_signature() {
        let private = RsaPrivateKey::from_pkcs1_pem(include_str!(
            "../../../tests/fixtures/issuer_rsa.pem"
        ))
        .expect("fixture key");
        let key = RsaPublicKey::try_from(&private.to_public_key()).expect("public key");

        let message = b"abc.def";
        let signature = private
            .sign(Pkcs1v15Sign::new::<Sha256>(), &Sha256::digest(message))
            .expect("sign");

        let s = signature_to_int(&signature, &key).expect("signature int");
        let y = message_digest_int(message, &key).expect("digest int");
        let proof = prove(&s, &y, &key, 16).expect("prove");
        assert!(verify(&proof, &y, &key, 16).expect("verify"));

        let other = message_digest_int(b"abc.deg", &key).expect("digest int");
        assert!(!verify(&proof, &other, &key, 16).expect("verify"));
    }
}
