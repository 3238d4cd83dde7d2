use super::{BlindSignature, PublicKey, SecretKey, Signature};
use crate::error::Error;
use crate::AnonResult;
use blsful::inner_types::*;
use rand_core::{CryptoRng, RngCore};

/// This struct represents an Issuer of signatures or Signer.
/// Provided are methods for signing regularly where all messages are known
/// and 2PC where the hidden secret is only known to the holder and a blind
/// signature is created.
pub struct Issuer;

impl Issuer {
    /// Create a keypair capable of signing up to `count` messages
    pub fn new_keys(
        count: usize,
        rng: impl RngCore + CryptoRng,
    ) -> AnonResult<(PublicKey, SecretKey)> {
        SecretKey::random(count, rng)
            .map(|sk| {
                let pk = PublicKey::from(&sk);
                (pk, sk)
            })
            .ok_or(Error::General("invalid key generation"))
    }

    /// Create a signature with no hidden messages
    pub fn sign<M>(
        sk: &SecretKey,
        msgs: M,
        rng: impl RngCore + CryptoRng,
    ) -> AnonResult<Signature>
    where
        M: AsRef<[Scalar]>,
    {
        Signature::new(sk, msgs, rng)
    }

    /// Blind sign the known messages together with the committed hidden secret.
    ///
    /// The commitment must already have been shown well formed, this only signs.
    pub fn blind_sign(
        commitment: G1Projective,
        sk: &SecretKey,
        msgs: &[(usize, Scalar)],
        rng: impl RngCore + CryptoRng,
    ) -> AnonResult<BlindSignature> {
        BlindSignature::new(commitment, sk, msgs, rng)
    }
}
