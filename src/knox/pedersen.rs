use super::Knox;
use blsful::inner_types::*;
use rand_core::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

/// Pedersen commitment bases in G1. A commitment to `m` with randomness `r`
/// is `g^r * h^m`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct PedersenParameters {
    /// The blinder base
    pub g: G1Projective,
    /// The message base
    pub h: G1Projective,
}

/// The values that open a Pedersen commitment
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize, Zeroize)]
#[zeroize(drop)]
pub struct PedersenOpening {
    /// The committed message
    pub message: Scalar,
    /// The commitment randomness
    pub randomness: Scalar,
}

impl PedersenParameters {
    const DST: &'static [u8] = b"BLS12381G1_XMD:SHA-256_SSWU_RO_ANONRATE_PEDERSEN_";

    /// Derive nothing-up-my-sleeve bases from a domain label
    pub fn new(domain: &[u8]) -> Self {
        let mut input = Vec::with_capacity(domain.len() + 8);
        input.extend_from_slice(domain);
        input.extend_from_slice(b"blinder");
        let g = Knox::hash_to_g1(&input, Self::DST);
        input.truncate(domain.len());
        input.extend_from_slice(b"message");
        let h = Knox::hash_to_g1(&input, Self::DST);
        Self { g, h }
    }

    /// Commit to `message` with `randomness`
    pub fn commit(&self, message: Scalar, randomness: Scalar) -> G1Projective {
        G1Projective::sum_of_products(&[self.g, self.h], &[randomness, message])
    }

    /// Commit to `message` with fresh randomness
    pub fn commit_random(
        &self,
        message: Scalar,
        rng: impl RngCore + CryptoRng,
    ) -> (G1Projective, PedersenOpening) {
        let randomness = Scalar::random(rng);
        (
            self.commit(message, randomness),
            PedersenOpening {
                message,
                randomness,
            },
        )
    }

    /// Check that `opening` opens `commitment`
    pub fn open(&self, commitment: &G1Projective, opening: &PedersenOpening) -> bool {
        self.commit(opening.message, opening.randomness) == *commitment
    }
}
