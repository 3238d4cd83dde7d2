use crate::{
    knox::{pedersen::PedersenParameters, Knox},
    AnonResult,
};
use blsful::inner_types::*;
use core::fmt::{self, Debug, Formatter};
use rand_core::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

/// Public values every participant agrees on
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct SystemParameters {
    /// The bases for pseudonyms and attribute commitments
    pub nym: PedersenParameters,
    /// The G2 base of the review linking tags
    pub link_basis: G2Projective,
}

impl SystemParameters {
    const LINK_DST: &'static [u8] = b"BLS12381G2_XMD:SHA-256_SSWU_RO_ANONRATE_LINK_BASIS_";

    /// Derive all bases from `domain`
    pub fn new(domain: &[u8]) -> Self {
        Self {
            nym: PedersenParameters::new(domain),
            link_basis: Knox::hash_to_g2(domain, Self::LINK_DST),
        }
    }
}

/// The user's long term secret. It is the first message of every credential
/// and review token the user holds.
#[derive(Clone, Eq, PartialEq, Zeroize)]
#[zeroize(drop)]
pub struct HiddenSecret(pub(crate) Scalar);

impl Debug for HiddenSecret {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "HiddenSecret(..)")
    }
}

impl From<Scalar> for HiddenSecret {
    fn from(s: Scalar) -> Self {
        Self(s)
    }
}

impl HiddenSecret {
    /// Draw a fresh secret
    pub fn random(rng: impl RngCore + CryptoRng) -> Self {
        Self(Scalar::random(rng))
    }

    /// The secret as a scalar
    pub fn to_scalar(&self) -> Scalar {
        self.0
    }
}

/// A commitment `g^r * h^usk` to the hidden secret
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Pseudonym(pub G1Projective);

impl Pseudonym {
    /// Commit to `usk`
    pub fn new(params: &SystemParameters, usk: &HiddenSecret, randomness: Scalar) -> Self {
        Self(params.nym.commit(usk.0, randomness))
    }

    /// The compressed encoding
    pub fn to_bytes(&self) -> [u8; 48] {
        self.0.to_affine().to_compressed()
    }
}

/// A pseudonym together with the randomness that opens it
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize, Zeroize)]
#[zeroize(drop)]
pub struct Identity {
    /// The public pseudonym
    #[zeroize(skip)]
    pub pseudonym: Pseudonym,
    /// The commitment randomness
    pub randomness: Scalar,
}

impl Identity {
    /// Create a fresh pseudonym for `usk`
    pub fn new(
        params: &SystemParameters,
        usk: &HiddenSecret,
        rng: impl RngCore + CryptoRng,
    ) -> Self {
        let randomness = Scalar::random(rng);
        Self {
            pseudonym: Pseudonym::new(params, usk, randomness),
            randomness,
        }
    }

    /// Check that the pseudonym opens to `usk`
    pub fn verify(&self, params: &SystemParameters, usk: &HiddenSecret) -> bool {
        Pseudonym::new(params, usk, self.randomness) == self.pseudonym
    }

    /// Check that the pseudonym is not the identity element
    pub fn is_valid(&self) -> AnonResult<()> {
        if bool::from(self.pseudonym.0.is_identity()) {
            return Err(crate::error::Error::InvalidArgument(
                "pseudonym is the identity element".to_string(),
            ));
        }
        Ok(())
    }
}
