use super::{PublicKey, SecretKey};
use crate::{error::Error, AnonResult};
use blsful::inner_types::*;
use core::convert::TryFrom;
use rand_core::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use subtle::{Choice, ConditionallySelectable, CtOption};

/// A Pointcheval Sanders signature
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Signature {
    pub(crate) sigma_1: G1Projective,
    pub(crate) sigma_2: G1Projective,
}

impl Default for Signature {
    fn default() -> Self {
        Self {
            sigma_1: G1Projective::IDENTITY,
            sigma_2: G1Projective::IDENTITY,
        }
    }
}

impl ConditionallySelectable for Signature {
    fn conditional_select(a: &Self, b: &Self, choice: Choice) -> Self {
        let sigma_1 = G1Projective::conditional_select(&a.sigma_1, &b.sigma_1, choice);
        let sigma_2 = G1Projective::conditional_select(&a.sigma_2, &b.sigma_2, choice);
        Self { sigma_1, sigma_2 }
    }
}

impl Signature {
    /// The size in bytes of the signature
    pub const BYTES: usize = 96;

    /// Generate a new signature where all messages are known to the signer
    pub fn new<M>(sk: &SecretKey, msgs: M, mut rng: impl RngCore + CryptoRng) -> AnonResult<Self>
    where
        M: AsRef<[Scalar]>,
    {
        let msgs = msgs.as_ref();
        if sk.is_invalid() {
            return Err(Error::InvalidSigningOperation);
        }
        if sk.y.len() != msgs.len() {
            return Err(Error::InvalidSigningOperation);
        }

        let sigma_1 = G1Projective::GENERATOR * Scalar::random(&mut rng);
        let mut exp = sk.x;
        for (ski, m) in sk.y.iter().zip(msgs.iter()) {
            exp += *ski * *m;
        }
        let sigma_2 = sigma_1 * exp;
        Ok(Self { sigma_1, sigma_2 })
    }

    /// The first signature element
    pub fn sigma_1(&self) -> G1Projective {
        self.sigma_1
    }

    /// The second signature element
    pub fn sigma_2(&self) -> G1Projective {
        self.sigma_2
    }

    /// Verify a signature
    pub fn verify<M>(&self, pk: &PublicKey, msgs: M) -> Choice
    where
        M: AsRef<[Scalar]>,
    {
        let msgs = msgs.as_ref();
        if pk.y.len() != msgs.len() {
            return Choice::from(0);
        }
        if pk.is_invalid().unwrap_u8() == 1 {
            return Choice::from(0);
        }
        if (self.sigma_1.is_identity() | self.sigma_2.is_identity()).unwrap_u8() == 1u8 {
            return Choice::from(0);
        }

        let mut points = Vec::with_capacity(msgs.len() + 1);
        let mut scalars = Vec::with_capacity(msgs.len() + 1);
        points.push(pk.x);
        scalars.push(Scalar::ONE);
        for (y, m) in pk.y.iter().zip(msgs.iter()) {
            points.push(*y);
            scalars.push(*m);
        }

        // Y_m = X_tilde * Y_tilde[0]^usk * Y_tilde[1]^m_1 * ...Y_tilde[i]^m_i
        let y_m = G2Projective::sum_of_products(&points, &scalars);

        // e(sigma_1, Y_m) == e(sigma_2, G2)
        multi_miller_loop(&[
            (
                &self.sigma_1.to_affine(),
                &G2Prepared::from(y_m.to_affine()),
            ),
            (
                &self.sigma_2.to_affine(),
                &G2Prepared::from(-G2Affine::generator()),
            ),
        ])
        .final_exponentiation()
        .is_identity()
    }

    /// Rerandomize the signature so that `sigma_1' = sigma_1^t` and
    /// `sigma_2' = (sigma_2 * sigma_1^r)^t`.
    ///
    /// The result verifies against the same messages only once the
    /// `r` term is accounted for, which is what disclosure proofs do.
    pub fn randomize(&self, t: Scalar, r: Scalar) -> Self {
        Self {
            sigma_1: self.sigma_1 * t,
            sigma_2: (self.sigma_2 + self.sigma_1 * r) * t,
        }
    }

    /// Get the byte representation of this signature
    pub fn to_bytes(&self) -> [u8; Self::BYTES] {
        let mut bytes = [0u8; Self::BYTES];
        bytes[..48].copy_from_slice(&self.sigma_1.to_affine().to_compressed());
        bytes[48..].copy_from_slice(&self.sigma_2.to_affine().to_compressed());
        bytes
    }

    /// Convert a byte sequence into a signature
    pub fn from_bytes(data: &[u8; Self::BYTES]) -> CtOption<Self> {
        let mut s1 = [0u8; 48];
        let mut s2 = [0u8; 48];
        s1.copy_from_slice(&data[..48]);
        s2.copy_from_slice(&data[48..]);
        let s1 = G1Affine::from_compressed(&s1).map(G1Projective::from);
        let s2 = G1Affine::from_compressed(&s2).map(G1Projective::from);

        s1.and_then(|sigma_1| s2.map(|sigma_2| Signature { sigma_1, sigma_2 }))
    }
}

impl TryFrom<&[u8]> for Signature {
    type Error = Error;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        let bytes = <[u8; Self::BYTES]>::try_from(value)
            .map_err(|_| Error::General("invalid signature length"))?;
        Option::<Self>::from(Self::from_bytes(&bytes)).ok_or(Error::General("invalid signature"))
    }
}
