use super::{SecretKey, Signature};
use crate::{error::Error, AnonResult};
use blsful::inner_types::*;
use rand_core::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use subtle::CtOption;

/// A PS blind signature
/// structurally identical to `Signature` but is used to
/// help with misuse and confusion.
///
/// The hidden secret in slot 0 was committed by the signature recipient
/// so the signer only knows the remaining messages.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Deserialize, Serialize)]
pub struct BlindSignature(pub(crate) Signature);

impl BlindSignature {
    /// The size of the signature in bytes
    pub const BYTES: usize = Signature::BYTES;

    /// Sign the known messages together with whatever `commitment` hides.
    ///
    /// `commitment` must be `g^rho * Y1[i]^m_i` for the hidden indices, `msgs`
    /// holds the index and value of every message the signer knows.
    pub fn new(
        commitment: G1Projective,
        sk: &SecretKey,
        msgs: &[(usize, Scalar)],
        mut rng: impl RngCore + CryptoRng,
    ) -> AnonResult<Self> {
        if sk.y.len() < msgs.len() {
            return Err(Error::InvalidSigningOperation);
        }
        if sk.is_invalid() {
            return Err(Error::InvalidSigningOperation);
        }
        if bool::from(commitment.is_identity()) {
            return Err(Error::InvalidSigningOperation);
        }

        let u = Scalar::random(&mut rng);
        let sigma_1 = G1Projective::GENERATOR * u;

        let mut exp = sk.x;
        for (i, msg) in msgs {
            let y = sk.y.get(*i).ok_or(Error::InvalidSigningOperation)?;
            exp += *y * *msg;
        }
        let mut sigma_2 = (G1Projective::GENERATOR * exp) + commitment;
        sigma_2 *= u;
        Ok(Self(Signature { sigma_1, sigma_2 }))
    }

    /// Once signature on committed attributes (blind signature) is received, the signature needs to be unblinded.
    /// Takes the blinding factor used in the commitment.
    pub fn to_unblinded(self, blinding: Scalar) -> Signature {
        Signature {
            sigma_1: self.0.sigma_1,
            sigma_2: self.0.sigma_2 - (self.0.sigma_1 * blinding),
        }
    }

    /// Get the byte representation of this signature
    pub fn to_bytes(&self) -> [u8; Self::BYTES] {
        self.0.to_bytes()
    }

    /// Convert a byte sequence into a signature
    pub fn from_bytes(data: &[u8; Self::BYTES]) -> CtOption<Self> {
        Signature::from_bytes(data).map(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knox::ps::PublicKey;

    #[test]
    fn blind_sign_and_unblind() {
        let mut rng = rand::thread_rng();
        let sk = SecretKey::random(3, &mut rng).unwrap();
        let pk = PublicKey::from(&sk);
        let usk = Scalar::from(7u64);
        let rho = Scalar::random(&mut rng);
        let commitment = G1Projective::GENERATOR * rho + pk.blinding_base() * usk;
        let known = [(1, Scalar::from(25u64)), (2, Scalar::from(77u64))];

        let blind = BlindSignature::new(commitment, &sk, &known, &mut rng).unwrap();
        let msgs = [usk, known[0].1, known[1].1];
        assert_eq!(blind.0.verify(&pk, &msgs).unwrap_u8(), 0);
        let sig = blind.to_unblinded(rho);
        assert_eq!(sig.verify(&pk, &msgs).unwrap_u8(), 1);

        let wrong = blind.to_unblinded(rho + Scalar::ONE);
        assert_eq!(wrong.verify(&pk, &msgs).unwrap_u8(), 0);
    }

    #[test]
    fn out_of_bounds_index() {
        let mut rng = rand::thread_rng();
        let sk = SecretKey::random(2, &mut rng).unwrap();
        let res = BlindSignature::new(
            G1Projective::GENERATOR,
            &sk,
            &[(5, Scalar::ONE)],
            &mut rng,
        );
        assert_eq!(res, Err(Error::InvalidSigningOperation));
    }
}
