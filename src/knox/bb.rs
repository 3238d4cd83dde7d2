//! Weak Boneh-Boyen signatures `A_s = g^{1/(x+s)}` over the members of a
//! public set. A verifier publishes the signatures and forgets `x`; a prover
//! that knows a signature on its committed value can then show membership
//! without saying which member it holds (Camenisch, Chaabouni, shelat 2008).

use crate::error::Error;
use crate::sigma::relation::{Equation, Expr};
use crate::AnonResult;
use blsful::inner_types::*;
use merlin::Transcript;
use rand_core::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use uint_zigzag::Uint;

/// A signature on one member of the set
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct SetElementSignature {
    /// The member
    pub element: Scalar,
    /// `g^{1/(x+element)}`
    pub signature: G1Projective,
}

/// Public parameters for proving membership in a fixed set
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct SetMembershipParameters {
    /// `g~^x`
    pub public_key: G2Projective,
    /// One signature per member
    pub signatures: Vec<SetElementSignature>,
}

impl SetMembershipParameters {
    /// Sign every member of `elements` under a fresh key that is dropped afterwards
    pub fn new(elements: &[Scalar], mut rng: impl RngCore + CryptoRng) -> AnonResult<Self> {
        if elements.is_empty() {
            return Err(Error::InvalidArgument("the set must not be empty".to_string()));
        }
        for (i, e) in elements.iter().enumerate() {
            if elements[..i].contains(e) {
                return Err(Error::InvalidArgument(
                    "the set contains duplicate members".to_string(),
                ));
            }
        }
        let x = Scalar::random(&mut rng);
        let public_key = G2Projective::GENERATOR * x;
        let signatures = elements
            .iter()
            .map(|element| {
                Option::<Scalar>::from((x + element).invert())
                    .map(|inv| SetElementSignature {
                        element: *element,
                        signature: G1Projective::GENERATOR * inv,
                    })
                    .ok_or(Error::General("set member collides with the signing key"))
            })
            .collect::<AnonResult<Vec<_>>>()?;
        Ok(Self {
            public_key,
            signatures,
        })
    }

    /// The signature on `element` if it is a member
    pub fn signature_for(&self, element: &Scalar) -> Option<G1Projective> {
        self.signatures
            .iter()
            .find(|s| s.element == *element)
            .map(|s| s.signature)
    }

    /// Is `element` a member
    pub fn contains(&self, element: &Scalar) -> bool {
        self.signature_for(element).is_some()
    }

    /// The number of members
    pub fn len(&self) -> usize {
        self.signatures.len()
    }

    /// Is the set empty
    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty()
    }

    /// Check every published signature: `e(A_s, g~^x * g~^s) == e(g, g~)`.
    ///
    /// These are constant-only equations, they hold or fail without any witness.
    pub fn verify(&self) -> AnonResult<bool> {
        if bool::from(self.public_key.is_identity()) || self.signatures.is_empty() {
            return Ok(false);
        }
        for s in &self.signatures {
            let equation = Equation::new(
                Expr::pairing(
                    Expr::from(s.signature),
                    Expr::from(self.public_key + G2Projective::GENERATOR * s.element),
                ),
                Expr::pairing(
                    Expr::from(G1Projective::GENERATOR),
                    Expr::from(G2Projective::GENERATOR),
                ),
            );
            if !equation.linearize()?.holds_trivially() {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Add the public parameters to the transcript
    pub fn add_challenge_contribution(&self, transcript: &mut Transcript) {
        transcript.append_message(
            b"set membership public key",
            self.public_key.to_affine().to_compressed().as_ref(),
        );
        transcript.append_message(b"set size", &Uint::from(self.signatures.len()).to_vec());
        for s in &self.signatures {
            transcript.append_message(b"set member", &s.element.to_be_bytes());
            transcript.append_message(
                b"set member signature",
                s.signature.to_affine().to_compressed().as_ref(),
            );
        }
    }
}

/// Public parameters for range proofs by base-`u` digit decomposition.
/// Every digit is shown to be a member of `{0, .., u - 1}`.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct RangeParameters {
    /// The decomposition base `u`
    pub base: u64,
    /// Signatures on every digit
    pub digits: SetMembershipParameters,
}

impl RangeParameters {
    /// The largest supported base
    pub const MAX_BASE: u64 = 1 << 16;

    /// Create range parameters for `base`
    pub fn new(base: u64, rng: impl RngCore + CryptoRng) -> AnonResult<Self> {
        if !(2..=Self::MAX_BASE).contains(&base) {
            return Err(Error::InvalidArgument(format!(
                "range base {} is not in [2, {}]",
                base,
                Self::MAX_BASE
            )));
        }
        let digits = (0..base).map(Scalar::from).collect::<Vec<_>>();
        Ok(Self {
            base,
            digits: SetMembershipParameters::new(&digits, rng)?,
        })
    }

    /// The number of digits needed so `base^digits >= width`
    pub fn digit_count(&self, width: u128) -> usize {
        let mut count = 1;
        let mut span = self.base as u128;
        while span < width {
            span *= self.base as u128;
            count += 1;
        }
        count
    }

    /// Decompose `value` into `count` little-endian digits
    pub fn decompose(&self, mut value: u128, count: usize) -> Vec<u64> {
        let base = self.base as u128;
        (0..count)
            .map(|_| {
                let d = (value % base) as u64;
                value /= base;
                d
            })
            .collect()
    }

    /// Add the public parameters to the transcript
    pub fn add_challenge_contribution(&self, transcript: &mut Transcript) {
        transcript.append_message(b"range base", &Uint::from(self.base).to_vec());
        self.digits.add_challenge_contribution(transcript);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signatures_verify() {
        let set = [Scalar::from(3u64), Scalar::from(5u64), Scalar::from(8u64)];
        let params = SetMembershipParameters::new(&set, rand::thread_rng()).unwrap();
        assert!(params.verify().unwrap());
        assert!(params.contains(&Scalar::from(5u64)));
        assert!(!params.contains(&Scalar::from(4u64)));

        let mut tampered = params.clone();
        tampered.signatures[1].signature = G1Projective::GENERATOR;
        assert!(!tampered.verify().unwrap());
    }

    #[test]
    fn rejects_bad_sets() {
        assert!(SetMembershipParameters::new(&[], rand::thread_rng()).is_err());
        let dup = [Scalar::ONE, Scalar::ONE];
        assert!(SetMembershipParameters::new(&dup, rand::thread_rng()).is_err());
    }

    #[test]
    fn digits() {
        let params = RangeParameters::new(16, rand::thread_rng()).unwrap();
        assert_eq!(params.digit_count(1), 1);
        assert_eq!(params.digit_count(16), 1);
        assert_eq!(params.digit_count(17), 2);
        assert_eq!(params.digit_count(113), 2);
        assert_eq!(params.digit_count(257), 3);
        assert_eq!(params.decompose(0x1a2, 3), vec![2, 10, 1]);
        assert!(RangeParameters::new(1, rand::thread_rng()).is_err());
    }
}
