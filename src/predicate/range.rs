//! Range proofs by digit decomposition (Camenisch, Chaabouni, shelat 2008).
//!
//! With `ℓ` digits in base `u` and `u^ℓ >= upper - lower + 1` the prover shows
//!
//! ```text
//! C * h^-lower             = g^r * Π (h^(u^j))^a_j
//! C * h^(u^ℓ - upper - 1)  = g^r * Π (h^(u^j))^b_j
//! ```
//!
//! where every digit `a_j`, `b_j` carries a blinded signature proving it is
//! in `{0, .., u - 1}`. The first line gives `m >= lower` and the second
//! `m <= upper`.

use super::{
    set_membership::signature_equation, PredicateKind, PredicateProtocolFactory, PredicateWitness,
};
use crate::{
    error::Error,
    knox::{bb::RangeParameters, pedersen::PedersenParameters},
    sigma::{
        group::{GroupElement, GroupKind},
        relation::{Equation, Expr},
        LinearProver, LinearVerifier, SchnorrStatement, SigmaProver, SigmaVerifier,
        StatementBuilder,
    },
    utils::{scalar_from_i64, scalar_from_u128, scoped_name},
    AnonResult,
};
use blsful::inner_types::*;
use merlin::Transcript;
use rand_core::CryptoRngCore;
use std::collections::BTreeMap;

/// Public parameters of a range proof
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RangeProofParameters {
    nym: PedersenParameters,
    commitment: G1Projective,
    lower: i64,
    upper: i64,
    range: RangeParameters,
    digits: usize,
    position: String,
}

impl RangeProofParameters {
    /// Prove that `commitment` opens to an integer in `[lower, upper]`
    pub fn new(
        nym: PedersenParameters,
        commitment: G1Projective,
        lower: i64,
        upper: i64,
        range: RangeParameters,
        position: impl Into<String>,
    ) -> AnonResult<Self> {
        if lower > upper {
            return Err(Error::InvalidArgument(format!(
                "empty range [{}, {}]",
                lower, upper
            )));
        }
        let width = (upper as i128 - lower as i128 + 1) as u128;
        let digits = range.digit_count(width);
        Ok(Self {
            nym,
            commitment,
            lower,
            upper,
            range,
            digits,
            position: position.into(),
        })
    }

    fn name(&self, name: &str) -> String {
        scoped_name(&self.position, name)
    }

    fn digit(&self, side: &str, j: usize) -> String {
        scoped_name(&self.position, &format!("{}Digit{}", side, j))
    }

    fn blinding(&self, side: &str, j: usize) -> String {
        scoped_name(&self.position, &format!("{}Blinding{}", side, j))
    }

    /// `u^ℓ`
    fn span(&self) -> u128 {
        (self.range.base as u128).pow(self.digits as u32)
    }

    fn decomposition(&self, side: &str, offset: Expr) -> Equation {
        let mut factors = vec![Expr::from(self.nym.g).pow_witness(self.name("randomness"))];
        let mut power = Scalar::ONE;
        let base = Scalar::from(self.range.base);
        for j in 0..self.digits {
            factors.push(
                Expr::from(self.nym.h)
                    .pow(power)
                    .pow_witness(self.digit(side, j)),
            );
            power *= base;
        }
        Equation::new(Expr::from(self.commitment).mul(offset), Expr::product(factors))
    }
}

impl StatementBuilder for RangeProofParameters {
    fn label(&self) -> &'static [u8] {
        b"range"
    }

    fn auxiliary_kinds(&self) -> Vec<GroupKind> {
        vec![GroupKind::G1; 2 * self.digits]
    }

    fn build(&self, auxiliary: &[GroupElement]) -> AnonResult<SchnorrStatement> {
        if auxiliary.len() != 2 * self.digits {
            return Err(Error::General("wrong number of digit signatures"));
        }
        let h = Expr::from(self.nym.h);
        let high_offset = scalar_from_u128(self.span()) - scalar_from_i64(self.upper) - Scalar::ONE;
        let mut equations = vec![
            self.decomposition("low", h.clone().pow(scalar_from_i64(self.lower)).inv()),
            self.decomposition("high", h.pow(high_offset)),
        ];
        for (i, v) in auxiliary.iter().enumerate() {
            let (side, j) = if i < self.digits {
                ("low", i)
            } else {
                ("high", i - self.digits)
            };
            equations.push(signature_equation(
                self.range.digits.public_key,
                v.as_g1()?,
                self.digit(side, j),
                self.blinding(side, j),
            ));
        }
        SchnorrStatement::new(&equations)
    }

    fn add_challenge_contribution(&self, transcript: &mut Transcript) {
        transcript.append_message(b"position", self.position.as_bytes());
        transcript.append_message(b"lower", &self.lower.to_be_bytes());
        transcript.append_message(b"upper", &self.upper.to_be_bytes());
        self.range.add_challenge_contribution(transcript);
    }
}

/// Builds range protocols
#[derive(Clone, Debug)]
pub struct RangeFactory {
    parameters: RangeProofParameters,
}

impl RangeFactory {
    /// Create a new factory
    pub fn new(parameters: RangeProofParameters) -> Self {
        Self { parameters }
    }
}

impl PredicateProtocolFactory for RangeFactory {
    fn kind(&self) -> PredicateKind {
        PredicateKind::InRange
    }

    fn prover_protocol(
        &self,
        witness: &PredicateWitness,
        rng: &mut dyn CryptoRngCore,
    ) -> AnonResult<Box<dyn SigmaProver>> {
        let (value, randomness) = match witness {
            PredicateWitness::Integer { value, randomness } => (*value, *randomness),
            PredicateWitness::Scalar(_) => {
                return Err(Error::InvalidArgument(
                    "range proofs need an integer witness".to_string(),
                ))
            }
        };
        let p = &self.parameters;
        if value < p.lower || value > p.upper {
            return Err(Error::ValueOutOfRange {
                value,
                lower: p.lower,
                upper: p.upper,
            });
        }
        let low = (value as i128 - p.lower as i128) as u128;
        let high = (value as i128 - p.upper as i128 - 1 + p.span() as i128) as u128;

        let mut witnesses = BTreeMap::new();
        witnesses.insert(p.name("randomness"), randomness);
        let mut auxiliary = Vec::with_capacity(2 * p.digits);
        for (side, number) in [("low", low), ("high", high)] {
            for (j, d) in p.range.decompose(number, p.digits).into_iter().enumerate() {
                let digit = Scalar::from(d);
                let signature = p
                    .range
                    .digits
                    .signature_for(&digit)
                    .ok_or(Error::General("digit outside the signed set"))?;
                let blinding = Scalar::random(&mut *rng);
                auxiliary.push((signature * blinding).into());
                witnesses.insert(p.digit(side, j), digit);
                witnesses.insert(p.blinding(side, j), blinding);
            }
        }
        Ok(Box::new(LinearProver::new(p, auxiliary, witnesses, rng)?))
    }

    fn verifier_protocol(&self) -> Box<dyn SigmaVerifier> {
        Box::new(LinearVerifier::new(self.parameters.clone()))
    }
}
