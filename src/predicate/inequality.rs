//! Inequality of a committed value following Camenisch and Shoup.
//!
//! To show `B^m != Y` the prover draws a helper `a != 0` and publishes
//! `Z = (B^m * Y^-1)^a`. With `β = m * a` and `γ = r * a` it proves
//!
//! ```text
//! C   = g^r * h^m
//! Z   = B^β * (Y^-1)^a
//! C^a = g^γ * h^β
//! ```
//!
//! and the verifier checks `Z != 1`. For a public value `v` the bases are
//! `B = h` and `Y = h^v`.

use super::{PredicateKind, PredicateProtocolFactory, PredicateWitness};
use crate::{
    error::Error,
    knox::pedersen::PedersenParameters,
    sigma::{
        group::{GroupElement, GroupKind},
        relation::{Equation, Expr},
        LinearProver, LinearVerifier, SchnorrStatement, SigmaProver, SigmaVerifier,
        StatementBuilder,
    },
    utils::scoped_name,
    AnonResult,
};
use blsful::inner_types::*;
use maplit::btreemap;
use merlin::Transcript;
use rand_core::CryptoRngCore;

/// Public parameters of an inequality proof
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct InequalityParameters {
    nym: PedersenParameters,
    commitment: G1Projective,
    base: G1Projective,
    target: G1Projective,
    position: String,
}

impl InequalityParameters {
    /// Prove that `commitment` opens to a value different from `value`
    pub fn public_value(
        nym: PedersenParameters,
        commitment: G1Projective,
        value: Scalar,
        position: impl Into<String>,
    ) -> Self {
        Self {
            nym,
            commitment,
            base: nym.h,
            target: nym.h * value,
            position: position.into(),
        }
    }

    /// Prove that `commitment` opens to `m` with `base^m != target`
    pub fn discrete_log(
        nym: PedersenParameters,
        commitment: G1Projective,
        base: G1Projective,
        target: G1Projective,
        position: impl Into<String>,
    ) -> Self {
        Self {
            nym,
            commitment,
            base,
            target,
            position: position.into(),
        }
    }

    fn name(&self, name: &str) -> String {
        scoped_name(&self.position, name)
    }
}

impl StatementBuilder for InequalityParameters {
    fn label(&self) -> &'static [u8] {
        b"inequality"
    }

    fn auxiliary_kinds(&self) -> Vec<GroupKind> {
        vec![GroupKind::G1]
    }

    fn build(&self, auxiliary: &[GroupElement]) -> AnonResult<SchnorrStatement> {
        let z = auxiliary
            .first()
            .ok_or(Error::General("missing inequality helper"))?
            .as_g1()?;
        let (g, h) = (self.nym.g, self.nym.h);
        SchnorrStatement::new(&[
            Equation::new(
                Expr::from(self.commitment),
                Expr::product([
                    Expr::from(g).pow_witness(self.name("randomness")),
                    Expr::from(h).pow_witness(self.name("value")),
                ]),
            ),
            Equation::new(
                Expr::from(z),
                Expr::product([
                    Expr::from(self.base).pow_witness(self.name("helperValue")),
                    Expr::from(self.target).inv().pow_witness(self.name("helper")),
                ]),
            ),
            Equation::new(
                Expr::from(self.commitment).pow_witness(self.name("helper")),
                Expr::product([
                    Expr::from(g).pow_witness(self.name("helperRandomness")),
                    Expr::from(h).pow_witness(self.name("helperValue")),
                ]),
            ),
        ])
    }

    fn add_challenge_contribution(&self, transcript: &mut Transcript) {
        transcript.append_message(b"position", self.position.as_bytes());
    }

    // Z = 1 would make the statement hold for equal values
    fn check_auxiliary(&self, auxiliary: &[GroupElement]) -> bool {
        auxiliary.iter().all(|a| !a.is_identity())
    }
}

/// Builds inequality protocols
#[derive(Clone, Debug)]
pub struct InequalityFactory {
    kind: PredicateKind,
    parameters: InequalityParameters,
}

impl InequalityFactory {
    /// `kind` must be one of the inequality kinds
    pub fn new(kind: PredicateKind, parameters: InequalityParameters) -> AnonResult<Self> {
        match kind {
            PredicateKind::UnequalConst
            | PredicateKind::UnequalDlog
            | PredicateKind::UnequalAttr => Ok(Self { kind, parameters }),
            _ => Err(Error::InvalidArgument(format!(
                "{} is not an inequality predicate",
                kind
            ))),
        }
    }
}

impl PredicateProtocolFactory for InequalityFactory {
    fn kind(&self) -> PredicateKind {
        self.kind
    }

    fn prover_protocol(
        &self,
        witness: &PredicateWitness,
        rng: &mut dyn CryptoRngCore,
    ) -> AnonResult<Box<dyn SigmaProver>> {
        let opening = witness.opening();
        let p = &self.parameters;
        let difference = p.base * opening.message - p.target;
        if bool::from(difference.is_identity()) {
            return Err(Error::PredicateNotSatisfied(self.kind.to_string()));
        }
        let mut helper = Scalar::random(&mut *rng);
        while bool::from(helper.is_zero()) {
            helper = Scalar::random(&mut *rng);
        }
        let z = difference * helper;
        let witnesses = btreemap! {
            p.name("randomness") => opening.randomness,
            p.name("value") => opening.message,
            p.name("helper") => helper,
            p.name("helperValue") => opening.message * helper,
            p.name("helperRandomness") => opening.randomness * helper,
        };
        Ok(Box::new(LinearProver::new(p, vec![z.into()], witnesses, rng)?))
    }

    fn verifier_protocol(&self) -> Box<dyn SigmaVerifier> {
        Box::new(LinearVerifier::new(self.parameters.clone()))
    }
}
