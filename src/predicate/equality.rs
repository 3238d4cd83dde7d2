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

/// What the committed value is compared against
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum EqualityTarget {
    /// A public field element
    Value(Scalar),
    /// `target = base^m`
    Dlog {
        /// The base
        base: G1Projective,
        /// The public result
        target: G1Projective,
    },
}

/// Public parameters of an equality proof
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EqualityParameters {
    nym: PedersenParameters,
    commitment: G1Projective,
    target: EqualityTarget,
    position: String,
}

impl EqualityParameters {
    /// Prove that `commitment` opens to a value matching `target`
    pub fn new(
        nym: PedersenParameters,
        commitment: G1Projective,
        target: EqualityTarget,
        position: impl Into<String>,
    ) -> Self {
        Self {
            nym,
            commitment,
            target,
            position: position.into(),
        }
    }

    fn randomness(&self) -> String {
        scoped_name(&self.position, "randomness")
    }

    fn value(&self) -> String {
        scoped_name(&self.position, "value")
    }

    fn satisfied_by(&self, m: Scalar) -> bool {
        match self.target {
            EqualityTarget::Value(v) => m == v,
            EqualityTarget::Dlog { base, target } => base * m == target,
        }
    }
}

impl StatementBuilder for EqualityParameters {
    fn label(&self) -> &'static [u8] {
        b"equality"
    }

    fn auxiliary_kinds(&self) -> Vec<GroupKind> {
        Vec::new()
    }

    fn build(&self, _auxiliary: &[GroupElement]) -> AnonResult<SchnorrStatement> {
        match self.target {
            // C * h^-v = g^r
            EqualityTarget::Value(v) => SchnorrStatement::new(&[Equation::new(
                Expr::from(self.commitment).mul(Expr::from(self.nym.h).pow(v).inv()),
                Expr::from(self.nym.g).pow_witness(self.randomness()),
            )]),
            EqualityTarget::Dlog { base, target } => SchnorrStatement::new(&[
                Equation::new(
                    Expr::from(self.commitment),
                    Expr::product([
                        Expr::from(self.nym.g).pow_witness(self.randomness()),
                        Expr::from(self.nym.h).pow_witness(self.value()),
                    ]),
                ),
                Equation::new(Expr::from(target), Expr::from(base).pow_witness(self.value())),
            ]),
        }
    }

    fn add_challenge_contribution(&self, transcript: &mut Transcript) {
        transcript.append_message(b"position", self.position.as_bytes());
    }
}

/// Builds equality protocols for public values, discrete logarithms and
/// attribute differences
#[derive(Clone, Debug)]
pub struct EqualityFactory {
    kind: PredicateKind,
    parameters: EqualityParameters,
}

impl EqualityFactory {
    /// `kind` must be one of the equality kinds
    pub fn new(kind: PredicateKind, parameters: EqualityParameters) -> AnonResult<Self> {
        match kind {
            PredicateKind::EqualConst | PredicateKind::EqualDlog | PredicateKind::EqualAttr => {
                Ok(Self { kind, parameters })
            }
            _ => Err(Error::InvalidArgument(format!(
                "{} is not an equality predicate",
                kind
            ))),
        }
    }
}

impl PredicateProtocolFactory for EqualityFactory {
    fn kind(&self) -> PredicateKind {
        self.kind
    }

    fn prover_protocol(
        &self,
        witness: &PredicateWitness,
        rng: &mut dyn CryptoRngCore,
    ) -> AnonResult<Box<dyn SigmaProver>> {
        let opening = witness.opening();
        if !self.parameters.satisfied_by(opening.message) {
            return Err(Error::PredicateNotSatisfied(self.kind.to_string()));
        }
        let witnesses = btreemap! {
            self.parameters.randomness() => opening.randomness,
            self.parameters.value() => opening.message,
        };
        Ok(Box::new(LinearProver::new(
            &self.parameters,
            Vec::new(),
            witnesses,
            rng,
        )?))
    }

    fn verifier_protocol(&self) -> Box<dyn SigmaVerifier> {
        Box::new(LinearVerifier::new(self.parameters.clone()))
    }
}
