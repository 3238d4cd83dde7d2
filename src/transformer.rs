use crate::{
    attribute::{AttributeSpace, AttributeValue},
    error::Error,
    identity::SystemParameters,
    knox::pedersen::PedersenOpening,
    policy::{PolicyFact, PolicyNode, ThresholdPolicy},
    predicate::*,
    sigma::{
        AndProver, AndVerifier, SigmaProver, SigmaVerifier, ThresholdChild, ThresholdProver,
        ThresholdVerifier,
    },
    AnonResult,
};
use blsful::inner_types::*;
use log::debug;
use rand_core::CryptoRngCore;

/// The public values a predicate proof inside a sub-policy needs
#[derive(Copy, Clone, Debug)]
pub struct SubProofParameters<'a> {
    /// System parameters, the commitment bases
    pub system: &'a SystemParameters,
    /// The attribute space of the credential
    pub space: &'a AttributeSpace,
    /// One commitment per attribute slot
    pub commitments: &'a [G1Projective],
}

impl<'a> SubProofParameters<'a> {
    fn commitment(&self, slot: usize) -> AnonResult<G1Projective> {
        self.commitments.get(slot).copied().ok_or_else(|| {
            Error::InvalidArgument(format!("no commitment for attribute slot {}", slot))
        })
    }
}

/// The secret input of a policy leaf
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum LeafWitness {
    /// The verifier has no witness
    Empty,
    /// The prover's dense attribute values and their commitment openings
    Attributes {
        /// One value per slot
        values: Vec<AttributeValue>,
        /// One opening per slot
        openings: Vec<PedersenOpening>,
    },
}

/// Either side of a predicate protocol
pub enum TransformedProtocol {
    /// Built from a witness
    Prover(Box<dyn SigmaProver>),
    /// Built without one
    Verifier(Box<dyn SigmaVerifier>),
}

/// Decides how a policy leaf becomes a Sigma protocol
pub trait LeafResolver {
    /// The verifier for `fact`
    fn verifier(&self, fact: &PolicyFact, position: &str) -> AnonResult<Box<dyn SigmaVerifier>>;

    /// The prover for `fact`
    fn prover(
        &self,
        fact: &PolicyFact,
        position: &str,
        rng: &mut dyn CryptoRngCore,
    ) -> AnonResult<Box<dyn SigmaProver>>;

    /// Can the prover prove `fact`
    fn is_satisfied(&self, fact: &PolicyFact) -> bool;
}

/// Turns policies into composite Sigma protocols
pub struct PolicyToProofTransformer;

impl PolicyToProofTransformer {
    /// Build the protocol for one predicate leaf.
    ///
    /// The empty witness gives the verifier, an attribute witness the prover.
    pub fn transform(
        fact: &PolicyFact,
        witness: &LeafWitness,
        params: &SubProofParameters,
        position: &str,
        rng: &mut dyn CryptoRngCore,
    ) -> AnonResult<TransformedProtocol> {
        let fact = Self::predicate_fact(fact)?;
        let factory = Self::factory(fact, params, position)?;
        match witness {
            LeafWitness::Empty => Ok(TransformedProtocol::Verifier(factory.verifier_protocol())),
            LeafWitness::Attributes { values, openings } => {
                let witness = Self::predicate_witness(fact, values, openings)?;
                debug!("proving {} at {}", fact.kind(), position);
                Ok(TransformedProtocol::Prover(
                    factory.prover_protocol(&witness, rng)?,
                ))
            }
        }
    }

    /// The witness free protocol used to simulate an unsatisfied leaf
    pub fn recreate(
        fact: &PolicyFact,
        params: &SubProofParameters,
        position: &str,
    ) -> AnonResult<Box<dyn SigmaVerifier>> {
        let fact = Self::predicate_fact(fact)?;
        Ok(Self::factory(fact, params, position)?.verifier_protocol())
    }

    /// The verifier of a whole policy tree. Full gates become conjunctions,
    /// other gates threshold compositions.
    pub fn policy_verifier(
        policy: &ThresholdPolicy,
        resolver: &dyn LeafResolver,
        position: &str,
    ) -> AnonResult<Box<dyn SigmaVerifier>> {
        let mut children = Vec::with_capacity(policy.children.len());
        for (i, child) in policy.children.iter().enumerate() {
            let position = child_position(position, i);
            children.push(match child {
                PolicyNode::Gate(g) => Self::policy_verifier(g, resolver, &position)?,
                PolicyNode::Fact(f) => resolver.verifier(f, &position)?,
            });
        }
        if policy.is_full() {
            Ok(Box::new(AndVerifier::new(children)))
        } else {
            Ok(Box::new(ThresholdVerifier::new(policy.threshold, children)?))
        }
    }

    /// The prover of a whole policy tree.
    ///
    /// Full gates prove every child so leaf errors surface. Other gates prove
    /// the first `threshold` satisfied children and simulate the rest.
    pub fn policy_prover(
        policy: &ThresholdPolicy,
        resolver: &dyn LeafResolver,
        position: &str,
        rng: &mut dyn CryptoRngCore,
    ) -> AnonResult<Box<dyn SigmaProver>> {
        if policy.is_full() {
            let mut children = Vec::with_capacity(policy.children.len());
            for (i, child) in policy.children.iter().enumerate() {
                children.push(Self::node_prover(child, resolver, &child_position(position, i), rng)?);
            }
            return Ok(Box::new(AndProver::new(children)));
        }

        let leaf = |f: &PolicyFact| resolver.is_satisfied(f);
        let mut remaining = policy.threshold;
        let mut children = Vec::with_capacity(policy.children.len());
        for (i, child) in policy.children.iter().enumerate() {
            let position = child_position(position, i);
            let satisfied = remaining > 0
                && match child {
                    PolicyNode::Gate(g) => g.is_satisfied(&leaf),
                    PolicyNode::Fact(f) => resolver.is_satisfied(f),
                };
            if satisfied {
                remaining -= 1;
                children.push(ThresholdChild::Real(Self::node_prover(
                    child, resolver, &position, rng,
                )?));
            } else {
                let verifier = match child {
                    PolicyNode::Gate(g) => Self::policy_verifier(g, resolver, &position)?,
                    PolicyNode::Fact(f) => resolver.verifier(f, &position)?,
                };
                children.push(ThresholdChild::Simulated(verifier));
            }
        }
        if remaining > 0 {
            debug!(
                "only {} of {} required branches hold at {}",
                policy.threshold - remaining,
                policy.threshold,
                position
            );
            return Err(Error::PolicyNotSatisfied);
        }
        Ok(Box::new(ThresholdProver::new(policy.threshold, children, rng)?))
    }

    fn node_prover(
        node: &PolicyNode,
        resolver: &dyn LeafResolver,
        position: &str,
        rng: &mut dyn CryptoRngCore,
    ) -> AnonResult<Box<dyn SigmaProver>> {
        match node {
            PolicyNode::Gate(g) => Self::policy_prover(g, resolver, position, rng),
            PolicyNode::Fact(f) => resolver.prover(f, position, rng),
        }
    }

    fn predicate_fact(fact: &PolicyFact) -> AnonResult<&PredicatePolicyFact> {
        match fact {
            PolicyFact::Predicate(p) => Ok(p),
            PolicyFact::SubPolicy(_) => Err(Error::InvalidArgument(
                "a sub-policy cannot be nested inside another".to_string(),
            )),
        }
    }

    fn factory(
        fact: &PredicatePolicyFact,
        params: &SubProofParameters,
        position: &str,
    ) -> AnonResult<Box<dyn PredicateProtocolFactory>> {
        let nym = params.system.nym;
        let commitment = params.commitment(fact.attribute)?;
        let kind = fact.kind();
        Ok(match &fact.predicate {
            Predicate::EqualConst(v) => Box::new(EqualityFactory::new(
                kind,
                EqualityParameters::new(
                    nym,
                    commitment,
                    EqualityTarget::Value(v.to_scalar()),
                    position,
                ),
            )?),
            Predicate::UnequalConst(v) => Box::new(InequalityFactory::new(
                kind,
                InequalityParameters::public_value(nym, commitment, v.to_scalar(), position),
            )?),
            Predicate::EqualDlog { base, target } => Box::new(EqualityFactory::new(
                kind,
                EqualityParameters::new(
                    nym,
                    commitment,
                    EqualityTarget::Dlog {
                        base: *base,
                        target: *target,
                    },
                    position,
                ),
            )?),
            Predicate::UnequalDlog { base, target } => Box::new(InequalityFactory::new(
                kind,
                InequalityParameters::discrete_log(nym, commitment, *base, *target, position),
            )?),
            Predicate::EqualAttr(other) => {
                let difference = commitment - params.commitment(*other)?;
                Box::new(EqualityFactory::new(
                    kind,
                    EqualityParameters::new(
                        nym,
                        difference,
                        EqualityTarget::Value(Scalar::ZERO),
                        position,
                    ),
                )?)
            }
            Predicate::UnequalAttr(other) => {
                let difference = commitment - params.commitment(*other)?;
                Box::new(InequalityFactory::new(
                    kind,
                    InequalityParameters::public_value(nym, difference, Scalar::ZERO, position),
                )?)
            }
            Predicate::InSet { parameters, .. } => Box::new(SetMembershipFactory::new(
                SetMembershipProofParameters::new(nym, commitment, parameters.clone(), position),
            )),
            Predicate::InRange {
                lower,
                upper,
                parameters,
            } => Box::new(RangeFactory::new(RangeProofParameters::new(
                nym,
                commitment,
                *lower,
                *upper,
                parameters.clone(),
                position,
            )?)),
        })
    }

    fn predicate_witness(
        fact: &PredicatePolicyFact,
        values: &[AttributeValue],
        openings: &[PedersenOpening],
    ) -> AnonResult<PredicateWitness> {
        let slot = |i: usize| -> AnonResult<(&AttributeValue, &PedersenOpening)> {
            values.get(i).zip(openings.get(i)).ok_or_else(|| {
                Error::InvalidArgument(format!("no witness for attribute slot {}", i))
            })
        };
        let (value, opening) = slot(fact.attribute)?;
        match &fact.predicate {
            Predicate::EqualAttr(other) | Predicate::UnequalAttr(other) => {
                let (_, other) = slot(*other)?;
                Ok(PredicateWitness::Scalar(PedersenOpening {
                    message: opening.message - other.message,
                    randomness: opening.randomness - other.randomness,
                }))
            }
            Predicate::InRange { .. } => match value.as_integer() {
                Some(v) => Ok(PredicateWitness::Integer {
                    value: v,
                    randomness: opening.randomness,
                }),
                None => Err(Error::InvalidArgument(format!(
                    "range predicate on a non integer value {}",
                    value
                ))),
            },
            _ => Ok(PredicateWitness::Scalar(opening.clone())),
        }
    }
}

pub(crate) fn child_position(position: &str, index: usize) -> String {
    format!("{}.{}", position, index)
}

/// Resolves the predicate leaves of a sub-policy against one credential's
/// attribute commitments
pub struct PredicateLeafResolver<'a> {
    params: SubProofParameters<'a>,
    witness: LeafWitness,
}

impl<'a> PredicateLeafResolver<'a> {
    /// A resolver for the verifier
    pub fn verifier(params: SubProofParameters<'a>) -> Self {
        Self {
            params,
            witness: LeafWitness::Empty,
        }
    }

    /// A resolver for the prover
    pub fn prover(
        params: SubProofParameters<'a>,
        values: Vec<AttributeValue>,
        openings: Vec<PedersenOpening>,
    ) -> Self {
        Self {
            params,
            witness: LeafWitness::Attributes { values, openings },
        }
    }
}

impl<'a> LeafResolver for PredicateLeafResolver<'a> {
    fn verifier(&self, fact: &PolicyFact, position: &str) -> AnonResult<Box<dyn SigmaVerifier>> {
        PolicyToProofTransformer::recreate(fact, &self.params, position)
    }

    fn prover(
        &self,
        fact: &PolicyFact,
        position: &str,
        rng: &mut dyn CryptoRngCore,
    ) -> AnonResult<Box<dyn SigmaProver>> {
        match PolicyToProofTransformer::transform(fact, &self.witness, &self.params, position, rng)? {
            TransformedProtocol::Prover(p) => Ok(p),
            TransformedProtocol::Verifier(_) => Err(Error::InvalidArgument(
                "a prover needs an attribute witness".to_string(),
            )),
        }
    }

    fn is_satisfied(&self, fact: &PolicyFact) -> bool {
        match (fact, &self.witness) {
            (PolicyFact::Predicate(p), LeafWitness::Attributes { values, .. }) => {
                p.is_satisfied(values)
            }
            _ => false,
        }
    }
}
