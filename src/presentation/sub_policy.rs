use super::{DisclosedValues, DisclosureWitness};
use crate::{
    attribute::{AttributeSpace, AttributeValue},
    credential::{CredentialStatement, SignatureCredential},
    error::Error,
    identity::{Pseudonym, SystemParameters},
    policy::{PolicyFact, SubPolicyPolicyFact, ThresholdPolicy},
    sigma::{
        group::GroupElement, AndProver, Announcement, Auxiliary, LinearVerifier, Response,
        SigmaProver, SigmaVerifier,
    },
    transformer::{LeafResolver, PolicyToProofTransformer, PredicateLeafResolver, SubProofParameters},
    AnonResult,
};
use blsful::inner_types::*;
use log::debug;
use merlin::Transcript;
use rand_core::CryptoRngCore;
use std::collections::BTreeMap;

fn nested_position(position: &str) -> String {
    format!("{}.policy", position)
}

fn sub_policy(fact: &PolicyFact) -> AnonResult<&SubPolicyPolicyFact> {
    match fact {
        PolicyFact::SubPolicy(s) => Ok(s),
        PolicyFact::Predicate(_) => Err(Error::InvalidArgument(
            "predicates must be scoped by a sub-policy".to_string(),
        )),
    }
}

/// Could `credential` satisfy the nested policy of `fact`
fn fits(fact: &SubPolicyPolicyFact, credential: &SignatureCredential) -> bool {
    credential.issuer == fact.space.issuer && credential.attributes.len() == fact.space.len()
}

/// Pick the credential for a sub-policy. The first credential from the
/// issuer that satisfies the nested policy wins. Without one the first
/// credential from the issuer is used so that the leaf that fails reports
/// why.
pub(crate) fn select_credential<'a>(
    fact: &SubPolicyPolicyFact,
    credentials: &'a [SignatureCredential],
) -> AnonResult<&'a SignatureCredential> {
    let mut candidates = credentials.iter().filter(|c| fits(fact, c)).peekable();
    let first = candidates.peek().copied();
    candidates
        .find(|c| satisfies(fact, c))
        .or(first)
        .ok_or_else(|| {
            debug!("no credential from issuer '{}'", fact.space.issuer.id);
            Error::PolicyNotSatisfied
        })
}

fn satisfies(fact: &SubPolicyPolicyFact, credential: &SignatureCredential) -> bool {
    let leaf = |f: &PolicyFact| match f {
        PolicyFact::Predicate(p) => p.is_satisfied(&credential.attributes),
        PolicyFact::SubPolicy(_) => false,
    };
    fact.policy.is_satisfied(&leaf)
}

/// The values `credential` reveals for `fact`
pub(crate) fn disclosed_values(
    fact: &SubPolicyPolicyFact,
    credential: &SignatureCredential,
) -> AnonResult<BTreeMap<String, AttributeValue>> {
    fact.disclosed
        .iter()
        .map(|name| {
            credential
                .value(&fact.space, name)
                .cloned()
                .map(|v| (name.clone(), v))
                .ok_or_else(|| {
                    Error::InvalidArgument(format!("cannot disclose unknown attribute '{}'", name))
                })
        })
        .collect()
}

/// Resolves the sub-policy leaves of a presentation policy
pub(crate) struct PresentationResolver<'a> {
    pub(crate) system: SystemParameters,
    pub(crate) pseudonym: Pseudonym,
    pub(crate) disclosed: &'a DisclosedValues,
    pub(crate) witness: Option<&'a DisclosureWitness>,
}

impl<'a> PresentationResolver<'a> {
    fn statement(
        &self,
        fact: &SubPolicyPolicyFact,
        position: &str,
    ) -> AnonResult<CredentialStatement> {
        let empty = BTreeMap::new();
        let values = self.disclosed.get(position).unwrap_or(&empty);
        if !values.keys().eq(fact.disclosed.iter()) {
            return Err(Error::InvalidArgument(format!(
                "disclosed attributes at {} do not match the policy",
                position
            )));
        }
        let mut slots = BTreeMap::new();
        for (name, value) in values {
            let slot = fact.space.index_of(name).ok_or_else(|| {
                Error::InvalidArgument(format!("cannot disclose unknown attribute '{}'", name))
            })?;
            slots.insert(slot, value.clone());
        }
        CredentialStatement::new(self.system, &fact.space, &slots, self.pseudonym, position)
    }
}

impl<'a> LeafResolver for PresentationResolver<'a> {
    fn verifier(&self, fact: &PolicyFact, position: &str) -> AnonResult<Box<dyn SigmaVerifier>> {
        let fact = sub_policy(fact)?;
        Ok(Box::new(SubPolicyVerifier {
            credential: LinearVerifier::new(self.statement(fact, position)?),
            system: self.system,
            space: fact.space.clone(),
            policy: fact.policy.clone(),
            position: nested_position(position),
        }))
    }

    fn prover(
        &self,
        fact: &PolicyFact,
        position: &str,
        rng: &mut dyn CryptoRngCore,
    ) -> AnonResult<Box<dyn SigmaProver>> {
        let witness = self.witness.ok_or_else(|| {
            Error::InvalidArgument("a prover needs a disclosure witness".to_string())
        })?;
        let fact = sub_policy(fact)?;
        let credential = select_credential(fact, &witness.credentials)?;
        let statement = self.statement(fact, position)?;
        let openings = CredentialStatement::fresh_openings(credential, rng);
        let credential_prover = statement.prover(
            credential,
            &witness.usk,
            &witness.identity,
            &openings,
            rng,
        )?;
        let announcement = credential_prover.announcement();
        let commitments = CredentialStatement::commitments(
            announcement
                .leaf_auxiliary()
                .ok_or(Error::General("credential announcement is not a leaf"))?,
        )?;
        let params = SubProofParameters {
            system: &self.system,
            space: &fact.space,
            commitments: &commitments,
        };
        let resolver =
            PredicateLeafResolver::prover(params, credential.attributes.clone(), openings);
        let nested = PolicyToProofTransformer::policy_prover(
            &fact.policy,
            &resolver,
            &nested_position(position),
            rng,
        )?;
        let credential_prover: Box<dyn SigmaProver> = Box::new(credential_prover);
        Ok(Box::new(AndProver::new(vec![credential_prover, nested])))
    }

    fn is_satisfied(&self, fact: &PolicyFact) -> bool {
        match (fact, self.witness) {
            (PolicyFact::SubPolicy(s), Some(w)) => w
                .credentials
                .iter()
                .any(|c| fits(s, c) && satisfies(s, c)),
            _ => false,
        }
    }
}

/// Verifies a credential together with the nested policy over its
/// attribute commitments. The nested verifier depends on the commitments
/// the prover sends, so it is rebuilt for every announcement.
pub(crate) struct SubPolicyVerifier {
    credential: LinearVerifier<CredentialStatement>,
    system: SystemParameters,
    space: AttributeSpace,
    policy: ThresholdPolicy,
    position: String,
}

impl SubPolicyVerifier {
    fn nested(&self, auxiliary: &[GroupElement]) -> AnonResult<Box<dyn SigmaVerifier>> {
        let commitments = CredentialStatement::commitments(auxiliary)?;
        if commitments.len() != self.space.len() {
            return Err(Error::InvalidArgument(format!(
                "{} commitments for {} slots",
                commitments.len(),
                self.space.len()
            )));
        }
        let params = SubProofParameters {
            system: &self.system,
            space: &self.space,
            commitments: &commitments,
        };
        PolicyToProofTransformer::policy_verifier(
            &self.policy,
            &PredicateLeafResolver::verifier(params),
            &self.position,
        )
    }
}

impl SigmaVerifier for SubPolicyVerifier {
    fn add_challenge_contribution(
        &self,
        announcement: &Announcement,
        transcript: &mut Transcript,
    ) -> AnonResult<()> {
        let (credential, nested) = match announcement {
            Announcement::Composite(c) if c.len() == 2 => (&c[0], &c[1]),
            _ => {
                return Err(Error::InvalidArgument(
                    "sub-policy announcement must hold two parts".to_string(),
                ))
            }
        };
        self.credential
            .add_challenge_contribution(credential, transcript)?;
        let auxiliary = credential
            .leaf_auxiliary()
            .ok_or(Error::General("credential announcement is not a leaf"))?;
        self.nested(auxiliary)?
            .add_challenge_contribution(nested, transcript)
    }

    fn recompute_announcement(
        &self,
        auxiliary: &Auxiliary,
        challenge: Scalar,
        response: &Response,
    ) -> Option<Announcement> {
        let (credential_aux, nested_aux, credential_resp, nested_resp) =
            match (auxiliary, response) {
                (Auxiliary::Composite(a), Response::Composite(r)) if a.len() == 2 && r.len() == 2 => {
                    (&a[0], &a[1], &r[0], &r[1])
                }
                _ => {
                    debug!("sub-policy proof does not hold two parts");
                    return None;
                }
            };
        let credential =
            self.credential
                .recompute_announcement(credential_aux, challenge, credential_resp)?;
        let nested = self.nested(credential.leaf_auxiliary()?).ok()?;
        let nested = nested.recompute_announcement(nested_aux, challenge, nested_resp)?;
        Some(Announcement::Composite(vec![credential, nested]))
    }

    fn simulate(
        &self,
        challenge: Scalar,
        rng: &mut dyn CryptoRngCore,
    ) -> AnonResult<(Announcement, Response)> {
        let (credential, credential_resp) = self.credential.simulate(challenge, rng)?;
        let auxiliary = credential
            .leaf_auxiliary()
            .ok_or(Error::General("credential announcement is not a leaf"))?;
        let (nested, nested_resp) = self.nested(auxiliary)?.simulate(challenge, rng)?;
        Ok((
            Announcement::Composite(vec![credential, nested]),
            Response::Composite(vec![credential_resp, nested_resp]),
        ))
    }
}
