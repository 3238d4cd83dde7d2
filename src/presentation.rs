//! Proofs that a holder's credentials satisfy a presentation policy.
//!
//! Every sub-policy leaf is proven by a credential relation and the nested
//! predicate policy over its attribute commitments. All credentials are
//! bound to one pseudonym, so they hide the same secret.

mod sub_policy;

use sub_policy::{disclosed_values, select_credential, PresentationResolver};

use crate::{
    attribute::AttributeValue,
    credential::SignatureCredential,
    error::Error,
    identity::{HiddenSecret, Identity, Pseudonym, SystemParameters},
    policy::{PolicyFact, PolicyNode, ThresholdPolicy},
    sigma::{Announcement, FiatShamirProof, Response, SigmaProver, SigmaVerifier},
    transformer::{child_position, PolicyToProofTransformer},
    AnonResult,
};
use blsful::inner_types::*;
use log::debug;
use rand_core::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

const DISCLOSURE_DOMAIN: &[u8] = b"disclosure proof";
const ROOT: &str = "policy";

/// Disclosed attribute values keyed by the position of their sub-policy
pub type DisclosedValues = BTreeMap<String, BTreeMap<String, AttributeValue>>;

/// Everything a holder needs to prove a policy
#[derive(Clone, Debug)]
pub struct DisclosureWitness {
    /// The pseudonym and its opening
    pub identity: Identity,
    /// The hidden secret
    pub usk: HiddenSecret,
    /// The credentials to pick from
    pub credentials: Vec<SignatureCredential>,
}

/// A non-interactive disclosure proof
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub struct DisclosureProof {
    /// The pseudonym all credentials are bound to
    pub pseudonym: Pseudonym,
    /// The revealed values
    pub disclosed: DisclosedValues,
    /// The proof
    pub proof: FiatShamirProof,
}

/// The disclosed attribute names by sub-policy position
fn disclosure_layout(
    policy: &ThresholdPolicy,
    position: &str,
    out: &mut BTreeMap<String, BTreeSet<String>>,
) {
    for (i, child) in policy.children.iter().enumerate() {
        let position = child_position(position, i);
        match child {
            PolicyNode::Gate(g) => disclosure_layout(g, &position, out),
            PolicyNode::Fact(PolicyFact::SubPolicy(s)) if !s.disclosed.is_empty() => {
                out.insert(position, s.disclosed.clone());
            }
            PolicyNode::Fact(_) => {}
        }
    }
}

fn collect_disclosures(
    policy: &ThresholdPolicy,
    position: &str,
    credentials: &[SignatureCredential],
    out: &mut DisclosedValues,
) -> AnonResult<()> {
    for (i, child) in policy.children.iter().enumerate() {
        let position = child_position(position, i);
        match child {
            PolicyNode::Gate(g) => collect_disclosures(g, &position, credentials, out)?,
            PolicyNode::Fact(PolicyFact::SubPolicy(s)) if !s.disclosed.is_empty() => {
                let credential = select_credential(s, credentials)?;
                out.insert(position, disclosed_values(s, credential)?);
            }
            PolicyNode::Fact(_) => {}
        }
    }
    Ok(())
}

/// The prover side of an interactive disclosure
pub struct DisclosureProver {
    prover: Box<dyn SigmaProver>,
    pseudonym: Pseudonym,
    disclosed: DisclosedValues,
}

impl DisclosureProver {
    /// Select credentials for `policy` and commit to everything.
    ///
    /// Fails when the policy cannot be satisfied, including a value outside
    /// of a range in a branch that has to hold.
    pub fn new(
        system: SystemParameters,
        policy: &ThresholdPolicy,
        witness: &DisclosureWitness,
        mut rng: impl RngCore + CryptoRng,
    ) -> AnonResult<Self> {
        policy.validate()?;
        if !witness.identity.verify(&system, &witness.usk) {
            return Err(Error::InvalidArgument(
                "identity does not open to the hidden secret".to_string(),
            ));
        }
        let mut disclosed = DisclosedValues::new();
        collect_disclosures(policy, ROOT, &witness.credentials, &mut disclosed)?;
        let resolver = PresentationResolver {
            system,
            pseudonym: witness.identity.pseudonym,
            disclosed: &disclosed,
            witness: Some(witness),
        };
        let prover = PolicyToProofTransformer::policy_prover(policy, &resolver, ROOT, &mut rng)?;
        Ok(Self {
            prover,
            pseudonym: witness.identity.pseudonym,
            disclosed,
        })
    }

    /// The pseudonym the proof is bound to
    pub fn pseudonym(&self) -> Pseudonym {
        self.pseudonym
    }

    /// The revealed values
    pub fn disclosed(&self) -> &DisclosedValues {
        &self.disclosed
    }

    /// The first message
    pub fn announcement(&self) -> Announcement {
        self.prover.announcement()
    }

    /// The answer to `challenge`
    pub fn respond(&self, challenge: Scalar) -> AnonResult<Response> {
        self.prover.respond(challenge)
    }
}

/// The verifier side of an interactive disclosure
pub struct DisclosureVerifier {
    verifier: Box<dyn SigmaVerifier>,
}

impl DisclosureVerifier {
    /// A verifier for `policy` with the prover's pseudonym and revealed values.
    ///
    /// Revealed values that do not match what the policy discloses are an
    /// error.
    pub fn new(
        system: SystemParameters,
        policy: &ThresholdPolicy,
        pseudonym: Pseudonym,
        disclosed: &DisclosedValues,
    ) -> AnonResult<Self> {
        policy.validate()?;
        let mut layout = BTreeMap::new();
        disclosure_layout(policy, ROOT, &mut layout);
        let matches = layout.len() == disclosed.len()
            && layout
                .iter()
                .zip(disclosed)
                .all(|((p, names), (q, values))| p == q && names.iter().eq(values.keys()));
        if !matches {
            return Err(Error::InvalidArgument(
                "revealed values do not match the policy".to_string(),
            ));
        }
        if bool::from(pseudonym.0.is_identity()) {
            return Err(Error::InvalidArgument(
                "pseudonym is the identity element".to_string(),
            ));
        }
        let resolver = PresentationResolver {
            system,
            pseudonym,
            disclosed,
            witness: None,
        };
        Ok(Self {
            verifier: PolicyToProofTransformer::policy_verifier(policy, &resolver, ROOT)?,
        })
    }

    /// Check a transcript
    pub fn verify(&self, announcement: &Announcement, challenge: Scalar, response: &Response) -> bool {
        self.verifier.verify(announcement, challenge, response)
    }
}

/// Prove `policy` non-interactively, bound to `context`
pub fn build_disclosure_proof(
    system: SystemParameters,
    policy: &ThresholdPolicy,
    witness: &DisclosureWitness,
    context: &[u8],
    mut rng: impl RngCore + CryptoRng,
) -> AnonResult<DisclosureProof> {
    let prover = DisclosureProver::new(system, policy, witness, &mut rng)?;
    let verifier = DisclosureVerifier::new(system, policy, prover.pseudonym, &prover.disclosed)?;
    let proof = FiatShamirProof::prove(
        DISCLOSURE_DOMAIN,
        &verifier.verifier,
        &prover.prover,
        context,
    )?;
    debug!(
        "built a disclosure proof revealing {} sub-policies",
        prover.disclosed.len()
    );
    Ok(DisclosureProof {
        pseudonym: prover.pseudonym,
        disclosed: prover.disclosed,
        proof,
    })
}

/// Check a disclosure proof against `policy` and `context`.
///
/// An invalid policy is an error, every problem with the proof gives `false`.
pub fn verify_disclosure_proof(
    system: SystemParameters,
    policy: &ThresholdPolicy,
    proof: &DisclosureProof,
    context: &[u8],
) -> AnonResult<bool> {
    policy.validate()?;
    let verifier = match DisclosureVerifier::new(system, policy, proof.pseudonym, &proof.disclosed)
    {
        Ok(v) => v,
        Err(e) => {
            debug!("rejecting disclosure proof: {}", e);
            return Ok(false);
        }
    };
    Ok(proof
        .proof
        .verify(DISCLOSURE_DOMAIN, &verifier.verifier, context))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        attribute::{
            AttributeDefinition, AttributeKind, AttributeSpace, Attributes,
        },
        issuance::issue,
        issuer::Issuer,
        policy::SubPolicyPolicyFact,
        predicate::{Predicate, PredicatePolicyFact},
    };
    use indexmap::IndexMap;

    struct World {
        system: SystemParameters,
        space: AttributeSpace,
        witness: DisclosureWitness,
    }

    fn world(age: i64) -> World {
        let mut rng = rand::thread_rng();
        let system = SystemParameters::new(b"presentation test");
        let (public, issuer) = Issuer::new(2, &mut rng).unwrap();
        let mut definitions = IndexMap::new();
        definitions.insert(
            "age".to_string(),
            AttributeDefinition::new(AttributeKind::Integer { min: None, max: None }, "age"),
        );
        definitions.insert(
            "gender".to_string(),
            AttributeDefinition::new(AttributeKind::String { max_length: None }, "gender"),
        );
        let space = AttributeSpace::new(definitions, public).unwrap();
        let usk = HiddenSecret::from(Scalar::from(7u64));
        let identity = Identity::new(&system, &usk, &mut rng);
        let attributes: Attributes = [
            ("age", AttributeValue::from(age)),
            ("gender", AttributeValue::from("M")),
        ]
        .into_iter()
        .collect();
        let credential = issue(
            system, &issuer, &space, &usk, &identity, attributes, &mut rng,
        )
        .unwrap();
        World {
            system,
            space,
            witness: DisclosureWitness {
                identity,
                usk,
                credentials: vec![credential],
            },
        }
    }

    fn adult(space: &AttributeSpace) -> SubPolicyPolicyFact {
        SubPolicyPolicyFact::new(
            space.clone(),
            ThresholdPolicy::all(vec![
                PredicatePolicyFact::new(
                    0,
                    Predicate::in_range(18, 130, 16, rand::thread_rng()).unwrap(),
                )
                .into(),
                PredicatePolicyFact::new(1, Predicate::UnequalConst(AttributeValue::from("F")))
                    .into(),
            ]),
        )
    }

    #[test]
    fn interactive_disclosure() {
        let mut rng = rand::thread_rng();
        let w = world(25);
        let policy = ThresholdPolicy::all(vec![adult(&w.space).disclose("gender").into()]);
        let prover = DisclosureProver::new(w.system, &policy, &w.witness, &mut rng).unwrap();
        assert_eq!(
            prover.disclosed()["policy.0"]["gender"],
            AttributeValue::from("M")
        );
        let verifier =
            DisclosureVerifier::new(w.system, &policy, prover.pseudonym(), prover.disclosed())
                .unwrap();
        let challenge = Scalar::random(&mut rng);
        let announcement = prover.announcement();
        let response = prover.respond(challenge).unwrap();
        assert!(verifier.verify(&announcement, challenge, &response));
        assert!(!verifier.verify(&announcement, challenge + Scalar::ONE, &response));

        let mut lied = prover.disclosed().clone();
        lied.get_mut("policy.0")
            .unwrap()
            .insert("gender".to_string(), AttributeValue::from("X"));
        let fooled = DisclosureVerifier::new(w.system, &policy, prover.pseudonym(), &lied).unwrap();
        assert!(!fooled.verify(&announcement, challenge, &response));
    }

    #[test]
    fn non_interactive_disclosure() {
        let mut rng = rand::thread_rng();
        let w = world(25);
        let policy = ThresholdPolicy::all(vec![adult(&w.space).into()]);
        let proof =
            build_disclosure_proof(w.system, &policy, &w.witness, b"verifier", &mut rng).unwrap();
        assert_eq!(
            verify_disclosure_proof(w.system, &policy, &proof, b"verifier"),
            Ok(true)
        );
        assert_eq!(
            verify_disclosure_proof(w.system, &policy, &proof, b"another verifier"),
            Ok(false)
        );
        let mut extra = proof.clone();
        extra.disclosed.insert("policy.0".to_string(), BTreeMap::new());
        assert_eq!(
            verify_disclosure_proof(w.system, &policy, &extra, b"verifier"),
            Ok(false)
        );
    }

    #[test]
    fn or_hides_the_unsatisfied_branch() {
        let mut rng = rand::thread_rng();
        let w = world(25);
        let (other, _) = Issuer::new(1, &mut rng).unwrap();
        let mut definitions = IndexMap::new();
        definitions.insert(
            "member".to_string(),
            AttributeDefinition::new(AttributeKind::Boolean, "club member"),
        );
        let club = AttributeSpace::new(definitions, other).unwrap();
        let member = SubPolicyPolicyFact::new(
            club,
            ThresholdPolicy::all(vec![PredicatePolicyFact::new(
                0,
                Predicate::EqualConst(AttributeValue::from(true)),
            )
            .into()]),
        );
        let policy = ThresholdPolicy::any(vec![member.into(), adult(&w.space).into()]);
        let proof = build_disclosure_proof(w.system, &policy, &w.witness, b"", &mut rng).unwrap();
        assert_eq!(
            verify_disclosure_proof(w.system, &policy, &proof, b""),
            Ok(true)
        );
    }

    #[test]
    fn under_age_fails_construction() {
        let mut rng = rand::thread_rng();
        let w = world(10);
        let policy = ThresholdPolicy::all(vec![adult(&w.space).into()]);
        let res = build_disclosure_proof(w.system, &policy, &w.witness, b"", &mut rng);
        assert_eq!(
            res.err(),
            Some(Error::ValueOutOfRange {
                value: 10,
                lower: 18,
                upper: 130
            })
        );
    }
}
