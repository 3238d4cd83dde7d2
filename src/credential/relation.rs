//! The Schnorr relations over Pointcheval Sanders credentials.
//!
//! For a randomized signature `(σ1', σ2')` the holder proves
//!
//! ```text
//! e(σ1', g~)^r * e(σ1', Y~0)^usk * Π_hidden e(σ1', Y~i)^a_i
//!     = e(σ2', g~) * e(σ1', X~ * Π_disclosed Y~i^a_i)^-1
//! nym = g^r_nym * h^usk
//! C_i = g^r_i * h^a_i              (hidden slots)
//! C_i * (h^a_i)^-1 = g^r_i         (disclosed slots)
//! ```
//!
//! The commitments `C_i` are sent as auxiliary elements so predicate proofs
//! can refer to the attributes of the credential.

use super::SignatureCredential;
use crate::{
    attribute::{AttributeSpace, AttributeValue},
    error::Error,
    identity::{HiddenSecret, Identity, Pseudonym, SystemParameters},
    issuer::IssuerPublic,
    knox::pedersen::PedersenOpening,
    sigma::{
        group::{GroupElement, GroupKind},
        relation::{Equation, Expr},
        LinearProver, SchnorrStatement, StatementBuilder,
    },
    utils::scoped_name,
    AnonResult,
};
use blsful::inner_types::*;
use log::debug;
use merlin::Transcript;
use rand_core::CryptoRngCore;
use std::collections::BTreeMap;
use uint_zigzag::Uint;

/// The witness name of the hidden secret. It is shared by every relation in
/// a proof and therefore not scoped.
pub const USK: &str = "usk";

/// Proves possession of a credential over an attribute space
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CredentialStatement {
    system: SystemParameters,
    issuer: IssuerPublic,
    slots: Vec<String>,
    disclosed: BTreeMap<usize, Scalar>,
    pseudonym: Pseudonym,
    position: String,
}

impl CredentialStatement {
    /// The number of auxiliary elements before the attribute commitments
    pub const SIGNATURE_ELEMENTS: usize = 2;

    /// A statement over `space` that reveals the `disclosed` slots
    pub fn new(
        system: SystemParameters,
        space: &AttributeSpace,
        disclosed: &BTreeMap<usize, AttributeValue>,
        pseudonym: Pseudonym,
        position: impl Into<String>,
    ) -> AnonResult<Self> {
        if let Some(slot) = disclosed.keys().find(|s| **s >= space.len()) {
            return Err(Error::InvalidArgument(format!(
                "cannot disclose slot {} of a space with {} slots",
                slot,
                space.len()
            )));
        }
        if space.issuer.verifying_key.message_count() != space.len() + 1 {
            return Err(Error::InvalidArgument(
                "issuer key does not match the attribute space".to_string(),
            ));
        }
        Ok(Self {
            system,
            issuer: space.issuer.clone(),
            slots: space.names().map(str::to_string).collect(),
            disclosed: disclosed
                .iter()
                .map(|(i, v)| (*i, v.to_scalar()))
                .collect(),
            pseudonym,
            position: position.into(),
        })
    }

    fn signature_random(&self) -> String {
        scoped_name(&self.position, "signatureRandom")
    }

    fn nym_random(&self) -> String {
        scoped_name(&self.position, "nymRandom")
    }

    fn random(&self, slot: usize) -> String {
        scoped_name(&self.position, &format!("random_{}", self.slots[slot]))
    }

    fn attribute(&self, slot: usize) -> String {
        scoped_name(&self.position, &format!("attribute_{}", self.slots[slot]))
    }

    /// The attribute commitments inside a credential announcement's auxiliary
    /// elements
    pub fn commitments(auxiliary: &[GroupElement]) -> AnonResult<Vec<G1Projective>> {
        auxiliary
            .iter()
            .skip(Self::SIGNATURE_ELEMENTS)
            .map(GroupElement::as_g1)
            .collect()
    }

    /// Fresh commitment openings for every attribute of `credential`
    pub fn fresh_openings(
        credential: &SignatureCredential,
        rng: &mut dyn CryptoRngCore,
    ) -> Vec<PedersenOpening> {
        credential
            .attributes
            .iter()
            .map(|a| PedersenOpening {
                message: a.to_scalar(),
                randomness: Scalar::random(&mut *rng),
            })
            .collect()
    }

    /// Randomize the credential signature, commit to the attributes with
    /// `openings` and build the prover
    pub fn prover(
        &self,
        credential: &SignatureCredential,
        usk: &HiddenSecret,
        identity: &Identity,
        openings: &[PedersenOpening],
        rng: &mut dyn CryptoRngCore,
    ) -> AnonResult<LinearProver> {
        if credential.issuer != self.issuer {
            return Err(Error::InvalidArgument(format!(
                "credential is from issuer '{}' but the statement expects '{}'",
                credential.issuer.id, self.issuer.id
            )));
        }
        if credential.attributes.len() != self.slots.len() || openings.len() != self.slots.len()
        {
            return Err(Error::InvalidArgument(format!(
                "{} slots but {} attributes and {} openings",
                self.slots.len(),
                credential.attributes.len(),
                openings.len()
            )));
        }
        if identity.pseudonym != self.pseudonym {
            return Err(Error::InvalidArgument(
                "identity does not match the statement pseudonym".to_string(),
            ));
        }
        for (slot, value) in &self.disclosed {
            if credential.attributes[*slot].to_scalar() != *value {
                return Err(Error::InvalidWitness(format!(
                    "disclosed value for '{}' differs from the credential",
                    self.slots[*slot]
                )));
            }
        }
        for (i, (opening, value)) in openings.iter().zip(&credential.attributes).enumerate() {
            if opening.message != value.to_scalar() {
                return Err(Error::InvalidWitness(format!(
                    "opening for '{}' does not match the credential",
                    self.slots[i]
                )));
            }
        }

        let mut t = Scalar::random(&mut *rng);
        while bool::from(t.is_zero()) {
            t = Scalar::random(&mut *rng);
        }
        let r = Scalar::random(&mut *rng);
        let randomized = credential.signature.randomize(t, r);

        let mut auxiliary: Vec<GroupElement> = vec![
            randomized.sigma_1().into(),
            randomized.sigma_2().into(),
        ];
        let mut witnesses = BTreeMap::new();
        witnesses.insert(self.signature_random(), r);
        witnesses.insert(USK.to_string(), usk.to_scalar());
        witnesses.insert(self.nym_random(), identity.randomness);
        for (i, opening) in openings.iter().enumerate() {
            auxiliary.push(
                self.system
                    .nym
                    .commit(opening.message, opening.randomness)
                    .into(),
            );
            witnesses.insert(self.random(i), opening.randomness);
            if !self.disclosed.contains_key(&i) {
                witnesses.insert(self.attribute(i), opening.message);
            }
        }
        debug!(
            "proving a credential from '{}' at {} disclosing {} of {} attributes",
            self.issuer.id,
            self.position,
            self.disclosed.len(),
            self.slots.len()
        );
        LinearProver::new(self, auxiliary, witnesses, rng)
    }
}

impl StatementBuilder for CredentialStatement {
    fn label(&self) -> &'static [u8] {
        b"credential"
    }

    fn auxiliary_kinds(&self) -> Vec<GroupKind> {
        vec![GroupKind::G1; Self::SIGNATURE_ELEMENTS + self.slots.len()]
    }

    fn build(&self, auxiliary: &[GroupElement]) -> AnonResult<SchnorrStatement> {
        if auxiliary.len() != Self::SIGNATURE_ELEMENTS + self.slots.len() {
            return Err(Error::General("wrong number of credential elements"));
        }
        let sigma_1 = auxiliary[0].as_g1()?;
        let sigma_2 = auxiliary[1].as_g1()?;
        let commitments = Self::commitments(auxiliary)?;
        let pk = &self.issuer.verifying_key;
        let y0 = *pk.y.first().ok_or(Error::General("empty issuer key"))?;
        let g2 = G2Projective::GENERATOR;

        let mut lhs = vec![
            Expr::pairing(sigma_1.into(), g2.into()).pow_witness(self.signature_random()),
            Expr::pairing(sigma_1.into(), y0.into()).pow_witness(USK),
        ];
        let mut folded = pk.x;
        for (i, y) in pk.y.iter().skip(1).enumerate() {
            match self.disclosed.get(&i) {
                Some(value) => folded += *y * *value,
                None => lhs.push(
                    Expr::pairing(sigma_1.into(), (*y).into()).pow_witness(self.attribute(i)),
                ),
            }
        }
        let rhs = Expr::pairing(sigma_2.into(), g2.into())
            .mul(Expr::pairing(sigma_1.into(), folded.into()).inv());

        let (g, h) = (self.system.nym.g, self.system.nym.h);
        let mut equations = vec![
            Equation::new(Expr::product(lhs), rhs),
            Equation::new(
                Expr::from(self.pseudonym.0),
                Expr::product([
                    Expr::from(g).pow_witness(self.nym_random()),
                    Expr::from(h).pow_witness(USK),
                ]),
            ),
        ];
        for (i, c) in commitments.into_iter().enumerate() {
            equations.push(match self.disclosed.get(&i) {
                Some(value) => Equation::new(
                    Expr::from(c).mul(Expr::from(h).pow(*value).inv()),
                    Expr::from(g).pow_witness(self.random(i)),
                ),
                None => Equation::new(
                    Expr::from(c),
                    Expr::product([
                        Expr::from(g).pow_witness(self.random(i)),
                        Expr::from(h).pow_witness(self.attribute(i)),
                    ]),
                ),
            });
        }
        SchnorrStatement::new(&equations)
    }

    fn add_challenge_contribution(&self, transcript: &mut Transcript) {
        transcript.append_message(b"position", self.position.as_bytes());
        transcript.append_message(b"issuer", &self.issuer.to_bytes());
        transcript.append_message(b"pseudonym", &self.pseudonym.to_bytes());
        transcript.append_message(b"slots", &Uint::from(self.slots.len()).to_vec());
        for s in &self.slots {
            transcript.append_message(b"slot", s.as_bytes());
        }
        transcript.append_message(b"disclosed", &Uint::from(self.disclosed.len()).to_vec());
        for (i, v) in &self.disclosed {
            transcript.append_message(b"disclosed slot", &Uint::from(*i).to_vec());
            transcript.append_message(b"disclosed value", &v.to_be_bytes());
        }
    }
}

/// Proves that a blind issuance commitment `C = g^ρ * Y0^usk` hides the same
/// secret as the pseudonym
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct IssuanceStatement {
    system: SystemParameters,
    issuer: IssuerPublic,
    commitment: G1Projective,
    pseudonym: Pseudonym,
    known: Vec<Scalar>,
}

impl IssuanceStatement {
    const COMMITMENT_RANDOM: &'static str = "issuance:commitmentRandom";
    const NYM_RANDOM: &'static str = "issuance:nymRandom";

    /// A statement for a request to sign `known` after the committed secret
    pub fn new(
        system: SystemParameters,
        issuer: IssuerPublic,
        commitment: G1Projective,
        pseudonym: Pseudonym,
        known: Vec<Scalar>,
    ) -> Self {
        Self {
            system,
            issuer,
            commitment,
            pseudonym,
            known,
        }
    }

    /// The commitment to the hidden secret under the issuer's blinding base
    pub fn commit(issuer: &IssuerPublic, usk: &HiddenSecret, blinding: Scalar) -> G1Projective {
        G1Projective::GENERATOR * blinding + issuer.verifying_key.blinding_base() * usk.to_scalar()
    }

    /// The witnesses for the request
    pub fn witnesses(
        usk: &HiddenSecret,
        identity: &Identity,
        blinding: Scalar,
    ) -> BTreeMap<String, Scalar> {
        let mut witnesses = BTreeMap::new();
        witnesses.insert(Self::COMMITMENT_RANDOM.to_string(), blinding);
        witnesses.insert(USK.to_string(), usk.to_scalar());
        witnesses.insert(Self::NYM_RANDOM.to_string(), identity.randomness);
        witnesses
    }
}

impl StatementBuilder for IssuanceStatement {
    fn label(&self) -> &'static [u8] {
        b"issuance"
    }

    fn auxiliary_kinds(&self) -> Vec<GroupKind> {
        Vec::new()
    }

    fn build(&self, _auxiliary: &[GroupElement]) -> AnonResult<SchnorrStatement> {
        SchnorrStatement::new(&[
            Equation::new(
                Expr::from(self.commitment),
                Expr::product([
                    Expr::from(G1Projective::GENERATOR).pow_witness(Self::COMMITMENT_RANDOM),
                    Expr::from(self.issuer.verifying_key.blinding_base()).pow_witness(USK),
                ]),
            ),
            Equation::new(
                Expr::from(self.pseudonym.0),
                Expr::product([
                    Expr::from(self.system.nym.g).pow_witness(Self::NYM_RANDOM),
                    Expr::from(self.system.nym.h).pow_witness(USK),
                ]),
            ),
        ])
    }

    fn add_challenge_contribution(&self, transcript: &mut Transcript) {
        transcript.append_message(b"issuer", &self.issuer.to_bytes());
        transcript.append_message(b"pseudonym", &self.pseudonym.to_bytes());
        transcript.append_message(b"known messages", &Uint::from(self.known.len()).to_vec());
        for m in &self.known {
            transcript.append_message(b"known message", &m.to_be_bytes());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        attribute::{AttributeDefinition, AttributeKind},
        issuer::Issuer,
        knox::ps,
        sigma::{LinearVerifier, SigmaProver, SigmaVerifier},
    };
    use indexmap::IndexMap;

    struct Holder {
        system: SystemParameters,
        space: AttributeSpace,
        usk: HiddenSecret,
        identity: Identity,
        credential: SignatureCredential,
    }

    fn holder() -> Holder {
        let mut rng = rand::thread_rng();
        let system = SystemParameters::new(b"credential relation test");
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
        let space = AttributeSpace::new(definitions, public.clone()).unwrap();
        let usk = HiddenSecret::from(Scalar::from(7u64));
        let attributes = vec![AttributeValue::from(25i64), AttributeValue::from("M")];
        let mut messages = vec![usk.to_scalar()];
        messages.extend(attributes.iter().map(AttributeValue::to_scalar));
        let signature = ps::Issuer::sign(&issuer.signing_key, &messages, &mut rng).unwrap();
        let identity = Identity::new(&system, &usk, &mut rng);
        Holder {
            system,
            space,
            usk,
            identity,
            credential: SignatureCredential {
                signature,
                attributes,
                issuer: public,
            },
        }
    }

    fn run(h: &Holder, disclosed: BTreeMap<usize, AttributeValue>) -> AnonResult<bool> {
        let mut rng = rand::thread_rng();
        let statement = CredentialStatement::new(
            h.system,
            &h.space,
            &disclosed,
            h.identity.pseudonym,
            "0",
        )?;
        let openings = CredentialStatement::fresh_openings(&h.credential, &mut rng);
        let prover = statement.prover(&h.credential, &h.usk, &h.identity, &openings, &mut rng)?;
        let verifier = LinearVerifier::new(statement);
        let challenge = Scalar::random(&mut rng);
        let response = prover.respond(challenge)?;
        Ok(verifier.verify(&prover.announcement(), challenge, &response))
    }

    #[test]
    fn hidden_and_disclosed() {
        let h = holder();
        assert_eq!(run(&h, BTreeMap::new()), Ok(true));
        let mut disclosed = BTreeMap::new();
        disclosed.insert(1, AttributeValue::from("M"));
        assert_eq!(run(&h, disclosed), Ok(true));
    }

    #[test]
    fn wrong_disclosure_is_rejected() {
        let h = holder();
        let mut disclosed = BTreeMap::new();
        disclosed.insert(1, AttributeValue::from("F"));
        assert!(matches!(run(&h, disclosed), Err(Error::InvalidWitness(_))));

        let mut out_of_space = BTreeMap::new();
        out_of_space.insert(2, AttributeValue::from("F"));
        assert!(matches!(run(&h, out_of_space), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn count_mismatch_is_rejected() {
        let mut h = holder();
        h.credential.attributes.pop();
        assert!(matches!(run(&h, BTreeMap::new()), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn wrong_secret_fails() {
        let mut h = holder();
        h.usk = HiddenSecret::from(Scalar::from(8u64));
        assert!(matches!(run(&h, BTreeMap::new()), Err(Error::InvalidWitness(_))));
    }

    #[test]
    fn issuance_relation() {
        let mut rng = rand::thread_rng();
        let h = holder();
        let blinding = Scalar::random(&mut rng);
        let commitment = IssuanceStatement::commit(&h.credential.issuer, &h.usk, blinding);
        let statement = IssuanceStatement::new(
            h.system,
            h.credential.issuer.clone(),
            commitment,
            h.identity.pseudonym,
            vec![Scalar::from(25u64)],
        );
        let prover = LinearProver::new(
            &statement,
            Vec::new(),
            IssuanceStatement::witnesses(&h.usk, &h.identity, blinding),
            &mut rng,
        )
        .unwrap();
        let verifier = LinearVerifier::new(statement.clone());
        let challenge = Scalar::random(&mut rng);
        let response = prover.respond(challenge).unwrap();
        assert!(verifier.verify(&prover.announcement(), challenge, &response));

        let other = HiddenSecret::from(Scalar::from(8u64));
        let res = LinearProver::new(
            &statement,
            Vec::new(),
            IssuanceStatement::witnesses(&other, &h.identity, blinding),
            &mut rng,
        );
        assert!(matches!(res, Err(Error::InvalidWitness(_))));
    }
}
