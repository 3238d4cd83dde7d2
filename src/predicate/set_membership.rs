use super::{PredicateKind, PredicateProtocolFactory, PredicateWitness};
use crate::{
    error::Error,
    knox::{bb::SetMembershipParameters, pedersen::PedersenParameters},
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

/// `e(V, X~) = e(V, g~)^-m * e(g, g~)^t` for a blinded signature `V = A_m^t`.
///
/// Shared by set membership and every digit of a range proof.
pub(crate) fn signature_equation(
    public_key: G2Projective,
    blinded: G1Projective,
    value: String,
    blinding: String,
) -> Equation {
    Equation::new(
        Expr::pairing(Expr::from(blinded), Expr::from(public_key)),
        Expr::product([
            Expr::pairing_pow(
                Expr::from(blinded),
                Expr::from(G2Projective::GENERATOR),
                -1,
            )
            .pow_witness(value),
            Expr::pairing(
                Expr::from(G1Projective::GENERATOR),
                Expr::from(G2Projective::GENERATOR),
            )
            .pow_witness(blinding),
        ]),
    )
}

/// Public parameters of a set membership proof
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SetMembershipProofParameters {
    nym: PedersenParameters,
    commitment: G1Projective,
    set: SetMembershipParameters,
    position: String,
}

impl SetMembershipProofParameters {
    /// Prove that `commitment` opens to a member of `set`
    pub fn new(
        nym: PedersenParameters,
        commitment: G1Projective,
        set: SetMembershipParameters,
        position: impl Into<String>,
    ) -> Self {
        Self {
            nym,
            commitment,
            set,
            position: position.into(),
        }
    }

    fn name(&self, name: &str) -> String {
        scoped_name(&self.position, name)
    }
}

impl StatementBuilder for SetMembershipProofParameters {
    fn label(&self) -> &'static [u8] {
        b"set membership"
    }

    fn auxiliary_kinds(&self) -> Vec<GroupKind> {
        vec![GroupKind::G1]
    }

    fn build(&self, auxiliary: &[GroupElement]) -> AnonResult<SchnorrStatement> {
        let v = auxiliary
            .first()
            .ok_or(Error::General("missing blinded signature"))?
            .as_g1()?;
        SchnorrStatement::new(&[
            signature_equation(
                self.set.public_key,
                v,
                self.name("value"),
                self.name("signatureBlinding"),
            ),
            Equation::new(
                Expr::from(self.commitment),
                Expr::product([
                    Expr::from(self.nym.g).pow_witness(self.name("randomness")),
                    Expr::from(self.nym.h).pow_witness(self.name("value")),
                ]),
            ),
        ])
    }

    fn add_challenge_contribution(&self, transcript: &mut Transcript) {
        transcript.append_message(b"position", self.position.as_bytes());
        self.set.add_challenge_contribution(transcript);
    }
}

/// Builds set membership protocols
#[derive(Clone, Debug)]
pub struct SetMembershipFactory {
    parameters: SetMembershipProofParameters,
}

impl SetMembershipFactory {
    /// Create a new factory
    pub fn new(parameters: SetMembershipProofParameters) -> Self {
        Self { parameters }
    }
}

impl PredicateProtocolFactory for SetMembershipFactory {
    fn kind(&self) -> PredicateKind {
        PredicateKind::InSet
    }

    fn prover_protocol(
        &self,
        witness: &PredicateWitness,
        rng: &mut dyn CryptoRngCore,
    ) -> AnonResult<Box<dyn SigmaProver>> {
        let opening = witness.opening();
        let p = &self.parameters;
        let signature = p
            .set
            .signature_for(&opening.message)
            .ok_or_else(|| Error::PredicateNotSatisfied(PredicateKind::InSet.to_string()))?;
        let blinding = Scalar::random(&mut *rng);
        let witnesses = btreemap! {
            p.name("value") => opening.message,
            p.name("randomness") => opening.randomness,
            p.name("signatureBlinding") => blinding,
        };
        Ok(Box::new(LinearProver::new(
            p,
            vec![(signature * blinding).into()],
            witnesses,
            rng,
        )?))
    }

    fn verifier_protocol(&self) -> Box<dyn SigmaVerifier> {
        Box::new(LinearVerifier::new(self.parameters.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knox::pedersen::PedersenOpening;

    #[test]
    fn member_proves() {
        let mut rng = rand::thread_rng();
        let nym = PedersenParameters::new(b"set test");
        let members = [3u64, 5, 8, 13].map(Scalar::from);
        let set = SetMembershipParameters::new(&members, &mut rng).unwrap();
        let (c, opening) = nym.commit_random(Scalar::from(8u64), &mut rng);
        let factory = SetMembershipFactory::new(SetMembershipProofParameters::new(nym, c, set, "p"));
        let prover = factory
            .prover_protocol(&PredicateWitness::Scalar(opening.clone()), &mut rng)
            .unwrap();
        let verifier = factory.verifier_protocol();
        let challenge = Scalar::random(&mut rng);
        let response = prover.respond(challenge).unwrap();
        assert!(verifier.verify(&prover.announcement(), challenge, &response));

        let outsider = PredicateWitness::Scalar(PedersenOpening {
            message: Scalar::from(4u64),
            randomness: opening.randomness,
        });
        assert!(matches!(
            factory.prover_protocol(&outsider, &mut rng),
            Err(Error::PredicateNotSatisfied(_))
        ));
    }
}
