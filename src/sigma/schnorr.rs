use super::{
    group::{GroupElement, GroupKind},
    relation::{Equation, LinearEquation},
    Announcement, Auxiliary, Response, SigmaProver, SigmaVerifier,
};
use crate::{error::Error, AnonResult};
use blsful::inner_types::*;
use log::debug;
use merlin::Transcript;
use rand_core::CryptoRngCore;
use std::collections::{BTreeMap, BTreeSet};
use uint_zigzag::Uint;
use zeroize::Zeroize;

/// A conjunction of linear equations sharing one witness namespace.
/// A witness that appears in several equations is proven to be the same value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SchnorrStatement {
    equations: Vec<LinearEquation>,
}

impl SchnorrStatement {
    /// Normalize every equation
    pub fn new(equations: &[Equation]) -> AnonResult<Self> {
        let equations = equations
            .iter()
            .map(Equation::linearize)
            .collect::<AnonResult<Vec<_>>>()?;
        Ok(Self { equations })
    }

    /// The normalized equations
    pub fn equations(&self) -> &[LinearEquation] {
        &self.equations
    }

    /// All witness names
    pub fn witness_names(&self) -> BTreeSet<String> {
        self.equations
            .iter()
            .flat_map(|e| e.terms.iter().map(|t| t.witness.clone()))
            .collect()
    }

    /// Do the witnesses satisfy every equation
    pub fn is_satisfied(&self, witnesses: &BTreeMap<String, Scalar>) -> AnonResult<bool> {
        for e in &self.equations {
            if !e.holds(witnesses)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// The prover's first message `Π base^(coefficient * blinding)` per equation
    pub fn commit(&self, blindings: &BTreeMap<String, Scalar>) -> AnonResult<Vec<GroupElement>> {
        self.equations.iter().map(|e| e.evaluate(blindings)).collect()
    }

    /// The announcement that makes `(announcement, challenge, responses)` accept:
    /// `Π base^(coefficient * response) * target^-challenge`
    pub fn simulate_commitments(
        &self,
        challenge: Scalar,
        responses: &BTreeMap<String, Scalar>,
    ) -> AnonResult<Vec<GroupElement>> {
        self.equations
            .iter()
            .map(|e| e.evaluate(responses)?.op(&e.target.pow(&-challenge)))
            .collect()
    }

    /// Add the public relation to the transcript
    pub fn add_challenge_contribution(&self, transcript: &mut Transcript) {
        transcript.append_message(b"equations", &Uint::from(self.equations.len()).to_vec());
        for e in &self.equations {
            e.add_challenge_contribution(transcript);
        }
    }
}

/// Builds a [`SchnorrStatement`] once the prover has chosen its public
/// auxiliary elements, such as a randomized signature or fresh commitments.
/// Prover and verifier call the same builder so both see one relation.
pub trait StatementBuilder {
    /// A label that separates this protocol in transcripts
    fn label(&self) -> &'static [u8];

    /// The groups of the auxiliary elements in the order they are sent
    fn auxiliary_kinds(&self) -> Vec<GroupKind>;

    /// Build the relation for the given auxiliary elements
    fn build(&self, auxiliary: &[GroupElement]) -> AnonResult<SchnorrStatement>;

    /// Public parameters that are not captured by the relation itself
    fn add_challenge_contribution(&self, _transcript: &mut Transcript) {}

    /// Protocol specific checks on the auxiliary elements
    fn check_auxiliary(&self, _auxiliary: &[GroupElement]) -> bool {
        true
    }
}

fn auxiliary_well_formed(kinds: &[GroupKind], auxiliary: &[GroupElement]) -> bool {
    kinds.len() == auxiliary.len()
        && kinds
            .iter()
            .zip(auxiliary)
            .all(|(k, a)| a.kind() == *k && !a.is_identity())
}

/// The honest prover for a linear relation
pub struct LinearProver {
    auxiliary: Vec<GroupElement>,
    witnesses: BTreeMap<String, Scalar>,
    blindings: BTreeMap<String, Scalar>,
    commitments: Vec<GroupElement>,
}

impl Drop for LinearProver {
    fn drop(&mut self) {
        self.witnesses.values_mut().for_each(Zeroize::zeroize);
        self.blindings.values_mut().for_each(Zeroize::zeroize);
    }
}

impl LinearProver {
    /// Commit to fresh blindings for every witness of the relation.
    ///
    /// Fails if a witness is missing or if the witnesses do not satisfy the
    /// relation, so no announcement ever exists for a false statement.
    pub fn new<B: StatementBuilder + ?Sized>(
        builder: &B,
        auxiliary: Vec<GroupElement>,
        mut witnesses: BTreeMap<String, Scalar>,
        rng: &mut dyn CryptoRngCore,
    ) -> AnonResult<Self> {
        if !auxiliary_well_formed(&builder.auxiliary_kinds(), &auxiliary)
            || !builder.check_auxiliary(&auxiliary)
        {
            return Err(Error::InvalidArgument(format!(
                "malformed auxiliary elements for {}",
                String::from_utf8_lossy(builder.label())
            )));
        }
        let statement = builder.build(&auxiliary)?;
        let names = statement.witness_names();
        if let Some(missing) = names.iter().find(|n| !witnesses.contains_key(*n)) {
            return Err(Error::MissingWitness(missing.clone()));
        }
        witnesses.retain(|k, _| names.contains(k));
        if !statement.is_satisfied(&witnesses)? {
            return Err(Error::InvalidWitness(format!(
                "witnesses do not satisfy {}",
                String::from_utf8_lossy(builder.label())
            )));
        }
        let blindings = names
            .into_iter()
            .map(|n| (n, Scalar::random(&mut *rng)))
            .collect::<BTreeMap<_, _>>();
        let commitments = statement.commit(&blindings)?;
        Ok(Self {
            auxiliary,
            witnesses,
            blindings,
            commitments,
        })
    }
}

impl SigmaProver for LinearProver {
    fn announcement(&self) -> Announcement {
        Announcement::Leaf {
            auxiliary: self.auxiliary.clone(),
            commitments: self.commitments.clone(),
        }
    }

    fn respond(&self, challenge: Scalar) -> AnonResult<Response> {
        let mut responses = BTreeMap::new();
        for (name, blinding) in &self.blindings {
            let witness = self
                .witnesses
                .get(name)
                .ok_or_else(|| Error::MissingWitness(name.clone()))?;
            responses.insert(name.clone(), *blinding + challenge * witness);
        }
        Ok(Response::Leaf(responses))
    }
}

/// The verifier and simulator for a linear relation
#[derive(Clone, Debug)]
pub struct LinearVerifier<B> {
    builder: B,
}

impl<B: StatementBuilder> LinearVerifier<B> {
    /// Wrap a statement builder
    pub fn new(builder: B) -> Self {
        Self { builder }
    }

    /// The wrapped builder
    pub fn builder(&self) -> &B {
        &self.builder
    }

    fn statement_for(&self, auxiliary: &[GroupElement]) -> Option<SchnorrStatement> {
        if !auxiliary_well_formed(&self.builder.auxiliary_kinds(), auxiliary)
            || !self.builder.check_auxiliary(auxiliary)
        {
            debug!(
                "rejecting auxiliary elements for {}",
                String::from_utf8_lossy(self.builder.label())
            );
            return None;
        }
        self.builder.build(auxiliary).ok()
    }
}

impl<B: StatementBuilder> SigmaVerifier for LinearVerifier<B> {
    fn add_challenge_contribution(
        &self,
        announcement: &Announcement,
        transcript: &mut Transcript,
    ) -> AnonResult<()> {
        let (auxiliary, commitments) = match announcement {
            Announcement::Leaf {
                auxiliary,
                commitments,
            } => (auxiliary, commitments),
            Announcement::Composite(_) => {
                return Err(Error::InvalidArgument(
                    "a linear protocol expects a leaf announcement".to_string(),
                ))
            }
        };
        transcript.append_message(b"protocol", self.builder.label());
        self.builder.add_challenge_contribution(transcript);
        transcript.append_message(b"auxiliary elements", &Uint::from(auxiliary.len()).to_vec());
        for a in auxiliary {
            transcript.append_message(b"auxiliary", &a.to_bytes());
        }
        let statement = self.statement_for(auxiliary).ok_or_else(|| {
            Error::InvalidArgument("malformed auxiliary elements".to_string())
        })?;
        statement.add_challenge_contribution(transcript);
        for c in commitments {
            transcript.append_message(b"commitment", &c.to_bytes());
        }
        Ok(())
    }

    fn recompute_announcement(
        &self,
        auxiliary: &Auxiliary,
        challenge: Scalar,
        response: &Response,
    ) -> Option<Announcement> {
        let (auxiliary, responses) = match (auxiliary, response) {
            (Auxiliary::Leaf(a), Response::Leaf(r)) => (a, r),
            _ => return None,
        };
        let statement = self.statement_for(auxiliary)?;
        if !responses.keys().cloned().eq(statement.witness_names()) {
            debug!(
                "response names do not match {}",
                String::from_utf8_lossy(self.builder.label())
            );
            return None;
        }
        let commitments = statement.simulate_commitments(challenge, responses).ok()?;
        Some(Announcement::Leaf {
            auxiliary: auxiliary.clone(),
            commitments,
        })
    }

    fn simulate(
        &self,
        challenge: Scalar,
        rng: &mut dyn CryptoRngCore,
    ) -> AnonResult<(Announcement, Response)> {
        let auxiliary = self
            .builder
            .auxiliary_kinds()
            .into_iter()
            .map(|k| GroupElement::random(k, rng))
            .collect::<Vec<_>>();
        let statement = self.builder.build(&auxiliary)?;
        let responses = statement
            .witness_names()
            .into_iter()
            .map(|n| (n, Scalar::random(&mut *rng)))
            .collect::<BTreeMap<_, _>>();
        let commitments = statement.simulate_commitments(challenge, &responses)?;
        Ok((
            Announcement::Leaf {
                auxiliary,
                commitments,
            },
            Response::Leaf(responses),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sigma::relation::Expr;
    use maplit::btreemap;

    /// `Y = g^x` and `Z = h^x` with `Z` sent as an auxiliary element
    struct DlogEquality {
        g: G1Projective,
        h: G1Projective,
        y: G1Projective,
    }

    impl StatementBuilder for DlogEquality {
        fn label(&self) -> &'static [u8] {
            b"dlog equality"
        }

        fn auxiliary_kinds(&self) -> Vec<GroupKind> {
            vec![GroupKind::G1]
        }

        fn build(&self, auxiliary: &[GroupElement]) -> AnonResult<SchnorrStatement> {
            let z = auxiliary[0].as_g1()?;
            SchnorrStatement::new(&[
                Equation::new(Expr::from(self.y), Expr::from(self.g).pow_witness("x")),
                Equation::new(Expr::from(z), Expr::from(self.h).pow_witness("x")),
            ])
        }
    }

    fn setup() -> (DlogEquality, Scalar, G1Projective) {
        let x = Scalar::from(1234u64);
        let g = G1Projective::GENERATOR;
        let h = G1Projective::hash::<ExpandMsgXmd<sha2::Sha256>>(b"h", b"test");
        (DlogEquality { g, h, y: g * x }, x, h * x)
    }

    #[test]
    fn complete_and_sound() {
        let mut rng = rand::thread_rng();
        let (builder, x, z) = setup();
        let prover = LinearProver::new(
            &builder,
            vec![z.into()],
            btreemap! {"x".to_string() => x},
            &mut rng,
        )
        .unwrap();
        let verifier = LinearVerifier::new(builder);
        let announcement = prover.announcement();
        let challenge = Scalar::random(&mut rng);
        let response = prover.respond(challenge).unwrap();
        assert!(verifier.verify(&announcement, challenge, &response));
        assert!(!verifier.verify(&announcement, challenge + Scalar::ONE, &response));

        let Response::Leaf(mut tampered) = response.clone() else {
            panic!("leaf response expected")
        };
        tampered.insert("x".to_string(), Scalar::ONE);
        assert!(!verifier.verify(&announcement, challenge, &Response::Leaf(tampered)));
    }

    #[test]
    fn wrong_witness_fails_construction() {
        let mut rng = rand::thread_rng();
        let (builder, x, z) = setup();
        let res = LinearProver::new(
            &builder,
            vec![z.into()],
            btreemap! {"x".to_string() => x + Scalar::ONE},
            &mut rng,
        );
        assert!(matches!(res, Err(Error::InvalidWitness(_))));
        let res = LinearProver::new(&builder, vec![z.into()], BTreeMap::new(), &mut rng);
        assert_eq!(res.err(), Some(Error::MissingWitness("x".to_string())));
        let res = LinearProver::new(
            &builder,
            vec![],
            btreemap! {"x".to_string() => x},
            &mut rng,
        );
        assert!(matches!(res, Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn simulation_verifies() {
        let mut rng = rand::thread_rng();
        let (builder, _, _) = setup();
        let verifier = LinearVerifier::new(builder);
        let challenge = Scalar::random(&mut rng);
        let (announcement, response) = verifier.simulate(challenge, &mut rng).unwrap();
        assert!(verifier.verify(&announcement, challenge, &response));
    }
}
