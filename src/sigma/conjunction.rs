use super::{Announcement, Auxiliary, Response, SigmaProver, SigmaVerifier};
use crate::{error::Error, AnonResult};
use blsful::inner_types::*;
use log::debug;
use merlin::Transcript;
use rand_core::CryptoRngCore;
use uint_zigzag::Uint;

/// Proves every child under the same challenge
pub struct AndProver {
    children: Vec<Box<dyn SigmaProver>>,
}

impl AndProver {
    /// Compose `children`
    pub fn new(children: Vec<Box<dyn SigmaProver>>) -> Self {
        Self { children }
    }
}

impl SigmaProver for AndProver {
    fn announcement(&self) -> Announcement {
        Announcement::Composite(self.children.iter().map(|c| c.announcement()).collect())
    }

    fn respond(&self, challenge: Scalar) -> AnonResult<Response> {
        self.children
            .iter()
            .map(|c| c.respond(challenge))
            .collect::<AnonResult<Vec<_>>>()
            .map(Response::Composite)
    }
}

/// Verifies every child under the same challenge
pub struct AndVerifier {
    children: Vec<Box<dyn SigmaVerifier>>,
}

impl AndVerifier {
    /// Compose `children`
    pub fn new(children: Vec<Box<dyn SigmaVerifier>>) -> Self {
        Self { children }
    }

    /// The number of children
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// Is the conjunction empty
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

impl SigmaVerifier for AndVerifier {
    fn add_challenge_contribution(
        &self,
        announcement: &Announcement,
        transcript: &mut Transcript,
    ) -> AnonResult<()> {
        let children = match announcement {
            Announcement::Composite(c) if c.len() == self.children.len() => c,
            _ => {
                return Err(Error::InvalidArgument(
                    "conjunction announcement does not match its children".to_string(),
                ))
            }
        };
        transcript.append_message(b"and", &Uint::from(children.len()).to_vec());
        for (v, a) in self.children.iter().zip(children) {
            v.add_challenge_contribution(a, transcript)?;
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
            (Auxiliary::Composite(a), Response::Composite(r))
                if a.len() == self.children.len() && r.len() == self.children.len() =>
            {
                (a, r)
            }
            _ => {
                debug!("conjunction response does not match its children");
                return None;
            }
        };
        self.children
            .iter()
            .zip(auxiliary.iter().zip(responses))
            .map(|(v, (a, r))| v.recompute_announcement(a, challenge, r))
            .collect::<Option<Vec<_>>>()
            .map(Announcement::Composite)
    }

    fn simulate(
        &self,
        challenge: Scalar,
        rng: &mut dyn CryptoRngCore,
    ) -> AnonResult<(Announcement, Response)> {
        let mut announcements = Vec::with_capacity(self.children.len());
        let mut responses = Vec::with_capacity(self.children.len());
        for c in &self.children {
            let (a, r) = c.simulate(challenge, rng)?;
            announcements.push(a);
            responses.push(r);
        }
        Ok((
            Announcement::Composite(announcements),
            Response::Composite(responses),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sigma::{
        group::{GroupElement, GroupKind},
        relation::{Equation, Expr},
        LinearProver, LinearVerifier, SchnorrStatement, StatementBuilder,
    };
    use maplit::btreemap;

    struct Dlog(G1Projective);

    impl StatementBuilder for Dlog {
        fn label(&self) -> &'static [u8] {
            b"dlog"
        }

        fn auxiliary_kinds(&self) -> Vec<GroupKind> {
            Vec::new()
        }

        fn build(&self, _auxiliary: &[GroupElement]) -> AnonResult<SchnorrStatement> {
            SchnorrStatement::new(&[Equation::new(
                Expr::from(self.0),
                Expr::from(G1Projective::GENERATOR).pow_witness("x"),
            )])
        }
    }

    #[test]
    fn both_children_verify() {
        let mut rng = rand::thread_rng();
        let (x1, x2) = (Scalar::from(3u64), Scalar::from(4u64));
        let y1 = G1Projective::GENERATOR * x1;
        let y2 = G1Projective::GENERATOR * x2;
        let prover = AndProver::new(vec![
            Box::new(
                LinearProver::new(&Dlog(y1), vec![], btreemap! {"x".to_string() => x1}, &mut rng)
                    .unwrap(),
            ),
            Box::new(
                LinearProver::new(&Dlog(y2), vec![], btreemap! {"x".to_string() => x2}, &mut rng)
                    .unwrap(),
            ),
        ]);
        let verifier = AndVerifier::new(vec![
            Box::new(LinearVerifier::new(Dlog(y1))),
            Box::new(LinearVerifier::new(Dlog(y2))),
        ]);
        let announcement = prover.announcement();
        let c = Scalar::random(&mut rng);
        let response = prover.respond(c).unwrap();
        assert!(verifier.verify(&announcement, c, &response));

        let Response::Composite(mut swapped) = response else {
            panic!("composite response expected")
        };
        swapped.swap(0, 1);
        assert!(!verifier.verify(&announcement, c, &Response::Composite(swapped)));

        let (a, r) = verifier.simulate(c, &mut rng).unwrap();
        assert!(verifier.verify(&a, c, &r));
    }
}
