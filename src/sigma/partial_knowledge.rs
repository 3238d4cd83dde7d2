//! Proofs of partial knowledge (Cramer, Damgård, Schoenmakers 1994).
//!
//! For a `k` of `n` threshold the challenge `c` is shared with a polynomial
//! `p` of degree `n - k` where `p(0) = c` and child `i` answers the share
//! `p(i + 1)`. The prover fixes the `n - k` shares of the children it cannot
//! prove and simulates them, the remaining shares are then determined.

use super::{Announcement, Auxiliary, Response, SigmaProver, SigmaVerifier};
use crate::{error::Error, AnonResult};
use blsful::inner_types::*;
use log::debug;
use merlin::Transcript;
use rand_core::CryptoRngCore;
use uint_zigzag::Uint;

/// A child of a threshold prover
pub enum ThresholdChild {
    /// A child the prover holds a witness for
    Real(Box<dyn SigmaProver>),
    /// A child that is simulated
    Simulated(Box<dyn SigmaVerifier>),
}

enum Branch {
    Real(Box<dyn SigmaProver>),
    Simulated {
        share: Scalar,
        announcement: Announcement,
        response: Response,
    },
}

/// Evaluate the polynomial through `points` at `x`
fn interpolate(points: &[(Scalar, Scalar)], x: Scalar) -> Option<Scalar> {
    let mut result = Scalar::ZERO;
    for (i, (xi, yi)) in points.iter().enumerate() {
        let mut num = Scalar::ONE;
        let mut den = Scalar::ONE;
        for (j, (xj, _)) in points.iter().enumerate() {
            if i != j {
                num *= x - xj;
                den *= xi - xj;
            }
        }
        let inv = Option::<Scalar>::from(den.invert())?;
        result += *yi * num * inv;
    }
    Some(result)
}

fn position(i: usize) -> Scalar {
    Scalar::from(i as u64 + 1)
}

/// All `n` shares given the challenge and the shares at positions `1..=n-k`
fn complete_shares(challenge: Scalar, fixed: &[Scalar], n: usize) -> Option<Vec<Scalar>> {
    let mut points = Vec::with_capacity(fixed.len() + 1);
    points.push((Scalar::ZERO, challenge));
    points.extend(fixed.iter().enumerate().map(|(i, s)| (position(i), *s)));
    (0..n).map(|i| interpolate(&points, position(i))).collect()
}

/// Proves that at least `threshold` of its children hold
pub struct ThresholdProver {
    threshold: usize,
    branches: Vec<Branch>,
}

impl ThresholdProver {
    /// Simulate the children marked as simulated.
    ///
    /// Exactly `n - threshold` children must be simulated.
    pub fn new(
        threshold: usize,
        children: Vec<ThresholdChild>,
        rng: &mut dyn CryptoRngCore,
    ) -> AnonResult<Self> {
        let n = children.len();
        if threshold == 0 || threshold > n {
            return Err(Error::InvalidArgument(format!(
                "threshold {} is not in [1, {}]",
                threshold, n
            )));
        }
        let simulated = children
            .iter()
            .filter(|c| matches!(c, ThresholdChild::Simulated(_)))
            .count();
        if simulated != n - threshold {
            return Err(Error::InvalidArgument(format!(
                "{} of {} children are simulated, expected {}",
                simulated,
                n,
                n - threshold
            )));
        }
        let mut branches = Vec::with_capacity(n);
        for child in children {
            branches.push(match child {
                ThresholdChild::Real(p) => Branch::Real(p),
                ThresholdChild::Simulated(v) => {
                    let share = Scalar::random(&mut *rng);
                    let (announcement, response) = v.simulate(share, rng)?;
                    Branch::Simulated {
                        share,
                        announcement,
                        response,
                    }
                }
            });
        }
        Ok(Self {
            threshold,
            branches,
        })
    }
}

impl SigmaProver for ThresholdProver {
    fn announcement(&self) -> Announcement {
        Announcement::Composite(
            self.branches
                .iter()
                .map(|b| match b {
                    Branch::Real(p) => p.announcement(),
                    Branch::Simulated { announcement, .. } => announcement.clone(),
                })
                .collect(),
        )
    }

    fn respond(&self, challenge: Scalar) -> AnonResult<Response> {
        let n = self.branches.len();
        // The polynomial passes through (0, c) and every simulated share.
        // Real children take whatever the polynomial gives them.
        let mut points = vec![(Scalar::ZERO, challenge)];
        for (i, b) in self.branches.iter().enumerate() {
            if let Branch::Simulated { share, .. } = b {
                points.push((position(i), *share));
            }
        }
        debug_assert_eq!(points.len(), n - self.threshold + 1);
        let mut challenges = Vec::with_capacity(n);
        let mut responses = Vec::with_capacity(n);
        for (i, b) in self.branches.iter().enumerate() {
            match b {
                Branch::Real(p) => {
                    let share = interpolate(&points, position(i))
                        .ok_or(Error::General("duplicate interpolation points"))?;
                    challenges.push(share);
                    responses.push(p.respond(share)?);
                }
                Branch::Simulated {
                    share, response, ..
                } => {
                    challenges.push(*share);
                    responses.push(response.clone());
                }
            }
        }
        Ok(Response::Threshold {
            challenges,
            responses,
        })
    }
}

/// Verifies a `threshold` of `n` composition
pub struct ThresholdVerifier {
    threshold: usize,
    children: Vec<Box<dyn SigmaVerifier>>,
}

impl ThresholdVerifier {
    /// Create a new verifier, `threshold` must be in `1..=children.len()`
    pub fn new(threshold: usize, children: Vec<Box<dyn SigmaVerifier>>) -> AnonResult<Self> {
        if threshold == 0 || threshold > children.len() {
            return Err(Error::InvalidArgument(format!(
                "threshold {} is not in [1, {}]",
                threshold,
                children.len()
            )));
        }
        Ok(Self {
            threshold,
            children,
        })
    }

    fn shares_consistent(&self, challenge: Scalar, challenges: &[Scalar]) -> bool {
        let n = self.children.len();
        if challenges.len() != n {
            return false;
        }
        let free = n - self.threshold;
        match complete_shares(challenge, &challenges[..free], n) {
            Some(expected) => expected == challenges,
            None => false,
        }
    }
}

impl SigmaVerifier for ThresholdVerifier {
    fn add_challenge_contribution(
        &self,
        announcement: &Announcement,
        transcript: &mut Transcript,
    ) -> AnonResult<()> {
        let children = match announcement {
            Announcement::Composite(c) if c.len() == self.children.len() => c,
            _ => {
                return Err(Error::InvalidArgument(
                    "threshold announcement does not match its children".to_string(),
                ))
            }
        };
        transcript.append_message(b"threshold", &Uint::from(self.threshold).to_vec());
        transcript.append_message(b"of", &Uint::from(children.len()).to_vec());
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
        let n = self.children.len();
        let (auxiliary, challenges, responses) = match (auxiliary, response) {
            (
                Auxiliary::Composite(a),
                Response::Threshold {
                    challenges,
                    responses,
                },
            ) if a.len() == n && responses.len() == n => (a, challenges, responses),
            _ => {
                debug!("threshold response does not match its children");
                return None;
            }
        };
        if !self.shares_consistent(challenge, challenges) {
            debug!("threshold challenge shares are inconsistent");
            return None;
        }
        self.children
            .iter()
            .zip(auxiliary)
            .zip(challenges.iter().zip(responses))
            .map(|((v, a), (c, r))| v.recompute_announcement(a, *c, r))
            .collect::<Option<Vec<_>>>()
            .map(Announcement::Composite)
    }

    fn simulate(
        &self,
        challenge: Scalar,
        rng: &mut dyn CryptoRngCore,
    ) -> AnonResult<(Announcement, Response)> {
        let n = self.children.len();
        let fixed = (0..n - self.threshold)
            .map(|_| Scalar::random(&mut *rng))
            .collect::<Vec<_>>();
        let challenges = complete_shares(challenge, &fixed, n)
            .ok_or(Error::General("duplicate interpolation points"))?;
        let mut announcements = Vec::with_capacity(n);
        let mut responses = Vec::with_capacity(n);
        for (v, c) in self.children.iter().zip(&challenges) {
            let (a, r) = v.simulate(*c, rng)?;
            announcements.push(a);
            responses.push(r);
        }
        Ok((
            Announcement::Composite(announcements),
            Response::Threshold {
                challenges,
                responses,
            },
        ))
    }
}
