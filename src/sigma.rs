//! Three-move Sigma protocols over the BLS12-381 pairing groups.
//!
//! A prover sends an [`Announcement`], receives a challenge and answers with a
//! [`Response`]. Both messages are trees that mirror how protocols are
//! composed: linear relations are leaves, conjunctions and thresholds are
//! interior nodes.

mod conjunction;
mod fiat_shamir;
/// Group elements of G1, G2 and Gt
pub mod group;
mod partial_knowledge;
/// Relations between group elements and named witnesses
pub mod relation;
mod schnorr;

pub use conjunction::*;
pub use fiat_shamir::*;
pub use partial_knowledge::*;
pub use schnorr::*;

use crate::AnonResult;
use blsful::inner_types::*;
use group::GroupElement;
use merlin::Transcript;
use rand_core::CryptoRngCore;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The prover's first message
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Announcement {
    /// A linear relation
    Leaf {
        /// Public elements chosen by the prover, e.g. a randomized signature
        auxiliary: Vec<GroupElement>,
        /// One commitment per equation
        commitments: Vec<GroupElement>,
    },
    /// One announcement per child protocol
    Composite(Vec<Announcement>),
}

impl Announcement {
    /// The part of the announcement that is carried in a non-interactive proof
    pub fn auxiliary(&self) -> Auxiliary {
        match self {
            Self::Leaf { auxiliary, .. } => Auxiliary::Leaf(auxiliary.clone()),
            Self::Composite(children) => {
                Auxiliary::Composite(children.iter().map(Self::auxiliary).collect())
            }
        }
    }

    /// The auxiliary elements of a leaf
    pub fn leaf_auxiliary(&self) -> Option<&[GroupElement]> {
        match self {
            Self::Leaf { auxiliary, .. } => Some(auxiliary),
            Self::Composite(_) => None,
        }
    }
}

/// The auxiliary elements of an announcement tree. Commitments are left out
/// because the verifier recomputes them from the challenge and response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Auxiliary {
    /// Auxiliary elements of a linear relation
    Leaf(Vec<GroupElement>),
    /// Children of a composition
    Composite(Vec<Auxiliary>),
}

/// The prover's third message
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Response {
    /// `s = b + c * x` for every named witness
    Leaf(BTreeMap<String, Scalar>),
    /// The challenge shares and responses of a threshold composition
    Threshold {
        /// One challenge share per child
        challenges: Vec<Scalar>,
        /// One response per child
        responses: Vec<Response>,
    },
    /// One response per child of a conjunction
    Composite(Vec<Response>),
}

/// The prover side of a Sigma protocol. The announcement is fixed when the
/// prover is constructed.
pub trait SigmaProver {
    /// The first message
    fn announcement(&self) -> Announcement;

    /// The third message for `challenge`
    fn respond(&self, challenge: Scalar) -> AnonResult<Response>;
}

/// The verifier side of a Sigma protocol
pub trait SigmaVerifier {
    /// Add the public statement and the announcement to a transcript
    fn add_challenge_contribution(
        &self,
        announcement: &Announcement,
        transcript: &mut Transcript,
    ) -> AnonResult<()>;

    /// The only announcement that is accepted for `(auxiliary, challenge, response)`.
    /// `None` means the inputs are malformed.
    fn recompute_announcement(
        &self,
        auxiliary: &Auxiliary,
        challenge: Scalar,
        response: &Response,
    ) -> Option<Announcement>;

    /// An accepting transcript for `challenge` produced without a witness
    fn simulate(
        &self,
        challenge: Scalar,
        rng: &mut dyn CryptoRngCore,
    ) -> AnonResult<(Announcement, Response)>;

    /// Check a full transcript
    fn verify(&self, announcement: &Announcement, challenge: Scalar, response: &Response) -> bool {
        self.recompute_announcement(&announcement.auxiliary(), challenge, response)
            .map_or(false, |a| a == *announcement)
    }
}

impl<T: SigmaVerifier + ?Sized> SigmaVerifier for Box<T> {
    fn add_challenge_contribution(
        &self,
        announcement: &Announcement,
        transcript: &mut Transcript,
    ) -> AnonResult<()> {
        (**self).add_challenge_contribution(announcement, transcript)
    }

    fn recompute_announcement(
        &self,
        auxiliary: &Auxiliary,
        challenge: Scalar,
        response: &Response,
    ) -> Option<Announcement> {
        (**self).recompute_announcement(auxiliary, challenge, response)
    }

    fn simulate(
        &self,
        challenge: Scalar,
        rng: &mut dyn CryptoRngCore,
    ) -> AnonResult<(Announcement, Response)> {
        (**self).simulate(challenge, rng)
    }
}

impl<T: SigmaProver + ?Sized> SigmaProver for Box<T> {
    fn announcement(&self) -> Announcement {
        (**self).announcement()
    }

    fn respond(&self, challenge: Scalar) -> AnonResult<Response> {
        (**self).respond(challenge)
    }
}

/// A uniformly random challenge for interactive runs
pub fn choose_challenge(rng: &mut dyn CryptoRngCore) -> Scalar {
    Scalar::random(rng)
}
