use super::{Auxiliary, Response, SigmaProver, SigmaVerifier};
use crate::{utils::scalar_from_transcript, AnonResult};
use blsful::inner_types::*;
use log::debug;
use merlin::Transcript;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

/// A non-interactive Sigma proof.
///
/// Only the prover-chosen auxiliary elements travel with the proof, the
/// commitments are recomputed by the verifier and hashed back into the
/// challenge.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiatShamirProof {
    /// Public elements chosen by the prover
    pub auxiliary: Auxiliary,
    /// The hash derived challenge
    pub challenge: Scalar,
    /// The responses
    pub response: Response,
}

fn derive_challenge<V: SigmaVerifier + ?Sized>(
    domain: &'static [u8],
    verifier: &V,
    announcement: &super::Announcement,
    context: &[u8],
) -> AnonResult<Scalar> {
    let mut transcript = Transcript::new(b"anonrate fiat-shamir");
    transcript.append_message(b"domain", domain);
    verifier.add_challenge_contribution(announcement, &mut transcript)?;
    transcript.append_message(b"context", context);
    Ok(scalar_from_transcript(&mut transcript, b"challenge"))
}

impl FiatShamirProof {
    /// Run `prover` against a challenge derived from the statement, the
    /// announcement and `context`
    pub fn prove<V, P>(
        domain: &'static [u8],
        verifier: &V,
        prover: &P,
        context: &[u8],
    ) -> AnonResult<Self>
    where
        V: SigmaVerifier + ?Sized,
        P: SigmaProver + ?Sized,
    {
        let announcement = prover.announcement();
        let challenge = derive_challenge(domain, verifier, &announcement, context)?;
        let response = prover.respond(challenge)?;
        Ok(Self {
            auxiliary: announcement.auxiliary(),
            challenge,
            response,
        })
    }

    /// Recompute the announcement and check that it hashes to the challenge
    pub fn verify<V: SigmaVerifier + ?Sized>(
        &self,
        domain: &'static [u8],
        verifier: &V,
        context: &[u8],
    ) -> bool {
        let announcement =
            match verifier.recompute_announcement(&self.auxiliary, self.challenge, &self.response) {
                Some(a) => a,
                None => {
                    debug!("proof does not match the statement");
                    return false;
                }
            };
        match derive_challenge(domain, verifier, &announcement, context) {
            Ok(challenge) => bool::from(challenge.ct_eq(&self.challenge)),
            Err(e) => {
                debug!("cannot derive challenge: {}", e);
                false
            }
        }
    }
}

/// A signature of knowledge: a Fiat-Shamir proof with the message in the
/// challenge
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiatShamirSignature(pub FiatShamirProof);

impl FiatShamirSignature {
    const DOMAIN: &'static [u8] = b"signature of knowledge";

    /// Sign `message` with knowledge of the witness held by `prover`
    pub fn sign<V, P>(verifier: &V, prover: &P, message: &[u8]) -> AnonResult<Self>
    where
        V: SigmaVerifier + ?Sized,
        P: SigmaProver + ?Sized,
    {
        FiatShamirProof::prove(Self::DOMAIN, verifier, prover, message).map(Self)
    }

    /// Verify the signature on `message`
    pub fn verify<V: SigmaVerifier + ?Sized>(&self, verifier: &V, message: &[u8]) -> bool {
        self.0.verify(Self::DOMAIN, verifier, message)
    }
}
