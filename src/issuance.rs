//! Blind issuance of credentials and review tokens.
//!
//! The requester commits to its hidden secret under the issuer's blinding
//! base and proves that the commitment and its pseudonym hide the same
//! secret. The issuer signs the commitment together with the values it
//! knows, the requester unblinds and checks the result.

use crate::{
    attribute::{AttributeSpace, Attributes, AttributeValue, HashOfItem},
    credential::{IssuanceStatement, ReviewToken, SignatureCredential},
    error::Error,
    identity::{HiddenSecret, Identity, Pseudonym, SystemParameters},
    issuer::{Issuer, IssuerPublic},
    knox::ps::{self, BlindSignature, Signature},
    sigma::{
        choose_challenge, Announcement, FiatShamirProof, LinearProver, LinearVerifier, Response,
        SigmaProver, SigmaVerifier,
    },
    AnonResult,
};
use blsful::inner_types::*;
use log::{debug, error, warn};
use rand_core::{CryptoRng, RngCore};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

const ISSUANCE_DOMAIN: &[u8] = b"blind issuance";

/// Public data that names the issuer of an issuable
pub trait IssuanceContext {
    /// The issuer
    fn issuer(&self) -> &IssuerPublic;
}

impl IssuanceContext for AttributeSpace {
    fn issuer(&self) -> &IssuerPublic {
        &self.issuer
    }
}

impl IssuanceContext for IssuerPublic {
    fn issuer(&self) -> &IssuerPublic {
        self
    }
}

/// Something an issuer signs together with a hidden secret
pub trait Issuable: Clone + Serialize + DeserializeOwned {
    /// What describes the message block
    type Context: IssuanceContext;
    /// What the requester holds after issuance
    type Issued;

    /// The messages that follow the hidden secret
    fn messages(&self, context: &Self::Context) -> AnonResult<Vec<Scalar>>;

    /// Wrap an unblinded signature
    fn assemble(&self, context: &Self::Context, signature: Signature) -> AnonResult<Self::Issued>;
}

impl Issuable for Attributes {
    type Context = AttributeSpace;
    type Issued = SignatureCredential;

    fn messages(&self, context: &AttributeSpace) -> AnonResult<Vec<Scalar>> {
        Ok(self
            .to_dense(context)?
            .iter()
            .map(AttributeValue::to_scalar)
            .collect())
    }

    fn assemble(
        &self,
        context: &AttributeSpace,
        signature: Signature,
    ) -> AnonResult<SignatureCredential> {
        Ok(SignatureCredential {
            signature,
            attributes: self.to_dense(context)?,
            issuer: context.issuer.clone(),
        })
    }
}

impl Issuable for HashOfItem {
    type Context = IssuerPublic;
    type Issued = ReviewToken;

    fn messages(&self, _context: &IssuerPublic) -> AnonResult<Vec<Scalar>> {
        Ok(vec![self.0])
    }

    fn assemble(&self, context: &IssuerPublic, signature: Signature) -> AnonResult<ReviewToken> {
        Ok(ReviewToken {
            signature,
            item: *self,
            issuer: context.clone(),
        })
    }
}

/// The requester's first message
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(bound = "I: Issuable")]
pub struct IssueRequest<I: Issuable> {
    /// `g^ρ * Y0^usk`
    pub commitment: G1Projective,
    /// The requester's pseudonym
    pub pseudonym: Pseudonym,
    /// What is to be signed
    pub issuable: I,
}

/// A request that carries its own proof
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(bound = "I: Issuable")]
pub struct NonInteractiveIssueRequest<I: Issuable> {
    /// The request
    pub request: IssueRequest<I>,
    /// The proof that the commitment is well formed
    pub proof: FiatShamirProof,
}

fn statement_for<I: Issuable>(
    system: SystemParameters,
    context: &I::Context,
    request: &IssueRequest<I>,
) -> AnonResult<IssuanceStatement> {
    let issuer = context.issuer();
    let known = request.issuable.messages(context)?;
    if known.len() + 1 != issuer.verifying_key.message_count() {
        return Err(Error::InvalidArgument(format!(
            "issuer signs {} messages but the request has {}",
            issuer.verifying_key.message_count(),
            known.len() + 1
        )));
    }
    if bool::from(request.pseudonym.0.is_identity()) || bool::from(request.commitment.is_identity())
    {
        return Err(Error::InvalidArgument(
            "request holds an identity element".to_string(),
        ));
    }
    Ok(IssuanceStatement::new(
        system,
        issuer.clone(),
        request.commitment,
        request.pseudonym,
        known,
    ))
}

/// Where an issuer session is
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum IssuanceState {
    /// Waiting for a request
    Created,
    /// A challenge was sent
    AnnouncementsReceived,
    /// The response was checked
    Verified(bool),
    /// A blind signature was produced
    Issued,
    /// The request was refused
    Rejected,
}

struct PendingRequest<I: Issuable> {
    request: IssueRequest<I>,
    verifier: LinearVerifier<IssuanceStatement>,
    announcement: Announcement,
    challenge: Scalar,
}

/// The issuer side of one issuance
pub struct IssuerSession<'a, I: Issuable> {
    system: SystemParameters,
    issuer: &'a Issuer,
    context: &'a I::Context,
    state: IssuanceState,
    pending: Option<PendingRequest<I>>,
}

impl<'a, I: Issuable> IssuerSession<'a, I> {
    /// Start a session, `context` must belong to `issuer`
    pub fn new(
        system: SystemParameters,
        issuer: &'a Issuer,
        context: &'a I::Context,
    ) -> AnonResult<Self> {
        if context.issuer() != issuer.public() {
            return Err(Error::InvalidArgument(
                "the issuance context belongs to another issuer".to_string(),
            ));
        }
        Ok(Self {
            system,
            issuer,
            context,
            state: IssuanceState::Created,
            pending: None,
        })
    }

    /// The current state
    pub fn state(&self) -> IssuanceState {
        self.state
    }

    /// Accept the request and its announcement, answer with a challenge
    pub fn receive_announcements(
        &mut self,
        request: IssueRequest<I>,
        announcement: Announcement,
        mut rng: impl RngCore + CryptoRng,
    ) -> AnonResult<Scalar> {
        if self.state != IssuanceState::Created {
            return Err(Error::InvalidIssuanceState(
                "announcements were already received",
            ));
        }
        let verifier = LinearVerifier::new(statement_for(self.system, self.context, &request)?);
        let challenge = choose_challenge(&mut rng);
        debug!("issuer '{}' received an issuance request", self.issuer.id);
        self.pending = Some(PendingRequest {
            request,
            verifier,
            announcement,
            challenge,
        });
        self.state = IssuanceState::AnnouncementsReceived;
        Ok(challenge)
    }

    /// Check the requester's response. A failed check discards the request.
    pub fn verify(&mut self, response: &Response) -> AnonResult<bool> {
        if self.state != IssuanceState::AnnouncementsReceived {
            return Err(Error::InvalidIssuanceState("no challenge is outstanding"));
        }
        let pending = self
            .pending
            .as_ref()
            .ok_or(Error::InvalidIssuanceState("no request is pending"))?;
        let valid = pending
            .verifier
            .verify(&pending.announcement, pending.challenge, response);
        if !valid {
            warn!("issuer '{}' rejected an issuance proof", self.issuer.id);
            self.pending = None;
        }
        self.state = IssuanceState::Verified(valid);
        Ok(valid)
    }

    /// Blind sign the verified request
    pub fn issue(&mut self, rng: impl RngCore + CryptoRng) -> AnonResult<BlindSignature> {
        match self.state {
            IssuanceState::Verified(true) => {
                let pending = self
                    .pending
                    .take()
                    .ok_or(Error::InvalidIssuanceState("no request is pending"))?;
                let signature = self.sign(&pending.request, rng)?;
                self.state = IssuanceState::Issued;
                Ok(signature)
            }
            IssuanceState::Verified(false) => {
                self.state = IssuanceState::Rejected;
                Err(Error::IssuanceRejected)
            }
            _ => Err(Error::InvalidIssuanceState(
                "a request must be verified before issuing",
            )),
        }
    }

    /// Check a self-proving request bound to `context` and blind sign it
    pub fn issue_non_interactive(
        &mut self,
        request: &NonInteractiveIssueRequest<I>,
        context: &[u8],
        rng: impl RngCore + CryptoRng,
    ) -> AnonResult<BlindSignature> {
        if self.state != IssuanceState::Created {
            return Err(Error::InvalidIssuanceState("the session is already in use"));
        }
        let verifier =
            LinearVerifier::new(statement_for(self.system, self.context, &request.request)?);
        if !request.proof.verify(ISSUANCE_DOMAIN, &verifier, context) {
            warn!("issuer '{}' rejected an issuance proof", self.issuer.id);
            self.state = IssuanceState::Rejected;
            return Err(Error::IssuanceRejected);
        }
        let signature = self.sign(&request.request, rng)?;
        self.state = IssuanceState::Issued;
        Ok(signature)
    }

    fn sign(
        &self,
        request: &IssueRequest<I>,
        rng: impl RngCore + CryptoRng,
    ) -> AnonResult<BlindSignature> {
        let known = request
            .issuable
            .messages(self.context)?
            .into_iter()
            .enumerate()
            .map(|(i, m)| (i + 1, m))
            .collect::<Vec<_>>();
        let signature =
            ps::Issuer::blind_sign(request.commitment, &self.issuer.signing_key, &known, rng)?;
        debug!(
            "issuer '{}' signed {} known messages: {}",
            self.issuer.id,
            known.len(),
            hex::encode(signature.to_bytes())
        );
        Ok(signature)
    }
}

/// The requester side of one issuance
pub struct RequesterSession<'a, I: Issuable> {
    context: &'a I::Context,
    usk: &'a HiddenSecret,
    issuable: I,
    blinding: Scalar,
    statement: IssuanceStatement,
    prover: LinearProver,
    answered: bool,
}

impl<'a, I: Issuable> RequesterSession<'a, I> {
    /// Commit to `usk` and build the request with its announcement
    pub fn begin(
        system: SystemParameters,
        context: &'a I::Context,
        usk: &'a HiddenSecret,
        identity: &Identity,
        issuable: I,
        mut rng: impl RngCore + CryptoRng,
    ) -> AnonResult<(Self, IssueRequest<I>, Announcement)> {
        if !identity.verify(&system, usk) {
            return Err(Error::InvalidArgument(
                "identity does not open to the hidden secret".to_string(),
            ));
        }
        let blinding = Scalar::random(&mut rng);
        let request = IssueRequest {
            commitment: IssuanceStatement::commit(context.issuer(), usk, blinding),
            pseudonym: identity.pseudonym,
            issuable: issuable.clone(),
        };
        let statement = statement_for(system, context, &request)?;
        let prover = LinearProver::new(
            &statement,
            Vec::new(),
            IssuanceStatement::witnesses(usk, identity, blinding),
            &mut rng,
        )?;
        let announcement = prover.announcement();
        Ok((
            Self {
                context,
                usk,
                issuable,
                blinding,
                statement,
                prover,
                answered: false,
            },
            request,
            announcement,
        ))
    }

    /// Answer the issuer's challenge, only once
    pub fn receive_challenge(&mut self, challenge: Scalar) -> AnonResult<Response> {
        if self.answered {
            return Err(Error::InvalidIssuanceState("the challenge was already answered"));
        }
        self.answered = true;
        self.prover.respond(challenge)
    }

    /// Turn the request into one that carries a proof bound to `context`
    pub fn non_interactive_request(
        &mut self,
        request: IssueRequest<I>,
        context: &[u8],
    ) -> AnonResult<NonInteractiveIssueRequest<I>> {
        if self.answered {
            return Err(Error::InvalidIssuanceState("the challenge was already answered"));
        }
        self.answered = true;
        let verifier = LinearVerifier::new(self.statement.clone());
        let proof = FiatShamirProof::prove(ISSUANCE_DOMAIN, &verifier, &self.prover, context)?;
        Ok(NonInteractiveIssueRequest { request, proof })
    }

    /// Unblind the issuer's signature and check it
    pub fn complete(self, signature: BlindSignature) -> AnonResult<I::Issued> {
        let signature = signature.to_unblinded(self.blinding);
        let mut messages = vec![self.usk.to_scalar()];
        messages.extend(self.issuable.messages(self.context)?);
        let issuer = self.context.issuer();
        if !bool::from(signature.verify(&issuer.verifying_key, &messages)) {
            error!(
                "signature from issuer '{}' does not verify after unblinding",
                issuer.id
            );
            return Err(Error::IssuanceParameterMismatch);
        }
        debug!("unblinded a signature from issuer '{}'", issuer.id);
        self.issuable.assemble(self.context, signature)
    }
}

/// Run an interactive issuance end to end
pub fn issue<I: Issuable>(
    system: SystemParameters,
    issuer: &Issuer,
    context: &I::Context,
    usk: &HiddenSecret,
    identity: &Identity,
    issuable: I,
    mut rng: impl RngCore + CryptoRng,
) -> AnonResult<I::Issued> {
    let mut issuer_session = IssuerSession::<I>::new(system, issuer, context)?;
    let (mut requester, request, announcement) =
        RequesterSession::begin(system, context, usk, identity, issuable, &mut rng)?;
    let challenge = issuer_session.receive_announcements(request, announcement, &mut rng)?;
    let response = requester.receive_challenge(challenge)?;
    issuer_session.verify(&response)?;
    let signature = issuer_session.issue(&mut rng)?;
    requester.complete(signature)
}
