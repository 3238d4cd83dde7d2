//! Anonymous reviews.
//!
//! A user registered with the system manager and holding a review token for
//! an item publishes a review by signing the message with knowledge of both
//! signatures. The review carries `L1 = H^(ζ+usk)` and `L2 = linkBasis^ζ`
//! so that reviews from the same secret can be linked.

pub mod linking;
mod rating;

pub use rating::{link_base, RatingStatement};

use crate::{
    attribute::HashOfItem,
    credential::{ReviewToken, SignatureCredential, USK},
    error::Error,
    identity::{HiddenSecret, SystemParameters},
    issuer::IssuerPublic,
    knox::ps::Signature,
    sigma::{FiatShamirSignature, LinearProver, LinearVerifier},
    utils::{deserialize_bytes, serialize_bytes},
    AnonResult,
};
use blsful::inner_types::*;
use log::debug;
use rand_core::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A published review
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    /// The review payload
    #[serde(serialize_with = "serialize_bytes", deserialize_with = "deserialize_bytes")]
    pub message: Vec<u8>,
    /// The reviewed item
    #[serde(serialize_with = "serialize_bytes", deserialize_with = "deserialize_bytes")]
    pub item: Vec<u8>,
    /// The randomized registration signature
    pub registration_signature: Signature,
    /// The randomized review token signature
    pub token_signature: Signature,
    /// The signature of knowledge over the message and item
    pub signature: FiatShamirSignature,
    /// `H(rpk, item)^(ζ + usk)`
    pub l1: G1Projective,
    /// `linkBasis^ζ`
    pub l2: G2Projective,
}

fn signed_bytes(message: &[u8], item: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(8 + message.len() + item.len());
    out.extend_from_slice(&(message.len() as u32).to_be_bytes());
    out.extend_from_slice(message);
    out.extend_from_slice(&(item.len() as u32).to_be_bytes());
    out.extend_from_slice(item);
    out
}

impl Review {
    /// Write a review of `item`.
    ///
    /// `registration` is the credential the system manager issued over an
    /// empty attribute space and `token` the review token the rating issuer
    /// issued for `item`. Both must be bound to `usk`.
    pub fn rate(
        system: &SystemParameters,
        usk: &HiddenSecret,
        registration: &SignatureCredential,
        token: &ReviewToken,
        item: &[u8],
        message: &[u8],
        mut rng: impl RngCore + CryptoRng,
    ) -> AnonResult<Self> {
        if token.item != HashOfItem::new(item) {
            return Err(Error::InvalidArgument(
                "review token is for a different item".to_string(),
            ));
        }
        if !registration.attributes.is_empty() {
            return Err(Error::InvalidArgument(
                "registration must not carry attributes".to_string(),
            ));
        }

        let registration_random = Scalar::random(&mut rng);
        let token_random = Scalar::random(&mut rng);
        let registration_signature = registration
            .signature
            .randomize(Scalar::random(&mut rng), registration_random);
        let token_signature = token
            .signature
            .randomize(Scalar::random(&mut rng), token_random);

        let zeta = Scalar::random(&mut rng);
        let base = link_base(&token.issuer, item);
        let statement = RatingStatement {
            system: *system,
            system_manager: registration.issuer.clone(),
            rating_issuer: token.issuer.clone(),
            item: token.item,
            registration: registration_signature,
            token: token_signature,
            base,
            l1: base * (zeta + usk.to_scalar()),
            l2: system.link_basis * zeta,
        };

        let mut witnesses = BTreeMap::new();
        witnesses.insert(rating::REGISTRATION_RANDOM.to_string(), registration_random);
        witnesses.insert(rating::TOKEN_RANDOM.to_string(), token_random);
        witnesses.insert(USK.to_string(), usk.to_scalar());
        witnesses.insert(rating::ZETA.to_string(), zeta);
        let prover = LinearProver::new(&statement, Vec::new(), witnesses, &mut rng)?;

        let (l1, l2) = (statement.l1, statement.l2);
        let verifier = LinearVerifier::new(statement);
        let signature = FiatShamirSignature::sign(&verifier, &prover, &signed_bytes(message, item))?;
        Ok(Self {
            message: message.to_vec(),
            item: item.to_vec(),
            registration_signature,
            token_signature,
            signature,
            l1,
            l2,
        })
    }

    /// The statement this review proves
    pub fn statement(
        &self,
        system: &SystemParameters,
        rating_issuer: &IssuerPublic,
        system_manager: &IssuerPublic,
    ) -> RatingStatement {
        RatingStatement {
            system: *system,
            system_manager: system_manager.clone(),
            rating_issuer: rating_issuer.clone(),
            item: HashOfItem::new(&self.item),
            registration: self.registration_signature,
            token: self.token_signature,
            base: link_base(rating_issuer, &self.item),
            l1: self.l1,
            l2: self.l2,
        }
    }

    /// Check the review against the keys of the rating issuer and the
    /// system manager
    pub fn verify(
        &self,
        system: &SystemParameters,
        rating_issuer: &IssuerPublic,
        system_manager: &IssuerPublic,
    ) -> bool {
        if rating_issuer.verifying_key.message_count() != 2
            || system_manager.verifying_key.message_count() != 1
        {
            debug!("review keys have the wrong shape");
            return false;
        }
        if bool::from(self.l1.is_identity() | self.l2.is_identity()) {
            debug!("review linking elements are the identity");
            return false;
        }
        let verifier = LinearVerifier::new(self.statement(system, rating_issuer, system_manager));
        self.signature
            .verify(&verifier, &signed_bytes(&self.message, &self.item))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{issuer::Issuer, knox::ps};

    pub(crate) struct Reviewer {
        pub system: SystemParameters,
        pub manager: IssuerPublic,
        pub rating: IssuerPublic,
        pub usk: HiddenSecret,
        pub registration: SignatureCredential,
        pub rating_key: Issuer,
    }

    impl Reviewer {
        pub fn new(usk: u64) -> Self {
            let mut rng = rand::thread_rng();
            let system = SystemParameters::new(b"review tests");
            let (manager, manager_key) = Issuer::new(0, &mut rng).unwrap();
            let (rating, rating_key) = Issuer::new(1, &mut rng).unwrap();
            let usk = HiddenSecret::from(Scalar::from(usk));
            let signature =
                ps::Issuer::sign(&manager_key.signing_key, &[usk.to_scalar()], &mut rng).unwrap();
            Self {
                system,
                registration: SignatureCredential {
                    signature,
                    attributes: Vec::new(),
                    issuer: manager.clone(),
                },
                manager,
                rating,
                usk,
                rating_key,
            }
        }

        pub fn token(&self, item: &[u8]) -> ReviewToken {
            let item = HashOfItem::new(item);
            let signature = ps::Issuer::sign(
                &self.rating_key.signing_key,
                &[self.usk.to_scalar(), item.0],
                rand::thread_rng(),
            )
            .unwrap();
            ReviewToken {
                signature,
                item,
                issuer: self.rating.clone(),
            }
        }
    }

    #[test]
    fn rate_and_verify() {
        let reviewer = Reviewer::new(7);
        let token = reviewer.token(b"book");
        let review = Review::rate(
            &reviewer.system,
            &reviewer.usk,
            &reviewer.registration,
            &token,
            b"book",
            b"five stars",
            rand::thread_rng(),
        )
        .unwrap();
        assert!(review.verify(&reviewer.system, &reviewer.rating, &reviewer.manager));
        assert!(!review.verify(&reviewer.system, &reviewer.manager, &reviewer.rating));

        let mut edited = review.clone();
        edited.message = b"one star".to_vec();
        assert!(!edited.verify(&reviewer.system, &reviewer.rating, &reviewer.manager));

        let mut moved = review;
        moved.item = b"film".to_vec();
        assert!(!moved.verify(&reviewer.system, &reviewer.rating, &reviewer.manager));
    }

    #[test]
    fn token_for_another_item() {
        let reviewer = Reviewer::new(7);
        let token = reviewer.token(b"book");
        let res = Review::rate(
            &reviewer.system,
            &reviewer.usk,
            &reviewer.registration,
            &token,
            b"film",
            b"meh",
            rand::thread_rng(),
        );
        assert!(matches!(res, Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn wrong_secret_cannot_rate() {
        let reviewer = Reviewer::new(7);
        let token = reviewer.token(b"book");
        let res = Review::rate(
            &reviewer.system,
            &HiddenSecret::from(Scalar::from(8u64)),
            &reviewer.registration,
            &token,
            b"book",
            b"fake",
            rand::thread_rng(),
        );
        assert!(matches!(res, Err(Error::InvalidWitness(_))));
    }

    #[test]
    fn binary_payload() {
        let reviewer = Reviewer::new(7);
        let token = reviewer.token(b"book");
        let payload = [0xffu8, 0xfe, 0x00, 0xc3];
        assert!(std::str::from_utf8(&payload).is_err());
        let review = Review::rate(
            &reviewer.system,
            &reviewer.usk,
            &reviewer.registration,
            &token,
            b"book",
            &payload,
            rand::thread_rng(),
        )
        .unwrap();
        assert_eq!(review.message, payload.to_vec());
        assert!(review.verify(&reviewer.system, &reviewer.rating, &reviewer.manager));

        let json = serde_json::to_string(&review).unwrap();
        assert!(json.contains("\"fffe00c3\""));
        let restored: Review = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, review);
        assert!(restored.verify(&reviewer.system, &reviewer.rating, &reviewer.manager));
    }
}
