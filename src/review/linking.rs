//! Linking tags for reviews.
//!
//! With `H = H(rpk, item)` every review carries `L1 = H^(ζ+usk)` and
//! `L2 = linkBasis^ζ`. Two reviews come from the same secret iff
//! `e(L1a / L1b, linkBasis) == e(H, L2a / L2b)`, and a single review yields
//! the tag `e(H, linkBasis)^usk = e(L1, linkBasis) * e(H, L2)^-1`.

use super::{link_base, Review};
use crate::{identity::SystemParameters, issuer::IssuerPublic, knox::Knox};
use blsful::inner_types::*;
use log::trace;
use std::collections::HashSet;

/// A tag that is equal for all reviews of one item by one secret
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct LinkingTag(pub Gt);

impl LinkingTag {
    /// The canonical encoding
    pub fn to_bytes(&self) -> Vec<u8> {
        self.0.to_bytes().as_ref().to_vec()
    }
}

/// Computes tags and links reviews of one rating issuer
#[derive(Clone, Debug)]
pub struct LinkingTagEngine {
    system: SystemParameters,
    rating_issuer: IssuerPublic,
}

impl LinkingTagEngine {
    /// An engine for the reviews backed by `rating_issuer`
    pub fn new(system: SystemParameters, rating_issuer: IssuerPublic) -> Self {
        Self {
            system,
            rating_issuer,
        }
    }

    fn base(&self, review: &Review) -> G1Projective {
        link_base(&self.rating_issuer, &review.item)
    }

    /// The tag of a review. Only meaningful for reviews that verified.
    pub fn compute_linking_tag(&self, review: &Review) -> LinkingTag {
        let lb = self.system.link_basis;
        LinkingTag(Knox::pair(&review.l1, &lb) - Knox::pair(&self.base(review), &review.l2))
    }

    /// Are `a` and `b` reviews of the same item by the same secret
    pub fn link(&self, a: &Review, b: &Review) -> bool {
        if a.item != b.item {
            trace!("reviews are for different items");
            return false;
        }
        let lhs = Knox::pair(&(a.l1 - b.l1), &self.system.link_basis);
        let rhs = Knox::pair(&self.base(a), &(a.l2 - b.l2));
        lhs == rhs
    }
}

/// Remembers the tags of accepted reviews
#[derive(Clone, Debug, Default)]
pub struct DuplicateDetector {
    seen: HashSet<Vec<u8>>,
}

impl DuplicateDetector {
    /// An empty detector
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `tag`. Returns `true` if it was recorded before.
    pub fn check_and_insert(&mut self, tag: &LinkingTag) -> bool {
        !self.seen.insert(tag.to_bytes())
    }

    /// Has `tag` been recorded
    pub fn contains(&self, tag: &LinkingTag) -> bool {
        self.seen.contains(&tag.to_bytes())
    }

    /// The number of recorded tags
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// Are there no recorded tags
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        attribute::HashOfItem,
        credential::{ReviewToken, SignatureCredential},
        identity::HiddenSecret,
        issuer::Issuer,
        knox::ps,
    };

    struct Setup {
        system: SystemParameters,
        manager_key: Issuer,
        rating_key: Issuer,
    }

    impl Setup {
        fn new() -> Self {
            let mut rng = rand::thread_rng();
            Self {
                system: SystemParameters::new(b"linking tests"),
                manager_key: Issuer::new(0, &mut rng).unwrap().1,
                rating_key: Issuer::new(1, &mut rng).unwrap().1,
            }
        }

        fn review(&self, usk: u64, item: &[u8], message: &str) -> Review {
            let mut rng = rand::thread_rng();
            let usk = HiddenSecret::from(Scalar::from(usk));
            let registration = SignatureCredential {
                signature: ps::Issuer::sign(
                    &self.manager_key.signing_key,
                    &[usk.to_scalar()],
                    &mut rng,
                )
                .unwrap(),
                attributes: Vec::new(),
                issuer: self.manager_key.public.clone(),
            };
            let hash = HashOfItem::new(item);
            let token = ReviewToken {
                signature: ps::Issuer::sign(
                    &self.rating_key.signing_key,
                    &[usk.to_scalar(), hash.0],
                    &mut rng,
                )
                .unwrap(),
                item: hash,
                issuer: self.rating_key.public.clone(),
            };
            let review = Review::rate(
                &self.system,
                &usk,
                &registration,
                &token,
                item,
                message.as_bytes(),
                &mut rng,
            )
            .unwrap();
            assert!(review.verify(
                &self.system,
                &self.rating_key.public,
                &self.manager_key.public
            ));
            review
        }

        fn engine(&self) -> LinkingTagEngine {
            LinkingTagEngine::new(self.system, self.rating_key.public.clone())
        }
    }

    #[test]
    fn same_secret_links() {
        let setup = Setup::new();
        let engine = setup.engine();
        let a = setup.review(7, b"book", "good");
        let b = setup.review(7, b"book", "still good");
        assert!(engine.link(&a, &b));
        assert_eq!(engine.compute_linking_tag(&a), engine.compute_linking_tag(&b));
    }

    #[test]
    fn different_secret_does_not_link() {
        let setup = Setup::new();
        let engine = setup.engine();
        let a = setup.review(7, b"book", "good");
        let b = setup.review(8, b"book", "bad");
        assert!(!engine.link(&a, &b));
        assert_ne!(engine.compute_linking_tag(&a), engine.compute_linking_tag(&b));
    }

    #[test]
    fn different_item_does_not_link() {
        let setup = Setup::new();
        let engine = setup.engine();
        let a = setup.review(7, b"book", "good");
        let b = setup.review(7, b"film", "good");
        assert!(!engine.link(&a, &b));
        assert_ne!(engine.compute_linking_tag(&a), engine.compute_linking_tag(&b));
    }

    #[test]
    fn duplicates_are_detected() {
        let setup = Setup::new();
        let engine = setup.engine();
        let mut detector = DuplicateDetector::new();
        assert!(detector.is_empty());
        let first = engine.compute_linking_tag(&setup.review(7, b"book", "one"));
        let other = engine.compute_linking_tag(&setup.review(8, b"book", "two"));
        let again = engine.compute_linking_tag(&setup.review(7, b"book", "three"));
        assert!(!detector.check_and_insert(&first));
        assert!(!detector.check_and_insert(&other));
        assert!(detector.check_and_insert(&again));
        assert!(detector.contains(&first));
        assert_eq!(detector.len(), 2);
    }
}
