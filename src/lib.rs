//! Anonymous attribute credentials.
//!
//! Users obtain blindly issued credentials and review tokens bound to a
//! hidden secret, prove that their hidden attributes satisfy a threshold
//! policy, and publish reviews that can be linked when they come from the
//! same secret.
#![warn(missing_docs)]
#![deny(unused_import_braces)]
#![warn(trivial_casts, trivial_numeric_casts, unused_qualifications)]
#![cfg_attr(docsrs, feature(doc_cfg))]

/// Attribute values, definitions and spaces
pub mod attribute;
/// Credentials and the relations proving their possession
pub mod credential;
mod error;
/// Pseudonyms and system parameters
pub mod identity;
/// The blind issuance protocol
pub mod issuance;
/// Issuer keys
pub mod issuer;
/// Low level cryptographic primitives
pub mod knox;
/// Threshold policies
pub mod policy;
/// Predicates over attributes
pub mod predicate;
/// Disclosure proofs
pub mod presentation;
/// Anonymous linkable reviews
pub mod review;
/// Type tagged representations
pub mod serialization;
/// Sigma protocols and their composition
pub mod sigma;
/// Turns policies into proofs
pub mod transformer;
mod utils;

pub use error::Error;
pub use utils::*;

/// Results returned by this crate
pub type AnonResult<T> = Result<T, Error>;

/// A prelude for the common types
pub mod prelude {
    pub use super::{
        attribute::*,
        credential::{ReviewToken, SignatureCredential},
        identity::*,
        issuance::{issue, IssuerSession, RequesterSession},
        issuer::*,
        policy::*,
        predicate::Predicate,
        presentation::{
            build_disclosure_proof, verify_disclosure_proof, DisclosureProof, DisclosureWitness,
        },
        review::{
            linking::{DuplicateDetector, LinkingTag, LinkingTagEngine},
            Review,
        },
        serialization::Representable,
        AnonResult, Error,
    };
    pub use blsful::inner_types::Scalar;
}
