//! Attribute predicates and the Sigma protocols that prove them about a
//! Pedersen commitment `C = g^r * h^m`.

mod equality;
mod inequality;
mod range;
mod set_membership;

pub use equality::*;
pub use inequality::*;
pub use range::*;
pub use set_membership::*;

use crate::{
    attribute::AttributeValue,
    error::Error,
    knox::{
        bb::{RangeParameters, SetMembershipParameters},
        pedersen::PedersenOpening,
    },
    sigma::{SigmaProver, SigmaVerifier},
    utils::scalar_from_i64,
    AnonResult,
};
use blsful::inner_types::*;
use core::fmt::{self, Display, Formatter};
use rand_core::{CryptoRng, CryptoRngCore, RngCore};
use serde::{Deserialize, Serialize};

/// The closed set of predicates
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Deserialize, Serialize)]
pub enum PredicateKind {
    /// The attribute equals a public value
    EqualConst,
    /// The attribute differs from a public value
    UnequalConst,
    /// `target = base^attribute`
    EqualDlog,
    /// `target != base^attribute`
    UnequalDlog,
    /// Two attributes are equal
    EqualAttr,
    /// Two attributes differ
    UnequalAttr,
    /// The attribute is a member of a public set
    InSet,
    /// The attribute is an integer in a closed interval
    InRange,
}

impl Display for PredicateKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::EqualConst => "EqualConst",
            Self::UnequalConst => "UnequalConst",
            Self::EqualDlog => "EqualDlog",
            Self::UnequalDlog => "UnequalDlog",
            Self::EqualAttr => "EqualAttr",
            Self::UnequalAttr => "UnequalAttr",
            Self::InSet => "InSet",
            Self::InRange => "InRange",
        };
        write!(f, "{}", name)
    }
}

/// A predicate together with its public parameters
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub enum Predicate {
    /// `attribute == value`
    EqualConst(AttributeValue),
    /// `attribute != value`
    UnequalConst(AttributeValue),
    /// `target == base^attribute`
    EqualDlog {
        /// The base
        base: G1Projective,
        /// The public result
        target: G1Projective,
    },
    /// `target != base^attribute`
    UnequalDlog {
        /// The base
        base: G1Projective,
        /// The public result
        target: G1Projective,
    },
    /// `attribute == attributes[other]`
    EqualAttr(usize),
    /// `attribute != attributes[other]`
    UnequalAttr(usize),
    /// `attribute ∈ members`
    InSet {
        /// The members in the clear
        members: Vec<AttributeValue>,
        /// Signatures on every member
        parameters: SetMembershipParameters,
    },
    /// `lower <= attribute <= upper`
    InRange {
        /// Inclusive lower bound
        lower: i64,
        /// Inclusive upper bound
        upper: i64,
        /// Digit signatures
        parameters: RangeParameters,
    },
}

impl Predicate {
    /// Set membership over `members`, signed under a fresh key
    pub fn in_set(
        members: Vec<AttributeValue>,
        rng: impl RngCore + CryptoRng,
    ) -> AnonResult<Self> {
        let scalars = members.iter().map(AttributeValue::to_scalar).collect::<Vec<_>>();
        let parameters = SetMembershipParameters::new(&scalars, rng)?;
        Ok(Self::InSet {
            members,
            parameters,
        })
    }

    /// A range proof for `[lower, upper]` using digits in `base`
    pub fn in_range(
        lower: i64,
        upper: i64,
        base: u64,
        rng: impl RngCore + CryptoRng,
    ) -> AnonResult<Self> {
        if lower > upper {
            return Err(Error::InvalidArgument(format!(
                "empty range [{}, {}]",
                lower, upper
            )));
        }
        Ok(Self::InRange {
            lower,
            upper,
            parameters: RangeParameters::new(base, rng)?,
        })
    }

    /// The predicate kind
    pub fn kind(&self) -> PredicateKind {
        match self {
            Self::EqualConst(_) => PredicateKind::EqualConst,
            Self::UnequalConst(_) => PredicateKind::UnequalConst,
            Self::EqualDlog { .. } => PredicateKind::EqualDlog,
            Self::UnequalDlog { .. } => PredicateKind::UnequalDlog,
            Self::EqualAttr(_) => PredicateKind::EqualAttr,
            Self::UnequalAttr(_) => PredicateKind::UnequalAttr,
            Self::InSet { .. } => PredicateKind::InSet,
            Self::InRange { .. } => PredicateKind::InRange,
        }
    }
}

/// A policy leaf that constrains the attribute in slot `attribute`
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub struct PredicatePolicyFact {
    /// The slot index of the constrained attribute
    pub attribute: usize,
    /// The predicate
    pub predicate: Predicate,
}

impl PredicatePolicyFact {
    /// Create a new fact
    pub fn new(attribute: usize, predicate: Predicate) -> Self {
        Self {
            attribute,
            predicate,
        }
    }

    /// The predicate kind
    pub fn kind(&self) -> PredicateKind {
        self.predicate.kind()
    }

    /// Every slot the fact reads
    pub fn slots(&self) -> Vec<usize> {
        match self.predicate {
            Predicate::EqualAttr(other) | Predicate::UnequalAttr(other) => {
                vec![self.attribute, other]
            }
            _ => vec![self.attribute],
        }
    }

    /// Evaluate the fact on dense attribute values
    pub fn is_satisfied(&self, values: &[AttributeValue]) -> bool {
        let value = match values.get(self.attribute) {
            Some(v) => v,
            None => return false,
        };
        let m = value.to_scalar();
        match &self.predicate {
            Predicate::EqualConst(v) => m == v.to_scalar(),
            Predicate::UnequalConst(v) => m != v.to_scalar(),
            Predicate::EqualDlog { base, target } => *base * m == *target,
            Predicate::UnequalDlog { base, target } => *base * m != *target,
            Predicate::EqualAttr(other) => values.get(*other).map_or(false, |o| o.to_scalar() == m),
            Predicate::UnequalAttr(other) => {
                values.get(*other).map_or(false, |o| o.to_scalar() != m)
            }
            Predicate::InSet { parameters, .. } => parameters.contains(&m),
            Predicate::InRange { lower, upper, .. } => value
                .as_integer()
                .map_or(false, |v| *lower <= v && v <= *upper),
        }
    }
}

/// The secret a predicate prover needs: the opening of the commitment
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PredicateWitness {
    /// Any committed field element
    Scalar(PedersenOpening),
    /// A committed integer, required by range proofs
    Integer {
        /// The integer
        value: i64,
        /// The commitment randomness
        randomness: Scalar,
    },
}

impl PredicateWitness {
    /// The commitment opening
    pub fn opening(&self) -> PedersenOpening {
        match self {
            Self::Scalar(o) => o.clone(),
            Self::Integer { value, randomness } => PedersenOpening {
                message: scalar_from_i64(*value),
                randomness: *randomness,
            },
        }
    }
}

/// Builds the prover and verifier of one predicate over a fixed commitment
pub trait PredicateProtocolFactory {
    /// The predicate kind the protocols prove
    fn kind(&self) -> PredicateKind;

    /// A prover for `witness`. Fails before any message exists when the
    /// witness does not satisfy the predicate.
    fn prover_protocol(
        &self,
        witness: &PredicateWitness,
        rng: &mut dyn CryptoRngCore,
    ) -> AnonResult<Box<dyn SigmaProver>>;

    /// The witness free verifier, also used for simulation
    fn verifier_protocol(&self) -> Box<dyn SigmaVerifier>;
}
