use crate::{error::Error, knox::Knox, AnonResult};
use blsful::inner_types::*;
use rand_core::CryptoRngCore;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// The three groups of the pairing
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum GroupKind {
    /// The first source group
    G1,
    /// The second source group
    G2,
    /// The target group
    Gt,
}

/// An element of one of the pairing groups written multiplicatively
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum GroupElement {
    /// G1 element
    G1(G1Projective),
    /// G2 element
    G2(G2Projective),
    /// Target group element
    Gt(Gt),
}

impl From<G1Projective> for GroupElement {
    fn from(p: G1Projective) -> Self {
        Self::G1(p)
    }
}

impl From<G2Projective> for GroupElement {
    fn from(p: G2Projective) -> Self {
        Self::G2(p)
    }
}

impl From<Gt> for GroupElement {
    fn from(p: Gt) -> Self {
        Self::Gt(p)
    }
}

impl GroupElement {
    /// The neutral element of `kind`
    pub fn identity(kind: GroupKind) -> Self {
        match kind {
            GroupKind::G1 => Self::G1(G1Projective::IDENTITY),
            GroupKind::G2 => Self::G2(G2Projective::IDENTITY),
            GroupKind::Gt => Self::Gt(Gt::IDENTITY),
        }
    }

    /// A uniformly random element of `kind`
    pub fn random(kind: GroupKind, rng: &mut dyn CryptoRngCore) -> Self {
        match kind {
            GroupKind::G1 => Self::G1(G1Projective::random(&mut *rng)),
            GroupKind::G2 => Self::G2(G2Projective::random(&mut *rng)),
            GroupKind::Gt => Self::Gt(Gt::random(&mut *rng)),
        }
    }

    /// Which group this element belongs to
    pub fn kind(&self) -> GroupKind {
        match self {
            Self::G1(_) => GroupKind::G1,
            Self::G2(_) => GroupKind::G2,
            Self::Gt(_) => GroupKind::Gt,
        }
    }

    /// The group operation
    pub fn op(&self, other: &Self) -> AnonResult<Self> {
        match (self, other) {
            (Self::G1(a), Self::G1(b)) => Ok(Self::G1(*a + *b)),
            (Self::G2(a), Self::G2(b)) => Ok(Self::G2(*a + *b)),
            (Self::Gt(a), Self::Gt(b)) => Ok(Self::Gt(*a + *b)),
            _ => Err(Error::IncompatibleGroups),
        }
    }

    /// The group inverse
    pub fn inv(&self) -> Self {
        match self {
            Self::G1(a) => Self::G1(-*a),
            Self::G2(a) => Self::G2(-*a),
            Self::Gt(a) => Self::Gt(-*a),
        }
    }

    /// Exponentiation by a scalar
    pub fn pow(&self, exponent: &Scalar) -> Self {
        match self {
            Self::G1(a) => Self::G1(*a * *exponent),
            Self::G2(a) => Self::G2(*a * *exponent),
            Self::Gt(a) => Self::Gt(*a * *exponent),
        }
    }

    /// Is this the neutral element
    pub fn is_identity(&self) -> bool {
        match self {
            Self::G1(a) => bool::from(a.is_identity()),
            Self::G2(a) => bool::from(a.is_identity()),
            Self::Gt(a) => bool::from(a.is_identity()),
        }
    }

    /// The canonical encoding, compressed for the source groups
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Self::G1(a) => a.to_affine().to_compressed().to_vec(),
            Self::G2(a) => a.to_affine().to_compressed().to_vec(),
            Self::Gt(a) => a.to_bytes().as_ref().to_vec(),
        }
    }

    /// The G1 element or an error
    pub fn as_g1(&self) -> AnonResult<G1Projective> {
        match self {
            Self::G1(a) => Ok(*a),
            _ => Err(Error::IncompatibleGroups),
        }
    }

    /// The G2 element or an error
    pub fn as_g2(&self) -> AnonResult<G2Projective> {
        match self {
            Self::G2(a) => Ok(*a),
            _ => Err(Error::IncompatibleGroups),
        }
    }

    /// The pairing `e(self, other)`, `self` must be in G1 and `other` in G2
    pub fn pair(&self, other: &Self) -> AnonResult<Self> {
        match (self, other) {
            (Self::G1(a), Self::G2(b)) => Ok(Self::Gt(Knox::pair(a, b))),
            _ => Err(Error::IncompatibleGroups),
        }
    }
}

#[derive(Serialize, Deserialize)]
enum SourceGroupElement {
    G1(G1Projective),
    G2(G2Projective),
}

/// Only source group elements travel in proofs. Target group elements are
/// always recomputed by the receiver.
impl Serialize for GroupElement {
    fn serialize<S>(&self, s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::G1(p) => SourceGroupElement::G1(*p).serialize(s),
            Self::G2(p) => SourceGroupElement::G2(*p).serialize(s),
            Self::Gt(_) => Err(serde::ser::Error::custom(
                "target group elements are not serialized",
            )),
        }
    }
}

impl<'de> Deserialize<'de> for GroupElement {
    fn deserialize<D>(d: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match SourceGroupElement::deserialize(d)? {
            SourceGroupElement::G1(p) => Self::G1(p),
            SourceGroupElement::G2(p) => Self::G2(p),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mixed_groups_are_rejected() {
        let a = GroupElement::from(G1Projective::GENERATOR);
        let b = GroupElement::from(G2Projective::GENERATOR);
        assert_eq!(a.op(&b), Err(Error::IncompatibleGroups));
        assert_eq!(b.pair(&a), Err(Error::IncompatibleGroups));
    }

    #[test]
    fn target_group_is_multiplicative() {
        let a = GroupElement::from(G1Projective::GENERATOR);
        let b = GroupElement::from(G2Projective::GENERATOR);
        let e = a.pair(&b).unwrap();
        let three = Scalar::from(3u64);
        let lhs = a.pow(&three).pair(&b).unwrap();
        assert_eq!(lhs, e.pow(&three));
        assert!(e.op(&e.inv()).unwrap().is_identity());
        assert_eq!(e.to_bytes().len(), 576);
    }

    #[test]
    fn serde_source_groups_only() {
        let a = GroupElement::from(G1Projective::GENERATOR);
        let json = serde_json::to_string(&a).unwrap();
        assert_eq!(serde_json::from_str::<GroupElement>(&json).unwrap(), a);
        let gt = GroupElement::identity(GroupKind::Gt);
        assert!(serde_json::to_string(&gt).is_err());
    }
}
