use crate::{
    error::Error,
    issuer::IssuerPublic,
    utils::{deserialize_indexmap, hash_to_scalar, scalar_from_i64, serialize_indexmap},
    AnonResult,
};
use blsful::inner_types::Scalar;
use core::fmt::{self, Display, Formatter};
use indexmap::IndexMap;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The value of one attribute slot
#[derive(Clone, Debug, Eq, PartialEq, Hash, Deserialize, Serialize)]
pub enum AttributeValue {
    /// The slot was not assigned by the issuer
    Undefined,
    /// A signed integer
    Integer(i64),
    /// A string, hashed before signing
    String(String),
    /// A boolean
    Boolean(bool),
}

impl Display for AttributeValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undefined => write!(f, "undefined"),
            Self::Integer(i) => write!(f, "{}", i),
            Self::String(s) => write!(f, "\"{}\"", s),
            Self::Boolean(b) => write!(f, "{}", b),
        }
    }
}

impl From<i64> for AttributeValue {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<&str> for AttributeValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<bool> for AttributeValue {
    fn from(v: bool) -> Self {
        Self::Boolean(v)
    }
}

impl AttributeValue {
    /// The scalar that is signed for this value.
    ///
    /// Integers map to themselves so they can be range proven, strings are
    /// hashed and `Undefined` maps to a reserved hash no string can reach.
    pub fn to_scalar(&self) -> Scalar {
        match self {
            Self::Undefined => hash_to_scalar(b"ANONRATE_UNDEFINED_ATTRIBUTE", &[]),
            Self::Integer(i) => scalar_from_i64(*i),
            Self::String(s) => hash_to_scalar(b"ANONRATE_STRING_ATTRIBUTE", s.as_bytes()),
            Self::Boolean(b) => hash_to_scalar(b"ANONRATE_BOOLEAN_ATTRIBUTE", &[u8::from(*b)]),
        }
    }

    /// The integer value, if this is an integer
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Is this the undefined marker
    pub fn is_undefined(&self) -> bool {
        matches!(self, Self::Undefined)
    }
}

/// The kind of value a slot holds together with its validation rule
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub enum AttributeKind {
    /// Integers, optionally bounded (inclusive)
    Integer {
        /// Smallest allowed value
        min: Option<i64>,
        /// Largest allowed value
        max: Option<i64>,
    },
    /// Strings up to an optional length
    String {
        /// Longest allowed length in bytes
        max_length: Option<usize>,
    },
    /// Booleans
    Boolean,
    /// One of a fixed list of strings
    Enumeration(Vec<String>),
}

impl AttributeKind {
    /// Does `value` fit this slot. Undefined always fits.
    pub fn is_valid(&self, value: &AttributeValue) -> bool {
        match (self, value) {
            (_, AttributeValue::Undefined) => true,
            (Self::Integer { min, max }, AttributeValue::Integer(i)) => {
                min.map_or(true, |m| *i >= m) && max.map_or(true, |m| *i <= m)
            }
            (Self::String { max_length }, AttributeValue::String(s)) => {
                max_length.map_or(true, |m| s.len() <= m)
            }
            (Self::Boolean, AttributeValue::Boolean(_)) => true,
            (Self::Enumeration(allowed), AttributeValue::String(s)) => allowed.contains(s),
            _ => false,
        }
    }
}

/// One attribute slot
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub struct AttributeDefinition {
    /// The value kind
    pub kind: AttributeKind,
    /// A human readable description
    pub description: String,
}

impl AttributeDefinition {
    /// Create a definition
    pub fn new(kind: AttributeKind, description: impl Into<String>) -> Self {
        Self {
            kind,
            description: description.into(),
        }
    }
}

/// The ordered attribute slots an issuer signs. The slot index of a name is
/// its insertion index; signature message `i + 1` holds slot `i`.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub struct AttributeSpace {
    /// The unique id of this space
    pub id: String,
    /// The slots
    #[serde(
        serialize_with = "serialize_indexmap",
        deserialize_with = "deserialize_indexmap"
    )]
    pub definitions: IndexMap<String, AttributeDefinition>,
    /// The issuer that signs credentials over this space
    pub issuer: IssuerPublic,
}

impl AttributeSpace {
    /// Create a space for `issuer`, whose key must sign one message per slot
    /// plus the hidden secret
    pub fn new(
        definitions: IndexMap<String, AttributeDefinition>,
        issuer: IssuerPublic,
    ) -> AnonResult<Self> {
        if issuer.verifying_key.message_count() != definitions.len() + 1 {
            return Err(Error::InvalidArgument(format!(
                "issuer key signs {} messages but the space needs {}",
                issuer.verifying_key.message_count(),
                definitions.len() + 1
            )));
        }
        let space = Self {
            id: uuid::Uuid::new_v4().to_string(),
            definitions,
            issuer,
        };
        debug!(
            "Attribute Space: {}",
            serde_json::to_string_pretty(&space).unwrap_or_default()
        );
        Ok(space)
    }

    /// An attribute space with no slots, used for registrations
    pub fn empty(issuer: IssuerPublic) -> AnonResult<Self> {
        Self::new(IndexMap::new(), issuer)
    }

    /// The number of slots
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Has the space no slots
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// The slot index of `name`
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.definitions.get_index_of(name)
    }

    /// The name of slot `index`
    pub fn name_of(&self, index: usize) -> Option<&str> {
        self.definitions.get_index(index).map(|(k, _)| k.as_str())
    }

    /// The slot names in order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.definitions.keys().map(String::as_str)
    }
}

/// A sparse assignment of attribute values by name
#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
pub struct Attributes {
    /// The assigned values
    pub values: BTreeMap<String, AttributeValue>,
}

impl<K: Into<String>, V: Into<AttributeValue>> FromIterator<(K, V)> for Attributes {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl Attributes {
    /// Expand to one value per slot, missing slots are `Undefined`.
    ///
    /// Names outside the space and values the slot rejects are errors.
    pub fn to_dense(&self, space: &AttributeSpace) -> AnonResult<Vec<AttributeValue>> {
        if let Some(unknown) = self.values.keys().find(|k| space.index_of(k).is_none()) {
            return Err(Error::InvalidArgument(format!(
                "attribute '{}' is not in the attribute space",
                unknown
            )));
        }
        space
            .definitions
            .iter()
            .map(|(name, definition)| {
                let value = self
                    .values
                    .get(name)
                    .cloned()
                    .unwrap_or(AttributeValue::Undefined);
                if definition.kind.is_valid(&value) {
                    Ok(value)
                } else {
                    Err(Error::InvalidArgument(format!(
                        "{} is not a valid value for '{}'",
                        value, name
                    )))
                }
            })
            .collect()
    }
}

/// The hash of an opaque item that a review token is issued for
#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub struct HashOfItem(pub Scalar);

impl HashOfItem {
    /// Hash `item`
    pub fn new(item: &[u8]) -> Self {
        Self(hash_to_scalar(b"ANONRATE_ITEM", item))
    }
}
