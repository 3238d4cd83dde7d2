//! Self describing representations of the persisted objects.
//!
//! Every object serializes to `{"type": <name>, "fields": <object>}` and
//! back to an equal value. A compact binary form is
//! available through `to_bytes`.

use crate::{
    attribute::AttributeSpace,
    credential::{ReviewToken, SignatureCredential},
    error::Error,
    issuer::IssuerPublic,
    policy::ThresholdPolicy,
    presentation::DisclosureProof,
    review::Review,
    AnonResult,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Value};

const TYPE: &str = "type";
const FIELDS: &str = "fields";

/// An object with a type tagged representation
pub trait Representable: Serialize + DeserializeOwned {
    /// The tag written into the representation
    const TYPE_NAME: &'static str;

    /// The type tagged representation
    fn to_representation(&self) -> AnonResult<Value> {
        Ok(json!({
            TYPE: Self::TYPE_NAME,
            FIELDS: serde_json::to_value(self)?,
        }))
    }

    /// Parse a type tagged representation
    fn from_representation(value: &Value) -> AnonResult<Self> {
        let tag = value
            .get(TYPE)
            .and_then(Value::as_str)
            .ok_or_else(|| Error::Serialization("missing type tag".to_string()))?;
        if tag != Self::TYPE_NAME {
            return Err(Error::Serialization(format!(
                "expected a {}, found a {}",
                Self::TYPE_NAME,
                tag
            )));
        }
        let fields = value
            .get(FIELDS)
            .ok_or_else(|| Error::Serialization(format!("{} has no fields", tag)))?;
        Ok(serde_json::from_str(&fields.to_string())?)
    }

    /// The representation as a JSON string
    fn to_json(&self) -> AnonResult<String> {
        Ok(serde_json::to_string(&self.to_representation()?)?)
    }

    /// Parse the representation from a JSON string
    fn from_json(json: &str) -> AnonResult<Self> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_representation(&value)
    }

    /// The compact binary encoding
    fn to_bytes(&self) -> AnonResult<Vec<u8>> {
        Ok(serde_bare::to_vec(self)?)
    }

    /// Parse the compact binary encoding
    fn from_bytes(bytes: &[u8]) -> AnonResult<Self> {
        Ok(serde_bare::from_slice(bytes)?)
    }
}

impl Representable for SignatureCredential {
    const TYPE_NAME: &'static str = "SignatureCredential";
}

impl Representable for ReviewToken {
    const TYPE_NAME: &'static str = "ReviewToken";
}

impl Representable for IssuerPublic {
    const TYPE_NAME: &'static str = "IssuerPublic";
}

impl Representable for AttributeSpace {
    const TYPE_NAME: &'static str = "AttributeSpace";
}

impl Representable for ThresholdPolicy {
    const TYPE_NAME: &'static str = "ThresholdPolicy";
}

impl Representable for DisclosureProof {
    const TYPE_NAME: &'static str = "DisclosureProof";
}

impl Representable for Review {
    const TYPE_NAME: &'static str = "Review";
}
