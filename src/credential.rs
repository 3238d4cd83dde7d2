mod relation;

pub use relation::*;

use crate::{
    attribute::{AttributeSpace, AttributeValue, HashOfItem},
    identity::HiddenSecret,
    issuer::IssuerPublic,
    knox::ps::Signature,
};
use blsful::inner_types::Scalar;
use serde::{Deserialize, Serialize};

/// A credential: a signature over the hidden secret followed by one value
/// per attribute slot
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub struct SignatureCredential {
    /// The signature
    pub signature: Signature,
    /// The dense attribute values
    pub attributes: Vec<AttributeValue>,
    /// The issuer that signed it
    pub issuer: IssuerPublic,
}

impl SignatureCredential {
    /// The signed message block `(usk, a_1, .., a_n)`
    pub fn messages(&self, usk: &HiddenSecret) -> Vec<Scalar> {
        let mut messages = Vec::with_capacity(self.attributes.len() + 1);
        messages.push(usk.to_scalar());
        messages.extend(self.attributes.iter().map(AttributeValue::to_scalar));
        messages
    }

    /// Check the signature for `usk`
    pub fn verify(&self, usk: &HiddenSecret) -> bool {
        self.signature
            .verify(&self.issuer.verifying_key, self.messages(usk))
            .into()
    }

    /// Look up an attribute by name
    pub fn value(&self, space: &AttributeSpace, name: &str) -> Option<&AttributeValue> {
        space.index_of(name).and_then(|i| self.attributes.get(i))
    }
}

/// A token that allows one review of an item
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub struct ReviewToken {
    /// The signature over `(usk, hash(item))`
    pub signature: Signature,
    /// The item the token is for
    pub item: HashOfItem,
    /// The rating issuer
    pub issuer: IssuerPublic,
}

impl ReviewToken {
    /// The signed message block
    pub fn messages(&self, usk: &HiddenSecret) -> [Scalar; 2] {
        [usk.to_scalar(), self.item.0]
    }

    /// Check the signature for `usk`
    pub fn verify(&self, usk: &HiddenSecret) -> bool {
        self.signature
            .verify(&self.issuer.verifying_key, self.messages(usk))
            .into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{issuer::Issuer, knox::ps};

    #[test]
    fn credential_verifies() {
        let mut rng = rand::thread_rng();
        let (public, issuer) = Issuer::new(2, &mut rng).unwrap();
        let usk = HiddenSecret::from(Scalar::from(7u64));
        let attributes = vec![AttributeValue::from(25i64), AttributeValue::from("M")];
        let mut messages = vec![usk.to_scalar()];
        messages.extend(attributes.iter().map(AttributeValue::to_scalar));
        let signature = ps::Issuer::sign(&issuer.signing_key, &messages, &mut rng).unwrap();
        let credential = SignatureCredential {
            signature,
            attributes,
            issuer: public,
        };
        assert!(credential.verify(&usk));
        assert!(!credential.verify(&HiddenSecret::from(Scalar::from(8u64))));

        let mut older = credential.clone();
        older.attributes[0] = AttributeValue::from(26i64);
        assert!(!older.verify(&usk));
    }
}
