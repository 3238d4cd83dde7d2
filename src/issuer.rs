use crate::knox::ps;
use crate::{random_string, AnonResult};
use log::debug;
use rand_core::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};

/// An issuer of credentials, review tokens or registrations
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Issuer {
    /// The issuer's unique id
    pub id: String,
    /// The signing key for this issuer
    pub signing_key: ps::SecretKey,
    /// The public data of this issuer
    pub public: IssuerPublic,
}

/// The public data for an issuer
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub struct IssuerPublic {
    /// The issuer's unique id
    pub id: String,
    /// The signature verifying key for this issuer
    pub verifying_key: ps::PublicKey,
}

impl From<&Issuer> for IssuerPublic {
    fn from(i: &Issuer) -> Self {
        i.public.clone()
    }
}

impl IssuerPublic {
    /// The number of values after the hidden secret this issuer signs
    pub fn attribute_count(&self) -> usize {
        self.verifying_key.message_count().saturating_sub(1)
    }

    /// The canonical encoding used in transcripts
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&(self.id.len() as u32).to_be_bytes());
        out.extend_from_slice(self.id.as_bytes());
        out.extend_from_slice(&self.verifying_key.to_bytes());
        out
    }
}

impl Issuer {
    /// Create a new issuer that signs the hidden secret followed by
    /// `attribute_count` values
    pub fn new(
        attribute_count: usize,
        mut rng: impl RngCore + CryptoRng,
    ) -> AnonResult<(IssuerPublic, Self)> {
        let id = random_string(16, &mut rng);
        let (verifying_key, signing_key) = ps::Issuer::new_keys(attribute_count + 1, &mut rng)?;
        let public = IssuerPublic {
            id: id.clone(),
            verifying_key,
        };
        debug!(
            "Issuer Public: {}",
            serde_json::to_string_pretty(&public).unwrap_or_default()
        );
        Ok((
            public.clone(),
            Self {
                id,
                signing_key,
                public,
            },
        ))
    }

    /// The public data
    pub fn public(&self) -> &IssuerPublic {
        &self.public
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_size() {
        let (public, issuer) = Issuer::new(2, rand::thread_rng()).unwrap();
        assert_eq!(public.attribute_count(), 2);
        assert_eq!(public.verifying_key.message_count(), 3);
        assert_eq!(issuer.public(), &public);
        assert_eq!(public.id.len(), 16);
        assert_ne!(
            public.to_bytes(),
            Issuer::new(2, rand::thread_rng()).unwrap().0.to_bytes()
        );
    }
}
