use crate::knox::ps::PublicKey;
use blsful::inner_types::*;
use rand_chacha::ChaChaRng;
use rand_core::{CryptoRng, RngCore, SeedableRng};
use serde::{Deserialize, Serialize};
use sha3::digest::{ExtendableOutput, Update, XofReader};
use zeroize::Zeroize;

/// The secret key contains a field element for each
/// message that is signed and one extra.
/// See section 4.2 in
/// <https://eprint.iacr.org/2015/525.pdf>
///
/// `y[0]` always signs the holder's hidden secret.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize, Zeroize)]
#[zeroize(drop)]
pub struct SecretKey {
    pub(crate) x: Scalar,
    pub(crate) y: Vec<Scalar>,
}

impl Default for SecretKey {
    fn default() -> Self {
        Self {
            x: Scalar::ZERO,
            y: Vec::new(),
        }
    }
}

impl SecretKey {
    const SCALAR_SIZE: usize = 32;
    /// The largest message block a key can sign
    pub const MAX_MESSAGES: usize = 128;

    /// Compute a secret key from a hash
    pub fn hash<B: AsRef<[u8]>>(count: usize, data: B) -> Option<Self> {
        const SALT: &[u8] = b"ANONRATE-PS-KEYGEN-SALT-";
        let mut reader = sha3::Shake256::default()
            .chain(SALT)
            .chain(data.as_ref())
            .finalize_xof();
        let mut okm = [0u8; Self::SCALAR_SIZE];
        reader.read(&mut okm);
        let rng = ChaChaRng::from_seed(okm);

        generate_secret_key(count, rng)
    }

    /// Compute a secret key from a CS-PRNG
    pub fn random(count: usize, rng: impl RngCore + CryptoRng) -> Option<Self> {
        generate_secret_key(count, rng)
    }

    /// The public key for this secret key
    pub fn public_key(&self) -> PublicKey {
        PublicKey::from(self)
    }

    /// The number of messages this key signs
    pub fn message_count(&self) -> usize {
        self.y.len()
    }

    /// Store the secret key as a sequence of bytes
    /// Each scalar is compressed to big-endian format
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buffer = Vec::with_capacity((self.y.len() + 1) * Self::SCALAR_SIZE);
        buffer.extend_from_slice(&self.x.to_be_bytes());
        for y in &self.y {
            buffer.extend_from_slice(&y.to_be_bytes());
        }
        buffer
    }

    /// Convert a byte sequence into the secret key
    pub fn from_bytes<B: AsRef<[u8]>>(bytes: B) -> Option<Self> {
        let buffer = bytes.as_ref();
        if buffer.len() % Self::SCALAR_SIZE != 0 || buffer.len() < Self::SCALAR_SIZE * 2 {
            return None;
        }
        let mut scalars = buffer.chunks_exact(Self::SCALAR_SIZE).map(|chunk| {
            let mut repr = [0u8; Self::SCALAR_SIZE];
            repr.copy_from_slice(chunk);
            Option::<Scalar>::from(Scalar::from_be_bytes(&repr))
        });
        let x = scalars.next()??;
        let y = scalars.collect::<Option<Vec<_>>>()?;
        Some(Self { x, y })
    }

    /// Check if this secret key is invalid
    pub fn is_invalid(&self) -> bool {
        let mut res = self.x.is_zero();
        for y in &self.y {
            res |= y.is_zero();
        }
        res.unwrap_u8() == 1u8
    }
}

fn generate_secret_key(count: usize, mut rng: impl RngCore + CryptoRng) -> Option<SecretKey> {
    if count == 0 || count > SecretKey::MAX_MESSAGES {
        return None;
    }
    let x = Scalar::random(&mut rng);
    let y = (0..count).map(|_| Scalar::random(&mut rng)).collect();
    Some(SecretKey { x, y })
}
