use super::SecretKey;
use crate::error::Error;
use blsful::inner_types::*;
use core::convert::TryFrom;
use serde::{Deserialize, Serialize};
use subtle::Choice;

/// The public key contains a generator point for each
/// message that is signed and one extra.
/// See section 4.2 in
/// <https://eprint.iacr.org/2015/525.pdf>
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub struct PublicKey {
    /// The signing secret
    pub x: G2Projective,
    /// The secrets for each signed message
    pub y: Vec<G2Projective>,
    /// The secrets for each signed message for blinding purposes
    pub y_blinds: Vec<G1Projective>,
}

impl Default for PublicKey {
    fn default() -> Self {
        Self {
            x: G2Projective::IDENTITY,
            y: Vec::new(),
            y_blinds: Vec::new(),
        }
    }
}

impl From<&SecretKey> for PublicKey {
    fn from(sk: &SecretKey) -> Self {
        let x = G2Projective::GENERATOR * sk.x;
        let mut y = Vec::with_capacity(sk.y.len());
        let mut y_blinds = Vec::with_capacity(sk.y.len());
        for s_y in &sk.y {
            y.push(G2Projective::GENERATOR * s_y);
            y_blinds.push(G1Projective::GENERATOR * s_y);
        }
        Self { x, y, y_blinds }
    }
}

impl TryFrom<&[u8]> for PublicKey {
    type Error = Error;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        Self::from_bytes(bytes).ok_or(Error::General("Invalid public key"))
    }
}

impl PublicKey {
    const G1_SIZE: usize = 48;
    const G2_SIZE: usize = 96;

    /// The number of messages this key verifies
    pub fn message_count(&self) -> usize {
        self.y.len()
    }

    /// Check if this public key is invalid
    pub fn is_invalid(&self) -> Choice {
        let mut res = self.x.is_identity();
        res |= Choice::from((self.y.is_empty() || self.y.len() != self.y_blinds.len()) as u8);
        for y in &self.y {
            res |= y.is_identity();
        }
        for y in &self.y_blinds {
            res |= y.is_identity();
        }
        res
    }

    /// The single-message commitment base used to blind the hidden secret
    pub fn blinding_base(&self) -> G1Projective {
        self.y_blinds
            .first()
            .copied()
            .unwrap_or(G1Projective::IDENTITY)
    }

    /// Store the public key as a sequence of bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buffer = Vec::with_capacity(
            4 + Self::G2_SIZE * (self.y.len() + 1) + Self::G1_SIZE * self.y_blinds.len(),
        );
        buffer.extend_from_slice(&(self.y.len() as u32).to_be_bytes()[..]);
        buffer.extend_from_slice(&self.x.to_affine().to_compressed()[..]);
        for y in &self.y {
            buffer.extend_from_slice(&y.to_affine().to_compressed()[..]);
        }
        for y in &self.y_blinds {
            buffer.extend_from_slice(&y.to_affine().to_compressed()[..]);
        }
        buffer
    }

    /// Convert a byte sequence into the public key
    pub fn from_bytes<B: AsRef<[u8]>>(bytes: B) -> Option<Self> {
        let buffer = bytes.as_ref();
        if buffer.len() < 4 {
            return None;
        }
        let y_cnt = u32::from_be_bytes(<[u8; 4]>::try_from(&buffer[..4]).ok()?) as usize;
        if buffer.len() != 4 + Self::G2_SIZE * (y_cnt + 1) + Self::G1_SIZE * y_cnt {
            return None;
        }

        fn g2(d: &[u8]) -> Option<G2Projective> {
            let repr = <[u8; 96]>::try_from(d).ok()?;
            Option::<G2Affine>::from(G2Affine::from_compressed(&repr)).map(G2Projective::from)
        }
        fn g1(d: &[u8]) -> Option<G1Projective> {
            let repr = <[u8; 48]>::try_from(d).ok()?;
            Option::<G1Affine>::from(G1Affine::from_compressed(&repr)).map(G1Projective::from)
        }

        let mut offset = 4;
        let x = g2(&buffer[offset..offset + Self::G2_SIZE])?;
        offset += Self::G2_SIZE;
        let mut y = Vec::with_capacity(y_cnt);
        for _ in 0..y_cnt {
            y.push(g2(&buffer[offset..offset + Self::G2_SIZE])?);
            offset += Self::G2_SIZE;
        }
        let mut y_blinds = Vec::with_capacity(y_cnt);
        for _ in 0..y_cnt {
            y_blinds.push(g1(&buffer[offset..offset + Self::G1_SIZE])?);
            offset += Self::G1_SIZE;
        }
        Some(Self { x, y, y_blinds })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes() {
        let sk = SecretKey::random(3, rand::thread_rng()).unwrap();
        let pk = PublicKey::from(&sk);
        assert_eq!(pk.is_invalid().unwrap_u8(), 0);
        let restored = PublicKey::try_from(pk.to_bytes().as_slice()).unwrap();
        assert_eq!(pk, restored);
        assert!(PublicKey::from_bytes(&pk.to_bytes()[1..]).is_none());
    }

    #[test]
    fn default_is_invalid() {
        assert_eq!(PublicKey::default().is_invalid().unwrap_u8(), 1);
    }
}
