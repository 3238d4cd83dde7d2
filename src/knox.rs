/// Weak Boneh-Boyen signatures used for set membership
pub mod bb;
/// Pedersen commitments
pub mod pedersen;
/// Pointcheval Sanders signatures
pub mod ps;

use blsful::inner_types::*;
use sha3::digest::{ExtendableOutput, Update, XofReader};

/// General purpose crypto operations
pub struct Knox {}

impl Knox {
    /// Compute a variable length hash
    pub fn xof_digest<X: Default + ExtendableOutput + Update>(input: &[u8], output: &mut [u8]) {
        let mut r = X::default().chain(input).finalize_xof();
        r.read(output);
    }

    /// Hash arbitrary bytes to a point in G1
    pub fn hash_to_g1(msg: &[u8], dst: &[u8]) -> G1Projective {
        G1Projective::hash::<ExpandMsgXmd<sha2::Sha256>>(msg, dst)
    }

    /// Hash arbitrary bytes to a point in G2
    pub fn hash_to_g2(msg: &[u8], dst: &[u8]) -> G2Projective {
        G2Projective::hash::<ExpandMsgXmd<sha2::Sha256>>(msg, dst)
    }

    /// Compute `e(a, b)`
    pub fn pair(a: &G1Projective, b: &G2Projective) -> Gt {
        pairing(&a.to_affine(), &b.to_affine())
    }

    /// Compute `Π e(a_i, b_i)` with a single final exponentiation
    pub fn pairing_product(terms: &[(G1Projective, G2Projective)]) -> Gt {
        let affine = terms
            .iter()
            .map(|(a, b)| (a.to_affine(), G2Prepared::from(b.to_affine())))
            .collect::<Vec<_>>();
        let refs = affine.iter().map(|(a, b)| (a, b)).collect::<Vec<_>>();
        multi_miller_loop(&refs).final_exponentiation()
    }
}
