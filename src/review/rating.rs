use crate::{
    attribute::HashOfItem,
    error::Error,
    identity::SystemParameters,
    issuer::IssuerPublic,
    knox::{ps::Signature, Knox},
    sigma::{
        group::{GroupElement, GroupKind},
        relation::{Equation, Expr},
        SchnorrStatement, StatementBuilder,
    },
    AnonResult,
};
use blsful::inner_types::*;
use merlin::Transcript;

const LINK_BASE_DST: &[u8] = b"BLS12381G1_XMD:SHA-256_SSWU_RO_ANONRATE_REVIEW_";

/// `H(rpk, item)`, the G1 base of the linking elements
pub fn link_base(rating_issuer: &IssuerPublic, item: &[u8]) -> G1Projective {
    let mut input = rating_issuer.to_bytes();
    input.extend_from_slice(item);
    Knox::hash_to_g1(&input, LINK_BASE_DST)
}

pub(crate) const REGISTRATION_RANDOM: &str = "review:registrationRandom";
pub(crate) const TOKEN_RANDOM: &str = "review:tokenRandom";
pub(crate) const ZETA: &str = "review:zeta";

/// The relation behind a review:
///
/// ```text
/// e(ρ1, g~)^r_reg * e(ρ1, Y~0)^usk = e(ρ2, g~) * e(ρ1, X~)^-1
/// e(τ1, g~)^r_tok * e(τ1, Y~0)^usk = e(τ2, g~) * e(τ1, X~ * Y~1^hash)^-1
/// L1 = H^zeta * H^usk
/// L2 = linkBasis^zeta
/// ```
///
/// `ρ` is the randomized registration of the system manager and `τ` the
/// randomized review token of the rating issuer.
#[derive(Clone, Debug)]
pub struct RatingStatement {
    pub(crate) system: SystemParameters,
    pub(crate) system_manager: IssuerPublic,
    pub(crate) rating_issuer: IssuerPublic,
    pub(crate) item: HashOfItem,
    pub(crate) registration: Signature,
    pub(crate) token: Signature,
    pub(crate) base: G1Projective,
    pub(crate) l1: G1Projective,
    pub(crate) l2: G2Projective,
}

fn signature_equation(
    signature: &Signature,
    issuer: &IssuerPublic,
    disclosed: &[Scalar],
    random: &'static str,
) -> AnonResult<Equation> {
    let pk = &issuer.verifying_key;
    if pk.y.len() != disclosed.len() + 1 {
        return Err(Error::InvalidArgument(format!(
            "issuer '{}' signs {} messages, expected {}",
            issuer.id,
            pk.y.len(),
            disclosed.len() + 1
        )));
    }
    let y0 = *pk.y.first().ok_or(Error::General("empty issuer key"))?;
    let g2 = G2Projective::GENERATOR;
    let sigma_1 = signature.sigma_1();
    let folded = pk
        .y
        .iter()
        .skip(1)
        .zip(disclosed)
        .fold(pk.x, |acc, (y, m)| acc + *y * *m);
    Ok(Equation::new(
        Expr::product([
            Expr::pairing(sigma_1.into(), g2.into()).pow_witness(random),
            Expr::pairing(sigma_1.into(), y0.into()).pow_witness(super::USK),
        ]),
        Expr::pairing(signature.sigma_2().into(), g2.into())
            .mul(Expr::pairing(sigma_1.into(), folded.into()).inv()),
    ))
}

impl StatementBuilder for RatingStatement {
    fn label(&self) -> &'static [u8] {
        b"rating"
    }

    fn auxiliary_kinds(&self) -> Vec<GroupKind> {
        Vec::new()
    }

    fn build(&self, _auxiliary: &[GroupElement]) -> AnonResult<SchnorrStatement> {
        if bool::from(self.registration.sigma_1().is_identity() | self.token.sigma_1().is_identity())
        {
            return Err(Error::InvalidArgument(
                "randomized signature is the identity element".to_string(),
            ));
        }
        SchnorrStatement::new(&[
            signature_equation(
                &self.registration,
                &self.system_manager,
                &[],
                REGISTRATION_RANDOM,
            )?,
            signature_equation(&self.token, &self.rating_issuer, &[self.item.0], TOKEN_RANDOM)?,
            Equation::new(
                Expr::from(self.l1),
                Expr::product([
                    Expr::from(self.base).pow_witness(ZETA),
                    Expr::from(self.base).pow_witness(super::USK),
                ]),
            ),
            Equation::new(
                Expr::from(self.l2),
                Expr::from(self.system.link_basis).pow_witness(ZETA),
            ),
        ])
    }

    fn add_challenge_contribution(&self, transcript: &mut Transcript) {
        transcript.append_message(b"system manager", &self.system_manager.to_bytes());
        transcript.append_message(b"rating issuer", &self.rating_issuer.to_bytes());
        transcript.append_message(b"item", &self.item.0.to_be_bytes());
    }
}
