//! Symbolic group equations with named scalar unknowns.
//!
//! An [`Equation`] is built from literals, products, inverses, powers and
//! pairings. Normalizing it gives a [`LinearEquation`]
//! `Π base_j^(coefficient_j * x_j) = target`, which is the only shape the
//! Schnorr machinery needs for proving, verifying and simulating.

use super::group::{GroupElement, GroupKind};
use crate::{error::Error, AnonResult};
use blsful::inner_types::*;
use merlin::Transcript;
use std::collections::{BTreeMap, BTreeSet};
use uint_zigzag::Uint;

/// The exponent of a power node
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Exponent {
    /// A public scalar
    Constant(Scalar),
    /// A named witness
    Witness(String),
}

/// A symbolic expression over group elements
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Expr {
    /// A known group element
    Literal(GroupElement),
    /// The product of all factors
    Product(Vec<Expr>),
    /// `base^exponent`
    Power(Box<Expr>, Exponent),
    /// The inverse of an expression
    Inverse(Box<Expr>),
    /// `e(g1, g2)^power`, `g1` must live in G1 and `g2` in G2
    Pairing {
        /// The G1 side
        g1: Box<Expr>,
        /// The G2 side
        g2: Box<Expr>,
        /// Optional small power folded into the pairing
        power: Option<i64>,
    },
}

impl From<GroupElement> for Expr {
    fn from(e: GroupElement) -> Self {
        Self::Literal(e)
    }
}

impl From<G1Projective> for Expr {
    fn from(e: G1Projective) -> Self {
        Self::Literal(e.into())
    }
}

impl From<G2Projective> for Expr {
    fn from(e: G2Projective) -> Self {
        Self::Literal(e.into())
    }
}

impl Expr {
    /// The product of `factors`
    pub fn product(factors: impl IntoIterator<Item = Expr>) -> Self {
        Self::Product(factors.into_iter().collect())
    }

    /// `self * other`
    pub fn mul(self, other: Expr) -> Self {
        match self {
            Self::Product(mut factors) => {
                factors.push(other);
                Self::Product(factors)
            }
            e => Self::Product(vec![e, other]),
        }
    }

    /// `self^exponent` for a public exponent
    pub fn pow(self, exponent: Scalar) -> Self {
        Self::Power(Box::new(self), Exponent::Constant(exponent))
    }

    /// `self^witness`
    pub fn pow_witness(self, witness: impl Into<String>) -> Self {
        Self::Power(Box::new(self), Exponent::Witness(witness.into()))
    }

    /// `self^-1`
    pub fn inv(self) -> Self {
        Self::Inverse(Box::new(self))
    }

    /// `e(g1, g2)`
    pub fn pairing(g1: Expr, g2: Expr) -> Self {
        Self::Pairing {
            g1: Box::new(g1),
            g2: Box::new(g2),
            power: None,
        }
    }

    /// `e(g1, g2)^power`
    pub fn pairing_pow(g1: Expr, g2: Expr, power: i64) -> Self {
        Self::Pairing {
            g1: Box::new(g1),
            g2: Box::new(g2),
            power: Some(power),
        }
    }

    /// Every witness name that occurs in the expression
    pub fn witnesses(&self) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        self.collect_witnesses(&mut names);
        names
    }

    fn collect_witnesses(&self, names: &mut BTreeSet<String>) {
        match self {
            Self::Literal(_) => {}
            Self::Product(factors) => factors.iter().for_each(|f| f.collect_witnesses(names)),
            Self::Power(base, exponent) => {
                base.collect_witnesses(names);
                if let Exponent::Witness(w) = exponent {
                    names.insert(w.clone());
                }
            }
            Self::Inverse(e) => e.collect_witnesses(names),
            Self::Pairing { g1, g2, .. } => {
                g1.collect_witnesses(names);
                g2.collect_witnesses(names);
            }
        }
    }

    fn linearize(&self) -> AnonResult<LinearForm> {
        match self {
            Self::Literal(e) => Ok(LinearForm {
                constant: Some(*e),
                terms: Vec::new(),
            }),
            Self::Product(factors) => {
                let mut form = LinearForm::default();
                for f in factors {
                    form = form.combine(f.linearize()?)?;
                }
                Ok(form)
            }
            Self::Inverse(e) => Ok(e.linearize()?.scale(&-Scalar::ONE)),
            Self::Power(base, Exponent::Constant(c)) => Ok(base.linearize()?.scale(c)),
            Self::Power(base, Exponent::Witness(w)) => {
                let form = base.linearize()?;
                if !form.terms.is_empty() {
                    return Err(Error::NonLinearRelation(
                        "a witness power of an expression that already holds a witness",
                    ));
                }
                let base = form.constant.ok_or(Error::NonLinearRelation(
                    "a witness power of an empty product",
                ))?;
                Ok(LinearForm {
                    constant: None,
                    terms: vec![Term {
                        base,
                        witness: w.clone(),
                        coefficient: Scalar::ONE,
                    }],
                })
            }
            Self::Pairing { g1, g2, power } => {
                let a = g1.linearize()?;
                let b = g2.linearize()?;
                if !a.terms.is_empty() && !b.terms.is_empty() {
                    return Err(Error::NonLinearRelation(
                        "both sides of a pairing hold witnesses",
                    ));
                }
                let a_const = a.constant_or_identity(GroupKind::G1)?;
                let b_const = b.constant_or_identity(GroupKind::G2)?;
                let mut terms = Vec::with_capacity(a.terms.len() + b.terms.len());
                for t in a.terms {
                    terms.push(Term {
                        base: t.base.pair(&b_const)?,
                        witness: t.witness,
                        coefficient: t.coefficient,
                    });
                }
                for t in b.terms {
                    terms.push(Term {
                        base: a_const.pair(&t.base)?,
                        witness: t.witness,
                        coefficient: t.coefficient,
                    });
                }
                let constant = if a_const.is_identity() || b_const.is_identity() {
                    None
                } else {
                    Some(a_const.pair(&b_const)?)
                };
                let form = LinearForm { constant, terms };
                Ok(match power {
                    Some(p) => form.scale(&crate::utils::scalar_from_i64(*p)),
                    None => form,
                })
            }
        }
    }
}

/// One factor `base^(coefficient * witness)` of a linear equation
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Term {
    /// The public base
    pub base: GroupElement,
    /// The witness name
    pub witness: String,
    /// The public coefficient
    pub coefficient: Scalar,
}

#[derive(Clone, Debug, Default)]
struct LinearForm {
    constant: Option<GroupElement>,
    terms: Vec<Term>,
}

impl LinearForm {
    fn kind(&self) -> Option<GroupKind> {
        self.constant
            .map(|c| c.kind())
            .or_else(|| self.terms.first().map(|t| t.base.kind()))
    }

    fn check_kind(&self, kind: GroupKind) -> AnonResult<()> {
        let consistent = self.constant.map_or(true, |c| c.kind() == kind)
            && self.terms.iter().all(|t| t.base.kind() == kind);
        if consistent {
            Ok(())
        } else {
            Err(Error::IncompatibleGroups)
        }
    }

    fn constant_or_identity(&self, kind: GroupKind) -> AnonResult<GroupElement> {
        self.check_kind(kind)?;
        Ok(self.constant.unwrap_or_else(|| GroupElement::identity(kind)))
    }

    fn combine(mut self, other: LinearForm) -> AnonResult<Self> {
        if let (Some(a), Some(b)) = (self.kind(), other.kind()) {
            if a != b {
                return Err(Error::IncompatibleGroups);
            }
        }
        self.constant = match (self.constant, other.constant) {
            (Some(a), Some(b)) => Some(a.op(&b)?),
            (a, b) => a.or(b),
        };
        self.terms.extend(other.terms);
        Ok(self)
    }

    fn scale(mut self, s: &Scalar) -> Self {
        self.constant = self.constant.map(|c| c.pow(s));
        for t in self.terms.iter_mut() {
            t.coefficient *= *s;
        }
        self
    }
}

/// `lhs == rhs`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Equation {
    /// The left side
    pub lhs: Expr,
    /// The right side
    pub rhs: Expr,
}

impl Equation {
    /// Create a new equation
    pub fn new(lhs: Expr, rhs: Expr) -> Self {
        Self { lhs, rhs }
    }

    /// The witnesses of both sides
    pub fn witnesses(&self) -> BTreeSet<String> {
        let mut names = self.lhs.witnesses();
        names.extend(self.rhs.witnesses());
        names
    }

    /// Normalize to `Π base^(coefficient * witness) = target`
    pub fn linearize(&self) -> AnonResult<LinearEquation> {
        let lhs = self.lhs.linearize()?;
        let rhs = self.rhs.linearize()?;
        let kind = lhs
            .kind()
            .or_else(|| rhs.kind())
            .ok_or(Error::NonLinearRelation("an equation between empty products"))?;
        let target = rhs
            .constant_or_identity(kind)?
            .op(&lhs.constant_or_identity(kind)?.inv())?;
        let mut terms = lhs.terms;
        terms.extend(rhs.terms.into_iter().map(|t| Term {
            coefficient: -t.coefficient,
            ..t
        }));
        Ok(LinearEquation {
            kind,
            terms,
            target,
        })
    }
}

/// `Π base_j^(coefficient_j * x_j) = target`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinearEquation {
    /// The group the equation lives in
    pub kind: GroupKind,
    /// The witness carrying factors
    pub terms: Vec<Term>,
    /// The public right hand side
    pub target: GroupElement,
}

impl LinearEquation {
    /// Evaluate the left side with witnesses replaced by `assignment`
    pub fn evaluate(&self, assignment: &BTreeMap<String, Scalar>) -> AnonResult<GroupElement> {
        let mut acc = GroupElement::identity(self.kind);
        for t in &self.terms {
            let x = assignment
                .get(&t.witness)
                .ok_or_else(|| Error::MissingWitness(t.witness.clone()))?;
            acc = acc.op(&t.base.pow(&(t.coefficient * x)))?;
        }
        Ok(acc)
    }

    /// Does `assignment` satisfy the equation
    pub fn holds(&self, assignment: &BTreeMap<String, Scalar>) -> AnonResult<bool> {
        Ok(self.evaluate(assignment)? == self.target)
    }

    /// An equation without witnesses is a consistency check on public values
    pub fn holds_trivially(&self) -> bool {
        self.terms.is_empty() && self.target.is_identity()
    }

    /// Add the public shape of the equation to the transcript
    pub fn add_challenge_contribution(&self, transcript: &mut Transcript) {
        transcript.append_message(b"equation terms", &Uint::from(self.terms.len()).to_vec());
        for t in &self.terms {
            transcript.append_message(b"term witness", t.witness.as_bytes());
            transcript.append_message(b"term base", &t.base.to_bytes());
            transcript.append_message(b"term coefficient", &t.coefficient.to_be_bytes());
        }
        transcript.append_message(b"equation target", &self.target.to_bytes());
    }
}
