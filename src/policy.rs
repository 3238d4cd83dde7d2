use crate::{
    attribute::AttributeSpace, error::Error, predicate::PredicatePolicyFact, AnonResult,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A `threshold` of `children.len()` gate
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub struct ThresholdPolicy {
    /// How many children must hold
    pub threshold: usize,
    /// The children
    pub children: Vec<PolicyNode>,
}

/// A node of a policy tree
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub enum PolicyNode {
    /// A nested gate
    Gate(ThresholdPolicy),
    /// A leaf
    Fact(PolicyFact),
}

/// A policy leaf
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub enum PolicyFact {
    /// A predicate over an attribute of the enclosing credential
    Predicate(PredicatePolicyFact),
    /// A credential from a given issuer that satisfies a nested policy
    SubPolicy(SubPolicyPolicyFact),
}

/// Scopes a nested policy to a credential over `space`
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub struct SubPolicyPolicyFact {
    /// The attribute space, which names the issuer
    pub space: AttributeSpace,
    /// Attributes whose values are revealed
    pub disclosed: BTreeSet<String>,
    /// The nested policy, its leaves are predicates
    pub policy: ThresholdPolicy,
}

impl From<ThresholdPolicy> for PolicyNode {
    fn from(p: ThresholdPolicy) -> Self {
        Self::Gate(p)
    }
}

impl From<PredicatePolicyFact> for PolicyNode {
    fn from(f: PredicatePolicyFact) -> Self {
        Self::Fact(PolicyFact::Predicate(f))
    }
}

impl From<SubPolicyPolicyFact> for PolicyNode {
    fn from(f: SubPolicyPolicyFact) -> Self {
        Self::Fact(PolicyFact::SubPolicy(f))
    }
}

impl SubPolicyPolicyFact {
    /// A sub-policy that discloses nothing
    pub fn new(space: AttributeSpace, policy: ThresholdPolicy) -> Self {
        Self {
            space,
            disclosed: BTreeSet::new(),
            policy,
        }
    }

    /// Reveal the attribute `name`
    pub fn disclose(mut self, name: impl Into<String>) -> Self {
        self.disclosed.insert(name.into());
        self
    }

    /// The slot indices of the disclosed attributes
    pub fn disclosed_slots(&self) -> AnonResult<Vec<usize>> {
        self.disclosed
            .iter()
            .map(|n| {
                self.space.index_of(n).ok_or_else(|| {
                    Error::InvalidArgument(format!("cannot disclose unknown attribute '{}'", n))
                })
            })
            .collect()
    }
}

impl ThresholdPolicy {
    /// A `threshold` of `children` gate
    pub fn new(threshold: usize, children: Vec<PolicyNode>) -> Self {
        Self {
            threshold,
            children,
        }
    }

    /// Every child must hold
    pub fn all(children: Vec<PolicyNode>) -> Self {
        Self::new(children.len(), children)
    }

    /// One child must hold
    pub fn any(children: Vec<PolicyNode>) -> Self {
        Self::new(1, children)
    }

    /// Does every child have to hold
    pub fn is_full(&self) -> bool {
        self.threshold == self.children.len()
    }

    /// Check the structure of a presentation policy.
    ///
    /// Top level leaves must be sub-policies whose leaves are predicates over
    /// slots of their space. Disclosure is only allowed when every gate on
    /// the path is full because a simulated branch cannot reveal values.
    pub fn validate(&self) -> AnonResult<()> {
        self.validate_top(true)
    }

    fn check_threshold(&self) -> AnonResult<()> {
        if self.threshold == 0 || self.threshold > self.children.len() {
            return Err(Error::InvalidArgument(format!(
                "threshold {} is not in [1, {}]",
                self.threshold,
                self.children.len()
            )));
        }
        Ok(())
    }

    fn validate_top(&self, full_path: bool) -> AnonResult<()> {
        self.check_threshold()?;
        let full_path = full_path && self.is_full();
        for child in &self.children {
            match child {
                PolicyNode::Gate(g) => g.validate_top(full_path)?,
                PolicyNode::Fact(PolicyFact::SubPolicy(s)) => {
                    if !s.disclosed.is_empty() && !full_path {
                        return Err(Error::InvalidArgument(
                            "attributes can only be disclosed below full gates".to_string(),
                        ));
                    }
                    s.disclosed_slots()?;
                    s.policy.validate_nested(&s.space)?;
                }
                PolicyNode::Fact(PolicyFact::Predicate(_)) => {
                    return Err(Error::InvalidArgument(
                        "predicates must be scoped by a sub-policy".to_string(),
                    ))
                }
            }
        }
        Ok(())
    }

    fn validate_nested(&self, space: &AttributeSpace) -> AnonResult<()> {
        self.check_threshold()?;
        for child in &self.children {
            match child {
                PolicyNode::Gate(g) => g.validate_nested(space)?,
                PolicyNode::Fact(PolicyFact::Predicate(p)) => {
                    if let Some(slot) = p.slots().into_iter().find(|s| *s >= space.len()) {
                        return Err(Error::InvalidArgument(format!(
                            "attribute slot {} is not in the attribute space",
                            slot
                        )));
                    }
                }
                PolicyNode::Fact(PolicyFact::SubPolicy(_)) => {
                    return Err(Error::InvalidArgument(
                        "sub-policies cannot be nested".to_string(),
                    ))
                }
            }
        }
        Ok(())
    }

    /// Evaluate the policy with `leaf` deciding each fact
    pub fn is_satisfied<F>(&self, leaf: &F) -> bool
    where
        F: Fn(&PolicyFact) -> bool,
    {
        self.children
            .iter()
            .filter(|c| match c {
                PolicyNode::Gate(g) => g.is_satisfied(leaf),
                PolicyNode::Fact(f) => leaf(f),
            })
            .count()
            >= self.threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        attribute::{AttributeDefinition, AttributeKind, AttributeValue},
        issuer::Issuer,
        predicate::Predicate,
    };
    use indexmap::IndexMap;

    fn space() -> AttributeSpace {
        let (public, _) = Issuer::new(2, rand::thread_rng()).unwrap();
        let mut definitions = IndexMap::new();
        definitions.insert(
            "age".to_string(),
            AttributeDefinition::new(AttributeKind::Integer { min: None, max: None }, "age"),
        );
        definitions.insert(
            "gender".to_string(),
            AttributeDefinition::new(AttributeKind::String { max_length: None }, "gender"),
        );
        AttributeSpace::new(definitions, public).unwrap()
    }

    fn not_f(slot: usize) -> PolicyNode {
        PredicatePolicyFact::new(slot, Predicate::UnequalConst(AttributeValue::from("F"))).into()
    }

    #[test]
    fn valid_policies() {
        let space = space();
        let nested = ThresholdPolicy::all(vec![not_f(1)]);
        let policy = ThresholdPolicy::all(vec![SubPolicyPolicyFact::new(space.clone(), nested.clone())
            .disclose("age")
            .into()]);
        assert!(policy.validate().is_ok());

        let or = ThresholdPolicy::any(vec![
            SubPolicyPolicyFact::new(space.clone(), nested.clone()).into(),
            SubPolicyPolicyFact::new(space.clone(), nested.clone()).into(),
        ]);
        assert!(or.validate().is_ok());
    }

    #[test]
    fn invalid_policies() {
        let space = space();
        let nested = ThresholdPolicy::all(vec![not_f(1)]);
        let sub = || SubPolicyPolicyFact::new(space.clone(), nested.clone());

        assert!(ThresholdPolicy::new(0, vec![sub().into()]).validate().is_err());
        assert!(ThresholdPolicy::new(2, vec![sub().into()]).validate().is_err());
        assert!(ThresholdPolicy::all(vec![not_f(0)]).validate().is_err());

        let disclosed_in_or = ThresholdPolicy::any(vec![sub().disclose("age").into(), sub().into()]);
        assert!(disclosed_in_or.validate().is_err());

        let unknown = ThresholdPolicy::all(vec![sub().disclose("height").into()]);
        assert!(unknown.validate().is_err());

        let deep = ThresholdPolicy::all(vec![SubPolicyPolicyFact::new(
            space.clone(),
            ThresholdPolicy::all(vec![sub().into()]),
        )
        .into()]);
        assert!(deep.validate().is_err());

        let bad_slot =
            ThresholdPolicy::all(vec![SubPolicyPolicyFact::new(space.clone(), ThresholdPolicy::all(vec![not_f(5)])).into()]);
        assert!(bad_slot.validate().is_err());
    }

    #[test]
    fn evaluation() {
        let values = vec![AttributeValue::from(30i64), AttributeValue::from("M")];
        let policy = ThresholdPolicy::new(
            2,
            vec![
                not_f(1),
                PredicatePolicyFact::new(1, Predicate::EqualConst(AttributeValue::from("F"))).into(),
                ThresholdPolicy::any(vec![PredicatePolicyFact::new(
                    0,
                    Predicate::EqualConst(AttributeValue::from(30i64)),
                )
                .into()])
                .into(),
            ],
        );
        let leaf = |f: &PolicyFact| match f {
            PolicyFact::Predicate(p) => p.is_satisfied(&values),
            PolicyFact::SubPolicy(_) => false,
        };
        assert!(policy.is_satisfied(&leaf));
        let strict = ThresholdPolicy::all(policy.children.clone());
        assert!(!strict.is_satisfied(&leaf));
    }
}
