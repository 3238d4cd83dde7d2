#![allow(dead_code)]

use anonrate::prelude::*;
use anonrate::predicate::PredicatePolicyFact;
use indexmap::IndexMap;
use rand::thread_rng;

pub fn setup() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub struct Holder {
    pub system: SystemParameters,
    pub usk: HiddenSecret,
    pub identity: Identity,
}

impl Holder {
    pub fn new(usk: u64) -> Self {
        let system = SystemParameters::new(b"anonrate integration");
        let usk = HiddenSecret::from(Scalar::from(usk));
        let identity = Identity::new(&system, &usk, thread_rng());
        Self {
            system,
            usk,
            identity,
        }
    }

    pub fn witness(&self, credentials: Vec<SignatureCredential>) -> DisclosureWitness {
        DisclosureWitness {
            identity: self.identity.clone(),
            usk: self.usk.clone(),
            credentials,
        }
    }
}

/// A system manager and a rating issuer
pub struct Platform {
    pub manager: Issuer,
    pub registry: AttributeSpace,
    pub rating: Issuer,
}

impl Platform {
    pub fn new() -> AnonResult<Self> {
        let (manager_public, manager) = Issuer::new(0, thread_rng())?;
        let (_, rating) = Issuer::new(1, thread_rng())?;
        Ok(Self {
            manager,
            registry: AttributeSpace::empty(manager_public)?,
            rating,
        })
    }

    pub fn review(&self, holder: &Holder, item: &[u8], message: &[u8]) -> AnonResult<Review> {
        let registration = issue(
            holder.system,
            &self.manager,
            &self.registry,
            &holder.usk,
            &holder.identity,
            Attributes::default(),
            thread_rng(),
        )?;
        let token = issue(
            holder.system,
            &self.rating,
            self.rating.public(),
            &holder.usk,
            &holder.identity,
            HashOfItem::new(item),
            thread_rng(),
        )?;
        Review::rate(
            &holder.system,
            &holder.usk,
            &registration,
            &token,
            item,
            message,
            thread_rng(),
        )
    }

    pub fn verify(&self, holder: &Holder, review: &Review) -> bool {
        review.verify(&holder.system, self.rating.public(), self.manager.public())
    }
}

/// An identity card issuer with `age` and `gender` slots
pub fn id_card() -> AnonResult<(Issuer, AttributeSpace)> {
    let (public, issuer) = Issuer::new(2, thread_rng())?;
    let mut definitions = IndexMap::new();
    definitions.insert(
        "age".to_string(),
        AttributeDefinition::new(
            AttributeKind::Integer {
                min: Some(0),
                max: Some(150),
            },
            "age in years",
        ),
    );
    definitions.insert(
        "gender".to_string(),
        AttributeDefinition::new(
            AttributeKind::String {
                max_length: Some(1),
            },
            "gender",
        ),
    );
    Ok((issuer, AttributeSpace::new(definitions, public)?))
}

pub fn id_credential(
    holder: &Holder,
    issuer: &Issuer,
    space: &AttributeSpace,
    age: i64,
    gender: &str,
) -> AnonResult<SignatureCredential> {
    let attributes: Attributes = [
        ("age", AttributeValue::from(age)),
        ("gender", AttributeValue::from(gender)),
    ]
    .into_iter()
    .collect();
    issue(
        holder.system,
        issuer,
        space,
        &holder.usk,
        &holder.identity,
        attributes,
        thread_rng(),
    )
}

/// `18 <= age <= 130 AND gender != "F"`
pub fn adult_not_female(space: &AttributeSpace) -> AnonResult<SubPolicyPolicyFact> {
    Ok(SubPolicyPolicyFact::new(
        space.clone(),
        ThresholdPolicy::all(vec![
            PredicatePolicyFact::new(0, Predicate::in_range(18, 130, 16, thread_rng())?).into(),
            PredicatePolicyFact::new(1, Predicate::UnequalConst(AttributeValue::from("F"))).into(),
        ]),
    ))
}
