mod util;

use anonrate::prelude::*;
use anonrate::presentation::{DisclosureProver, DisclosureVerifier};
use blsful::inner_types::Field;
use rand::thread_rng;
use util::*;

#[test]
fn adult_disclosure_works() {
    setup();
    let res = test_adult_disclosure_works();
    assert!(res.is_ok(), "{:?}", res);
}

fn test_adult_disclosure_works() -> AnonResult<()> {
    let holder = Holder::new(7);
    let (issuer, space) = id_card()?;
    let credential = id_credential(&holder, &issuer, &space, 25, "M")?;
    assert!(credential.verify(&holder.usk));

    let policy = ThresholdPolicy::all(vec![adult_not_female(&space)?.into()]);
    let witness = holder.witness(vec![credential]);
    let proof = build_disclosure_proof(holder.system, &policy, &witness, b"shop", thread_rng())?;
    assert!(proof.disclosed.is_empty());
    assert!(verify_disclosure_proof(
        holder.system,
        &policy,
        &proof,
        b"shop"
    )?);
    assert!(!verify_disclosure_proof(
        holder.system,
        &policy,
        &proof,
        b"bar"
    )?);
    Ok(())
}

#[test]
fn under_age_is_out_of_range() {
    setup();
    let res = test_under_age_is_out_of_range();
    assert!(res.is_ok(), "{:?}", res);
}

fn test_under_age_is_out_of_range() -> AnonResult<()> {
    let holder = Holder::new(7);
    let (issuer, space) = id_card()?;
    let credential = id_credential(&holder, &issuer, &space, 10, "M")?;
    let policy = ThresholdPolicy::all(vec![adult_not_female(&space)?.into()]);
    let res = build_disclosure_proof(
        holder.system,
        &policy,
        &holder.witness(vec![credential]),
        b"",
        thread_rng(),
    );
    assert_eq!(
        res.err(),
        Some(Error::ValueOutOfRange {
            value: 10,
            lower: 18,
            upper: 130
        })
    );
    Ok(())
}

#[test]
fn disclosed_gender_is_revealed() {
    setup();
    let res = test_disclosed_gender_is_revealed();
    assert!(res.is_ok(), "{:?}", res);
}

fn test_disclosed_gender_is_revealed() -> AnonResult<()> {
    let holder = Holder::new(11);
    let (issuer, space) = id_card()?;
    let credential = id_credential(&holder, &issuer, &space, 40, "X")?;
    let policy = ThresholdPolicy::all(vec![adult_not_female(&space)?.disclose("age").into()]);
    let proof = build_disclosure_proof(
        holder.system,
        &policy,
        &holder.witness(vec![credential]),
        b"",
        thread_rng(),
    )?;
    assert_eq!(proof.disclosed["policy.0"]["age"], AttributeValue::from(40i64));
    assert!(verify_disclosure_proof(holder.system, &policy, &proof, b"")?);

    let mut lied = proof.clone();
    lied.disclosed
        .get_mut("policy.0")
        .ok_or(Error::General("missing disclosure"))?
        .insert("age".to_string(), AttributeValue::from(41i64));
    assert!(!verify_disclosure_proof(holder.system, &policy, &lied, b"")?);
    Ok(())
}

#[test]
fn two_credentials_share_one_secret() {
    setup();
    let res = test_two_credentials_share_one_secret();
    assert!(res.is_ok(), "{:?}", res);
}

fn test_two_credentials_share_one_secret() -> AnonResult<()> {
    let holder = Holder::new(7);
    let (issuer, space) = id_card()?;
    let (other_issuer, other_space) = id_card()?;
    let first = id_credential(&holder, &issuer, &space, 30, "M")?;
    let second = id_credential(&holder, &other_issuer, &other_space, 30, "M")?;
    let policy = ThresholdPolicy::all(vec![
        adult_not_female(&space)?.into(),
        adult_not_female(&other_space)?.into(),
    ]);
    let proof = build_disclosure_proof(
        holder.system,
        &policy,
        &holder.witness(vec![second, first]),
        b"",
        thread_rng(),
    )?;
    assert!(verify_disclosure_proof(holder.system, &policy, &proof, b"")?);

    // a credential of somebody else cannot be combined with ours
    let stranger = Holder::new(8);
    let foreign = id_credential(&stranger, &other_issuer, &other_space, 30, "M")?;
    let ours = id_credential(&holder, &issuer, &space, 30, "M")?;
    let res = build_disclosure_proof(
        holder.system,
        &policy,
        &holder.witness(vec![ours, foreign]),
        b"",
        thread_rng(),
    );
    assert!(res.is_err());
    Ok(())
}

#[test]
fn tampered_transcripts_fail() {
    setup();
    let res = test_tampered_transcripts_fail();
    assert!(res.is_ok(), "{:?}", res);
}

fn test_tampered_transcripts_fail() -> AnonResult<()> {
    let mut rng = thread_rng();
    let holder = Holder::new(7);
    let (issuer, space) = id_card()?;
    let credential = id_credential(&holder, &issuer, &space, 25, "M")?;
    let policy = ThresholdPolicy::all(vec![adult_not_female(&space)?.into()]);
    let witness = holder.witness(vec![credential]);

    let prover = DisclosureProver::new(holder.system, &policy, &witness, &mut rng)?;
    let verifier = DisclosureVerifier::new(
        holder.system,
        &policy,
        prover.pseudonym(),
        prover.disclosed(),
    )?;
    let challenge = Scalar::random(&mut rng);
    let announcement = prover.announcement();
    let response = prover.respond(challenge)?;
    assert!(verifier.verify(&announcement, challenge, &response));
    assert!(!verifier.verify(&announcement, challenge + Scalar::ONE, &response));

    let other = DisclosureProver::new(holder.system, &policy, &witness, &mut rng)?;
    let other_response = other.respond(challenge)?;
    assert!(!verifier.verify(&announcement, challenge, &other_response));
    assert!(!verifier.verify(&other.announcement(), challenge, &response));
    Ok(())
}
