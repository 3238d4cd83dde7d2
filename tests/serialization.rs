mod util;

use anonrate::prelude::*;
use rand::thread_rng;
use util::*;

#[test]
fn representations_survive() {
    setup();
    let res = test_representations_survive();
    assert!(res.is_ok(), "{:?}", res);
}

fn test_representations_survive() -> AnonResult<()> {
    let holder = Holder::new(7);
    let (issuer, space) = id_card()?;
    let credential = id_credential(&holder, &issuer, &space, 25, "M")?;
    let policy = ThresholdPolicy::all(vec![adult_not_female(&space)?.disclose("gender").into()]);
    let proof = build_disclosure_proof(
        holder.system,
        &policy,
        &holder.witness(vec![credential.clone()]),
        b"archive",
        thread_rng(),
    )?;

    let json = credential.to_json()?;
    assert_eq!(SignatureCredential::from_json(&json)?, credential);
    assert_eq!(AttributeSpace::from_json(&space.to_json()?)?, space);

    let policy_json = policy.to_representation()?;
    assert_eq!(policy_json["type"], "ThresholdPolicy");
    let restored_policy = ThresholdPolicy::from_representation(&policy_json)?;
    assert_eq!(restored_policy, policy);

    let restored_proof = DisclosureProof::from_bytes(&proof.to_bytes()?)?;
    assert_eq!(restored_proof, proof);
    assert!(verify_disclosure_proof(
        holder.system,
        &restored_policy,
        &restored_proof,
        b"archive"
    )?);

    assert!(DisclosureProof::from_json(&json).is_err());
    Ok(())
}

#[test]
fn cbor_round_trip() {
    setup();
    let res = test_cbor_round_trip();
    assert!(res.is_ok(), "{:?}", res);
}

fn test_cbor_round_trip() -> AnonResult<()> {
    let holder = Holder::new(7);
    let (issuer, space) = id_card()?;
    let credential = id_credential(&holder, &issuer, &space, 52, "F")?;
    let bytes = serde_cbor::to_vec(&credential)
        .map_err(|e| Error::Serialization(e.to_string()))?;
    let restored: SignatureCredential =
        serde_cbor::from_slice(&bytes).map_err(|e| Error::Serialization(e.to_string()))?;
    assert_eq!(restored, credential);
    assert!(restored.verify(&holder.usk));
    Ok(())
}

#[test]
fn reviews_and_proofs_survive() {
    setup();
    let res = test_reviews_and_proofs_survive();
    assert!(res.is_ok(), "{:?}", res);
}

fn test_reviews_and_proofs_survive() -> AnonResult<()> {
    let platform = Platform::new()?;
    let holder = Holder::new(9);

    let token: ReviewToken = issue(
        holder.system,
        &platform.rating,
        platform.rating.public(),
        &holder.usk,
        &holder.identity,
        HashOfItem::new(b"bakery"),
        thread_rng(),
    )?;
    for restored in [
        ReviewToken::from_json(&token.to_json()?)?,
        ReviewToken::from_bytes(&Representable::to_bytes(&token)?)?,
    ] {
        assert_eq!(restored.signature, token.signature);
        assert_eq!(restored.item, token.item);
        assert_eq!(restored.issuer, token.issuer);
        assert!(restored.verify(&holder.usk));
    }

    let review = platform.review(&holder, b"bakery", b"fresh bread")?;
    for restored in [
        Review::from_json(&review.to_json()?)?,
        Review::from_bytes(&Representable::to_bytes(&review)?)?,
    ] {
        assert_eq!(restored.message, review.message);
        assert_eq!(restored.item, review.item);
        assert_eq!(restored.registration_signature, review.registration_signature);
        assert_eq!(restored.token_signature, review.token_signature);
        assert_eq!(restored.signature, review.signature);
        assert_eq!(restored.l1, review.l1);
        assert_eq!(restored.l2, review.l2);
        assert!(platform.verify(&holder, &restored));
    }

    let (issuer, space) = id_card()?;
    let credential = id_credential(&holder, &issuer, &space, 33, "M")?;
    let policy = ThresholdPolicy::all(vec![adult_not_female(&space)?.disclose("gender").into()]);
    let proof = build_disclosure_proof(
        holder.system,
        &policy,
        &holder.witness(vec![credential]),
        b"bakery",
        thread_rng(),
    )?;
    for restored in [
        DisclosureProof::from_json(&proof.to_json()?)?,
        DisclosureProof::from_bytes(&Representable::to_bytes(&proof)?)?,
    ] {
        assert_eq!(restored.pseudonym, proof.pseudonym);
        assert_eq!(restored.disclosed, proof.disclosed);
        assert_eq!(restored.proof, proof.proof);
        assert!(verify_disclosure_proof(
            holder.system,
            &policy,
            &restored,
            b"bakery"
        )?);
    }
    Ok(())
}
