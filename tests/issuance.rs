mod util;

use anonrate::issuance::IssuanceState;
use anonrate::prelude::*;
use rand::thread_rng;
use util::*;

#[test]
fn interactive_issuance_works() {
    setup();
    let res = test_interactive_issuance_works();
    assert!(res.is_ok(), "{:?}", res);
}

fn test_interactive_issuance_works() -> AnonResult<()> {
    let mut rng = thread_rng();
    let holder = Holder::new(7);
    let (issuer, space) = id_card()?;
    let attributes: Attributes = [("age", AttributeValue::from(33i64))].into_iter().collect();

    let mut issuer_session = IssuerSession::<Attributes>::new(holder.system, &issuer, &space)?;
    assert_eq!(issuer_session.state(), IssuanceState::Created);
    let (mut requester, request, announcement) = RequesterSession::begin(
        holder.system,
        &space,
        &holder.usk,
        &holder.identity,
        attributes,
        &mut rng,
    )?;
    let challenge = issuer_session.receive_announcements(request, announcement, &mut rng)?;
    let response = requester.receive_challenge(challenge)?;
    assert!(requester.receive_challenge(challenge).is_err());
    assert!(issuer_session.verify(&response)?);
    let blind = issuer_session.issue(&mut rng)?;
    assert_eq!(issuer_session.state(), IssuanceState::Issued);

    let credential = requester.complete(blind)?;
    assert!(credential.verify(&holder.usk));
    assert_eq!(
        credential.value(&space, "age"),
        Some(&AttributeValue::from(33i64))
    );
    assert_eq!(
        credential.value(&space, "gender"),
        Some(&AttributeValue::Undefined)
    );
    Ok(())
}

#[test]
fn out_of_order_sessions_fail() {
    setup();
    let res = test_out_of_order_sessions_fail();
    assert!(res.is_ok(), "{:?}", res);
}

fn test_out_of_order_sessions_fail() -> AnonResult<()> {
    let holder = Holder::new(7);
    let (issuer, space) = id_card()?;
    let mut session = IssuerSession::<Attributes>::new(holder.system, &issuer, &space)?;
    assert!(matches!(
        session.issue(thread_rng()),
        Err(Error::InvalidIssuanceState(_))
    ));

    let (other, _) = id_card()?;
    assert!(matches!(
        IssuerSession::<Attributes>::new(holder.system, &other, &space),
        Err(Error::InvalidArgument(_))
    ));
    Ok(())
}

#[test]
fn non_interactive_review_token() {
    setup();
    let res = test_non_interactive_review_token();
    assert!(res.is_ok(), "{:?}", res);
}

fn test_non_interactive_review_token() -> AnonResult<()> {
    let mut rng = thread_rng();
    let holder = Holder::new(7);
    let (rating, rating_issuer) = Issuer::new(1, &mut rng)?;
    let item = HashOfItem::new(b"restaurant");

    let (mut requester, request, _) = RequesterSession::begin(
        holder.system,
        &rating,
        &holder.usk,
        &holder.identity,
        item,
        &mut rng,
    )?;
    let request = requester.non_interactive_request(request, b"rating service")?;

    let mut replay = IssuerSession::<HashOfItem>::new(holder.system, &rating_issuer, &rating)?;
    assert_eq!(
        replay.issue_non_interactive(&request, b"other service", &mut rng),
        Err(Error::IssuanceRejected)
    );
    assert_eq!(replay.state(), IssuanceState::Rejected);

    let mut session = IssuerSession::<HashOfItem>::new(holder.system, &rating_issuer, &rating)?;
    let blind = session.issue_non_interactive(&request, b"rating service", &mut rng)?;
    let token = requester.complete(blind)?;
    assert!(token.verify(&holder.usk));
    assert_eq!(token.item, item);
    Ok(())
}

#[test]
fn registration_has_no_attributes() {
    setup();
    let res = test_registration_has_no_attributes();
    assert!(res.is_ok(), "{:?}", res);
}

fn test_registration_has_no_attributes() -> AnonResult<()> {
    let holder = Holder::new(9);
    let (public, manager) = Issuer::new(0, thread_rng())?;
    let space = AttributeSpace::empty(public)?;
    let registration = issue(
        holder.system,
        &manager,
        &space,
        &holder.usk,
        &holder.identity,
        Attributes::default(),
        thread_rng(),
    )?;
    assert!(registration.attributes.is_empty());
    assert!(registration.verify(&holder.usk));
    Ok(())
}
