//! Integration test: quorum validation of price publications.
//!
//! Four oracles are selected. Publications are checked against:
//! 1. The majority boundary (2 of 4 rejected, 3 of 4 accepted)
//! 2. Signature ordering and duplicates
//! 3. Signers and submitters outside the round
//! 4. Messages that do not build on the last publication
//! 5. The emergency publication window
//!
//! Every rejected publication must leave points and the price untouched.

use oraclenet_crypto::message::PriceMessage;
use oraclenet_integration_tests::{pair, signed_votes, Harness, Oracle, GOVERNOR, READER};
use oraclenet_network::{AdminAction, ErrorCategory, NetworkError, Transaction};
use oraclenet_round::{PairParams, RoundError};
use oraclenet_types::PairId;

struct Scenario {
    harness: Harness,
    btc: PairId,
    oracles: Vec<Oracle>,
    outsider: Oracle,
}

fn scenario() -> Scenario {
    let oracles: Vec<Oracle> = (1..=4).map(Oracle::new).collect();
    let outsider = Oracle::new(9);
    let mut funded: Vec<&Oracle> = oracles.iter().collect();
    funded.push(&outsider);

    let mut harness = Harness::new(&funded);
    let btc = pair("BTCUSD");
    harness
        .register_pair(
            btc,
            PairParams {
                max_selected: 4,
                max_subscribed: 8,
                min_subscription_stake: 1,
                emergency_publishing_period_blocks: 30,
                ..PairParams::default()
            },
        )
        .expect("pair registration should succeed");

    for (i, oracle) in oracles.iter().enumerate() {
        harness
            .onboard(oracle, 10 + i as u128, btc)
            .expect("onboarding should succeed");
    }
    // Registered and staked, never subscribed.
    harness
        .send(
            outsider.owner,
            Transaction::RegisterOracle {
                reporter: outsider.reporter(),
                label: "outsider".into(),
            },
        )
        .expect("outsider registration");

    Scenario {
        harness,
        btc,
        oracles,
        outsider,
    }
}

/// Oracles ordered by reporting address, the order votes must be in.
fn by_reporter(oracles: &[Oracle]) -> Vec<&Oracle> {
    let mut sorted: Vec<&Oracle> = oracles.iter().collect();
    sorted.sort_by_key(|o| o.reporter());
    sorted
}

fn round_error(err: NetworkError) -> Option<RoundError> {
    match err {
        NetworkError::Round(e) => Some(e),
        _ => None,
    }
}

fn total_points(s: &Scenario) -> u64 {
    s.oracles
        .iter()
        .map(|o| {
            s.harness
                .network
                .points_of(&s.btc, &o.owner)
                .expect("points")
                .unwrap_or(0)
        })
        .sum()
}

#[test]
fn majority_boundary() {
    let mut s = scenario();
    let sorted = by_reporter(&s.oracles);

    // floor(4 / 2) = 2 signatures is not a majority.
    let err = s
        .harness
        .publish(s.btc, 100, sorted[0], &sorted[..2])
        .expect_err("two of four");
    assert_eq!(
        round_error(err),
        Some(RoundError::QuorumNotMet {
            signatures: 2,
            selected: 4
        })
    );
    assert_eq!(total_points(&s), 0);

    // floor(4 / 2) + 1 = 3 signatures is.
    s.harness
        .publish(s.btc, 100, sorted[0], &sorted[..3])
        .expect("three of four");
    assert_eq!(total_points(&s), 3);
    assert_eq!(s.harness.network.get_price(&s.btc, &READER).expect("price"), 100);
}

#[test]
fn unordered_and_duplicate_signatures() {
    let mut s = scenario();
    let sorted = by_reporter(&s.oracles);
    let voted = sorted[0];
    let message = s.harness.message(s.btc, 100, voted).expect("message");

    // [high, low]
    let mut votes = signed_votes(&message, &sorted[..3]);
    votes.swap(0, 2);
    let err = s
        .harness
        .send(
            voted.reporter(),
            Transaction::Publish {
                message,
                votes,
            },
        )
        .expect_err("unordered");
    assert!(matches!(round_error(err), Some(RoundError::UnorderedOrDuplicate(_))));

    // [a, a, b]
    let mut votes = signed_votes(&message, &[sorted[0], sorted[1]]);
    let first = votes[0].clone();
    votes.insert(0, first);
    let err = s
        .harness
        .send(voted.reporter(), Transaction::Publish { message, votes })
        .expect_err("duplicate");
    assert_eq!(round_error(err), Some(RoundError::UnorderedOrDuplicate(1)));
    assert_eq!(total_points(&s), 0);
}

#[test]
fn signer_and_submitter_checks() {
    let mut s = scenario();
    let sorted = by_reporter(&s.oracles);
    let voted = sorted[0];

    // A registered oracle outside the round cannot sign.
    let mut signers: Vec<&Oracle> = sorted[..3].to_vec();
    signers[2] = &s.outsider;
    let err = s
        .harness
        .publish(s.btc, 100, voted, &signers)
        .expect_err("outsider signature");
    assert_eq!(round_error(err), Some(RoundError::SignerNotSelected(s.outsider.reporter())));

    // Nor can it be voted to submit.
    let err = s
        .harness
        .publish(s.btc, 100, &s.outsider, &sorted[..3])
        .expect_err("outsider voted");
    assert_eq!(round_error(err), Some(RoundError::VoterNotSelected(s.outsider.reporter())));

    // Only the voted reporter may send the transaction.
    let message = s.harness.message(s.btc, 100, voted).expect("message");
    let votes = signed_votes(&message, &sorted[..3]);
    let err = s
        .harness
        .send(sorted[1].reporter(), Transaction::Publish { message, votes })
        .expect_err("wrong sender");
    assert!(matches!(round_error(err), Some(RoundError::SenderMismatch { .. })));

    // The voted reporter must sign its own publication.
    let err = s
        .harness
        .publish(s.btc, 100, voted, &sorted[1..4])
        .expect_err("voter did not sign");
    assert_eq!(round_error(err), Some(RoundError::SubmitterNotSigner(voted.reporter())));
    assert_eq!(total_points(&s), 0);
}

#[test]
fn message_must_build_on_last_publication() {
    let mut s = scenario();
    let sorted = by_reporter(&s.oracles);
    let voted = sorted[0];

    let stale = s.harness.message(s.btc, 100, voted).expect("message");
    s.harness
        .publish(s.btc, 100, voted, &sorted[..3])
        .expect("first publication");

    // Signed against the previous reference block.
    let votes = signed_votes(&stale, &sorted[..3]);
    let err = s
        .harness
        .send(voted.reporter(), Transaction::Publish { message: stale, votes })
        .expect_err("stale");
    assert!(matches!(round_error(err), Some(RoundError::StaleBlock { .. })));

    // Wrong version, zero price and a forged signature.
    let current = s.harness.message(s.btc, 100, voted).expect("message");
    let versioned = PriceMessage {
        version: current.version + 1,
        ..current
    };
    let votes = signed_votes(&versioned, &sorted[..3]);
    let err = s
        .harness
        .send(voted.reporter(), Transaction::Publish { message: versioned, votes })
        .expect_err("version");
    assert!(matches!(round_error(err), Some(RoundError::WrongVersion { .. })));

    let zero = PriceMessage { price: 0, ..current };
    let votes = signed_votes(&zero, &sorted[..3]);
    let err = s
        .harness
        .send(voted.reporter(), Transaction::Publish { message: zero, votes })
        .expect_err("zero price");
    assert_eq!(round_error(err), Some(RoundError::ZeroPrice));

    let mut votes = signed_votes(&current, &sorted[..3]);
    votes[1] = PriceMessage { price: 101, ..current }.sign(&sorted[1].keys.signing_key);
    let err = s
        .harness
        .send(voted.reporter(), Transaction::Publish { message: current, votes })
        .expect_err("forged");
    assert_eq!(round_error(err), Some(RoundError::InvalidSignature(1)));

    assert_eq!(total_points(&s), 3);
}

#[test]
fn emergency_publication_window() {
    let mut s = scenario();
    let publisher = s.outsider.owner;

    let err = s
        .harness
        .send(publisher, Transaction::EmergencyPublish { pair: s.btc, price: 7 })
        .expect_err("not whitelisted");
    assert_eq!(err.category(), ErrorCategory::Authorization);

    s.harness
        .send(
            GOVERNOR,
            Transaction::Admin(AdminAction::AddEmergencyPublisher {
                pair: s.btc,
                account: publisher,
            }),
        )
        .expect("whitelist publisher");

    // The pair was registered a few blocks ago; the window is 30 blocks.
    let err = s
        .harness
        .send(publisher, Transaction::EmergencyPublish { pair: s.btc, price: 7 })
        .expect_err("window not reached");
    assert!(matches!(round_error(err), Some(RoundError::EmergencyWindowNotReached { .. })));

    s.harness.advance(30, 300);
    s.harness
        .send(publisher, Transaction::EmergencyPublish { pair: s.btc, price: 7 })
        .expect("emergency publication");
    assert_eq!(s.harness.network.get_price(&s.btc, &READER).expect("price"), 7);
    // Quorum messages now build on the emergency block.
    let block = s.harness.block.number;
    let voted = by_reporter(&s.oracles)[0];
    assert_eq!(
        s.harness.message(s.btc, 1, voted).expect("message").last_publication_block,
        block
    );
}
