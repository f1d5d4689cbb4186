//! Integration test: one full round from registration to reward payout.
//!
//! Exercises the complete oracle lifecycle:
//! 1. Three oracles with stakes 4, 8 and 3 register, stake and subscribe
//! 2. The first subscription opens round 1; the others join mid-round
//! 3. Each oracle submits one price signed by two of the three
//! 4. An early switch is rejected and changes nothing
//! 5. After the lock period the switch pays rewards by points
//! 6. Round 2 starts from the stake-ordered subscribed set
//!
//! Everything goes through `Network::apply`, the same path a replayed
//! transaction log takes.

use oraclenet_integration_tests::{pair, Harness, Oracle, GOVERNOR, INITIAL_BALANCE, READER};
use oraclenet_network::{NetworkError, Transaction};
use oraclenet_round::{PairParams, RoundError};
use oraclenet_types::{Event, PairId};

const LOCK_SECS: u64 = 3_600;
const REWARD_POOL: u128 = 100;

fn params() -> PairParams {
    PairParams {
        max_selected: 3,
        max_subscribed: 5,
        round_lock_period_secs: LOCK_SECS,
        min_subscription_stake: 1,
        ..PairParams::default()
    }
}

struct Scenario {
    harness: Harness,
    btc: PairId,
    a: Oracle,
    b: Oracle,
    c: Oracle,
}

fn scenario() -> Scenario {
    let (a, b, c) = (Oracle::new(1), Oracle::new(2), Oracle::new(3));
    let mut harness = Harness::new(&[&a, &b, &c]);
    let btc = pair("BTCUSD");
    harness.register_pair(btc, params()).expect("pair registration should succeed");

    harness.onboard(&a, 4, btc).expect("onboard a");
    harness.onboard(&b, 8, btc).expect("onboard b");
    harness.onboard(&c, 3, btc).expect("onboard c");

    harness
        .send(
            GOVERNOR,
            Transaction::FundRewards {
                pair: btc,
                amount: REWARD_POOL,
            },
        )
        .expect("funding should succeed");

    Scenario {
        harness,
        btc,
        a,
        b,
        c,
    }
}

#[test]
fn round_opens_with_all_three_selected() {
    let s = scenario();
    let net = &s.harness.network;

    assert_eq!(net.round_number(&s.btc).expect("round"), 1);
    let mut selected = net.selected(&s.btc).expect("selected");
    selected.sort();
    assert_eq!(selected, vec![s.a.owner, s.b.owner, s.c.owner]);
    assert_eq!(net.stake_of(&s.b.owner), 8);
    assert_eq!(net.token_balance(&net.escrow_account()), 15);
}

#[test]
fn three_publications_then_proportional_switch() {
    let mut s = scenario();
    let (a, b, c) = (&s.a, &s.b, &s.c);

    // =========================================================
    // Step 1: three quorum publications, 2-of-3 each
    // =========================================================
    // Points after this step: a = 2, b = 3, c = 1.
    s.harness.publish(s.btc, 65_000, a, &[a, b]).expect("publication 1");
    s.harness.publish(s.btc, 65_100, b, &[a, b]).expect("publication 2");
    s.harness.publish(s.btc, 65_200, c, &[b, c]).expect("publication 3");

    let net = &s.harness.network;
    assert_eq!(net.points_of(&s.btc, &a.owner).expect("points"), Some(2));
    assert_eq!(net.points_of(&s.btc, &b.owner).expect("points"), Some(3));
    assert_eq!(net.points_of(&s.btc, &c.owner).expect("points"), Some(1));
    assert_eq!(net.get_price(&s.btc, &READER).expect("reader"), 65_200);

    // =========================================================
    // Step 2: switching inside the lock period is rejected
    // =========================================================
    let err = s
        .harness
        .send(a.owner, Transaction::SwitchRound { pair: s.btc })
        .expect_err("lock period still active");
    assert!(matches!(
        err,
        NetworkError::Round(RoundError::LockActive { .. })
    ));
    assert_eq!(s.harness.network.round_number(&s.btc).expect("round"), 1);
    assert_eq!(
        s.harness.network.points_of(&s.btc, &b.owner).expect("points"),
        Some(3)
    );

    // =========================================================
    // Step 3: switch after the lock period
    // =========================================================
    s.harness.advance(0, LOCK_SECS);
    let reward_account = s.harness.network.reward_account(&s.btc).expect("reward account");
    let pool_before = s.harness.network.token_balance(&reward_account);
    assert_eq!(pool_before, REWARD_POOL);

    let events = s
        .harness
        .send(c.owner, Transaction::SwitchRound { pair: s.btc })
        .expect("switch should succeed");

    // floor(points * 100 / 6): 33, 50, 16.
    let expected = [(a.owner, 33u128), (b.owner, 50), (c.owner, 16)];
    let net = &s.harness.network;
    let mut paid = 0;
    for (owner, reward) in expected {
        assert!(events.iter().any(|e| matches!(
            e,
            Event::RewardPaid { participant, amount, .. } if *participant == owner && *amount == reward
        )));
        assert_eq!(net.token_balance(&owner), INITIAL_BALANCE - net.stake_of(&owner) + reward);
        paid += reward;
    }
    assert_eq!(net.token_balance(&reward_account), pool_before - paid);
    assert_eq!(net.token_balance(&reward_account), 1);

    let switched = events
        .iter()
        .find_map(|e| match e {
            Event::RoundSwitched {
                round,
                total_points,
                distributed,
                selected,
                ..
            } => Some((*round, *total_points, *distributed, selected.clone())),
            _ => None,
        })
        .expect("round switched event");
    assert_eq!(switched.0, 2);
    assert_eq!(switched.1, 6);
    assert_eq!(switched.2, 99);
    // Stake-descending.
    assert_eq!(switched.3, vec![b.owner, a.owner, c.owner]);

    // =========================================================
    // Step 4: points reset in round 2
    // =========================================================
    for oracle in [a, b, c] {
        assert_eq!(net.points_of(&s.btc, &oracle.owner).expect("points"), Some(0));
    }
}

#[test]
fn switch_without_points_distributes_nothing() {
    let mut s = scenario();
    s.harness.advance(0, LOCK_SECS);
    let events = s
        .harness
        .send(s.a.owner, Transaction::SwitchRound { pair: s.btc })
        .expect("switch should succeed");

    assert!(!events.iter().any(|e| matches!(e, Event::RewardPaid { .. })));
    let reward_account = s.harness.network.reward_account(&s.btc).expect("reward account");
    assert_eq!(s.harness.network.token_balance(&reward_account), REWARD_POOL);
    assert_eq!(s.harness.network.round_number(&s.btc).expect("round"), 2);
}

#[test]
fn unsubscribed_oracle_drops_out_at_switch() {
    let mut s = scenario();
    let (a, b) = (&s.a, &s.b);
    s.harness.publish(s.btc, 1, a, &[a, b]).expect("publication");
    s.harness
        .send(a.owner, Transaction::Unsubscribe { pair: s.btc })
        .expect("unsubscribe");

    // Still selected, still holding points until the switch.
    assert!(s.harness.network.selected(&s.btc).expect("selected").contains(&a.owner));
    assert_eq!(s.harness.network.points_of(&s.btc, &a.owner).expect("points"), Some(1));

    s.harness.advance(0, LOCK_SECS);
    s.harness
        .send(b.owner, Transaction::SwitchRound { pair: s.btc })
        .expect("switch");

    let selected = s.harness.network.selected(&s.btc).expect("selected");
    assert!(!selected.contains(&a.owner));
    assert_eq!(selected, vec![b.owner, s.c.owner]);
    // a still earned its share of round 1.
    assert_eq!(
        s.harness.network.token_balance(&a.owner),
        INITIAL_BALANCE - 4 + 50
    );
}
