//! Round switch and proportional payout.
//!
//! Each selected participant receives
//! `floor(points * available / total_points)` of the reward account's
//! balance. Rounding remainders stay in the reward account for later
//! rounds, and nothing is paid when no points were earned.

use oraclenet_token::TokenLedger;
use oraclenet_types::{Address, Amount, BlockInfo, Event, EventLog, Points};

use crate::{Result, Round, RoundCoordinator, RoundError};

/// Split `available` among `points` holders.
///
/// Holders with zero points, or whose share rounds down to zero, are
/// omitted. The sum of the returned amounts never exceeds `available`.
///
/// # Errors
///
/// - [`RoundError::Overflow`] if `points * available` does not fit in 128 bits
pub fn compute_rewards(
    points: &[(Address, Points)],
    available: Amount,
) -> Result<Vec<(Address, Amount)>> {
    let total = points
        .iter()
        .try_fold(0 as Amount, |acc, (_, p)| acc.checked_add(Amount::from(*p)))
        .ok_or(RoundError::Overflow)?;
    if total == 0 {
        return Ok(Vec::new());
    }

    let mut payouts = Vec::with_capacity(points.len());
    for (owner, p) in points {
        let share = Amount::from(*p)
            .checked_mul(available)
            .ok_or(RoundError::Overflow)?
            / total;
        if share > 0 {
            payouts.push((*owner, share));
        }
    }
    Ok(payouts)
}

impl RoundCoordinator {
    /// Close the current round and open the next one.
    ///
    /// Pays rewards to the selected owners, then snapshots the top
    /// `max_selected` subscribers as the new selection with zero points.
    /// Returns the new round number.
    ///
    /// # Errors
    ///
    /// - [`RoundError::RoundNotOpen`] before the first admission
    /// - [`RoundError::LockActive`] before the lock period end
    /// - [`RoundError::Overflow`] if reward arithmetic overflows
    /// - [`RoundError::Token`] if a reward transfer fails
    pub fn switch_round<L: TokenLedger>(
        &mut self,
        token: &mut L,
        events: &mut EventLog,
        block: &BlockInfo,
    ) -> Result<u64> {
        let round = self.round.as_ref().ok_or(RoundError::RoundNotOpen)?;
        if block.timestamp < round.lock_period_end {
            return Err(RoundError::LockActive {
                now: block.timestamp,
                lock_period_end: round.lock_period_end,
            });
        }

        let total_points = round.total_points()?;
        let available = token.balance_of(&self.reward_account);
        let payouts = compute_rewards(&round.points_entries(), available)?;
        let closed = round.number;

        let mut distributed: Amount = 0;
        for (owner, amount) in &payouts {
            token.transfer(self.reward_account, *owner, *amount)?;
            distributed += amount;
            tracing::debug!(pair = %self.pair, round = closed, %owner, amount, "reward paid");
            events.emit(Event::RewardPaid {
                pair: self.pair,
                round: closed,
                participant: *owner,
                amount: *amount,
            });
        }

        let next = Round::open(
            closed + 1,
            block,
            self.params.round_lock_period_secs,
            self.params.max_selected,
            self.subscribed.sort(self.params.max_selected),
        );
        let selected = next.owners();

        tracing::info!(
            pair = %self.pair,
            round = next.number,
            total_points,
            distributed,
            selected = selected.len(),
            lock_period_end = next.lock_period_end,
            "round switched"
        );
        events.emit(Event::RoundSwitched {
            pair: self.pair,
            round: next.number,
            start_block: next.start_block,
            lock_period_end: next.lock_period_end,
            total_points,
            distributed,
            selected,
        });
        let number = next.number;
        self.round = Some(next);
        Ok(number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oraclenet_token::MemoryToken;
    use oraclenet_types::PairId;

    use crate::PairParams;

    const REWARDS: Address = Address::new([0xfe; 20]);

    fn addr(b: u8) -> Address {
        Address::new([b; 20])
    }

    fn coordinator(max_selected: usize) -> RoundCoordinator {
        let params = PairParams {
            max_selected,
            max_subscribed: 10,
            round_lock_period_secs: 100,
            min_subscription_stake: 1,
            ..PairParams::default()
        };
        RoundCoordinator::new(
            PairId::from_symbol("BTCUSD").expect("pair"),
            REWARDS,
            params,
            &BlockInfo::new(1, 1_000),
        )
        .expect("coordinator")
    }

    #[test]
    fn test_compute_rewards_floor_and_remainder() {
        let payouts =
            compute_rewards(&[(addr(1), 1), (addr(2), 2), (addr(3), 0)], 100).expect("payouts");
        assert_eq!(payouts, vec![(addr(1), 33), (addr(2), 66)]);
        let paid: Amount = payouts.iter().map(|(_, a)| a).sum();
        assert!(paid <= 100);
    }

    #[test]
    fn test_compute_rewards_no_points() {
        assert!(compute_rewards(&[(addr(1), 0)], 100).expect("empty").is_empty());
        assert!(compute_rewards(&[], 100).expect("empty").is_empty());
    }

    #[test]
    fn test_compute_rewards_overflow() {
        assert_eq!(
            compute_rewards(&[(addr(1), 2)], Amount::MAX),
            Err(RoundError::Overflow)
        );
    }

    #[test]
    fn test_switch_before_lock_end_changes_nothing() {
        let mut c = coordinator(2);
        let mut token = MemoryToken::new();
        let mut events = EventLog::new();
        assert_eq!(
            c.switch_round(&mut token, &mut events, &BlockInfo::new(2, 2_000)),
            Err(RoundError::RoundNotOpen)
        );

        c.subscribe(&mut events, addr(1), 5, &BlockInfo::new(2, 1_000))
            .expect("subscribe");
        events.drain();
        assert_eq!(
            c.switch_round(&mut token, &mut events, &BlockInfo::new(3, 1_099)),
            Err(RoundError::LockActive {
                now: 1_099,
                lock_period_end: 1_100,
            })
        );
        assert_eq!(c.round_number(), 1);
        assert!(events.is_empty());
    }

    #[test]
    fn test_switch_pays_and_resets() {
        let mut c = coordinator(2);
        let mut token = MemoryToken::new();
        token.mint(REWARDS, 1_000).expect("mint");
        let mut events = EventLog::new();
        let block = BlockInfo::new(2, 1_000);
        c.subscribe(&mut events, addr(1), 5, &block).expect("subscribe");
        c.subscribe(&mut events, addr(2), 9, &block).expect("subscribe");
        c.subscribe(&mut events, addr(3), 7, &block).expect("subscribe");
        if let Some(round) = c.round.as_mut() {
            round.add_point(&addr(1)).expect("point");
            round.add_point(&addr(2)).expect("point");
            round.add_point(&addr(2)).expect("point");
        }

        let number = c
            .switch_round(&mut token, &mut events, &BlockInfo::new(9, 1_100))
            .expect("switch");
        assert_eq!(number, 2);
        assert_eq!(token.balance_of(&addr(1)), 333);
        assert_eq!(token.balance_of(&addr(2)), 666);
        assert_eq!(token.balance_of(&REWARDS), 1);

        // New selection is the top two subscribers by stake.
        assert_eq!(c.selected(), vec![addr(2), addr(3)]);
        assert_eq!(c.round().map(|r| r.total_points().expect("sum")), Some(0));
        assert_eq!(c.round().map(|r| r.start_block), Some(9));
        assert_eq!(c.round().map(|r| r.lock_period_end), Some(1_200));
    }

    #[test]
    fn test_switch_skips_subscribers_below_raised_minimum() {
        let mut c = coordinator(2);
        let gov = oraclenet_governance::Governor::new([addr(0xad)]);
        let cap = oraclenet_governance::authorize(&gov, addr(0xad)).expect("cap");
        let mut token = MemoryToken::new();
        let mut events = EventLog::new();
        let block = BlockInfo::new(2, 1_000);
        for (b, stake) in [(1u8, 100u128), (2, 50), (3, 20)] {
            c.subscribe(&mut events, addr(b), stake, &block).expect("subscribe");
        }

        c.set_min_subscription_stake(&cap, &mut events, 60);
        c.switch_round(&mut token, &mut events, &BlockInfo::new(3, 1_100))
            .expect("switch");
        assert_eq!(c.selected(), vec![addr(1)]);
    }

    #[test]
    fn test_unsubscribed_drop_out_at_switch() {
        let mut c = coordinator(2);
        let mut token = MemoryToken::new();
        let mut events = EventLog::new();
        let block = BlockInfo::new(2, 1_000);
        c.subscribe(&mut events, addr(1), 5, &block).expect("subscribe");
        c.subscribe(&mut events, addr(2), 6, &block).expect("subscribe");
        c.unsubscribe(&mut events, addr(1)).expect("unsubscribe");
        assert!(c.is_selected(&addr(1)));

        c.switch_round(&mut token, &mut events, &BlockInfo::new(3, 1_100))
            .expect("switch");
        assert_eq!(c.selected(), vec![addr(2)]);
    }

    #[test]
    fn test_points_holders_paid_even_after_unsubscribing() {
        let mut c = coordinator(2);
        let mut token = MemoryToken::new();
        token.mint(REWARDS, 10).expect("mint");
        let mut events = EventLog::new();
        let block = BlockInfo::new(2, 1_000);
        c.subscribe(&mut events, addr(1), 5, &block).expect("subscribe");
        if let Some(round) = c.round.as_mut() {
            round.add_point(&addr(1)).expect("point");
        }
        c.unsubscribe(&mut events, addr(1)).expect("unsubscribe");
        c.switch_round(&mut token, &mut events, &BlockInfo::new(3, 1_100))
            .expect("switch");
        assert_eq!(token.balance_of(&addr(1)), 10);
        assert!(c.selected().is_empty());
    }
}
