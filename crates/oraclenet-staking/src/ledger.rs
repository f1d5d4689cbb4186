//! Deposited stake, locks and delayed withdrawal.
//!
//! Stake tokens are held at the ledger's escrow account. A withdrawal moves
//! them into the delayed settlement vault with the escrow account as the
//! payment source, so the ledger is the only party able to cancel it.

use std::collections::BTreeMap;

use oraclenet_governance::AdminCapability;
use oraclenet_settlement::{DelayedSettlement, SettlementError};
use oraclenet_token::TokenLedger;
use oraclenet_types::{Address, Amount, Event, EventLog, PaymentId};

use crate::{Result, StakeChange, StakeObserver, StakingError};

/// Per-owner stake balances.
#[derive(Debug, Clone)]
pub struct StakeLedger {
    escrow: Address,
    balances: BTreeMap<Address, Amount>,
    /// Whole-balance locks, as absolute timestamps.
    locks: BTreeMap<Address, u64>,
    withdrawal_delay_secs: u64,
}

impl StakeLedger {
    /// Create an empty ledger holding stake at `escrow`.
    pub fn new(escrow: Address, withdrawal_delay_secs: u64) -> Self {
        Self {
            escrow,
            balances: BTreeMap::new(),
            locks: BTreeMap::new(),
            withdrawal_delay_secs,
        }
    }

    /// Escrow account holding all stake.
    pub fn escrow(&self) -> Address {
        self.escrow
    }

    /// Delay applied to every withdrawal.
    pub fn withdrawal_delay_secs(&self) -> u64 {
        self.withdrawal_delay_secs
    }

    /// Change the withdrawal delay for future withdrawals.
    pub fn set_withdrawal_delay(&mut self, _cap: &AdminCapability, secs: u64) {
        tracing::info!(secs, "withdrawal delay changed");
        self.withdrawal_delay_secs = secs;
    }

    /// Deposited stake of `owner`.
    pub fn balance_of(&self, owner: &Address) -> Amount {
        self.balances.get(owner).copied().unwrap_or(0)
    }

    /// Timestamp until which `owner`'s stake is locked, if any lock was set.
    pub fn locked_until(&self, owner: &Address) -> Option<u64> {
        self.locks.get(owner).copied()
    }

    /// Stake `owner` could withdraw at `now`.
    pub fn available(&self, owner: &Address, now: u64) -> Amount {
        match self.locked_until(owner) {
            Some(until) if now < until => 0,
            _ => self.balance_of(owner),
        }
    }

    /// Total stake across all owners.
    pub fn total_staked(&self) -> Amount {
        self.balances
            .values()
            .fold(0, |acc: Amount, b| acc.saturating_add(*b))
    }

    /// Pull `amount` tokens from `owner` into escrow and credit its stake.
    ///
    /// The escrow spends an allowance the owner granted it beforehand.
    /// Returns the new stake balance.
    ///
    /// # Errors
    ///
    /// - [`StakingError::Token`] if the allowance or the owner's balance
    ///   does not cover the deposit
    /// - [`StakingError::Overflow`] if the balance would overflow
    pub fn deposit<L: TokenLedger>(
        &mut self,
        token: &mut L,
        events: &mut EventLog,
        observer: &mut impl StakeObserver,
        owner: Address,
        amount: Amount,
    ) -> Result<Amount> {
        let balance = self
            .balance_of(&owner)
            .checked_add(amount)
            .ok_or(StakingError::Overflow(owner))?;
        token.transfer_from(self.escrow, owner, self.escrow, amount)?;
        self.balances.insert(owner, balance);

        tracing::info!(%owner, amount, balance, "stake deposited");
        events.emit(Event::StakeDeposited {
            owner,
            amount,
            balance,
        });
        observer.notify_stake_changed(&owner, balance, StakeChange::Increased, events);
        Ok(balance)
    }

    /// Withdraw `amount` of `owner`'s stake into delayed settlement.
    ///
    /// The payment expires `withdrawal_delay_secs` after `now`. Observers are
    /// told the stake was reduced, which forfeits the owner's points in every
    /// active round.
    ///
    /// # Errors
    ///
    /// - [`StakingError::InsufficientBalance`] if `amount` exceeds the
    ///   unlocked balance
    /// - [`StakingError::Settlement`] if the settlement deposit fails
    #[allow(clippy::too_many_arguments)]
    pub fn withdraw<L: TokenLedger>(
        &mut self,
        token: &mut L,
        settlement: &mut DelayedSettlement,
        events: &mut EventLog,
        observer: &mut impl StakeObserver,
        owner: Address,
        amount: Amount,
        now: u64,
    ) -> Result<PaymentId> {
        let available = self.available(&owner, now);
        if amount > available {
            return Err(StakingError::InsufficientBalance {
                requested: amount,
                available,
            });
        }

        let payment_id = settlement.deposit(
            token,
            events,
            self.escrow,
            owner,
            amount,
            now,
            self.withdrawal_delay_secs,
        )?;
        let balance = self.balance_of(&owner) - amount;
        if balance == 0 {
            self.balances.remove(&owner);
        } else {
            self.balances.insert(owner, balance);
        }

        tracing::info!(%owner, amount, balance, payment_id, "stake withdrawn");
        events.emit(Event::StakeWithdrawn {
            owner,
            amount,
            balance,
            payment_id,
        });
        observer.notify_stake_reduced(&owner, balance, events);
        Ok(payment_id)
    }

    /// Cancel a pending withdrawal of `owner` and re-credit the stake.
    ///
    /// Returns the new stake balance.
    ///
    /// # Errors
    ///
    /// - [`StakingError::Settlement`] with
    ///   [`SettlementError::InvalidId`] if the payment does not exist or is
    ///   not owed to `owner`
    pub fn cancel_withdrawal<L: TokenLedger>(
        &mut self,
        token: &mut L,
        settlement: &mut DelayedSettlement,
        events: &mut EventLog,
        observer: &mut impl StakeObserver,
        owner: Address,
        payment_id: PaymentId,
    ) -> Result<Amount> {
        match settlement.get(payment_id) {
            Some(p) if p.destination == owner && p.source == self.escrow => {}
            _ => return Err(SettlementError::InvalidId(payment_id).into()),
        }
        let balance_before = self.balance_of(&owner);
        let payment = settlement.cancel(token, events, self.escrow, payment_id)?;
        let balance = balance_before
            .checked_add(payment.amount)
            .ok_or(StakingError::Overflow(owner))?;
        self.balances.insert(owner, balance);

        tracing::info!(%owner, amount = payment.amount, balance, payment_id, "withdrawal cancelled");
        events.emit(Event::StakeDeposited {
            owner,
            amount: payment.amount,
            balance,
        });
        observer.notify_stake_changed(&owner, balance, StakeChange::Increased, events);
        Ok(balance)
    }

    /// Lock `owner`'s whole stake until `until`.
    ///
    /// # Errors
    ///
    /// - [`StakingError::LockShortened`] if an existing lock ends later
    pub fn lock(
        &mut self,
        _cap: &AdminCapability,
        events: &mut EventLog,
        owner: Address,
        until: u64,
    ) -> Result<()> {
        if let Some(current) = self.locked_until(&owner) {
            if until < current {
                return Err(StakingError::LockShortened {
                    owner,
                    current,
                    requested: until,
                });
            }
        }
        self.locks.insert(owner, until);
        tracing::info!(%owner, until, "stake locked");
        events.emit(Event::StakeLocked { owner, until });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oraclenet_governance::{authorize, Governor};
    use oraclenet_token::MemoryToken;

    const ESCROW: Address = Address::new([0xe5; 20]);
    const VAULT: Address = Address::new([0xee; 20]);
    const ALICE: Address = Address::new([0xa1; 20]);
    const ADMIN: Address = Address::new([0xad; 20]);

    #[derive(Default)]
    struct Recorder {
        calls: Vec<(Address, Amount, StakeChange)>,
    }

    impl StakeObserver for Recorder {
        fn notify_stake_changed(
            &mut self,
            owner: &Address,
            stake: Amount,
            change: StakeChange,
            _events: &mut EventLog,
        ) {
            self.calls.push((*owner, stake, change));
        }
    }

    struct Fixture {
        ledger: StakeLedger,
        settlement: DelayedSettlement,
        token: MemoryToken,
        events: EventLog,
        observer: Recorder,
    }

    fn fixture() -> Fixture {
        let mut token = MemoryToken::new();
        token.mint(ALICE, 1_000).expect("mint");
        token.approve(ALICE, ESCROW, Amount::MAX);
        Fixture {
            ledger: StakeLedger::new(ESCROW, 100),
            settlement: DelayedSettlement::new(VAULT, ESCROW),
            token,
            events: EventLog::new(),
            observer: Recorder::default(),
        }
    }

    #[test]
    fn test_deposit_moves_tokens_to_escrow() {
        let mut f = fixture();
        let balance = f
            .ledger
            .deposit(&mut f.token, &mut f.events, &mut f.observer, ALICE, 400)
            .expect("deposit");
        assert_eq!(balance, 400);
        assert_eq!(f.token.balance_of(&ESCROW), 400);
        assert_eq!(f.token.balance_of(&ALICE), 600);
        assert_eq!(f.observer.calls, vec![(ALICE, 400, StakeChange::Increased)]);
    }

    #[test]
    fn test_deposit_without_funds_rejected() {
        let mut f = fixture();
        let err = f
            .ledger
            .deposit(&mut f.token, &mut f.events, &mut f.observer, ALICE, 1_001)
            .expect_err("overdraft");
        assert!(matches!(err, StakingError::Token(_)));
        assert_eq!(f.ledger.balance_of(&ALICE), 0);
        assert!(f.observer.calls.is_empty());
    }

    #[test]
    fn test_deposit_requires_allowance() {
        let mut f = fixture();
        f.token.approve(ALICE, ESCROW, 150);
        let err = f
            .ledger
            .deposit(&mut f.token, &mut f.events, &mut f.observer, ALICE, 200)
            .expect_err("allowance too small");
        assert!(matches!(
            err,
            StakingError::Token(oraclenet_token::TokenError::InsufficientAllowance { approved: 150, .. })
        ));
        assert_eq!(f.token.balance_of(&ALICE), 1_000);
        assert!(f.events.is_empty());

        f.ledger
            .deposit(&mut f.token, &mut f.events, &mut f.observer, ALICE, 150)
            .expect("within allowance");
        assert_eq!(f.token.allowance(&ALICE, &ESCROW), 0);
        assert_eq!(f.ledger.balance_of(&ALICE), 150);
    }

    #[test]
    fn test_withdraw_enqueues_payment() {
        let mut f = fixture();
        f.ledger
            .deposit(&mut f.token, &mut f.events, &mut f.observer, ALICE, 400)
            .expect("deposit");
        let id = f
            .ledger
            .withdraw(
                &mut f.token,
                &mut f.settlement,
                &mut f.events,
                &mut f.observer,
                ALICE,
                150,
                10_000,
            )
            .expect("withdraw");

        assert_eq!(f.ledger.balance_of(&ALICE), 250);
        assert_eq!(f.token.balance_of(&ESCROW), 250);
        assert_eq!(f.token.balance_of(&VAULT), 150);
        let payment = f.settlement.get(id).expect("pending");
        assert_eq!(payment.destination, ALICE);
        assert_eq!(payment.expiration, 10_100);
        assert_eq!(f.observer.calls.last(), Some(&(ALICE, 250, StakeChange::Reduced)));
    }

    #[test]
    fn test_withdraw_more_than_balance() {
        let mut f = fixture();
        f.ledger
            .deposit(&mut f.token, &mut f.events, &mut f.observer, ALICE, 400)
            .expect("deposit");
        let err = f
            .ledger
            .withdraw(
                &mut f.token,
                &mut f.settlement,
                &mut f.events,
                &mut f.observer,
                ALICE,
                401,
                0,
            )
            .expect_err("too much");
        assert_eq!(
            err,
            StakingError::InsufficientBalance {
                requested: 401,
                available: 400,
            }
        );
        assert!(f.settlement.is_empty());
    }

    #[test]
    fn test_locked_stake_not_withdrawable() {
        let mut f = fixture();
        let gov = Governor::new([ADMIN]);
        let cap = authorize(&gov, ADMIN).expect("cap");
        f.ledger
            .deposit(&mut f.token, &mut f.events, &mut f.observer, ALICE, 400)
            .expect("deposit");
        f.ledger
            .lock(&cap, &mut f.events, ALICE, 5_000)
            .expect("lock");

        assert_eq!(f.ledger.available(&ALICE, 4_999), 0);
        let err = f
            .ledger
            .withdraw(
                &mut f.token,
                &mut f.settlement,
                &mut f.events,
                &mut f.observer,
                ALICE,
                1,
                4_999,
            )
            .expect_err("locked");
        assert!(matches!(err, StakingError::InsufficientBalance { available: 0, .. }));

        f.ledger
            .withdraw(
                &mut f.token,
                &mut f.settlement,
                &mut f.events,
                &mut f.observer,
                ALICE,
                400,
                5_000,
            )
            .expect("unlocked");
    }

    #[test]
    fn test_lock_only_extends() {
        let mut f = fixture();
        let gov = Governor::new([ADMIN]);
        let cap = authorize(&gov, ADMIN).expect("cap");
        f.ledger.lock(&cap, &mut f.events, ALICE, 100).expect("lock");
        f.ledger.lock(&cap, &mut f.events, ALICE, 200).expect("extend");
        assert!(matches!(
            f.ledger.lock(&cap, &mut f.events, ALICE, 150),
            Err(StakingError::LockShortened { current: 200, .. })
        ));
    }

    #[test]
    fn test_cancel_withdrawal_recredits_stake() {
        let mut f = fixture();
        f.ledger
            .deposit(&mut f.token, &mut f.events, &mut f.observer, ALICE, 400)
            .expect("deposit");
        let id = f
            .ledger
            .withdraw(
                &mut f.token,
                &mut f.settlement,
                &mut f.events,
                &mut f.observer,
                ALICE,
                400,
                0,
            )
            .expect("withdraw");
        assert_eq!(f.ledger.balance_of(&ALICE), 0);

        let other = Address::new([0xb0; 20]);
        let err = f
            .ledger
            .cancel_withdrawal(
                &mut f.token,
                &mut f.settlement,
                &mut f.events,
                &mut f.observer,
                other,
                id,
            )
            .expect_err("not the destination");
        assert_eq!(err, StakingError::Settlement(SettlementError::InvalidId(id)));

        let balance = f
            .ledger
            .cancel_withdrawal(
                &mut f.token,
                &mut f.settlement,
                &mut f.events,
                &mut f.observer,
                ALICE,
                id,
            )
            .expect("cancel");
        assert_eq!(balance, 400);
        assert_eq!(f.token.balance_of(&ESCROW), 400);
        assert_eq!(f.token.balance_of(&VAULT), 0);
        assert!(f.settlement.get(id).is_none());
    }
}
