//! The network state store.
//!
//! Every component lives in one [`Network`] value owned by the caller.
//! There is no global state: two networks in the same process are fully
//! independent.

use std::collections::BTreeMap;

use oraclenet_crypto::blake3::module_address;
use oraclenet_governance::{authorize, ConfigRegistry, Governor, MemoryRegistry};
use oraclenet_round::{PairParams, RoundCoordinator};
use oraclenet_settlement::DelayedSettlement;
use oraclenet_staking::{ParticipantRegistry, StakeLedger};
use oraclenet_token::{MemoryToken, TokenLedger};
use oraclenet_types::{Address, BlockInfo, Event, EventLog, PairId, TxContext};

use crate::fanout::PairFanout;
use crate::tx::{AdminAction, Envelope, Transaction};
use crate::{NetworkError, Result};

/// Withdrawal delay used when the registry has no
/// `staking.withdrawal_delay_secs` entry. One week.
pub const DEFAULT_WITHDRAWAL_DELAY_SECS: u64 = 604_800;

/// Registry key of the stake withdrawal delay.
pub const WITHDRAWAL_DELAY_KEY: &str = "staking.withdrawal_delay_secs";

/// Reward account of `pair`, whether or not the pair is registered.
pub fn reward_account_for(pair: &PairId) -> Address {
    module_address(format!("rewards/{}", pair.symbol()).as_bytes())
}

/// Complete state of one oracle network.
#[derive(Debug, Clone)]
pub struct Network<L: TokenLedger + Clone = MemoryToken> {
    pub(crate) token: L,
    pub(crate) governor: Governor,
    pub(crate) registry: MemoryRegistry,
    pub(crate) ledger: StakeLedger,
    pub(crate) participants: ParticipantRegistry,
    pub(crate) settlement: DelayedSettlement,
    pub(crate) pairs: BTreeMap<PairId, RoundCoordinator>,
    pub(crate) last_block: Option<BlockInfo>,
}

impl<L: TokenLedger + Clone> Network<L> {
    /// Build a network at genesis.
    ///
    /// The stake escrow and settlement vault are derived module accounts.
    /// The settlement ledger only accepts deposits from the escrow.
    ///
    /// # Errors
    ///
    /// - [`NetworkError::Registry`] if the withdrawal delay entry is malformed
    pub fn new(token: L, governor: Governor, registry: MemoryRegistry) -> Result<Self> {
        let escrow = module_address(b"staking");
        let vault = module_address(b"settlement");
        let delay = registry.get_u64_or(WITHDRAWAL_DELAY_KEY, DEFAULT_WITHDRAWAL_DELAY_SECS)?;

        tracing::info!(
            %escrow,
            %vault,
            withdrawal_delay_secs = delay,
            governors = governor.len(),
            "network initialized"
        );
        Ok(Self {
            token,
            governor,
            registry,
            ledger: StakeLedger::new(escrow, delay),
            participants: ParticipantRegistry::new(),
            settlement: DelayedSettlement::new(vault, escrow),
            pairs: BTreeMap::new(),
            last_block: None,
        })
    }

    /// Apply one transaction atomically.
    ///
    /// Returns the events the transaction produced. On error no state
    /// changes and no events are emitted.
    ///
    /// # Errors
    ///
    /// - [`NetworkError::ClockRegression`] if the envelope's block is
    ///   earlier than the last applied one
    /// - [`NetworkError::ModuleAccountSender`] if the sender is the stake
    ///   escrow, the settlement vault or a registered pair's reward account
    /// - any error of the component that rejected the transaction
    pub fn apply(&mut self, envelope: &Envelope) -> Result<Vec<Event>> {
        if let Some(previous) = self.last_block {
            if !envelope.block.follows(&previous) {
                return Err(NetworkError::ClockRegression {
                    previous,
                    got: envelope.block,
                });
            }
        }

        if self.is_module_account(&envelope.sender) {
            return Err(NetworkError::ModuleAccountSender(envelope.sender));
        }

        let snapshot = self.clone();
        let mut events = EventLog::new();
        let ctx = TxContext::new(envelope.sender, envelope.block);

        match self.execute(&mut events, &ctx, &envelope.tx) {
            Ok(()) => {
                self.last_block = Some(envelope.block);
                tracing::debug!(
                    sender = %envelope.sender,
                    block = envelope.block.number,
                    kind = envelope.tx.kind(),
                    events = events.len(),
                    "transaction applied"
                );
                Ok(events.drain())
            }
            Err(e) => {
                *self = snapshot;
                tracing::debug!(
                    sender = %envelope.sender,
                    block = envelope.block.number,
                    kind = envelope.tx.kind(),
                    error = %e,
                    "transaction rejected"
                );
                Err(e)
            }
        }
    }

    fn execute(&mut self, events: &mut EventLog, ctx: &TxContext, tx: &Transaction) -> Result<()> {
        let sender = ctx.sender;
        match tx {
            Transaction::Transfer { to, amount } => {
                if *to == self.ledger.escrow() || *to == self.settlement.account() {
                    return Err(NetworkError::ModuleAccountRecipient(*to));
                }
                self.token.transfer(sender, *to, *amount)?;
            }
            Transaction::Approve { spender, amount } => {
                self.token.approve(sender, *spender, *amount);
            }
            Transaction::FundRewards { pair, amount } => {
                let reward_account = self.pair(pair)?.reward_account();
                self.token.transfer(sender, reward_account, *amount)?;
            }

            Transaction::RegisterOracle { reporter, label } => {
                self.participants
                    .register(events, sender, *reporter, label.clone(), ctx.now_block())?;
            }
            Transaction::DeregisterOracle => {
                let engaged = self.pairs.values().any(|c| c.is_engaged(&sender));
                self.participants.deregister(events, sender, engaged)?;
            }
            Transaction::SetOracleLabel { label } => {
                self.participants.set_label(events, sender, label.clone())?;
            }
            Transaction::SetOracleReporter { reporter } => {
                self.participants.set_reporter(events, sender, *reporter)?;
            }

            Transaction::Deposit { amount } => {
                let mut fanout = PairFanout {
                    pairs: &mut self.pairs,
                };
                self.ledger
                    .deposit(&mut self.token, events, &mut fanout, sender, *amount)?;
            }
            Transaction::Withdraw { amount } => {
                let mut fanout = PairFanout {
                    pairs: &mut self.pairs,
                };
                self.ledger.withdraw(
                    &mut self.token,
                    &mut self.settlement,
                    events,
                    &mut fanout,
                    sender,
                    *amount,
                    ctx.now(),
                )?;
            }
            Transaction::CancelWithdrawal { payment_id } => {
                let mut fanout = PairFanout {
                    pairs: &mut self.pairs,
                };
                self.ledger.cancel_withdrawal(
                    &mut self.token,
                    &mut self.settlement,
                    events,
                    &mut fanout,
                    sender,
                    *payment_id,
                )?;
            }
            Transaction::ClaimPayment { payment_id } => {
                self.settlement
                    .withdraw(&mut self.token, events, sender, *payment_id, ctx.now())?;
            }

            Transaction::Subscribe { pair } => {
                if !self.participants.is_registered(&sender) {
                    return Err(oraclenet_staking::AdmissionError::NotRegistered(sender).into());
                }
                let stake = self.ledger.balance_of(&sender);
                self.pair_mut(pair)?
                    .subscribe(events, sender, stake, &ctx.block)?;
            }
            Transaction::Unsubscribe { pair } => {
                self.pair_mut(pair)?.unsubscribe(events, sender)?;
            }

            Transaction::SwitchRound { pair } => {
                let coordinator = self
                    .pairs
                    .get_mut(pair)
                    .ok_or(NetworkError::UnknownPair(*pair))?;
                coordinator.switch_round(&mut self.token, events, &ctx.block)?;
            }
            Transaction::Publish { message, votes } => {
                let coordinator = self
                    .pairs
                    .get_mut(&message.pair)
                    .ok_or(NetworkError::UnknownPair(message.pair))?;
                coordinator.publish(&self.participants, events, ctx, message, votes)?;
            }
            Transaction::EmergencyPublish { pair, price } => {
                self.pair_mut(pair)?.emergency_publish(events, ctx, *price)?;
            }

            Transaction::Admin(action) => self.execute_admin(events, ctx, action)?,
        }
        Ok(())
    }

    fn execute_admin(
        &mut self,
        events: &mut EventLog,
        ctx: &TxContext,
        action: &AdminAction,
    ) -> Result<()> {
        let cap = authorize(&self.governor, ctx.sender)?;
        match action {
            AdminAction::RegisterPair { pair, params } => {
                self.register_pair_at(events, *pair, params.clone(), &ctx.block)?;
            }
            AdminAction::SetMaxSelected { pair, value } => {
                self.pair_mut(pair)?.set_max_selected(&cap, events, *value)?;
            }
            AdminAction::SetMaxSubscribed { pair, value } => {
                self.pair_mut(pair)?.set_max_subscribed(&cap, events, *value)?;
            }
            AdminAction::SetRoundLockPeriod { pair, secs } => {
                self.pair_mut(pair)?.set_round_lock_period(&cap, events, *secs);
            }
            AdminAction::SetValidPricePeriod { pair, blocks } => {
                self.pair_mut(pair)?.set_valid_price_period(&cap, events, *blocks);
            }
            AdminAction::SetEmergencyPublishingPeriod { pair, blocks } => {
                self.pair_mut(pair)?
                    .set_emergency_publishing_period(&cap, events, *blocks);
            }
            AdminAction::SetMinSubscriptionStake { pair, amount } => {
                self.pair_mut(pair)?
                    .set_min_subscription_stake(&cap, events, *amount);
            }
            AdminAction::AddPriceReader { pair, account } => {
                self.pair_mut(pair)?.price_readers_mut().add(&cap, *account);
            }
            AdminAction::RemovePriceReader { pair, account } => {
                self.pair_mut(pair)?.price_readers_mut().remove(&cap, account);
            }
            AdminAction::AddEmergencyPublisher { pair, account } => {
                self.pair_mut(pair)?
                    .emergency_publishers_mut()
                    .add(&cap, *account);
            }
            AdminAction::RemoveEmergencyPublisher { pair, account } => {
                self.pair_mut(pair)?
                    .emergency_publishers_mut()
                    .remove(&cap, account);
            }
            AdminAction::LockStake { owner, until } => {
                self.ledger.lock(&cap, events, *owner, *until)?;
            }
            AdminAction::SetWithdrawalDelay { secs } => {
                self.ledger.set_withdrawal_delay(&cap, *secs);
                events.emit(Event::ParameterChanged {
                    scope: "staking".to_string(),
                    name: "withdrawal_delay_secs".to_string(),
                    value: secs.to_string(),
                });
            }
            AdminAction::AddGovernor { account } => {
                self.governor.add_owner(&cap, *account);
            }
            AdminAction::RemoveGovernor { account } => {
                self.governor.remove_owner(&cap, account);
            }
            AdminAction::Mint { to, amount } => {
                self.token.mint(*to, *amount)?;
            }
        }
        Ok(())
    }

    /// Register a pair outside of a transaction, as genesis does.
    ///
    /// `params` of `None` reads the pair's parameters from the registry.
    ///
    /// # Errors
    ///
    /// - [`NetworkError::PairAlreadyRegistered`] if the pair exists
    /// - [`NetworkError::Registry`] if a registry entry is malformed
    /// - [`NetworkError::Round`] if the parameters are inconsistent
    pub fn register_pair(
        &mut self,
        pair: PairId,
        params: Option<PairParams>,
        block: &BlockInfo,
    ) -> Result<Vec<Event>> {
        let mut events = EventLog::new();
        self.register_pair_at(&mut events, pair, params, block)?;
        Ok(events.drain())
    }

    fn register_pair_at(
        &mut self,
        events: &mut EventLog,
        pair: PairId,
        params: Option<PairParams>,
        block: &BlockInfo,
    ) -> Result<()> {
        if self.pairs.contains_key(&pair) {
            return Err(NetworkError::PairAlreadyRegistered(pair));
        }
        let params = match params {
            Some(p) => p,
            None => PairParams::from_registry(&self.registry, &pair)?,
        };
        let reward_account = reward_account_for(&pair);
        let coordinator = RoundCoordinator::new(pair, reward_account, params, block)?;
        self.pairs.insert(pair, coordinator);
        events.emit(Event::PairRegistered {
            pair,
            reward_account,
        });
        Ok(())
    }

    /// Mutable access to the token ledger, for genesis allocation.
    pub fn token_mut(&mut self) -> &mut L {
        &mut self.token
    }

    pub(crate) fn pair(&self, pair: &PairId) -> Result<&RoundCoordinator> {
        self.pairs.get(pair).ok_or(NetworkError::UnknownPair(*pair))
    }

    fn pair_mut(&mut self, pair: &PairId) -> Result<&mut RoundCoordinator> {
        self.pairs
            .get_mut(pair)
            .ok_or(NetworkError::UnknownPair(*pair))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorCategory;
    use oraclenet_crypto::ed25519::KeyPair;
    use oraclenet_crypto::message::PriceMessage;
    use oraclenet_governance::RegistryValue;
    use oraclenet_types::PROTOCOL_VERSION;

    const ADMIN: Address = Address::new([0xad; 20]);

    fn addr(b: u8) -> Address {
        Address::new([b; 20])
    }

    fn btc() -> PairId {
        PairId::from_symbol("BTCUSD").expect("pair")
    }

    fn block(n: u64) -> BlockInfo {
        BlockInfo::new(n, 1_000 + n * 10)
    }

    fn env(sender: Address, n: u64, tx: Transaction) -> Envelope {
        Envelope::new(sender, block(n), tx)
    }

    fn params() -> PairParams {
        PairParams {
            max_selected: 3,
            max_subscribed: 5,
            round_lock_period_secs: 100,
            min_subscription_stake: 1,
            ..PairParams::default()
        }
    }

    struct Oracle {
        owner: Address,
        keys: KeyPair,
    }

    fn network_with(oracles: &[(u8, u128)]) -> (Network, Vec<Oracle>) {
        let mut token = MemoryToken::new();
        let mut out = Vec::new();
        for (b, stake) in oracles {
            let owner = addr(*b);
            token.mint(owner, 1_000).expect("mint");
            out.push((
                Oracle {
                    owner,
                    keys: KeyPair::from_bytes(&[*b; 32]),
                },
                *stake,
            ));
        }
        let mut net = Network::new(token, Governor::new([ADMIN]), MemoryRegistry::new())
            .expect("network");
        net.register_pair(btc(), Some(params()), &block(0))
            .expect("register pair");

        let mut n = 1;
        for (oracle, stake) in &out {
            let txs = [
                Transaction::RegisterOracle {
                    reporter: oracle.keys.address(),
                    label: format!("oracle-{}", oracle.owner),
                },
                Transaction::Approve {
                    spender: net.escrow_account(),
                    amount: *stake,
                },
                Transaction::Deposit { amount: *stake },
                Transaction::Subscribe { pair: btc() },
            ];
            for tx in txs {
                net.apply(&env(oracle.owner, n, tx)).expect("setup tx");
                n += 1;
            }
        }
        (net, out.into_iter().map(|(o, _)| o).collect())
    }

    #[test]
    fn test_withdrawal_delay_from_registry() {
        let mut registry = MemoryRegistry::new();
        registry.set(WITHDRAWAL_DELAY_KEY, RegistryValue::Uint(60));
        let net = Network::new(MemoryToken::new(), Governor::new([ADMIN]), registry)
            .expect("network");
        assert_eq!(net.ledger.withdrawal_delay_secs(), 60);

        let mut bad = MemoryRegistry::new();
        bad.set(WITHDRAWAL_DELAY_KEY, RegistryValue::Text("soon".into()));
        let err = Network::new(MemoryToken::new(), Governor::new([ADMIN]), bad)
            .expect_err("wrong type");
        assert_eq!(err.category(), ErrorCategory::Config);
    }

    #[test]
    fn test_first_subscriber_opens_round() {
        let (net, oracles) = network_with(&[(1, 10)]);
        let coordinator = net.pair(&btc()).expect("pair");
        assert_eq!(coordinator.round_number(), 1);
        assert!(coordinator.is_selected(&oracles[0].owner));
    }

    #[test]
    fn test_subscribe_requires_registration() {
        let (mut net, _) = network_with(&[]);
        let err = net
            .apply(&env(addr(9), 1, Transaction::Subscribe { pair: btc() }))
            .expect_err("unregistered");
        assert_eq!(err.category(), ErrorCategory::Admission);
    }

    #[test]
    fn test_failed_transaction_leaves_state_untouched() {
        let (mut net, oracles) = network_with(&[(1, 10)]);
        let owner = oracles[0].owner;
        let token_before = net.token.balance_of(&owner);
        let last_before = net.last_block;

        let err = net
            .apply(&env(owner, 50, Transaction::Withdraw { amount: 11 }))
            .expect_err("over balance");
        assert_eq!(err.category(), ErrorCategory::Settlement);
        assert_eq!(net.ledger.balance_of(&owner), 10);
        assert_eq!(net.token.balance_of(&owner), token_before);
        assert_eq!(net.last_block, last_before);
        assert!(net.settlement.is_empty());
    }

    #[test]
    fn test_clock_regression_rejected() {
        let (mut net, oracles) = network_with(&[(1, 10)]);
        let err = net
            .apply(&env(oracles[0].owner, 1, Transaction::Deposit { amount: 1 }))
            .expect_err("older block");
        assert!(matches!(err, NetworkError::ClockRegression { .. }));
    }

    #[test]
    fn test_admin_requires_governor() {
        let (mut net, _) = network_with(&[]);
        let tx = Transaction::Admin(AdminAction::SetMaxSelected {
            pair: btc(),
            value: 2,
        });
        let err = net.apply(&env(addr(9), 1, tx.clone())).expect_err("not admin");
        assert_eq!(err.category(), ErrorCategory::Authorization);

        let events = net.apply(&env(ADMIN, 2, tx)).expect("admin");
        assert!(matches!(&events[0], Event::ParameterChanged { name, .. } if name == "max_selected"));
    }

    #[test]
    fn test_register_pair_from_registry_and_twice() {
        let mut registry = MemoryRegistry::new();
        let rif = PairId::from_symbol("RIFBTC").expect("pair");
        registry.set("pair.RIFBTC.max_selected", RegistryValue::Uint(4));
        let mut net = Network::new(MemoryToken::new(), Governor::new([ADMIN]), registry)
            .expect("network");

        let tx = Transaction::Admin(AdminAction::RegisterPair {
            pair: rif,
            params: None,
        });
        net.apply(&env(ADMIN, 1, tx.clone())).expect("register");
        assert_eq!(net.pair(&rif).expect("pair").params().max_selected, 4);

        let err = net.apply(&env(ADMIN, 2, tx)).expect_err("duplicate");
        assert_eq!(err, NetworkError::PairAlreadyRegistered(rif));
    }

    #[test]
    fn test_deregister_blocked_while_subscribed() {
        let (mut net, oracles) = network_with(&[(1, 10)]);
        let owner = oracles[0].owner;
        let err = net
            .apply(&env(owner, 20, Transaction::DeregisterOracle))
            .expect_err("engaged");
        assert_eq!(
            err,
            NetworkError::Admission(oraclenet_staking::AdmissionError::NotReady(owner))
        );
    }

    #[test]
    fn test_publish_through_network() {
        let (mut net, oracles) = network_with(&[(1, 10), (2, 20), (3, 30)]);
        let mut sorted: Vec<&Oracle> = oracles.iter().collect();
        sorted.sort_by_key(|o| o.keys.address());

        let voted = sorted[0].keys.address();
        let message = PriceMessage {
            version: PROTOCOL_VERSION,
            pair: btc(),
            price: 65_000,
            voted_oracle: voted,
            last_publication_block: 0,
        };
        let votes = sorted[..2]
            .iter()
            .map(|o| message.sign(&o.keys.signing_key))
            .collect();

        let events = net
            .apply(&env(voted, 30, Transaction::Publish { message, votes }))
            .expect("publish");
        assert!(events
            .iter()
            .any(|e| matches!(e, Event::PricePublished { price: 65_000, .. })));
        assert_eq!(net.pair(&btc()).expect("pair").published().block, 30);
    }

    #[test]
    fn test_withdraw_removes_low_stake_from_round() {
        let (mut net, oracles) = network_with(&[(1, 10), (2, 20)]);
        let owner = oracles[0].owner;
        net.apply(&env(owner, 20, Transaction::Withdraw { amount: 10 }))
            .expect("withdraw");
        let coordinator = net.pair(&btc()).expect("pair");
        assert!(!coordinator.is_subscribed(&owner));
        assert!(!coordinator.is_selected(&owner));
        assert_eq!(net.settlement.len(), 1);
    }

    #[test]
    fn test_deposit_without_approval_rejected() {
        let (mut net, oracles) = network_with(&[(1, 10)]);
        let owner = oracles[0].owner;
        let err = net
            .apply(&env(owner, 20, Transaction::Deposit { amount: 5 }))
            .expect_err("allowance spent by the first deposit");
        assert!(matches!(
            err,
            NetworkError::Staking(oraclenet_staking::StakingError::Token(
                oraclenet_token::TokenError::InsufficientAllowance { .. }
            ))
        ));
        assert_eq!(err.category(), ErrorCategory::Token);

        let escrow = net.escrow_account();
        net.apply(&env(owner, 21, Transaction::Approve { spender: escrow, amount: 5 }))
            .expect("approve");
        net.apply(&env(owner, 22, Transaction::Deposit { amount: 5 }))
            .expect("deposit");
        assert_eq!(net.ledger.balance_of(&owner), 15);
    }

    #[test]
    fn test_module_accounts_cannot_send() {
        let (mut net, oracles) = network_with(&[(1, 10)]);
        let thief = addr(0x77);
        let reward_account = reward_account_for(&btc());
        net.apply(&env(
            oracles[0].owner,
            20,
            Transaction::FundRewards {
                pair: btc(),
                amount: 5,
            },
        ))
        .expect("fund");

        let mut n = 21;
        for sender in [net.escrow_account(), net.settlement_account(), reward_account] {
            let err = net
                .apply(&env(sender, n, Transaction::Transfer { to: thief, amount: 1 }))
                .expect_err("module sender");
            assert_eq!(err, NetworkError::ModuleAccountSender(sender));
            assert_eq!(err.category(), ErrorCategory::Authorization);
            n += 1;
        }
        assert_eq!(net.token.balance_of(&net.escrow_account()), 10);
        assert_eq!(net.token.balance_of(&reward_account), 5);
        assert_eq!(net.token.balance_of(&thief), 0);

        let escrow = net.escrow_account();
        let err = net
            .apply(&env(oracles[0].owner, n, Transaction::Transfer { to: escrow, amount: 1 }))
            .expect_err("direct escrow credit");
        assert_eq!(err, NetworkError::ModuleAccountRecipient(escrow));
    }

    #[test]
    fn test_fund_rewards_unknown_pair() {
        let (mut net, oracles) = network_with(&[(1, 10)]);
        let eth = PairId::from_symbol("ETHUSD").expect("pair");
        let err = net
            .apply(&env(
                oracles[0].owner,
                20,
                Transaction::FundRewards {
                    pair: eth,
                    amount: 1,
                },
            ))
            .expect_err("unknown");
        assert_eq!(err, NetworkError::UnknownPair(eth));
    }
}
