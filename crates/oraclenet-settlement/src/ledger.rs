//! Pending payments and the settlement vault.

use std::collections::BTreeMap;

use oraclenet_token::TokenLedger;
use oraclenet_types::{Address, Amount, Event, EventLog, PaymentId};
use serde::{Deserialize, Serialize};

use crate::{Result, SettlementError};

/// A payment waiting for its expiration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingPayment {
    pub id: PaymentId,
    pub source: Address,
    pub destination: Address,
    pub amount: Amount,
    /// Absolute timestamp from which the destination may withdraw.
    pub expiration: u64,
}

/// The delayed settlement ledger.
#[derive(Debug, Clone)]
pub struct DelayedSettlement {
    /// Vault account holding the funds of every pending payment.
    account: Address,
    /// The only account allowed to deposit and cancel.
    source_delegate: Address,
    payments: BTreeMap<PaymentId, PendingPayment>,
    next_id: PaymentId,
}

impl DelayedSettlement {
    /// Create an empty ledger whose funds are held at `account`.
    pub fn new(account: Address, source_delegate: Address) -> Self {
        Self {
            account,
            source_delegate,
            payments: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Vault account address.
    pub fn account(&self) -> Address {
        self.account
    }

    /// Registered source delegate.
    pub fn source_delegate(&self) -> Address {
        self.source_delegate
    }

    /// Move `amount` from the source delegate into the vault and record a
    /// payment to `destination` that expires `delay_secs` after `now`.
    ///
    /// # Errors
    ///
    /// - [`SettlementError::WrongSourceDelegate`] if `caller` is not the
    ///   registered source delegate
    /// - [`SettlementError::Token`] if the source cannot fund the payment
    #[allow(clippy::too_many_arguments)]
    pub fn deposit<L: TokenLedger>(
        &mut self,
        token: &mut L,
        events: &mut EventLog,
        caller: Address,
        destination: Address,
        amount: Amount,
        now: u64,
        delay_secs: u64,
    ) -> Result<PaymentId> {
        self.check_source(caller)?;
        token.transfer(caller, self.account, amount)?;

        let id = self.next_id;
        self.next_id += 1;
        let expiration = now.saturating_add(delay_secs);
        self.payments.insert(
            id,
            PendingPayment {
                id,
                source: caller,
                destination,
                amount,
                expiration,
            },
        );

        tracing::info!(id, %destination, amount, expiration, "payment deposited");
        events.emit(Event::PaymentDeposit {
            id,
            source: caller,
            destination,
            amount,
            expiration,
        });
        Ok(id)
    }

    /// Pay out an expired payment to its destination.
    ///
    /// # Errors
    ///
    /// - [`SettlementError::InvalidId`] if the payment does not exist or
    ///   `caller` is not its destination
    /// - [`SettlementError::NotExpired`] if `now` is before the expiration
    pub fn withdraw<L: TokenLedger>(
        &mut self,
        token: &mut L,
        events: &mut EventLog,
        caller: Address,
        id: PaymentId,
        now: u64,
    ) -> Result<Amount> {
        let payment = match self.payments.get(&id) {
            Some(p) if p.destination == caller => p,
            _ => return Err(SettlementError::InvalidId(id)),
        };
        if now < payment.expiration {
            return Err(SettlementError::NotExpired {
                id,
                expiration: payment.expiration,
                now,
            });
        }

        token.transfer(self.account, payment.destination, payment.amount)?;
        let payment = self
            .payments
            .remove(&id)
            .ok_or(SettlementError::InvalidId(id))?;

        tracing::info!(id, destination = %payment.destination, amount = payment.amount, "payment withdrawn");
        events.emit(Event::PaymentWithdraw {
            id,
            source: payment.source,
            destination: payment.destination,
            amount: payment.amount,
        });
        Ok(payment.amount)
    }

    /// Return a pending payment's funds to its source and delete it.
    ///
    /// # Errors
    ///
    /// - [`SettlementError::InvalidId`] if the payment does not exist
    /// - [`SettlementError::WrongSourceDelegate`] if `caller` is not the
    ///   registered source delegate
    pub fn cancel<L: TokenLedger>(
        &mut self,
        token: &mut L,
        events: &mut EventLog,
        caller: Address,
        id: PaymentId,
    ) -> Result<PendingPayment> {
        let payment = self
            .payments
            .get(&id)
            .ok_or(SettlementError::InvalidId(id))?;
        self.check_source(caller)?;

        token.transfer(self.account, payment.source, payment.amount)?;
        let payment = self
            .payments
            .remove(&id)
            .ok_or(SettlementError::InvalidId(id))?;

        tracing::info!(id, destination = %payment.destination, amount = payment.amount, "payment cancelled");
        events.emit(Event::PaymentCancel {
            id,
            source: payment.source,
            destination: payment.destination,
            amount: payment.amount,
        });
        Ok(payment)
    }

    /// Look up a pending payment.
    pub fn get(&self, id: PaymentId) -> Option<&PendingPayment> {
        self.payments.get(&id)
    }

    /// Pending payments to `destination`, by id.
    pub fn payments_for(&self, destination: &Address) -> Vec<&PendingPayment> {
        self.payments
            .values()
            .filter(|p| &p.destination == destination)
            .collect()
    }

    /// Total pending amount owed to `destination`.
    pub fn balance_of(&self, destination: &Address) -> Amount {
        self.payments
            .values()
            .filter(|p| &p.destination == destination)
            .fold(0, |acc: Amount, p| acc.saturating_add(p.amount))
    }

    /// Number of pending payments.
    pub fn len(&self) -> usize {
        self.payments.len()
    }

    /// Whether there are no pending payments.
    pub fn is_empty(&self) -> bool {
        self.payments.is_empty()
    }

    fn check_source(&self, caller: Address) -> Result<()> {
        if caller != self.source_delegate {
            return Err(SettlementError::WrongSourceDelegate {
                caller,
                source_delegate: self.source_delegate,
            });
        }
        Ok(())
    }
}
