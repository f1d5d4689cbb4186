//! In-memory token ledger.

use std::collections::BTreeMap;

use oraclenet_types::{Address, Amount};

use crate::{Result, TokenError, TokenLedger};

/// Balance and allowance maps held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryToken {
    balances: BTreeMap<Address, Amount>,
    allowances: BTreeMap<(Address, Address), Amount>,
    total_supply: Amount,
}

impl MemoryToken {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sum of all minted tokens.
    pub fn total_supply(&self) -> Amount {
        self.total_supply
    }

    fn debit(&mut self, account: Address, amount: Amount) -> Result<()> {
        let available = self.balance_of(&account);
        let remaining = available
            .checked_sub(amount)
            .ok_or(TokenError::InsufficientBalance {
                account,
                requested: amount,
                available,
            })?;
        if remaining == 0 {
            self.balances.remove(&account);
        } else {
            self.balances.insert(account, remaining);
        }
        Ok(())
    }

    fn credit(&mut self, account: Address, amount: Amount) -> Result<()> {
        let updated = self
            .balance_of(&account)
            .checked_add(amount)
            .ok_or(TokenError::Overflow(account))?;
        if updated > 0 {
            self.balances.insert(account, updated);
        }
        Ok(())
    }
}

impl TokenLedger for MemoryToken {
    fn balance_of(&self, account: &Address) -> Amount {
        self.balances.get(account).copied().unwrap_or(0)
    }

    fn transfer(&mut self, from: Address, to: Address, amount: Amount) -> Result<()> {
        if from != to && self.balance_of(&to).checked_add(amount).is_none() {
            return Err(TokenError::Overflow(to));
        }
        self.debit(from, amount)?;
        self.credit(to, amount)?;
        tracing::debug!(%from, %to, amount, "token transfer");
        Ok(())
    }

    fn transfer_from(
        &mut self,
        spender: Address,
        owner: Address,
        to: Address,
        amount: Amount,
    ) -> Result<()> {
        let approved = self.allowance(&owner, &spender);
        if approved < amount {
            return Err(TokenError::InsufficientAllowance {
                owner,
                spender,
                requested: amount,
                approved,
            });
        }
        self.transfer(owner, to, amount)?;
        self.allowances.insert((owner, spender), approved - amount);
        Ok(())
    }

    fn approve(&mut self, owner: Address, spender: Address, amount: Amount) {
        self.allowances.insert((owner, spender), amount);
    }

    fn allowance(&self, owner: &Address, spender: &Address) -> Amount {
        self.allowances
            .get(&(*owner, *spender))
            .copied()
            .unwrap_or(0)
    }

    fn mint(&mut self, to: Address, amount: Amount) -> Result<()> {
        let supply = self
            .total_supply
            .checked_add(amount)
            .ok_or(TokenError::Overflow(to))?;
        self.credit(to, amount)?;
        self.total_supply = supply;
        tracing::debug!(%to, amount, "tokens minted");
        Ok(())
    }
}
