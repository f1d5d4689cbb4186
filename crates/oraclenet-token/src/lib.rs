//! # oraclenet-token
//!
//! The fungible balance ledger used for staking collateral and rewards.
//!
//! The network only needs transfer, delegated transfer, balance and mint.
//! [`TokenLedger`] is the seam; [`MemoryToken`] is the in-process
//! implementation used by the node and the tests.

pub mod memory;

pub use memory::MemoryToken;

use oraclenet_types::{Address, Amount};

/// Token ledger failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    /// Sender balance is below the transfer amount.
    #[error("insufficient token balance for {account}: requested {requested}, available {available}")]
    InsufficientBalance {
        /// Debited account.
        account: Address,
        /// Amount requested.
        requested: Amount,
        /// Current balance.
        available: Amount,
    },

    /// Spender allowance is below the transfer amount.
    #[error("insufficient allowance from {owner} to {spender}: requested {requested}, approved {approved}")]
    InsufficientAllowance {
        /// Account whose tokens would move.
        owner: Address,
        /// Account moving them.
        spender: Address,
        /// Amount requested.
        requested: Amount,
        /// Remaining approval.
        approved: Amount,
    },

    /// A balance would exceed the representable range.
    #[error("token balance overflow for {0}")]
    Overflow(Address),
}

/// Convenience result type for token operations.
pub type Result<T> = std::result::Result<T, TokenError>;

/// A fungible balance ledger.
pub trait TokenLedger {
    /// Current balance of `account`.
    fn balance_of(&self, account: &Address) -> Amount;

    /// Move `amount` from `from` to `to`.
    fn transfer(&mut self, from: Address, to: Address, amount: Amount) -> Result<()>;

    /// Move `amount` from `owner` to `to`, spending `spender`'s allowance.
    fn transfer_from(
        &mut self,
        spender: Address,
        owner: Address,
        to: Address,
        amount: Amount,
    ) -> Result<()>;

    /// Set `spender`'s allowance over `owner`'s tokens.
    fn approve(&mut self, owner: Address, spender: Address, amount: Amount);

    /// Remaining allowance of `spender` over `owner`'s tokens.
    fn allowance(&self, owner: &Address, spender: &Address) -> Amount;

    /// Create `amount` new tokens at `to`.
    fn mint(&mut self, to: Address, amount: Amount) -> Result<()>;
}
