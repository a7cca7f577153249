//! Collaborators the engine consumes but does not own.
//!
//! - [`Clock`] supplies `now`; the engine never advances time itself.
//! - [`Treasury`] holds the disbursable funds and performs payouts.
//! - [`BalanceLedger`] is the external token ledger read by the weighted variant.
//!
//! All three are object-safe and `Send + Sync` so an engine instance can be
//! shared across threads behind its own lock.

use agora_types::{Address, Amount, Timestamp, Weight};
use thiserror::Error;

/// Source of the current time. Must be monotonically non-decreasing.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Wall-clock time in whole seconds.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// Why a treasury refused a transfer or deposit.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("insufficient funds: need {needed}, available {available}")]
    InsufficientFunds { needed: Amount, available: Amount },

    #[error("balance overflow")]
    Overflow,

    #[error("transfer refused: {0}")]
    Refused(String),
}

/// The funds-transfer capability backing proposal payouts.
pub trait Treasury: Send + Sync {
    /// Funds currently available for disbursement.
    fn balance(&self) -> Amount;

    /// Move `amount` out of the treasury to `to`. All-or-nothing.
    fn transfer(&self, to: &Address, amount: Amount) -> Result<(), TransferError>;

    /// Add funds to the treasury (initial funding, top-ups).
    fn deposit(&self, from: &Address, amount: Amount) -> Result<(), TransferError>;
}

/// Read-only view of an external token ledger.
pub trait BalanceLedger: Send + Sync {
    /// Balance of `principal`; zero for unknown principals.
    fn balance_of(&self, principal: &Address) -> Weight;
}
