//! Nullable treasury: in-memory funds with failure injection.

use agora_governance::{TransferError, Treasury};
use agora_types::{Address, Amount};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// One completed payout.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Payout {
    pub to: Address,
    pub amount: Amount,
}

#[derive(Default)]
struct State {
    balance: Amount,
    payouts: Vec<Payout>,
    paid: HashMap<Address, Amount>,
    /// Number of upcoming transfers to refuse.
    failures_pending: usize,
}

/// A treasury that records every payout and can be told to refuse
/// transfers.
#[derive(Default)]
pub struct NullTreasury {
    state: Mutex<State>,
}

impl NullTreasury {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_balance(balance: Amount) -> Self {
        let treasury = Self::new();
        treasury.lock().balance = balance;
        treasury
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Refuse the next `count` transfers, regardless of balance.
    pub fn fail_next_transfers(&self, count: usize) {
        self.lock().failures_pending = count;
    }

    /// Payouts made so far, in order.
    pub fn payouts(&self) -> Vec<Payout> {
        self.lock().payouts.clone()
    }

    /// Total paid to `to` so far.
    pub fn paid_to(&self, to: &Address) -> Amount {
        self.lock().paid.get(to).copied().unwrap_or(Amount::ZERO)
    }
}

impl Treasury for NullTreasury {
    fn balance(&self) -> Amount {
        self.lock().balance
    }

    fn transfer(&self, to: &Address, amount: Amount) -> Result<(), TransferError> {
        let mut state = self.lock();
        if state.failures_pending > 0 {
            state.failures_pending -= 1;
            return Err(TransferError::Refused("injected failure".into()));
        }
        let remaining = state
            .balance
            .checked_sub(amount)
            .ok_or(TransferError::InsufficientFunds {
                needed: amount,
                available: state.balance,
            })?;
        let paid = state.paid.get(to).copied().unwrap_or(Amount::ZERO);
        let paid = paid.checked_add(amount).ok_or(TransferError::Overflow)?;
        state.balance = remaining;
        state.paid.insert(*to, paid);
        state.payouts.push(Payout { to: *to, amount });
        Ok(())
    }

    fn deposit(&self, _from: &Address, amount: Amount) -> Result<(), TransferError> {
        let mut state = self.lock();
        state.balance = state
            .balance
            .checked_add(amount)
            .ok_or(TransferError::Overflow)?;
        Ok(())
    }
}
