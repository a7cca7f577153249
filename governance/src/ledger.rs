//! In-memory implementations of the treasury and token ledger collaborators.
//!
//! These are the production collaborators for a single-process deployment;
//! there is no persistence beyond process memory.

use crate::external::{BalanceLedger, TransferError, Treasury};
use agora_types::{Address, Amount, Weight};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

#[derive(Default)]
struct VaultState {
    balance: Amount,
    /// Cumulative amounts paid out, per recipient.
    paid: HashMap<Address, Amount>,
}

/// A treasury that keeps its balance and payout history in memory.
#[derive(Default)]
pub struct InMemoryTreasury {
    state: Mutex<VaultState>,
}

impl InMemoryTreasury {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, VaultState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Total paid out to `recipient` so far.
    pub fn paid_to(&self, recipient: &Address) -> Amount {
        self.lock().paid.get(recipient).copied().unwrap_or(Amount::ZERO)
    }
}

impl Treasury for InMemoryTreasury {
    fn balance(&self) -> Amount {
        self.lock().balance
    }

    fn transfer(&self, to: &Address, amount: Amount) -> Result<(), TransferError> {
        let mut state = self.lock();
        let remaining =
            state
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
        debug!(to = %to, amount = %amount, remaining = %remaining, "treasury payout");
        Ok(())
    }

    fn deposit(&self, from: &Address, amount: Amount) -> Result<(), TransferError> {
        let mut state = self.lock();
        state.balance = state
            .balance
            .checked_add(amount)
            .ok_or(TransferError::Overflow)?;
        debug!(from = %from, amount = %amount, "treasury deposit");
        Ok(())
    }
}

/// A token ledger whose balances are set directly by its owner.
#[derive(Default)]
pub struct InMemoryShareLedger {
    balances: Mutex<HashMap<Address, Weight>>,
}

impl InMemoryShareLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a ledger from `(holder, balance)` pairs.
    pub fn with_balances(balances: impl IntoIterator<Item = (Address, Weight)>) -> Self {
        Self {
            balances: Mutex::new(balances.into_iter().collect()),
        }
    }

    /// Set `holder`'s balance. A zero balance removes the entry.
    pub fn update_balance(&self, holder: Address, balance: Weight) {
        let mut balances = self.balances.lock().unwrap_or_else(PoisonError::into_inner);
        if balance == 0 {
            balances.remove(&holder);
        } else {
            balances.insert(holder, balance);
        }
    }

    /// Sum of all balances.
    pub fn total_supply(&self) -> Weight {
        self.balances
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .fold(0u128, |acc, b| acc.saturating_add(*b))
    }
}

impl BalanceLedger for InMemoryShareLedger {
    fn balance_of(&self, principal: &Address) -> Weight {
        self.balances
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(principal)
            .copied()
            .unwrap_or(0)
    }
}
