//! Eligibility and vote weight.
//!
//! The voting engine is generic over an [`Electorate`]: the congress variant
//! plugs in its [`MembershipRegistry`] (every member weighs 1), the
//! association variant plugs in a [`ShareholderElectorate`] that reads live
//! balances from an external token ledger.

use crate::error::GovernanceError;
use crate::external::BalanceLedger;
use crate::membership::MembershipRegistry;
use agora_types::{Address, Weight};
use std::sync::Arc;

pub trait Electorate {
    /// Voting weight of `principal`, or `None` if it may not vote.
    /// A returned weight is always nonzero.
    fn weight_of(&self, principal: &Address) -> Option<Weight>;

    /// The error reported when an ineligible principal attempts `action`.
    fn ineligible(&self, principal: Address, action: &'static str) -> GovernanceError;
}

impl Electorate for MembershipRegistry {
    fn weight_of(&self, principal: &Address) -> Option<Weight> {
        self.contains(principal).then_some(1)
    }

    fn ineligible(&self, principal: Address, action: &'static str) -> GovernanceError {
        GovernanceError::Unauthorized {
            caller: principal,
            action,
        }
    }
}

/// Token holders weighted by their balance at the moment they vote.
#[derive(Clone)]
pub struct ShareholderElectorate {
    ledger: Arc<dyn BalanceLedger>,
}

impl ShareholderElectorate {
    pub fn new(ledger: Arc<dyn BalanceLedger>) -> Self {
        Self { ledger }
    }

    pub fn balance_of(&self, principal: &Address) -> Weight {
        self.ledger.balance_of(principal)
    }
}

impl Electorate for ShareholderElectorate {
    fn weight_of(&self, principal: &Address) -> Option<Weight> {
        match self.ledger.balance_of(principal) {
            0 => None,
            balance => Some(balance),
        }
    }

    fn ineligible(&self, principal: Address, _action: &'static str) -> GovernanceError {
        GovernanceError::NoWeight(principal)
    }
}

impl std::fmt::Debug for ShareholderElectorate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShareholderElectorate").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::InMemoryShareLedger;
    use agora_types::Timestamp;

    fn addr(n: u8) -> Address {
        Address::new([n; 20])
    }

    #[test]
    fn members_weigh_one() {
        let mut registry = MembershipRegistry::new();
        registry.add(addr(1), "Alice", Timestamp::EPOCH).unwrap();
        assert_eq!(registry.weight_of(&addr(1)), Some(1));
        assert_eq!(registry.weight_of(&addr(2)), None);
        assert!(matches!(
            registry.ineligible(addr(2), "vote"),
            GovernanceError::Unauthorized { .. }
        ));
    }

    #[test]
    fn shareholders_weigh_their_live_balance() {
        let ledger = Arc::new(InMemoryShareLedger::with_balances([(addr(1), 7)]));
        let electorate = ShareholderElectorate::new(ledger.clone());
        assert_eq!(electorate.weight_of(&addr(1)), Some(7));

        ledger.update_balance(addr(1), 9);
        assert_eq!(electorate.weight_of(&addr(1)), Some(9));

        ledger.update_balance(addr(1), 0);
        assert_eq!(electorate.weight_of(&addr(1)), None);
        assert!(matches!(
            electorate.ineligible(addr(1), "vote"),
            GovernanceError::NoWeight(_)
        ));
    }
}
