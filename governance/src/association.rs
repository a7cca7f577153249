//! Shareholder association: token-weighted voting on payouts.
//!
//! Voting weight is read from an external token ledger at the moment a vote
//! is cast. There is no membership list and no admin workflow; the funder is
//! recorded for reference only.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use agora_types::{Address, Amount, ProposalId, Timestamp, Weight};
use tracing::info;

use crate::electorate::{Electorate, ShareholderElectorate};
use crate::engine::{ProposalRequest, VotingEngine};
use crate::error::GovernanceError;
use crate::event::{EventBus, EventListener};
use crate::external::{BalanceLedger, Clock, Treasury};
use crate::params::{Deployment, PassRule, ProposalPolicy, VotingRules};
use crate::proposal::{ExecutionOutcome, Proposal, ProposalState};

/// An association instance. Calls are serialized like [`crate::Congress`]:
/// the clock is read under the lock and events are delivered after it.
pub struct Association {
    funder: Address,
    engine: Mutex<VotingEngine<ShareholderElectorate>>,
    events: EventBus,
    clock: Arc<dyn Clock>,
    treasury: Arc<dyn Treasury>,
}

impl Association {
    pub fn deploy(
        deployment: Deployment,
        ledger: Arc<dyn BalanceLedger>,
        clock: Arc<dyn Clock>,
        treasury: Arc<dyn Treasury>,
    ) -> Result<Self, GovernanceError> {
        let Deployment {
            admin: funder,
            initial_funding,
            voting_rules,
            proposal_policy,
        } = deployment;
        if let PassRule::MinVotes(_) = voting_rules.pass_rule {
            return Err(GovernanceError::InvalidArgument(
                "an association measures quorum in weight, not headcount".into(),
            ));
        }
        if funder.is_zero() {
            return Err(GovernanceError::InvalidArgument(
                "funder must not be the zero address".into(),
            ));
        }
        if !initial_funding.is_zero() {
            treasury.deposit(&funder, initial_funding).map_err(|e| {
                GovernanceError::InvalidArgument(format!("initial funding refused: {e}"))
            })?;
        }

        let policy = proposal_policy.unwrap_or(ProposalPolicy::Open);
        info!(
            funder = %funder,
            funding = %initial_funding,
            ?voting_rules,
            ?policy,
            "association deployed"
        );
        Ok(Self {
            funder,
            engine: Mutex::new(VotingEngine::new(
                ShareholderElectorate::new(ledger),
                voting_rules,
                policy,
            )),
            events: EventBus::new(),
            clock,
            treasury,
        })
    }

    fn lock(&self) -> MutexGuard<'_, VotingEngine<ShareholderElectorate>> {
        self.engine.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn transact<T>(
        &self,
        op: impl FnOnce(&mut VotingEngine<ShareholderElectorate>, Timestamp) -> T,
    ) -> T {
        let result = {
            let mut engine = self.lock();
            let now = self.clock.now();
            let result = op(&mut *engine, now);
            self.events.enqueue(engine.take_events());
            result
        };
        self.events.flush();
        result
    }

    pub fn subscribe(&self, listener: EventListener) {
        self.events.subscribe(listener);
    }

    pub fn new_proposal(
        &self,
        caller: Address,
        request: ProposalRequest,
    ) -> Result<ProposalId, GovernanceError> {
        self.transact(|engine, now| {
            engine.new_proposal(caller, request, now, self.treasury.as_ref())
        })
    }

    /// Cast a vote weighted by the caller's current token balance.
    pub fn vote(
        &self,
        caller: Address,
        proposal_id: ProposalId,
        in_favor: bool,
        justification: impl Into<String>,
    ) -> Result<Weight, GovernanceError> {
        self.transact(|engine, now| engine.vote(caller, proposal_id, in_favor, justification, now))
    }

    pub fn voting_time_left(&self, proposal_id: ProposalId) -> Result<Duration, GovernanceError> {
        self.transact(|engine, now| engine.voting_time_left(proposal_id, now))
    }

    pub fn execute_proposal(
        &self,
        proposal_id: ProposalId,
        payload: &[u8],
    ) -> Result<ExecutionOutcome, GovernanceError> {
        self.transact(|engine, now| {
            engine.execute_proposal(proposal_id, payload, now, self.treasury.as_ref())
        })
    }

    pub fn check_proposal_code(
        &self,
        proposal_id: ProposalId,
        beneficiary: &Address,
        amount: Amount,
        payload: &[u8],
    ) -> Result<bool, GovernanceError> {
        self.lock()
            .check_proposal_code(proposal_id, beneficiary, amount, payload)
    }

    pub fn proposal(&self, proposal_id: ProposalId) -> Option<Proposal> {
        self.lock().proposal(proposal_id).cloned()
    }

    pub fn proposal_count(&self) -> u64 {
        self.lock().proposal_count()
    }

    pub fn proposal_state(&self, proposal_id: ProposalId) -> Result<ProposalState, GovernanceError> {
        self.transact(|engine, now| engine.proposal_state(proposal_id, now))
    }

    /// Live token balance of `principal`; zero means ineligible.
    pub fn weight_of(&self, principal: &Address) -> Weight {
        self.lock().electorate().weight_of(principal).unwrap_or(0)
    }

    pub fn admin(&self) -> Address {
        self.funder
    }

    pub fn voting_rules(&self) -> VotingRules {
        *self.lock().rules()
    }

    pub fn proposal_policy(&self) -> ProposalPolicy {
        self.lock().policy()
    }

    pub fn treasury_balance(&self) -> Amount {
        self.treasury.balance()
    }
}

impl std::fmt::Debug for Association {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Association")
            .field("funder", &self.funder)
            .field("engine", &*self.lock())
            .field("events", &self.events)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{InMemoryShareLedger, InMemoryTreasury};
    use agora_types::Timestamp;

    struct FixedClock(Timestamp);

    impl Clock for FixedClock {
        fn now(&self) -> Timestamp {
            self.0
        }
    }

    fn addr(n: u8) -> Address {
        Address::new([n; 20])
    }

    fn association(policy: Option<ProposalPolicy>) -> Association {
        let rules = VotingRules::association(5, 60, 1).unwrap();
        let mut deployment = Deployment::new(addr(1), rules).with_funding(Amount::new(100));
        deployment.proposal_policy = policy;
        let ledger = Arc::new(InMemoryShareLedger::with_balances([(addr(2), 3)]));
        Association::deploy(
            deployment,
            ledger,
            Arc::new(FixedClock(Timestamp::new(5))),
            Arc::new(InMemoryTreasury::new()),
        )
        .unwrap()
    }

    #[test]
    fn deploy_deposits_funding_and_defaults_to_open_policy() {
        let association = association(None);
        assert_eq!(association.treasury_balance(), Amount::new(100));
        assert_eq!(association.proposal_policy(), ProposalPolicy::Open);
        assert_eq!(association.admin(), addr(1));
    }

    #[test]
    fn deploy_rejects_headcount_rules() {
        let rules = VotingRules::congress(2, 60, 1).unwrap();
        let result = Association::deploy(
            Deployment::new(addr(1), rules),
            Arc::new(InMemoryShareLedger::new()),
            Arc::new(FixedClock(Timestamp::EPOCH)),
            Arc::new(InMemoryTreasury::new()),
        );
        assert!(matches!(result, Err(GovernanceError::InvalidArgument(_))));
    }

    #[test]
    fn zero_weight_voter_gets_no_weight_error() {
        let association = association(None);
        let id = association
            .new_proposal(addr(9), ProposalRequest::new(addr(4), Amount::new(10), "x"))
            .unwrap();
        assert!(matches!(
            association.vote(addr(9), id, true, ""),
            Err(GovernanceError::NoWeight(_))
        ));
        assert_eq!(association.vote(addr(2), id, true, "").unwrap(), 3);
    }

    #[test]
    fn members_only_policy_requires_weight_to_propose() {
        let association = association(Some(ProposalPolicy::MembersOnly));
        let request = ProposalRequest::new(addr(4), Amount::new(10), "x");
        assert!(matches!(
            association.new_proposal(addr(9), request.clone()),
            Err(GovernanceError::NoWeight(_))
        ));
        assert_eq!(association.new_proposal(addr(2), request).unwrap(), 0);
    }
}
