//! Equal-weight congress: an administered member list voting on payouts.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use agora_types::{Address, Amount, ProposalId, Timestamp, Weight};
use tracing::info;

use crate::electorate::Electorate;
use crate::engine::{ProposalRequest, VotingEngine};
use crate::error::GovernanceError;
use crate::event::{EventBus, EventListener, GovernanceEvent};
use crate::external::{Clock, Treasury};
use crate::membership::{Member, MembershipRegistry};
use crate::ownership::Ownership;
use crate::params::{Deployment, PassRule, ProposalPolicy, VotingRules};
use crate::proposal::{ExecutionOutcome, Proposal, ProposalState};

struct CongressState {
    ownership: Ownership,
    engine: VotingEngine<MembershipRegistry>,
}

/// A congress instance. Every call is serialized behind one lock and reads
/// the clock while holding it. Events are delivered in commit order after
/// the lock is released, so listeners may query the congress.
pub struct Congress {
    state: Mutex<CongressState>,
    events: EventBus,
    clock: Arc<dyn Clock>,
    treasury: Arc<dyn Treasury>,
}

impl Congress {
    /// Deploy a congress. The admin joins as its first member under
    /// `founder_name`, and the initial funding is deposited on its behalf.
    pub fn deploy(
        deployment: Deployment,
        founder_name: impl Into<String>,
        clock: Arc<dyn Clock>,
        treasury: Arc<dyn Treasury>,
    ) -> Result<Self, GovernanceError> {
        let Deployment {
            admin,
            initial_funding,
            voting_rules,
            proposal_policy,
        } = deployment;
        if let PassRule::MinQuorum(_) = voting_rules.pass_rule {
            return Err(GovernanceError::InvalidArgument(
                "a congress counts votes, not quorum weight".into(),
            ));
        }

        let ownership = Ownership::new(admin)?;
        let mut registry = MembershipRegistry::new();
        registry.add(admin, founder_name, clock.now())?;
        if !initial_funding.is_zero() {
            treasury.deposit(&admin, initial_funding).map_err(|e| {
                GovernanceError::InvalidArgument(format!("initial funding refused: {e}"))
            })?;
        }

        let policy = proposal_policy.unwrap_or(ProposalPolicy::MembersOnly);
        info!(
            admin = %admin,
            funding = %initial_funding,
            ?voting_rules,
            ?policy,
            "congress deployed"
        );
        Ok(Self {
            state: Mutex::new(CongressState {
                ownership,
                engine: VotingEngine::new(registry, voting_rules, policy),
            }),
            events: EventBus::new(),
            clock,
            treasury,
        })
    }

    fn lock(&self) -> MutexGuard<'_, CongressState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `op` against the locked state with `now` read under the lock,
    /// then deliver the events it committed.
    fn transact<T>(&self, op: impl FnOnce(&mut CongressState, Timestamp) -> T) -> T {
        let result = {
            let mut state = self.lock();
            let now = self.clock.now();
            let result = op(&mut *state, now);
            self.events.enqueue(state.engine.take_events());
            result
        };
        self.events.flush();
        result
    }

    pub fn subscribe(&self, listener: EventListener) {
        self.events.subscribe(listener);
    }

    // ── Membership & administration ─────────────────────────────────────

    pub fn add_member(
        &self,
        caller: Address,
        principal: Address,
        name: impl Into<String>,
    ) -> Result<(), GovernanceError> {
        self.transact(|state, now| -> Result<(), GovernanceError> {
            state.ownership.ensure_admin(&caller, "add members")?;
            let name = state
                .engine
                .electorate_mut()
                .add(principal, name, now)?
                .name
                .clone();
            info!(member = %principal, name = %name, "member added");
            state
                .engine
                .emit(GovernanceEvent::MemberAdded { principal, name });
            Ok(())
        })
    }

    pub fn remove_member(&self, caller: Address, principal: Address) -> Result<(), GovernanceError> {
        self.transact(|state, _| -> Result<(), GovernanceError> {
            state.ownership.ensure_admin(&caller, "remove members")?;
            let removed = state.engine.electorate_mut().remove(&principal)?;
            info!(member = %principal, name = %removed.name, "member removed");
            state.engine.emit(GovernanceEvent::MemberRemoved {
                principal,
                name: removed.name,
            });
            Ok(())
        })
    }

    /// Hand administration to `new_admin`. The caller loses admin rights
    /// immediately.
    pub fn transfer_ownership(
        &self,
        caller: Address,
        new_admin: Address,
    ) -> Result<(), GovernanceError> {
        self.transact(|state, _| -> Result<(), GovernanceError> {
            let previous_admin = state.ownership.transfer(&caller, new_admin)?;
            info!(previous = %previous_admin, new = %new_admin, "ownership transferred");
            state.engine.emit(GovernanceEvent::OwnershipTransferred {
                previous_admin,
                new_admin,
            });
            Ok(())
        })
    }

    /// Add funds to the treasury. Anyone may fund.
    pub fn fund(&self, from: Address, amount: Amount) -> Result<(), GovernanceError> {
        if amount.is_zero() {
            return Err(GovernanceError::InvalidArgument(
                "funding amount must be greater than zero".into(),
            ));
        }
        self.transact(|_, _| -> Result<(), GovernanceError> {
            self.treasury
                .deposit(&from, amount)
                .map_err(|source| GovernanceError::FundingFailed {
                    from,
                    amount,
                    source,
                })?;
            info!(from = %from, amount = %amount, "treasury funded");
            Ok(())
        })
    }

    // ── Proposals ───────────────────────────────────────────────────────

    pub fn new_proposal(
        &self,
        caller: Address,
        request: ProposalRequest,
    ) -> Result<ProposalId, GovernanceError> {
        self.transact(|state, now| {
            state
                .engine
                .new_proposal(caller, request, now, self.treasury.as_ref())
        })
    }

    pub fn vote(
        &self,
        caller: Address,
        proposal_id: ProposalId,
        in_favor: bool,
        justification: impl Into<String>,
    ) -> Result<Weight, GovernanceError> {
        self.transact(|state, now| {
            state
                .engine
                .vote(caller, proposal_id, in_favor, justification, now)
        })
    }

    pub fn voting_time_left(&self, proposal_id: ProposalId) -> Result<Duration, GovernanceError> {
        self.transact(|state, now| state.engine.voting_time_left(proposal_id, now))
    }

    pub fn execute_proposal(
        &self,
        proposal_id: ProposalId,
        payload: &[u8],
    ) -> Result<ExecutionOutcome, GovernanceError> {
        self.transact(|state, now| {
            state
                .engine
                .execute_proposal(proposal_id, payload, now, self.treasury.as_ref())
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
            .engine
            .check_proposal_code(proposal_id, beneficiary, amount, payload)
    }

    // ── Queries ─────────────────────────────────────────────────────────

    pub fn proposal(&self, proposal_id: ProposalId) -> Option<Proposal> {
        self.lock().engine.proposal(proposal_id).cloned()
    }

    pub fn proposal_count(&self) -> u64 {
        self.lock().engine.proposal_count()
    }

    pub fn proposal_state(&self, proposal_id: ProposalId) -> Result<ProposalState, GovernanceError> {
        self.transact(|state, now| state.engine.proposal_state(proposal_id, now))
    }

    /// Current members in join order.
    pub fn members(&self) -> Vec<Member> {
        self.lock().engine.electorate().iter().cloned().collect()
    }

    pub fn member(&self, principal: &Address) -> Option<Member> {
        self.lock().engine.electorate().get(principal).cloned()
    }

    pub fn is_member(&self, principal: &Address) -> bool {
        self.lock().engine.electorate().contains(principal)
    }

    pub fn admin(&self) -> Address {
        self.lock().ownership.admin()
    }

    /// 1 for members, 0 otherwise.
    pub fn weight_of(&self, principal: &Address) -> Weight {
        self.lock()
            .engine
            .electorate()
            .weight_of(principal)
            .unwrap_or(0)
    }

    pub fn voting_rules(&self) -> VotingRules {
        *self.lock().engine.rules()
    }

    pub fn proposal_policy(&self) -> ProposalPolicy {
        self.lock().engine.policy()
    }

    pub fn treasury_balance(&self) -> Amount {
        self.treasury.balance()
    }
}

impl std::fmt::Debug for Congress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("Congress")
            .field("admin", &state.ownership.admin())
            .field("members", &state.engine.electorate().len())
            .field("engine", &state.engine)
            .field("events", &self.events)
            .finish()
    }
}
