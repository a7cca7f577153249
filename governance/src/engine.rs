//! The voting engine: proposal store and the open → closed → executed state
//! machine, generic over who may vote and with what weight.
//!
//! The engine is a plain value. It reads no clock and owns no funds: `now`
//! and the treasury are passed into every call that needs them. Callers are
//! responsible for serializing access; [`crate::Congress`] and
//! [`crate::Association`] do so with a mutex. Events produced by successful
//! calls queue up until the caller takes them with
//! [`VotingEngine::take_events`].

use crate::electorate::Electorate;
use crate::error::GovernanceError;
use crate::event::GovernanceEvent;
use crate::external::Treasury;
use crate::params::{ProposalPolicy, VotingRules};
use crate::proposal::{ExecutionOutcome, Proposal, ProposalState, Vote};
use agora_types::{Address, Amount, ProposalId, Timestamp, Weight};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Everything a caller supplies to open a proposal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProposalRequest {
    pub beneficiary: Address,
    pub payout: Amount,
    pub description: String,
    /// Opaque bytes committed to by the proposal hash and re-supplied at
    /// execution.
    pub payload: Vec<u8>,
}

impl ProposalRequest {
    pub fn new(beneficiary: Address, payout: Amount, description: impl Into<String>) -> Self {
        Self {
            beneficiary,
            payout,
            description: description.into(),
            payload: Vec::new(),
        }
    }

    pub fn with_payload(mut self, payload: impl Into<Vec<u8>>) -> Self {
        self.payload = payload.into();
        self
    }
}

pub struct VotingEngine<E> {
    electorate: E,
    rules: VotingRules,
    policy: ProposalPolicy,
    /// Indexed by proposal id.
    proposals: Vec<Proposal>,
    /// Events for committed changes, oldest first.
    pending: Vec<GovernanceEvent>,
}

impl<E: Electorate> VotingEngine<E> {
    pub fn new(electorate: E, rules: VotingRules, policy: ProposalPolicy) -> Self {
        Self {
            electorate,
            rules,
            policy,
            proposals: Vec::new(),
            pending: Vec::new(),
        }
    }

    /// Queue an event for a change the caller has already committed.
    pub fn emit(&mut self, event: GovernanceEvent) {
        self.pending.push(event);
    }

    /// Drain the queued events in commit order.
    pub fn take_events(&mut self) -> Vec<GovernanceEvent> {
        std::mem::take(&mut self.pending)
    }

    /// Open a new proposal. Returns its id.
    pub fn new_proposal(
        &mut self,
        proposer: Address,
        request: ProposalRequest,
        now: Timestamp,
        treasury: &dyn Treasury,
    ) -> Result<ProposalId, GovernanceError> {
        if self.policy == ProposalPolicy::MembersOnly
            && self.electorate.weight_of(&proposer).is_none()
        {
            return Err(self.electorate.ineligible(proposer, "create proposals"));
        }
        if request.beneficiary.is_zero() {
            return Err(GovernanceError::InvalidArgument(
                "beneficiary must not be the zero address".into(),
            ));
        }
        if request.payout.is_zero() {
            return Err(GovernanceError::InvalidArgument(
                "payout must be greater than zero".into(),
            ));
        }
        let available = treasury.balance();
        if request.payout > available {
            return Err(GovernanceError::InvalidArgument(format!(
                "payout {} exceeds treasury balance {}",
                request.payout, available
            )));
        }

        let id = self.proposals.len() as ProposalId;
        let proposal = Proposal::new(
            id,
            proposer,
            request.beneficiary,
            request.payout,
            request.description,
            &request.payload,
            now,
            self.rules.voting_period_secs,
        );
        info!(
            proposal_id = id,
            proposer = %proposer,
            beneficiary = %proposal.beneficiary,
            payout = %proposal.payout,
            deadline = %proposal.voting_deadline,
            "proposal created"
        );
        let event = GovernanceEvent::ProposalCreated {
            proposal_id: id,
            beneficiary: proposal.beneficiary,
            description: proposal.description.clone(),
        };
        self.proposals.push(proposal);
        self.pending.push(event);
        Ok(id)
    }

    /// Cast `voter`'s vote. Returns the weight that was counted.
    pub fn vote(
        &mut self,
        voter: Address,
        proposal_id: ProposalId,
        in_favor: bool,
        justification: impl Into<String>,
        now: Timestamp,
    ) -> Result<Weight, GovernanceError> {
        let weight = {
            let proposal = self.get(proposal_id)?;
            if !proposal.is_open(now) {
                return Err(GovernanceError::VotingClosed(proposal_id));
            }
            self.electorate
                .weight_of(&voter)
                .ok_or_else(|| self.electorate.ineligible(voter, "vote"))?
        };

        let justification = justification.into();
        let proposal = self.get_mut(proposal_id)?;
        proposal.record_vote(Vote {
            voter,
            in_favor,
            weight,
            justification: justification.clone(),
            cast_at: now,
        })?;
        debug!(
            proposal_id,
            voter = %voter,
            in_favor,
            weight,
            vote_count = proposal.vote_count,
            current_result = proposal.current_result,
            "vote recorded"
        );
        let event = GovernanceEvent::VoteCast {
            proposal_id,
            voter,
            in_favor,
            weight,
            vote_count: proposal.vote_count,
            current_result: proposal.current_result,
            justification,
        };
        self.pending.push(event);
        Ok(weight)
    }

    /// Time remaining in the voting window; zero once it has closed.
    pub fn voting_time_left(
        &self,
        proposal_id: ProposalId,
        now: Timestamp,
    ) -> Result<Duration, GovernanceError> {
        Ok(self.get(proposal_id)?.voting_deadline.remaining_from(now))
    }

    /// Settle a proposal whose window has closed and, if it passed, pay out.
    ///
    /// A proposal that did not pass is still settled and the call fails with
    /// `ProposalRejected`. A failed transfer leaves the proposal unsettled.
    pub fn execute_proposal(
        &mut self,
        proposal_id: ProposalId,
        payload: &[u8],
        now: Timestamp,
        treasury: &dyn Treasury,
    ) -> Result<ExecutionOutcome, GovernanceError> {
        let rules = self.rules;
        let proposal = self.get_mut(proposal_id)?;
        if proposal.executed {
            return Err(GovernanceError::AlreadyExecuted(proposal_id));
        }
        if now < proposal.voting_deadline {
            return Err(GovernanceError::VotingStillOpen {
                proposal_id,
                secs_left: proposal.voting_deadline.remaining_from(now).as_secs(),
            });
        }
        if !proposal.matches(&proposal.beneficiary, proposal.payout, payload) {
            return Err(GovernanceError::PayloadMismatch(proposal_id));
        }

        let passed = rules.passes(proposal.current_result, proposal.vote_count);
        proposal.executed = true;
        proposal.passed = passed;

        if !passed {
            warn!(
                proposal_id,
                current_result = proposal.current_result,
                vote_count = proposal.vote_count,
                "proposal rejected"
            );
            return Err(GovernanceError::ProposalRejected {
                proposal_id,
                current_result: proposal.current_result,
                vote_count: proposal.vote_count,
            });
        }

        if let Err(source) = treasury.transfer(&proposal.beneficiary, proposal.payout) {
            proposal.executed = false;
            proposal.passed = false;
            warn!(
                proposal_id,
                beneficiary = %proposal.beneficiary,
                payout = %proposal.payout,
                error = %source,
                "payout failed, proposal left unsettled"
            );
            return Err(GovernanceError::TransferFailed {
                beneficiary: proposal.beneficiary,
                amount: proposal.payout,
                source,
            });
        }

        let outcome = ExecutionOutcome {
            proposal_id,
            beneficiary: proposal.beneficiary,
            payout: proposal.payout,
            current_result: proposal.current_result,
            vote_count: proposal.vote_count,
        };
        info!(
            proposal_id,
            beneficiary = %outcome.beneficiary,
            payout = %outcome.payout,
            current_result = outcome.current_result,
            vote_count = outcome.vote_count,
            "proposal executed"
        );
        self.pending.push(GovernanceEvent::ProposalExecuted {
            proposal_id,
            beneficiary: outcome.beneficiary,
            payout: outcome.payout,
            current_result: outcome.current_result,
            vote_count: outcome.vote_count,
            passed: true,
        });
        Ok(outcome)
    }

    /// Whether `(beneficiary, amount, payload)` matches the proposal's hash.
    pub fn check_proposal_code(
        &self,
        proposal_id: ProposalId,
        beneficiary: &Address,
        amount: Amount,
        payload: &[u8],
    ) -> Result<bool, GovernanceError> {
        Ok(self.get(proposal_id)?.matches(beneficiary, amount, payload))
    }

    pub fn proposal(&self, proposal_id: ProposalId) -> Option<&Proposal> {
        self.proposals.get(usize::try_from(proposal_id).ok()?)
    }

    pub fn proposal_count(&self) -> u64 {
        self.proposals.len() as u64
    }

    pub fn proposal_state(
        &self,
        proposal_id: ProposalId,
        now: Timestamp,
    ) -> Result<ProposalState, GovernanceError> {
        Ok(self.get(proposal_id)?.state(now))
    }

    pub fn proposals(&self) -> impl Iterator<Item = &Proposal> {
        self.proposals.iter()
    }

    pub fn rules(&self) -> &VotingRules {
        &self.rules
    }

    pub fn policy(&self) -> ProposalPolicy {
        self.policy
    }

    pub fn electorate(&self) -> &E {
        &self.electorate
    }

    pub fn electorate_mut(&mut self) -> &mut E {
        &mut self.electorate
    }

    fn get(&self, proposal_id: ProposalId) -> Result<&Proposal, GovernanceError> {
        self.proposal(proposal_id)
            .ok_or(GovernanceError::ProposalNotFound(proposal_id))
    }

    fn get_mut(&mut self, proposal_id: ProposalId) -> Result<&mut Proposal, GovernanceError> {
        usize::try_from(proposal_id)
            .ok()
            .and_then(|index| self.proposals.get_mut(index))
            .ok_or(GovernanceError::ProposalNotFound(proposal_id))
    }
}

impl<E> std::fmt::Debug for VotingEngine<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VotingEngine")
            .field("rules", &self.rules)
            .field("policy", &self.policy)
            .field("proposals", &self.proposals.len())
            .field("pending_events", &self.pending.len())
            .finish_non_exhaustive()
    }
}
