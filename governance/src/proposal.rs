//! Proposals, the votes recorded against them, and their lifecycle.

use crate::error::GovernanceError;
use agora_types::{Address, Amount, ProposalHash, ProposalId, Timestamp, Weight};
use serde::Serialize;

/// Where a proposal is in its lifecycle.
///
/// `Open` and `Closed` are derived lazily from the deadline and `now`; the
/// two executed states are terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalState {
    /// Accepting votes.
    Open,
    /// Voting window over, awaiting execution.
    Closed,
    /// Passed and paid out.
    ExecutedPassed,
    /// Settled without passing. No payout was made.
    ExecutedRejected,
}

impl ProposalState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::ExecutedPassed | Self::ExecutedRejected)
    }
}

/// One principal's vote on one proposal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Vote {
    pub voter: Address,
    pub in_favor: bool,
    /// Weight at the moment the vote was cast. Later balance changes do not
    /// revise it.
    pub weight: Weight,
    pub justification: String,
    pub cast_at: Timestamp,
}

#[derive(Clone, Debug, Serialize)]
pub struct Proposal {
    pub id: ProposalId,
    pub proposer: Address,
    pub beneficiary: Address,
    pub payout: Amount,
    pub description: String,
    pub proposal_hash: ProposalHash,
    pub created_at: Timestamp,
    pub voting_deadline: Timestamp,
    /// Set once, when an execution attempt settles the proposal.
    pub executed: bool,
    /// Meaningful only once `executed` is true.
    pub passed: bool,
    /// Sum of cast weights, yes and no.
    pub vote_count: Weight,
    /// Yes weight minus no weight.
    pub current_result: i128,
    pub votes: Vec<Vote>,
}

impl Proposal {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        id: ProposalId,
        proposer: Address,
        beneficiary: Address,
        payout: Amount,
        description: String,
        payload: &[u8],
        now: Timestamp,
        voting_period_secs: u64,
    ) -> Self {
        Self {
            id,
            proposer,
            beneficiary,
            payout,
            description,
            proposal_hash: ProposalHash::compute(&beneficiary, payout, payload),
            created_at: now,
            voting_deadline: now.plus_secs(voting_period_secs),
            executed: false,
            passed: false,
            vote_count: 0,
            current_result: 0,
            votes: Vec::new(),
        }
    }

    pub fn state(&self, now: Timestamp) -> ProposalState {
        match (self.executed, self.passed) {
            (true, true) => ProposalState::ExecutedPassed,
            (true, false) => ProposalState::ExecutedRejected,
            _ if now < self.voting_deadline => ProposalState::Open,
            _ => ProposalState::Closed,
        }
    }

    /// Whether votes are still accepted at `now`.
    pub fn is_open(&self, now: Timestamp) -> bool {
        !self.executed && now < self.voting_deadline
    }

    pub fn has_voted(&self, voter: &Address) -> bool {
        self.votes.iter().any(|v| v.voter == *voter)
    }

    /// Whether `(beneficiary, amount, payload)` matches the stored commitment.
    pub fn matches(&self, beneficiary: &Address, amount: Amount, payload: &[u8]) -> bool {
        ProposalHash::compute(beneficiary, amount, payload) == self.proposal_hash
    }

    /// Append a vote and update the running totals.
    ///
    /// Totals are computed before anything is mutated so an overflow leaves
    /// the proposal untouched.
    pub(crate) fn record_vote(&mut self, vote: Vote) -> Result<(), GovernanceError> {
        if self.has_voted(&vote.voter) {
            return Err(GovernanceError::DuplicateVote {
                proposal_id: self.id,
                voter: vote.voter,
            });
        }
        let signed = i128::try_from(vote.weight).map_err(|_| GovernanceError::Overflow)?;
        let vote_count = self
            .vote_count
            .checked_add(vote.weight)
            .ok_or(GovernanceError::Overflow)?;
        let current_result = if vote.in_favor {
            self.current_result.checked_add(signed)
        } else {
            self.current_result.checked_sub(signed)
        }
        .ok_or(GovernanceError::Overflow)?;

        self.vote_count = vote_count;
        self.current_result = current_result;
        self.votes.push(vote);
        Ok(())
    }

    /// Recompute `(vote_count, current_result)` from the recorded votes.
    pub fn recount(&self) -> Result<(Weight, i128), GovernanceError> {
        self.votes
            .iter()
            .try_fold((0 as Weight, 0i128), |(count, result), v| {
                let signed = i128::try_from(v.weight).ok()?;
                let count = count.checked_add(v.weight)?;
                let result = if v.in_favor {
                    result.checked_add(signed)?
                } else {
                    result.checked_sub(signed)?
                };
                Some((count, result))
            })
            .ok_or(GovernanceError::Overflow)
    }
}

/// The result of a successful execution.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ExecutionOutcome {
    pub proposal_id: ProposalId,
    pub beneficiary: Address,
    pub payout: Amount,
    pub current_result: i128,
    pub vote_count: Weight,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: u8) -> Address {
        Address::new([n; 20])
    }

    fn proposal() -> Proposal {
        Proposal::new(
            0,
            addr(1),
            addr(9),
            Amount::new(500),
            "new roof".into(),
            b"",
            Timestamp::new(1_000),
            600,
        )
    }

    fn vote(voter: u8, in_favor: bool, weight: Weight) -> Vote {
        Vote {
            voter: addr(voter),
            in_favor,
            weight,
            justification: String::new(),
            cast_at: Timestamp::new(1_001),
        }
    }

    #[test]
    fn test_deadline_and_state_transitions() {
        let mut p = proposal();
        assert_eq!(p.voting_deadline, Timestamp::new(1_600));
        assert_eq!(p.state(Timestamp::new(1_599)), ProposalState::Open);
        assert_eq!(p.state(Timestamp::new(1_600)), ProposalState::Closed);

        p.executed = true;
        assert_eq!(p.state(Timestamp::new(1_600)), ProposalState::ExecutedRejected);
        p.passed = true;
        assert!(p.state(Timestamp::new(1_600)).is_terminal());
    }

    #[test]
    fn test_record_vote_updates_totals() {
        let mut p = proposal();
        p.record_vote(vote(1, true, 3)).unwrap();
        p.record_vote(vote(2, false, 1)).unwrap();
        assert_eq!(p.vote_count, 4);
        assert_eq!(p.current_result, 2);
        assert_eq!(p.recount().unwrap(), (4, 2));
    }

    #[test]
    fn test_recount_reports_overflow() {
        let mut p = proposal();
        p.votes.push(vote(1, true, u128::MAX));
        assert!(matches!(p.recount(), Err(GovernanceError::Overflow)));
    }

    #[test]
    fn test_duplicate_vote_leaves_totals() {
        let mut p = proposal();
        p.record_vote(vote(1, true, 1)).unwrap();
        let err = p.record_vote(vote(1, false, 1)).unwrap_err();
        assert!(matches!(err, GovernanceError::DuplicateVote { proposal_id: 0, .. }));
        assert_eq!((p.vote_count, p.current_result), (1, 1));
        assert_eq!(p.votes.len(), 1);
    }

    #[test]
    fn test_overflowing_weight_is_rejected_without_mutation() {
        let mut p = proposal();
        let err = p.record_vote(vote(1, true, u128::MAX)).unwrap_err();
        assert!(matches!(err, GovernanceError::Overflow));
        assert!(p.votes.is_empty());
        assert_eq!(p.vote_count, 0);
    }

    #[test]
    fn test_hash_commits_to_terms_and_payload() {
        let p = proposal();
        assert!(p.matches(&addr(9), Amount::new(500), b""));
        assert!(!p.matches(&addr(9), Amount::new(501), b""));
        assert!(!p.matches(&addr(9), Amount::new(500), b"calldata"));
    }
}
