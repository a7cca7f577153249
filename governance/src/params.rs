//! Immutable voting rules and deployment parameters.
//!
//! Rules are fixed when an engine is constructed and never change afterwards.

use crate::error::GovernanceError;
use agora_types::{Address, Amount, Weight};
use serde::Serialize;

/// The vote-count clause of the pass condition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PassRule {
    /// Congress: at least this many votes must be cast (each member weighs 1).
    MinVotes(u64),
    /// Association: cumulative cast weight must reach this quorum.
    MinQuorum(Weight),
}

impl PassRule {
    /// Minimum `vote_count` required for a result to be actionable.
    pub fn floor(&self) -> Weight {
        match *self {
            Self::MinVotes(votes) => votes as Weight,
            Self::MinQuorum(quorum) => quorum,
        }
    }
}

/// Who may create proposals.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalPolicy {
    /// Only eligible voters (members, or holders of nonzero weight) may propose.
    #[default]
    MembersOnly,
    /// Any caller may propose.
    Open,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct VotingRules {
    /// Length of the voting window, fixed for every proposal.
    pub voting_period_secs: u64,
    /// Minimum `current_result` (yes weight minus no weight) to pass.
    pub min_pass_margin: i128,
    pub pass_rule: PassRule,
}

impl VotingRules {
    /// Rules for an equal-weight congress.
    pub fn congress(
        min_pass_votes: u64,
        voting_period_secs: u64,
        min_pass_margin: i128,
    ) -> Result<Self, GovernanceError> {
        Self::validated(voting_period_secs, min_pass_margin, PassRule::MinVotes(min_pass_votes))
    }

    /// Rules for a token-weighted association.
    pub fn association(
        min_quorum: Weight,
        voting_period_secs: u64,
        min_pass_margin: i128,
    ) -> Result<Self, GovernanceError> {
        Self::validated(voting_period_secs, min_pass_margin, PassRule::MinQuorum(min_quorum))
    }

    fn validated(
        voting_period_secs: u64,
        min_pass_margin: i128,
        pass_rule: PassRule,
    ) -> Result<Self, GovernanceError> {
        if voting_period_secs == 0 {
            return Err(GovernanceError::InvalidArgument(
                "voting period must be at least one second".into(),
            ));
        }
        // A zero floor would let a proposal with no votes pass.
        if pass_rule.floor() == 0 {
            return Err(GovernanceError::InvalidArgument(
                "minimum votes / quorum must be at least 1".into(),
            ));
        }
        Ok(Self {
            voting_period_secs,
            min_pass_margin,
            pass_rule,
        })
    }

    /// `current_result >= min_pass_margin && vote_count >= floor`, and never
    /// with zero votes cast.
    pub fn passes(&self, current_result: i128, vote_count: Weight) -> bool {
        vote_count > 0
            && vote_count >= self.pass_rule.floor()
            && current_result >= self.min_pass_margin
    }
}

/// Construction-time parameters shared by both governance variants.
#[derive(Clone, Debug)]
pub struct Deployment {
    /// Initial administrator and funder.
    pub admin: Address,
    /// Deposited into the treasury on behalf of `admin` at construction.
    pub initial_funding: Amount,
    pub voting_rules: VotingRules,
    /// `None` selects the variant's default policy.
    pub proposal_policy: Option<ProposalPolicy>,
}

impl Deployment {
    pub fn new(admin: Address, voting_rules: VotingRules) -> Self {
        Self {
            admin,
            initial_funding: Amount::ZERO,
            voting_rules,
            proposal_policy: None,
        }
    }

    pub fn with_funding(mut self, amount: Amount) -> Self {
        self.initial_funding = amount;
        self
    }

    pub fn with_policy(mut self, policy: ProposalPolicy) -> Self {
        self.proposal_policy = Some(policy);
        self
    }
}
