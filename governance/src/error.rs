use agora_types::{Address, Amount, ProposalId};
use thiserror::Error;

use crate::external::TransferError;

#[derive(Debug, Error)]
pub enum GovernanceError {
    #[error("{caller} is not authorized to {action}")]
    Unauthorized { caller: Address, action: &'static str },

    #[error("{0} holds no voting weight")]
    NoWeight(Address),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("proposal {0} not found")]
    ProposalNotFound(ProposalId),

    #[error("{0} is not a member")]
    MemberNotFound(Address),

    #[error("{0} is already a member")]
    DuplicateMember(Address),

    #[error("{voter} has already voted on proposal {proposal_id}")]
    DuplicateVote {
        proposal_id: ProposalId,
        voter: Address,
    },

    #[error("voting on proposal {0} has closed")]
    VotingClosed(ProposalId),

    #[error("voting on proposal {proposal_id} is still open for {secs_left}s")]
    VotingStillOpen {
        proposal_id: ProposalId,
        secs_left: u64,
    },

    #[error("proposal {0} has already been executed")]
    AlreadyExecuted(ProposalId),

    #[error("proposal {proposal_id} rejected: result {current_result} over {vote_count} weight")]
    ProposalRejected {
        proposal_id: ProposalId,
        current_result: i128,
        vote_count: u128,
    },

    #[error("execution payload does not match proposal {0}")]
    PayloadMismatch(ProposalId),

    #[error("transfer of {amount} to {beneficiary} failed: {source}")]
    TransferFailed {
        beneficiary: Address,
        amount: Amount,
        #[source]
        source: TransferError,
    },

    #[error("deposit of {amount} from {from} refused: {source}")]
    FundingFailed {
        from: Address,
        amount: Amount,
        #[source]
        source: TransferError,
    },

    #[error("arithmetic overflow in vote tally")]
    Overflow,

    #[error("config error: {0}")]
    Config(String),
}

impl GovernanceError {
    /// True for the two "unknown entity" errors (proposal id or member).
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ProposalNotFound(_) | Self::MemberNotFound(_))
    }
}
