//! Time-boxed proposal governance.
//!
//! A single [`VotingEngine`] drives every proposal through
//! open → closed → executed. Who may vote, and with what weight, is supplied
//! by an [`Electorate`]:
//!
//! - [`Congress`]: an admin-managed member list, one vote per member, passing
//!   on a minimum number of votes.
//! - [`Association`]: token holders weighted by their live balance, passing
//!   on a minimum cumulative weight (quorum).
//!
//! Both variants pay a passed proposal's amount out of a [`Treasury`] and
//! report every committed change as a [`GovernanceEvent`].

pub mod association;
pub mod config;
pub mod congress;
pub mod electorate;
pub mod engine;
pub mod error;
pub mod event;
pub mod external;
pub mod ledger;
pub mod membership;
pub mod ownership;
pub mod params;
pub mod proposal;

pub use association::Association;
pub use config::{GovernanceConfig, Variant};
pub use congress::Congress;
pub use electorate::{Electorate, ShareholderElectorate};
pub use engine::{ProposalRequest, VotingEngine};
pub use error::GovernanceError;
pub use event::{EventBus, EventListener, GovernanceEvent};
pub use external::{BalanceLedger, Clock, SystemClock, Treasury, TransferError};
pub use ledger::{InMemoryShareLedger, InMemoryTreasury};
pub use membership::{Member, MembershipRegistry};
pub use ownership::Ownership;
pub use params::{Deployment, PassRule, ProposalPolicy, VotingRules};
pub use proposal::{ExecutionOutcome, Proposal, ProposalState, Vote};
