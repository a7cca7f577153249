//! Fundamental types for Agora governance.
//!
//! This crate defines the core types shared across every other crate in the workspace:
//! principal addresses, monetary amounts, proposal hashes and timestamps.

pub mod address;
pub mod amount;
pub mod error;
pub mod hash;
pub mod time;

pub use address::Address;
pub use amount::Amount;
pub use error::TypesError;
pub use hash::ProposalHash;
pub use time::Timestamp;

/// Voting weight of a principal. 1 per congress member, token balance for shareholders.
pub type Weight = u128;

/// Sequential proposal identifier, starting at 0.
pub type ProposalId = u64;
