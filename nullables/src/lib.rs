//! Nullable infrastructure for deterministic testing.
//!
//! Every collaborator the governance engine consumes (clock, treasury,
//! event listeners) has a test-friendly implementation here that:
//! - returns deterministic values
//! - can be controlled programmatically
//! - never touches the wall clock or any real funds
//!
//! Usage: hand these to `Congress::deploy` / `Association::deploy` in place
//! of the production collaborators.

pub mod clock;
pub mod events;
pub mod treasury;

pub use clock::NullClock;
pub use events::EventRecorder;
pub use treasury::NullTreasury;
