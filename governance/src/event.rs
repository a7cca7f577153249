//! Governance events and the synchronous bus that delivers them.
//!
//! Events are part of the public contract: each successful state-changing
//! call emits exactly one event, in commit order, after the change has been
//! committed. Failed calls emit nothing.

use agora_types::{Address, Amount, ProposalId, Weight};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GovernanceEvent {
    /// A principal joined the congress.
    MemberAdded { principal: Address, name: String },
    /// A principal left the congress.
    MemberRemoved { principal: Address, name: String },
    /// Administration passed to a new principal.
    OwnershipTransferred {
        previous_admin: Address,
        new_admin: Address,
    },
    /// A proposal was created and its voting window opened.
    ProposalCreated {
        proposal_id: ProposalId,
        beneficiary: Address,
        description: String,
    },
    /// A vote was recorded. Totals are the running values after this vote.
    VoteCast {
        proposal_id: ProposalId,
        voter: Address,
        in_favor: bool,
        weight: Weight,
        vote_count: Weight,
        current_result: i128,
        justification: String,
    },
    /// A proposal passed and its payout was transferred.
    ProposalExecuted {
        proposal_id: ProposalId,
        beneficiary: Address,
        payout: Amount,
        current_result: i128,
        vote_count: Weight,
        passed: bool,
    },
}

impl GovernanceEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::MemberAdded { .. } => "member_added",
            Self::MemberRemoved { .. } => "member_removed",
            Self::OwnershipTransferred { .. } => "ownership_transferred",
            Self::ProposalCreated { .. } => "proposal_created",
            Self::VoteCast { .. } => "vote_cast",
            Self::ProposalExecuted { .. } => "proposal_executed",
        }
    }

    /// The proposal this event concerns, if any.
    pub fn proposal_id(&self) -> Option<ProposalId> {
        match self {
            Self::ProposalCreated { proposal_id, .. }
            | Self::VoteCast { proposal_id, .. }
            | Self::ProposalExecuted { proposal_id, .. } => Some(*proposal_id),
            _ => None,
        }
    }
}

pub type EventListener = Box<dyn Fn(&GovernanceEvent) + Send + Sync>;

type SharedListener = Arc<dyn Fn(&GovernanceEvent) + Send + Sync>;

/// Synchronous fan-out event bus with an outbox.
///
/// Events are queued with [`EventBus::enqueue`] while the owner's state lock
/// is held, then delivered by [`EventBus::flush`] once that lock is released.
/// Only one thread delivers at a time and it drains the outbox in FIFO
/// order, so listeners observe commit order and may query the instance that
/// emitted the event.
#[derive(Default)]
pub struct EventBus {
    listeners: Mutex<Vec<SharedListener>>,
    outbox: Mutex<VecDeque<GovernanceEvent>>,
    delivering: Mutex<()>,
}

fn relock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, listener: EventListener) {
        relock(&self.listeners).push(Arc::from(listener));
    }

    pub fn listener_count(&self) -> usize {
        relock(&self.listeners).len()
    }

    /// Queue events for delivery without running any listener.
    pub fn enqueue(&self, events: impl IntoIterator<Item = GovernanceEvent>) {
        relock(&self.outbox).extend(events);
    }

    /// Deliver queued events. Returns immediately if another call (on any
    /// thread, including an enclosing listener) is already delivering; that
    /// call picks up whatever is queued.
    pub fn flush(&self) {
        loop {
            let turn = match self.delivering.try_lock() {
                Ok(guard) => guard,
                Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
                Err(TryLockError::WouldBlock) => return,
            };
            loop {
                // The outbox lock must not be held while listeners run.
                let next = relock(&self.outbox).pop_front();
                let Some(event) = next else { break };
                let listeners = relock(&self.listeners).clone();
                for listener in &listeners {
                    listener(&event);
                }
            }
            drop(turn);
            if relock(&self.outbox).is_empty() {
                return;
            }
        }
    }

    /// Queue one event and deliver it.
    pub fn emit(&self, event: GovernanceEvent) {
        self.enqueue([event]);
        self.flush();
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listener_count())
            .field("queued", &relock(&self.outbox).len())
            .finish()
    }
}
