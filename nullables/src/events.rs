//! Event capture for asserting on the governance event surface.

use agora_governance::{EventListener, GovernanceEvent};
use std::sync::{Arc, Mutex, PoisonError};

/// Collects every event delivered to the listeners it hands out.
///
/// Cloning shares the underlying buffer.
#[derive(Clone, Debug, Default)]
pub struct EventRecorder {
    events: Arc<Mutex<Vec<GovernanceEvent>>>,
}

impl EventRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A listener that appends to this recorder.
    pub fn listener(&self) -> EventListener {
        let events = Arc::clone(&self.events);
        Box::new(move |event: &GovernanceEvent| {
            events
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(event.clone());
        })
    }

    /// All events recorded so far, in delivery order.
    pub fn events(&self) -> Vec<GovernanceEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Event names in delivery order.
    pub fn names(&self) -> Vec<&'static str> {
        self.events().iter().map(GovernanceEvent::name).collect()
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn last(&self) -> Option<GovernanceEvent> {
        self.events().pop()
    }

    /// Remove and return everything recorded so far.
    pub fn drain(&self) -> Vec<GovernanceEvent> {
        std::mem::take(&mut *self.events.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_types::Address;

    #[test]
    fn records_in_order_and_drains() {
        let recorder = EventRecorder::new();
        let listener = recorder.listener();
        listener(&GovernanceEvent::MemberAdded {
            principal: Address::new([1; 20]),
            name: "Alice".into(),
        });
        listener(&GovernanceEvent::MemberRemoved {
            principal: Address::new([1; 20]),
            name: "Alice".into(),
        });

        assert_eq!(recorder.names(), vec!["member_added", "member_removed"]);
        assert_eq!(recorder.drain().len(), 2);
        assert!(recorder.is_empty());
    }
}
