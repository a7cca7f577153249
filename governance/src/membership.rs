//! Membership registry: who belongs to a congress.
//!
//! The registry stores membership state; it does not make authorization
//! decisions. Admin gating is applied by [`crate::Congress`].

use crate::error::GovernanceError;
use agora_types::{Address, Timestamp};
use serde::Serialize;
use std::collections::HashMap;

/// A single congress member.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Member {
    pub principal: Address,
    pub name: String,
    pub joined_at: Timestamp,
}

/// The set of current members, unique by principal.
#[derive(Clone, Debug, Default)]
pub struct MembershipRegistry {
    members: HashMap<Address, Member>,
    /// Principals in join order.
    order: Vec<Address>,
}

impl MembershipRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new member.
    pub fn add(
        &mut self,
        principal: Address,
        name: impl Into<String>,
        now: Timestamp,
    ) -> Result<&Member, GovernanceError> {
        let name = name.into();
        if principal.is_zero() {
            return Err(GovernanceError::InvalidArgument(
                "member address must not be the zero address".into(),
            ));
        }
        if name.trim().is_empty() {
            return Err(GovernanceError::InvalidArgument(
                "member name must not be empty".into(),
            ));
        }
        if self.members.contains_key(&principal) {
            return Err(GovernanceError::DuplicateMember(principal));
        }
        self.order.push(principal);
        let member = self.members.entry(principal).or_insert(Member {
            principal,
            name,
            joined_at: now,
        });
        Ok(member)
    }

    /// Remove a member, returning its record.
    pub fn remove(&mut self, principal: &Address) -> Result<Member, GovernanceError> {
        let member = self
            .members
            .remove(principal)
            .ok_or(GovernanceError::MemberNotFound(*principal))?;
        self.order.retain(|p| p != principal);
        Ok(member)
    }

    pub fn get(&self, principal: &Address) -> Option<&Member> {
        self.members.get(principal)
    }

    pub fn contains(&self, principal: &Address) -> bool {
        self.members.contains_key(principal)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Members in the order they joined.
    pub fn iter(&self) -> impl Iterator<Item = &Member> {
        self.order.iter().filter_map(|p| self.members.get(p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: u8) -> Address {
        Address::new([n; 20])
    }

    #[test]
    fn add_and_query_member() {
        let mut registry = MembershipRegistry::new();
        let member = registry.add(addr(1), "Alice", Timestamp::new(10)).unwrap();
        assert_eq!(member.name, "Alice");
        assert_eq!(member.joined_at, Timestamp::new(10));
        assert!(registry.contains(&addr(1)));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn rejects_zero_address_and_empty_name() {
        let mut registry = MembershipRegistry::new();
        assert!(matches!(
            registry.add(Address::ZERO, "Nobody", Timestamp::EPOCH),
            Err(GovernanceError::InvalidArgument(_))
        ));
        assert!(matches!(
            registry.add(addr(2), "  ", Timestamp::EPOCH),
            Err(GovernanceError::InvalidArgument(_))
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn duplicate_add_rejected() {
        let mut registry = MembershipRegistry::new();
        registry.add(addr(1), "Alice", Timestamp::EPOCH).unwrap();
        assert!(matches!(
            registry.add(addr(1), "Alice again", Timestamp::EPOCH),
            Err(GovernanceError::DuplicateMember(_))
        ));
        assert_eq!(registry.get(&addr(1)).unwrap().name, "Alice");
    }

    #[test]
    fn remove_unknown_is_not_found() {
        let mut registry = MembershipRegistry::new();
        let err = registry.remove(&addr(5)).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn iteration_follows_join_order_after_removal() {
        let mut registry = MembershipRegistry::new();
        for (n, name) in [(3, "Carol"), (1, "Alice"), (2, "Bob")] {
            registry.add(addr(n), name, Timestamp::EPOCH).unwrap();
        }
        registry.remove(&addr(1)).unwrap();
        let names: Vec<_> = registry.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["Carol", "Bob"]);
    }
}
