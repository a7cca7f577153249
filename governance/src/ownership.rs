//! Single-administrator ownership.

use crate::error::GovernanceError;
use agora_types::Address;

/// Holds the current administrator. Exactly one admin exists at any time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ownership {
    admin: Address,
}

impl Ownership {
    pub fn new(admin: Address) -> Result<Self, GovernanceError> {
        if admin.is_zero() {
            return Err(GovernanceError::InvalidArgument(
                "admin must not be the zero address".into(),
            ));
        }
        Ok(Self { admin })
    }

    pub fn admin(&self) -> Address {
        self.admin
    }

    pub fn is_admin(&self, caller: &Address) -> bool {
        self.admin == *caller
    }

    /// Fail with `Unauthorized` unless `caller` is the admin.
    pub fn ensure_admin(&self, caller: &Address, action: &'static str) -> Result<(), GovernanceError> {
        if self.is_admin(caller) {
            Ok(())
        } else {
            Err(GovernanceError::Unauthorized {
                caller: *caller,
                action,
            })
        }
    }

    /// Hand administration to `new_admin`, returning the previous admin.
    ///
    /// Transferring to the current admin is allowed and still counts as a
    /// transfer.
    pub fn transfer(
        &mut self,
        caller: &Address,
        new_admin: Address,
    ) -> Result<Address, GovernanceError> {
        self.ensure_admin(caller, "transfer ownership")?;
        if new_admin.is_zero() {
            return Err(GovernanceError::InvalidArgument(
                "new admin must not be the zero address".into(),
            ));
        }
        let previous = std::mem::replace(&mut self.admin, new_admin);
        Ok(previous)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: u8) -> Address {
        Address::new([n; 20])
    }

    #[test]
    fn test_zero_admin_rejected() {
        assert!(Ownership::new(Address::ZERO).is_err());
    }

    #[test]
    fn test_transfer_by_admin() {
        let mut ownership = Ownership::new(addr(1)).unwrap();
        let previous = ownership.transfer(&addr(1), addr(2)).unwrap();
        assert_eq!(previous, addr(1));
        assert_eq!(ownership.admin(), addr(2));
        assert!(!ownership.is_admin(&addr(1)));
    }

    #[test]
    fn test_transfer_by_non_admin_is_unauthorized() {
        let mut ownership = Ownership::new(addr(1)).unwrap();
        let err = ownership.transfer(&addr(3), addr(3)).unwrap_err();
        assert!(matches!(err, GovernanceError::Unauthorized { caller, .. } if caller == addr(3)));
        assert_eq!(ownership.admin(), addr(1));
    }

    #[test]
    fn test_transfer_to_zero_rejected() {
        let mut ownership = Ownership::new(addr(1)).unwrap();
        assert!(matches!(
            ownership.transfer(&addr(1), Address::ZERO),
            Err(GovernanceError::InvalidArgument(_))
        ));
        assert_eq!(ownership.admin(), addr(1));
    }

    #[test]
    fn test_transfer_to_self() {
        let mut ownership = Ownership::new(addr(1)).unwrap();
        assert_eq!(ownership.transfer(&addr(1), addr(1)).unwrap(), addr(1));
        assert_eq!(ownership.admin(), addr(1));
    }
}
