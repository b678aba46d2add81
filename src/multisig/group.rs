//! Authorization groups
//!
//! A group is the on-ledger account that names the owners of an m-of-n
//! authority and the number of approvals an action needs.

use crate::core::{derive_group_address, Address};
use crate::multisig::validator::{self, ValidationErrors};
use serde::{Deserialize, Serialize};

/// A validated owner set and threshold
///
/// Only constructible through [`GroupConfig::new`], so holding one proves
/// the configuration rules passed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupConfig {
    owners: Vec<Address>,
    threshold: u8,
}

impl GroupConfig {
    /// Create a new group configuration
    ///
    /// # Arguments
    /// * `owners` - Addresses allowed to propose and vote (N)
    /// * `threshold` - Approvals required to execute (M)
    ///
    /// # Errors
    /// Returns every violated rule at once
    pub fn new(owners: Vec<Address>, threshold: u8) -> Result<Self, ValidationErrors> {
        validator::validate(&owners, threshold)?;
        Ok(Self { owners, threshold })
    }

    pub fn owners(&self) -> &[Address] {
        &self.owners
    }

    pub fn threshold(&self) -> u8 {
        self.threshold
    }

    /// Get description like "2-of-3"
    pub fn description(&self) -> String {
        format!("{}-of-{}", self.threshold, self.owners.len())
    }

    pub(crate) fn into_parts(self) -> (Vec<Address>, u8) {
        (self.owners, self.threshold)
    }
}

/// The authorization account
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    /// Account that established the group
    pub creator: Address,
    /// Approvals required to execute an action
    pub threshold: u8,
    /// Distinguishes groups made by the same creator
    pub nonce: u64,
    /// Number of actions ever proposed
    pub action_count: u64,
    /// Unix seconds
    pub created_at: i64,
    /// Current owners, in insertion order
    pub owners: Vec<Address>,
}

impl Group {
    /// A fresh group with no actions
    pub fn new(creator: Address, nonce: u64, config: GroupConfig, created_at: i64) -> Self {
        let (owners, threshold) = config.into_parts();
        Self {
            creator,
            threshold,
            nonce,
            action_count: 0,
            created_at,
            owners,
        }
    }

    /// Derived address of this group
    pub fn address(&self, program_id: &Address) -> Address {
        derive_group_address(&self.creator, self.nonce, program_id)
    }

    pub fn is_owner(&self, address: &Address) -> bool {
        self.owners.contains(address)
    }

    /// Owners and the creator may reconfigure or close the group
    pub fn can_administer(&self, address: &Address) -> bool {
        self.creator == *address || self.is_owner(address)
    }

    pub fn owner_count(&self) -> usize {
        self.owners.len()
    }

    /// Get description like "2-of-3"
    pub fn description(&self) -> String {
        format!("{}-of-{}", self.threshold, self.owners.len())
    }

    /// Check the current owner set and threshold against the rules
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        validator::validate(&self.owners, self.threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::multisig::validator::Violation;

    fn owners() -> Vec<Address> {
        vec![
            Address::new([1; 32]),
            Address::new([2; 32]),
            Address::new([3; 32]),
        ]
    }

    #[test]
    fn test_config_creation() {
        let config = GroupConfig::new(owners(), 2).unwrap();

        assert_eq!(config.threshold(), 2);
        assert_eq!(config.owners().len(), 3);
        assert_eq!(config.description(), "2-of-3");
    }

    #[test]
    fn test_config_validation() {
        assert!(GroupConfig::new(owners(), 0).is_err());
        assert!(GroupConfig::new(owners(), 4).is_err());
        assert!(GroupConfig::new(vec![Address::new([1; 32])], 1).is_err());

        let err = GroupConfig::new(vec![Address::new([1; 32]); 2], 1).unwrap_err();
        assert!(err.contains(&Violation::DuplicateOwner(Address::new([1; 32]))));
    }

    #[test]
    fn test_group_creation() {
        let creator = Address::new([9; 32]);
        let config = GroupConfig::new(owners(), 2).unwrap();
        let group = Group::new(creator, 7, config, 1_700_000_000);

        assert_eq!(group.action_count, 0);
        assert_eq!(group.description(), "2-of-3");
        assert!(group.is_owner(&Address::new([2; 32])));
        assert!(!group.is_owner(&creator));
        assert!(group.can_administer(&creator));
        assert!(group.validate().is_ok());
    }

    #[test]
    fn test_address_determinism() {
        let program = Address::new([42; 32]);
        let creator = Address::new([9; 32]);

        let g1 = Group::new(creator, 7, GroupConfig::new(owners(), 2).unwrap(), 1);
        let g2 = Group::new(creator, 7, GroupConfig::new(owners(), 3).unwrap(), 2);
        let g3 = Group::new(creator, 8, GroupConfig::new(owners(), 2).unwrap(), 1);

        // Address depends on creator and nonce only
        assert_eq!(g1.address(&program), g2.address(&program));
        assert_ne!(g1.address(&program), g3.address(&program));
    }
}
