//! Proposed actions awaiting owner votes
//!
//! An action record lives at a derived address under its group and carries
//! an opaque payload that is dispatched once enough owners approve.

use crate::core::{derive_action_address, Address};
use crate::multisig::group::Group;
use serde::{Deserialize, Serialize};

/// Lifecycle of an action record
///
/// `Pending` and `Ready` are both still open for votes; the rest are
/// terminal. `Expired` is never stored, it is inferred from the clock.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum ActionStatus {
    /// Waiting for more approvals
    Pending,
    /// Enough approvals under the current threshold
    Ready,
    /// Payload dispatched
    Executed,
    /// Withdrawn by its proposer
    Cancelled,
    /// Past its expiry without executing
    Expired,
}

impl ActionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ActionStatus::Executed | ActionStatus::Cancelled | ActionStatus::Expired
        )
    }
}

/// An action record
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRecord {
    /// Group this action belongs to
    pub authorization: Address,
    /// Owner who proposed it
    pub proposer: Address,
    /// Set once the payload has been dispatched
    pub executed: bool,
    /// Unix seconds
    pub created_at: i64,
    /// Unix seconds; the action is still live at exactly this instant
    pub expires_at: Option<i64>,
    /// Operation to run once approved
    #[serde(with = "hex_bytes")]
    pub payload: Vec<u8>,
    /// Owners who approved
    pub approvals: Vec<Address>,
    /// Owners who rejected
    pub rejections: Vec<Address>,
}

impl ActionRecord {
    /// Create a new proposed action with no votes
    pub fn new(
        authorization: Address,
        proposer: Address,
        payload: Vec<u8>,
        created_at: i64,
        expires_at: Option<i64>,
    ) -> Self {
        Self {
            authorization,
            proposer,
            executed: false,
            created_at,
            expires_at,
            payload,
            approvals: Vec::new(),
            rejections: Vec::new(),
        }
    }

    /// Lazy expiry: strictly after `expires_at`
    pub fn is_expired(&self, now: i64) -> bool {
        matches!(self.expires_at, Some(expires_at) if now > expires_at)
    }

    /// Whether `owner` has approved or rejected
    pub fn has_voted(&self, owner: &Address) -> bool {
        self.approvals.contains(owner) || self.rejections.contains(owner)
    }

    /// Approvals that still count: voters who are owners right now
    pub fn counted_approvals(&self, group: &Group) -> usize {
        self.approvals.iter().filter(|a| group.is_owner(a)).count()
    }

    /// Rejections from current owners
    pub fn counted_rejections(&self, group: &Group) -> usize {
        self.rejections.iter().filter(|r| group.is_owner(r)).count()
    }

    /// Drop votes cast by addresses that are no longer owners
    ///
    /// Keeps both lists within the current owner set, so together they
    /// never exceed the owner count.
    pub fn prune_votes(&mut self, group: &Group) {
        self.approvals.retain(|a| group.is_owner(a));
        self.rejections.retain(|r| group.is_owner(r));
    }

    /// Status under the group's current owners and threshold
    pub fn status(&self, group: &Group, now: i64) -> ActionStatus {
        if self.executed {
            ActionStatus::Executed
        } else if self.is_expired(now) {
            ActionStatus::Expired
        } else if self.counted_approvals(group) >= group.threshold as usize {
            ActionStatus::Ready
        } else {
            ActionStatus::Pending
        }
    }

    /// Still counts against closing the group
    pub fn is_open(&self, now: i64) -> bool {
        !self.executed && !self.is_expired(now)
    }
}

/// What lives at an action index
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ActionSlot {
    /// A stored record
    Open(ActionRecord),
    /// Index was allocated but the record has been cancelled
    Cancelled,
    /// Index never allocated
    Unknown,
}

impl ActionSlot {
    /// Classify a lookup: a missing record below `action_count` was cancelled
    pub fn resolve(group: &Group, action_index: u64, record: Option<ActionRecord>) -> Self {
        match record {
            Some(record) => ActionSlot::Open(record),
            None if action_index < group.action_count => ActionSlot::Cancelled,
            None => ActionSlot::Unknown,
        }
    }
}

/// Locates an action record
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRef {
    pub group: Address,
    pub index: u64,
    pub address: Address,
}

impl ActionRef {
    pub fn new(group: Address, index: u64, program_id: &Address) -> Self {
        Self {
            group,
            index,
            address: derive_action_address(&group, index, program_id),
        }
    }
}

pub(crate) mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::multisig::GroupConfig;

    fn group() -> Group {
        let owners = vec![
            Address::new([1; 32]),
            Address::new([2; 32]),
            Address::new([3; 32]),
        ];
        Group::new(
            Address::new([1; 32]),
            0,
            GroupConfig::new(owners, 2).unwrap(),
            100,
        )
    }

    #[test]
    fn test_expiry_is_inclusive() {
        let record = ActionRecord::new(
            Address::new([9; 32]),
            Address::new([1; 32]),
            vec![1],
            100,
            Some(200),
        );

        assert!(!record.is_expired(199));
        assert!(!record.is_expired(200));
        assert!(record.is_expired(201));

        let forever = ActionRecord::new(Address::new([9; 32]), Address::new([1; 32]), vec![], 100, None);
        assert!(!forever.is_expired(i64::MAX));
    }

    #[test]
    fn test_status_follows_current_threshold() {
        let mut group = group();
        let mut record = ActionRecord::new(Address::new([9; 32]), Address::new([1; 32]), vec![], 100, None);
        record.approvals = vec![Address::new([1; 32]), Address::new([2; 32])];

        assert_eq!(record.status(&group, 150), ActionStatus::Ready);

        group.threshold = 3;
        assert_eq!(record.status(&group, 150), ActionStatus::Pending);
    }

    #[test]
    fn test_removed_owner_approval_not_counted() {
        let mut group = group();
        let mut record = ActionRecord::new(Address::new([9; 32]), Address::new([1; 32]), vec![], 100, None);
        record.approvals = vec![Address::new([1; 32]), Address::new([3; 32])];
        assert_eq!(record.counted_approvals(&group), 2);

        group.owners.retain(|o| *o != Address::new([3; 32]));
        assert_eq!(record.counted_approvals(&group), 1);
    }

    #[test]
    fn test_prune_votes_keeps_current_owners() {
        let mut group = group();
        let mut record = ActionRecord::new(Address::new([9; 32]), Address::new([1; 32]), vec![], 100, None);
        record.approvals = vec![Address::new([1; 32]), Address::new([3; 32])];
        record.rejections = vec![Address::new([2; 32])];

        group.owners.retain(|o| *o != Address::new([3; 32]) && *o != Address::new([2; 32]));
        record.prune_votes(&group);

        assert_eq!(record.approvals, vec![Address::new([1; 32])]);
        assert!(record.rejections.is_empty());
    }

    #[test]
    fn test_slot_resolution() {
        let mut group = group();
        group.action_count = 2;

        assert_eq!(ActionSlot::resolve(&group, 1, None), ActionSlot::Cancelled);
        assert_eq!(ActionSlot::resolve(&group, 2, None), ActionSlot::Unknown);
    }

    #[test]
    fn test_payload_serializes_as_hex() {
        let record = ActionRecord::new(
            Address::new([9; 32]),
            Address::new([1; 32]),
            vec![0xDE, 0xAD, 0xBE, 0xEF],
            100,
            None,
        );
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"deadbeef\""));

        let back: ActionRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }
}
