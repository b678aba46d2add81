//! Authorization state machine
//!
//! [`apply`] is the single definition of every transition. Stores load a
//! [`Snapshot`], run `apply`, and persist the resulting [`Effect`]; the
//! ledger emulator runs the very same function against decoded accounts.
//!
//! Checks for actions run in this order:
//! - approve / reject: owner, record exists, not executed, not expired, not voted
//!
//! Votes from removed owners are dropped whenever a record is written, so
//! approvals and rejections stay within the current owner set.
//! - execute: record exists, not executed, not expired, threshold met;
//!   any signer may execute
//! - cancel: record exists, proposer, not executed

use crate::core::{derive_action_address, derive_group_address, Address};
use crate::multisig::action::{ActionRecord, ActionSlot};
use crate::multisig::error::MultisigError;
use crate::multisig::group::{Group, GroupConfig};
use crate::multisig::Instruction;

/// State needed to evaluate one instruction against one group
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Snapshot {
    /// Group account address
    pub address: Address,
    /// Current group, if the account exists
    pub group: Option<Group>,
    /// Targeted record, for instructions that name an action index
    pub action: Option<ActionSlot>,
    /// Records neither executed, cancelled nor expired (close only)
    pub open_actions: u64,
}

impl Snapshot {
    /// Gather exactly what `instruction` needs
    ///
    /// `load_action` is only called for the targeted index, or for every
    /// index when closing the group.
    pub fn load<G, A>(
        address: Address,
        instruction: &Instruction,
        now: i64,
        load_group: G,
        mut load_action: A,
    ) -> Result<Self, MultisigError>
    where
        G: FnOnce() -> Result<Option<Group>, MultisigError>,
        A: FnMut(u64) -> Result<Option<ActionRecord>, MultisigError>,
    {
        let group = load_group()?;
        let mut action = None;
        let mut open_actions = 0;

        if let Some(group) = &group {
            if let Some(index) = instruction.action_index() {
                action = Some(ActionSlot::resolve(group, index, load_action(index)?));
            }

            if matches!(instruction, Instruction::CloseGroup) {
                for index in 0..group.action_count {
                    if let Some(record) = load_action(index)? {
                        if record.is_open(now) {
                            open_actions += 1;
                        }
                    }
                }
            }
        }

        Ok(Self {
            address,
            group,
            action,
            open_actions,
        })
    }
}

/// Writes produced by a successful transition
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Effect {
    GroupCreated(Group),
    GroupUpdated(Group),
    /// Group and all `action_count` record slots removed
    GroupClosed { action_count: u64 },
    /// New record plus the group with its bumped counter
    ActionProposed {
        group: Group,
        index: u64,
        record: ActionRecord,
    },
    /// A vote was recorded
    ActionUpdated { index: u64, record: ActionRecord },
    /// Record marked executed; its payload must be dispatched
    ActionExecuted { index: u64, record: ActionRecord },
    ActionCancelled { index: u64 },
}

impl Effect {
    /// Get effect name for logging
    pub fn type_name(&self) -> &'static str {
        match self {
            Effect::GroupCreated(_) => "GroupCreated",
            Effect::GroupUpdated(_) => "GroupUpdated",
            Effect::GroupClosed { .. } => "GroupClosed",
            Effect::ActionProposed { .. } => "ActionProposed",
            Effect::ActionUpdated { .. } => "ActionUpdated",
            Effect::ActionExecuted { .. } => "ActionExecuted",
            Effect::ActionCancelled { .. } => "ActionCancelled",
        }
    }

    /// Index of the record this effect wrote or removed
    pub fn action_index(&self) -> Option<u64> {
        match self {
            Effect::ActionProposed { index, .. }
            | Effect::ActionUpdated { index, .. }
            | Effect::ActionExecuted { index, .. }
            | Effect::ActionCancelled { index } => Some(*index),
            _ => None,
        }
    }
}

/// Evaluate `instruction` from `caller` against `snapshot`
pub fn apply(
    snapshot: Snapshot,
    program_id: &Address,
    caller: &Address,
    instruction: Instruction,
    now: i64,
) -> Result<Effect, MultisigError> {
    let Snapshot {
        address,
        group,
        action,
        open_actions,
    } = snapshot;

    if let Instruction::CreateGroup {
        nonce,
        threshold,
        owners,
    } = instruction
    {
        let expected = derive_group_address(caller, nonce, program_id);
        if expected != address {
            return Err(MultisigError::AddressMismatch {
                expected,
                actual: address,
            });
        }
        if group.is_some() {
            return Err(MultisigError::GroupExists(address));
        }

        let config = GroupConfig::new(owners, threshold)?;
        return Ok(Effect::GroupCreated(Group::new(*caller, nonce, config, now)));
    }

    let mut group = group.ok_or(MultisigError::NotFound(address))?;

    match instruction {
        Instruction::CreateGroup { .. } => Err(MultisigError::GroupExists(address)),

        Instruction::AddOwner { owner } => {
            require_admin(&group, caller)?;
            group.owners.push(owner);
            group.validate()?;
            Ok(Effect::GroupUpdated(group))
        }

        Instruction::RemoveOwner { owner } => {
            require_admin(&group, caller)?;
            if !group.is_owner(&owner) {
                return Err(MultisigError::OwnerNotFound(owner));
            }
            group.owners.retain(|o| *o != owner);
            group.validate()?;
            Ok(Effect::GroupUpdated(group))
        }

        Instruction::ChangeThreshold { threshold } => {
            require_admin(&group, caller)?;
            group.threshold = threshold;
            group.validate()?;
            Ok(Effect::GroupUpdated(group))
        }

        Instruction::ProposeAction {
            payload,
            expires_at,
        } => {
            require_owner(&group, caller)?;
            if let Some(expires_at) = expires_at {
                if now > expires_at {
                    return Err(MultisigError::Expired { expires_at });
                }
            }

            let index = group.action_count;
            let record = ActionRecord::new(address, *caller, payload, now, expires_at);
            group.action_count += 1;
            Ok(Effect::ActionProposed {
                group,
                index,
                record,
            })
        }

        Instruction::ApproveAction { action_index } | Instruction::RejectAction { action_index } => {
            require_owner(&group, caller)?;
            let mut record = open_record(action, &address, action_index, program_id)?;
            require_live(&record, now)?;
            record.prune_votes(&group);
            if record.has_voted(caller) {
                return Err(MultisigError::AlreadyVoted(*caller));
            }

            if matches!(instruction, Instruction::ApproveAction { .. }) {
                record.approvals.push(*caller);
            } else {
                record.rejections.push(*caller);
            }
            Ok(Effect::ActionUpdated {
                index: action_index,
                record,
            })
        }

        Instruction::ExecuteAction { action_index } => {
            let mut record = open_record(action, &address, action_index, program_id)?;
            require_live(&record, now)?;
            record.prune_votes(&group);

            // Threshold and owner set are read now, not at proposal time
            let have = record.counted_approvals(&group);
            if have < group.threshold as usize {
                return Err(MultisigError::InsufficientApprovals {
                    have,
                    need: group.threshold,
                });
            }

            record.executed = true;
            Ok(Effect::ActionExecuted {
                index: action_index,
                record,
            })
        }

        Instruction::CancelAction { action_index } => {
            let record = open_record(action, &address, action_index, program_id)?;
            if record.proposer != *caller {
                return Err(MultisigError::NotProposer(*caller));
            }
            if record.executed {
                return Err(MultisigError::AlreadyFinalized);
            }
            Ok(Effect::ActionCancelled {
                index: action_index,
            })
        }

        Instruction::CloseGroup => {
            require_admin(&group, caller)?;
            if open_actions > 0 {
                return Err(MultisigError::OpenActions {
                    count: open_actions,
                });
            }
            Ok(Effect::GroupClosed {
                action_count: group.action_count,
            })
        }
    }
}

fn require_owner(group: &Group, caller: &Address) -> Result<(), MultisigError> {
    if group.is_owner(caller) {
        Ok(())
    } else {
        Err(MultisigError::NotAuthorized(*caller))
    }
}

fn require_admin(group: &Group, caller: &Address) -> Result<(), MultisigError> {
    if group.can_administer(caller) {
        Ok(())
    } else {
        Err(MultisigError::NotAuthorized(*caller))
    }
}

/// Not executed and not past expiry
fn require_live(record: &ActionRecord, now: i64) -> Result<(), MultisigError> {
    if record.executed {
        return Err(MultisigError::AlreadyFinalized);
    }
    if let Some(expires_at) = record.expires_at {
        if record.is_expired(now) {
            return Err(MultisigError::Expired { expires_at });
        }
    }
    Ok(())
}

fn open_record(
    slot: Option<ActionSlot>,
    group: &Address,
    action_index: u64,
    program_id: &Address,
) -> Result<ActionRecord, MultisigError> {
    match slot {
        Some(ActionSlot::Open(record)) => {
            if record.authorization != *group {
                return Err(MultisigError::AddressMismatch {
                    expected: *group,
                    actual: record.authorization,
                });
            }
            Ok(record)
        }
        Some(ActionSlot::Cancelled) => Err(MultisigError::AlreadyFinalized),
        Some(ActionSlot::Unknown) | None => Err(MultisigError::NotFound(derive_action_address(
            group,
            action_index,
            program_id,
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::multisig::validator::Violation;

    const NOW: i64 = 1_000;

    fn program() -> Address {
        Address::new([0xEE; 32])
    }

    fn a() -> Address {
        Address::new([0xA; 32])
    }
    fn b() -> Address {
        Address::new([0xB; 32])
    }
    fn c() -> Address {
        Address::new([0xC; 32])
    }
    fn outsider() -> Address {
        Address::new([0xF; 32])
    }

    fn group_address() -> Address {
        derive_group_address(&a(), 0, &program())
    }

    fn group(threshold: u8) -> Group {
        Group::new(
            a(),
            0,
            GroupConfig::new(vec![a(), b(), c()], threshold).unwrap(),
            NOW,
        )
    }

    fn record() -> ActionRecord {
        ActionRecord::new(group_address(), a(), vec![0xDE, 0xAD, 0xBE, 0xEF], NOW, None)
    }

    fn snapshot(group: Group, slot: Option<ActionSlot>) -> Snapshot {
        Snapshot {
            address: group_address(),
            group: Some(group),
            action: slot,
            open_actions: 0,
        }
    }

    fn run(snapshot: Snapshot, caller: Address, ix: Instruction) -> Result<Effect, MultisigError> {
        apply(snapshot, &program(), &caller, ix, NOW)
    }

    #[test]
    fn test_create_group() {
        let empty = Snapshot {
            address: group_address(),
            group: None,
            action: None,
            open_actions: 0,
        };
        let effect = run(
            empty.clone(),
            a(),
            Instruction::CreateGroup {
                nonce: 0,
                threshold: 2,
                owners: vec![a(), b(), c()],
            },
        )
        .unwrap();

        match effect {
            Effect::GroupCreated(g) => {
                assert_eq!(g.creator, a());
                assert_eq!(g.created_at, NOW);
                assert_eq!(g.action_count, 0);
            }
            other => panic!("unexpected effect {:?}", other),
        }

        // Wrong creator for the address
        let err = run(
            empty,
            b(),
            Instruction::CreateGroup {
                nonce: 0,
                threshold: 2,
                owners: vec![a(), b()],
            },
        )
        .unwrap_err();
        assert!(matches!(err, MultisigError::AddressMismatch { .. }));
    }

    #[test]
    fn test_create_group_twice() {
        let err = run(
            snapshot(group(2), None),
            a(),
            Instruction::CreateGroup {
                nonce: 0,
                threshold: 2,
                owners: vec![a(), b()],
            },
        )
        .unwrap_err();
        assert!(matches!(err, MultisigError::GroupExists(_)));
    }

    #[test]
    fn test_create_group_reports_all_violations() {
        let empty = Snapshot {
            address: group_address(),
            group: None,
            action: None,
            open_actions: 0,
        };
        let err = run(
            empty,
            a(),
            Instruction::CreateGroup {
                nonce: 0,
                threshold: 0,
                owners: vec![a()],
            },
        )
        .unwrap_err();

        match err {
            MultisigError::Validation(errors) => assert_eq!(errors.len(), 2),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_owner_changes_revalidate() {
        // Removing down to one owner breaks two rules at threshold 2
        let two = Group::new(a(), 0, GroupConfig::new(vec![a(), b()], 2).unwrap(), NOW);
        let err = run(snapshot(two, None), a(), Instruction::RemoveOwner { owner: b() }).unwrap_err();
        match err {
            MultisigError::Validation(errors) => {
                assert!(errors.contains(&Violation::TooFewOwners { count: 1 }));
                assert!(errors.contains(&Violation::ThresholdExceedsOwners {
                    threshold: 2,
                    owners: 1
                }));
            }
            other => panic!("unexpected error {:?}", other),
        }

        let err = run(snapshot(group(2), None), a(), Instruction::AddOwner { owner: b() }).unwrap_err();
        assert!(matches!(err, MultisigError::Validation(_)));

        let err = run(snapshot(group(2), None), a(), Instruction::ChangeThreshold { threshold: 4 })
            .unwrap_err();
        assert!(matches!(err, MultisigError::Validation(_)));

        let err = run(
            snapshot(group(2), None),
            a(),
            Instruction::RemoveOwner { owner: outsider() },
        )
        .unwrap_err();
        assert!(matches!(err, MultisigError::OwnerNotFound(_)));
    }

    #[test]
    fn test_outsider_cannot_reconfigure() {
        let err = run(
            snapshot(group(2), None),
            outsider(),
            Instruction::ChangeThreshold { threshold: 1 },
        )
        .unwrap_err();
        assert!(matches!(err, MultisigError::NotAuthorized(_)));
    }

    #[test]
    fn test_propose_bumps_counter() {
        let mut g = group(2);
        g.action_count = 4;

        let effect = run(
            snapshot(g, None),
            b(),
            Instruction::ProposeAction {
                payload: vec![1, 2],
                expires_at: Some(NOW + 10),
            },
        )
        .unwrap();

        match effect {
            Effect::ActionProposed {
                group,
                index,
                record,
            } => {
                assert_eq!(index, 4);
                assert_eq!(group.action_count, 5);
                assert_eq!(record.proposer, b());
                assert_eq!(record.authorization, group_address());
                assert_eq!(record.expires_at, Some(NOW + 10));
            }
            other => panic!("unexpected effect {:?}", other),
        }
    }

    #[test]
    fn test_propose_requires_owner_and_future_expiry() {
        let err = run(
            snapshot(group(2), None),
            outsider(),
            Instruction::ProposeAction {
                payload: vec![],
                expires_at: None,
            },
        )
        .unwrap_err();
        assert!(matches!(err, MultisigError::NotAuthorized(_)));

        let err = run(
            snapshot(group(2), None),
            a(),
            Instruction::ProposeAction {
                payload: vec![],
                expires_at: Some(NOW - 1),
            },
        )
        .unwrap_err();
        assert!(matches!(err, MultisigError::Expired { .. }));
    }

    #[test]
    fn test_vote_rules() {
        let mut voted = record();
        voted.approvals.push(b());

        let err = run(
            snapshot(group(2), Some(ActionSlot::Open(voted.clone()))),
            b(),
            Instruction::ApproveAction { action_index: 0 },
        )
        .unwrap_err();
        assert!(matches!(err, MultisigError::AlreadyVoted(_)));

        // Cannot switch sides either
        let err = run(
            snapshot(group(2), Some(ActionSlot::Open(voted))),
            b(),
            Instruction::RejectAction { action_index: 0 },
        )
        .unwrap_err();
        assert!(matches!(err, MultisigError::AlreadyVoted(_)));

        let err = run(
            snapshot(group(2), Some(ActionSlot::Open(record()))),
            outsider(),
            Instruction::ApproveAction { action_index: 0 },
        )
        .unwrap_err();
        assert!(matches!(err, MultisigError::NotAuthorized(_)));

        let effect = run(
            snapshot(group(2), Some(ActionSlot::Open(record()))),
            c(),
            Instruction::RejectAction { action_index: 0 },
        )
        .unwrap();
        match effect {
            Effect::ActionUpdated { record, .. } => assert_eq!(record.rejections, vec![c()]),
            other => panic!("unexpected effect {:?}", other),
        }
    }

    #[test]
    fn test_vote_on_finalized_or_expired() {
        let mut executed = record();
        executed.executed = true;
        let err = run(
            snapshot(group(2), Some(ActionSlot::Open(executed))),
            b(),
            Instruction::ApproveAction { action_index: 0 },
        )
        .unwrap_err();
        assert!(matches!(err, MultisigError::AlreadyFinalized));

        let mut expiring = record();
        expiring.expires_at = Some(NOW - 1);
        let err = run(
            snapshot(group(2), Some(ActionSlot::Open(expiring))),
            b(),
            Instruction::ApproveAction { action_index: 0 },
        )
        .unwrap_err();
        assert!(matches!(err, MultisigError::Expired { expires_at } if expires_at == NOW - 1));

        let err = run(
            snapshot(group(2), Some(ActionSlot::Cancelled)),
            b(),
            Instruction::ApproveAction { action_index: 0 },
        )
        .unwrap_err();
        assert!(matches!(err, MultisigError::AlreadyFinalized));

        let err = run(
            snapshot(group(2), Some(ActionSlot::Unknown)),
            b(),
            Instruction::ApproveAction { action_index: 0 },
        )
        .unwrap_err();
        assert!(matches!(err, MultisigError::NotFound(_)));
    }

    #[test]
    fn test_execute_at_expiry_instant() {
        let mut r = record();
        r.approvals = vec![a(), b()];
        r.expires_at = Some(NOW);

        let effect = run(
            snapshot(group(2), Some(ActionSlot::Open(r))),
            a(),
            Instruction::ExecuteAction { action_index: 0 },
        )
        .unwrap();
        assert!(matches!(effect, Effect::ActionExecuted { record, .. } if record.executed));
    }

    #[test]
    fn test_execute_uses_current_threshold() {
        let mut r = record();
        r.approvals = vec![a(), b()];

        let err = run(
            snapshot(group(3), Some(ActionSlot::Open(r))),
            a(),
            Instruction::ExecuteAction { action_index: 0 },
        )
        .unwrap_err();
        assert!(matches!(err, MultisigError::InsufficientApprovals { have: 2, need: 3 }));
        assert_eq!(err.deficit(), Some(1));
    }

    #[test]
    fn test_execute_open_to_any_signer() {
        let mut r = record();
        r.approvals = vec![a(), b()];

        let effect = run(
            snapshot(group(2), Some(ActionSlot::Open(r))),
            outsider(),
            Instruction::ExecuteAction { action_index: 0 },
        )
        .unwrap();
        assert!(matches!(effect, Effect::ActionExecuted { record, .. } if record.executed));
    }

    #[test]
    fn test_vote_drops_removed_owner_votes() {
        // c() approved and a() rejected while still owners, then both left
        let mut r = record();
        r.approvals = vec![c(), b()];
        r.rejections = vec![a()];
        let mut g = group(1);
        g.owners = vec![b(), outsider()];

        let effect = run(
            snapshot(g, Some(ActionSlot::Open(r))),
            outsider(),
            Instruction::ApproveAction { action_index: 0 },
        )
        .unwrap();
        match effect {
            Effect::ActionUpdated { record, .. } => {
                assert_eq!(record.approvals, vec![b(), outsider()]);
                assert!(record.rejections.is_empty());
            }
            other => panic!("unexpected effect {:?}", other),
        }
    }

    #[test]
    fn test_cancel_rules() {
        let err = run(
            snapshot(group(2), Some(ActionSlot::Open(record()))),
            b(),
            Instruction::CancelAction { action_index: 0 },
        )
        .unwrap_err();
        assert!(matches!(err, MultisigError::NotProposer(_)));

        let mut executed = record();
        executed.executed = true;
        let err = run(
            snapshot(group(2), Some(ActionSlot::Open(executed))),
            a(),
            Instruction::CancelAction { action_index: 0 },
        )
        .unwrap_err();
        assert!(matches!(err, MultisigError::AlreadyFinalized));

        let effect = run(
            snapshot(group(2), Some(ActionSlot::Open(record()))),
            a(),
            Instruction::CancelAction { action_index: 0 },
        )
        .unwrap();
        assert_eq!(effect, Effect::ActionCancelled { index: 0 });
    }

    #[test]
    fn test_close_refused_with_open_actions() {
        let mut s = snapshot(group(2), None);
        s.open_actions = 2;
        let err = run(s, b(), Instruction::CloseGroup).unwrap_err();
        assert!(matches!(err, MultisigError::OpenActions { count: 2 }));

        let mut g = group(2);
        g.action_count = 3;
        let effect = run(snapshot(g, None), b(), Instruction::CloseGroup).unwrap();
        assert_eq!(effect, Effect::GroupClosed { action_count: 3 });
    }

    #[test]
    fn test_missing_group() {
        let empty = Snapshot {
            address: group_address(),
            group: None,
            action: None,
            open_actions: 0,
        };
        let err = run(empty, a(), Instruction::CloseGroup).unwrap_err();
        assert!(matches!(err, MultisigError::NotFound(addr) if addr == group_address()));
    }

    #[test]
    fn test_snapshot_load_counts_open_records() {
        let mut g = group(2);
        g.action_count = 4;

        let mut executed = record();
        executed.executed = true;
        let mut expired = record();
        expired.expires_at = Some(NOW - 5);

        let records = vec![Some(record()), Some(executed), None, Some(expired)];
        let snapshot = Snapshot::load(
            group_address(),
            &Instruction::CloseGroup,
            NOW,
            || Ok(Some(g.clone())),
            |index| Ok(records[index as usize].clone()),
        )
        .unwrap();

        assert_eq!(snapshot.open_actions, 1);
        assert_eq!(snapshot.action, None);

        let snapshot = Snapshot::load(
            group_address(),
            &Instruction::ApproveAction { action_index: 2 },
            NOW,
            || Ok(Some(g.clone())),
            |index| Ok(records[index as usize].clone()),
        )
        .unwrap();
        assert_eq!(snapshot.action, Some(ActionSlot::Cancelled));
    }
}
