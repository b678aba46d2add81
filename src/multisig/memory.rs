//! In-process authorization store
//!
//! Groups and records live in maps behind a single mutex. Loading the
//! snapshot, running the machine and writing the effect all happen inside
//! one critical section, so every instruction is atomic.

use crate::core::Address;
use crate::crypto::Signer;
use crate::multisig::action::ActionRecord;
use crate::multisig::error::MultisigError;
use crate::multisig::group::Group;
use crate::multisig::machine::{self, Effect, Snapshot};
use crate::multisig::store::{AuthorizationStore, DispatchedAction, Receipt};
use crate::multisig::Instruction;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct Inner {
    groups: HashMap<Address, Group>,
    actions: HashMap<(Address, u64), ActionRecord>,
    dispatched: Vec<DispatchedAction>,
}

impl Inner {
    fn commit(&mut self, group: &Address, effect: &Effect, now: i64) {
        match effect {
            Effect::GroupCreated(g) | Effect::GroupUpdated(g) => {
                self.groups.insert(*group, g.clone());
            }
            Effect::GroupClosed { .. } => {
                self.groups.remove(group);
                self.actions.retain(|(owner, _), _| owner != group);
            }
            Effect::ActionProposed {
                group: g,
                index,
                record,
            } => {
                self.groups.insert(*group, g.clone());
                self.actions.insert((*group, *index), record.clone());
            }
            Effect::ActionUpdated { index, record } => {
                self.actions.insert((*group, *index), record.clone());
            }
            Effect::ActionExecuted { index, record } => {
                self.actions.insert((*group, *index), record.clone());
                self.dispatched.push(DispatchedAction {
                    group: *group,
                    index: *index,
                    payload: record.payload.clone(),
                    executed_at: now,
                });
            }
            Effect::ActionCancelled { index } => {
                self.actions.remove(&(*group, *index));
            }
        }
    }
}

/// Authorization store held entirely in memory
#[derive(Debug)]
pub struct InMemoryStore {
    program_id: Address,
    inner: Mutex<Inner>,
}

impl InMemoryStore {
    /// Create an empty store for `program_id`
    pub fn new(program_id: Address) -> Self {
        Self {
            program_id,
            inner: Mutex::new(Inner::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // Every write happens after all fallible steps, so a poisoned map
        // is still consistent
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Payloads dispatched so far, oldest first
    pub fn dispatched(&self) -> Vec<DispatchedAction> {
        self.lock().dispatched.clone()
    }

    /// Number of groups currently held
    pub fn group_count(&self) -> usize {
        self.lock().groups.len()
    }

    /// Number of live action records across all groups
    pub fn action_count(&self) -> usize {
        self.lock().actions.len()
    }
}

impl AuthorizationStore for InMemoryStore {
    fn program_id(&self) -> Address {
        self.program_id
    }

    fn group(&self, address: &Address) -> Result<Option<Group>, MultisigError> {
        Ok(self.lock().groups.get(address).cloned())
    }

    fn action(&self, group: &Address, index: u64) -> Result<Option<ActionRecord>, MultisigError> {
        Ok(self.lock().actions.get(&(*group, index)).cloned())
    }

    fn process(
        &self,
        signer: &dyn Signer,
        group: &Address,
        instruction: Instruction,
        now: i64,
    ) -> Result<Receipt, MultisigError> {
        let caller = signer.identity();
        let kind = instruction.type_name();

        let mut inner = self.lock();
        let snapshot = Snapshot::load(
            *group,
            &instruction,
            now,
            || Ok(inner.groups.get(group).cloned()),
            |index| Ok(inner.actions.get(&(*group, index)).cloned()),
        )?;

        let effect = machine::apply(snapshot, &self.program_id, &caller, instruction, now)?;
        inner.commit(group, &effect, now);
        drop(inner);

        log::info!(
            "{} by {} on group {} -> {}",
            kind,
            caller.short(),
            group.short(),
            effect.type_name()
        );

        Ok(Receipt {
            effect,
            signature: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::derive_group_address;
    use crate::crypto::KeyPair;

    fn setup() -> (InMemoryStore, Vec<KeyPair>, Address) {
        let program = Address::new([0xEE; 32]);
        let store = InMemoryStore::new(program);
        let keys: Vec<KeyPair> = (0..3).map(|_| KeyPair::generate()).collect();
        let group = derive_group_address(&keys[0].address(), 0, &program);

        store
            .process(
                &keys[0],
                &group,
                Instruction::CreateGroup {
                    nonce: 0,
                    threshold: 2,
                    owners: keys.iter().map(|k| k.address()).collect(),
                },
                100,
            )
            .unwrap();

        (store, keys, group)
    }

    #[test]
    fn test_store_creation() {
        let store = InMemoryStore::new(Address::new([1; 32]));
        assert_eq!(store.group_count(), 0);
        assert_eq!(store.action_count(), 0);
        assert!(store.dispatched().is_empty());
    }

    #[test]
    fn test_failed_instruction_leaves_state_untouched() {
        let (store, keys, group) = setup();
        let before = store.load_group(&group).unwrap();

        let outsider = KeyPair::generate();
        let err = store
            .process(
                &outsider,
                &group,
                Instruction::ProposeAction {
                    payload: vec![1],
                    expires_at: None,
                },
                101,
            )
            .unwrap_err();
        assert!(matches!(err, MultisigError::NotAuthorized(_)));
        assert_eq!(store.load_group(&group).unwrap(), before);
        assert_eq!(store.action_count(), 0);

        // Sanity: an owner can propose
        store
            .process(
                &keys[1],
                &group,
                Instruction::ProposeAction {
                    payload: vec![1],
                    expires_at: None,
                },
                101,
            )
            .unwrap();
        assert_eq!(store.action_count(), 1);
    }

    #[test]
    fn test_execute_dispatches_once() {
        let (store, keys, group) = setup();
        let propose = Instruction::ProposeAction {
            payload: vec![0xAB],
            expires_at: None,
        };
        store.process(&keys[0], &group, propose, 101).unwrap();
        for key in &keys[..2] {
            store
                .process(key, &group, Instruction::ApproveAction { action_index: 0 }, 102)
                .unwrap();
        }
        store
            .process(&keys[2], &group, Instruction::ExecuteAction { action_index: 0 }, 103)
            .unwrap();

        let dispatched = store.dispatched();
        assert_eq!(dispatched.len(), 1);
        assert_eq!(dispatched[0].payload, vec![0xAB]);
        assert_eq!(dispatched[0].executed_at, 103);
    }

    #[test]
    fn test_close_removes_records() {
        let (store, keys, group) = setup();
        store
            .process(
                &keys[0],
                &group,
                Instruction::ProposeAction {
                    payload: vec![],
                    expires_at: Some(150),
                },
                101,
            )
            .unwrap();

        let err = store
            .process(&keys[0], &group, Instruction::CloseGroup, 120)
            .unwrap_err();
        assert!(matches!(err, MultisigError::OpenActions { count: 1 }));

        // Once expired the record no longer blocks closing
        store
            .process(&keys[0], &group, Instruction::CloseGroup, 151)
            .unwrap();
        assert_eq!(store.group_count(), 0);
        assert_eq!(store.action_count(), 0);
        assert!(matches!(
            store.load_group(&group),
            Err(MultisigError::NotFound(_))
        ));
    }
}
