//! In-process ledger
//!
//! Holds raw account bytes and executes the authorization program against
//! them: signatures are checked over the operation message, the payload is
//! decoded, every derived account is checked against the accounts the
//! operation lists, and the state machine runs on the decoded accounts.
//! Group accounts are allocated at their maximum size and zero padded.

use super::{LedgerClient, LedgerError, SignedOperation};
use crate::codec::{CodecError, GROUP_MAX_LEN};
use crate::core::{derive_action_address, Address, Clock, SystemClock};
use crate::crypto::{verify_signature, Signature};
use crate::multisig::machine::{self, Effect, Snapshot};
use crate::multisig::{
    AccountMeta, ActionRecord, DispatchedAction, Group, Instruction, MultisigError,
    OperationDescriptor,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Everything the ledger knows, in a persistable form
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerState {
    /// Account bytes by address, hex encoded when serialized
    #[serde(with = "hex_accounts")]
    pub accounts: BTreeMap<Address, Vec<u8>>,
    /// Payloads handed off by executed actions
    pub dispatched: Vec<DispatchedAction>,
    /// Number of operations applied
    pub processed: u64,
}

impl LedgerState {
    fn group(&self, address: &Address) -> Result<Option<Group>, MultisigError> {
        self.accounts
            .get(address)
            .map(|bytes| Group::from_bytes(bytes))
            .transpose()
            .map_err(MultisigError::from)
    }

    fn action(&self, address: &Address) -> Result<Option<ActionRecord>, MultisigError> {
        self.accounts
            .get(address)
            .map(|bytes| ActionRecord::from_bytes(bytes))
            .transpose()
            .map_err(MultisigError::from)
    }

    /// Write the effect's accounts; nothing is written unless every
    /// account encodes
    fn commit(
        &mut self,
        program_id: &Address,
        group: &Address,
        effect: &Effect,
        now: i64,
    ) -> Result<(), CodecError> {
        let record_address = |index: u64| derive_action_address(group, index, program_id);

        match effect {
            Effect::GroupCreated(g) | Effect::GroupUpdated(g) => {
                let bytes = group_account(g)?;
                self.accounts.insert(*group, bytes);
            }
            Effect::GroupClosed { action_count } => {
                self.accounts.remove(group);
                for index in 0..*action_count {
                    self.accounts.remove(&record_address(index));
                }
            }
            Effect::ActionProposed {
                group: g,
                index,
                record,
            } => {
                let group_bytes = group_account(g)?;
                let record_bytes = record.to_bytes()?;
                self.accounts.insert(*group, group_bytes);
                self.accounts.insert(record_address(*index), record_bytes);
            }
            Effect::ActionUpdated { index, record } => {
                self.accounts.insert(record_address(*index), record.to_bytes()?);
            }
            Effect::ActionExecuted { index, record } => {
                self.accounts.insert(record_address(*index), record.to_bytes()?);
                self.dispatched.push(DispatchedAction {
                    group: *group,
                    index: *index,
                    payload: record.payload.clone(),
                    executed_at: now,
                });
            }
            Effect::ActionCancelled { index } => {
                self.accounts.remove(&record_address(*index));
            }
        }
        self.processed += 1;
        Ok(())
    }
}

/// Group accounts are allocated at their largest size
fn group_account(group: &Group) -> Result<Vec<u8>, CodecError> {
    let mut bytes = group.to_bytes()?;
    bytes.resize(GROUP_MAX_LEN, 0);
    Ok(bytes)
}

/// A ledger that lives in this process
pub struct LocalLedger<C: Clock = SystemClock> {
    program_id: Address,
    clock: C,
    state: Mutex<LedgerState>,
}

impl<C: Clock> LocalLedger<C> {
    /// Create an empty ledger hosting the program at `program_id`
    pub fn new(program_id: Address, clock: C) -> Self {
        Self::with_state(program_id, clock, LedgerState::default())
    }

    /// Resume from a previously exported state
    pub fn with_state(program_id: Address, clock: C, state: LedgerState) -> Self {
        Self {
            program_id,
            clock,
            state: Mutex::new(state),
        }
    }

    pub fn program_id(&self) -> Address {
        self.program_id
    }

    fn lock(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy of the current state, for persistence
    pub fn state(&self) -> LedgerState {
        self.lock().clone()
    }

    /// Payloads dispatched so far
    pub fn dispatched(&self) -> Vec<DispatchedAction> {
        self.lock().dispatched.clone()
    }

    pub fn account_count(&self) -> usize {
        self.lock().accounts.len()
    }

    /// Every signer account must carry a valid signature over the message
    fn verify_signatures(&self, operation: &SignedOperation) -> Result<(), LedgerError> {
        let message = operation.descriptor.message();
        for signer in operation.descriptor.signers() {
            let signature = operation
                .signature_for(signer)
                .ok_or(LedgerError::MissingSignature(*signer))?;
            if !verify_signature(signer, &message, signature)? {
                return Err(LedgerError::InvalidSignature(*signer));
            }
        }
        Ok(())
    }

    /// Execute the authorization program over the ledger state
    fn execute(
        &self,
        state: &mut LedgerState,
        descriptor: &OperationDescriptor,
        instruction: Instruction,
        now: i64,
    ) -> Result<(), MultisigError> {
        let caller = account(&descriptor.accounts, 0)?;
        if !caller.is_signer {
            return Err(MultisigError::NotAuthorized(caller.address));
        }
        let group = account(&descriptor.accounts, 1)?.address;

        let snapshot = Snapshot::load(
            group,
            &instruction,
            now,
            || state.group(&group),
            |index| state.action(&derive_action_address(&group, index, &self.program_id)),
        )?;
        self.check_record_accounts(descriptor, &snapshot, &instruction)?;

        let kind = instruction.type_name();
        let effect = machine::apply(snapshot, &self.program_id, &caller.address, instruction, now)?;
        state.commit(&self.program_id, &group, &effect, now)?;

        log::info!(
            "Ledger applied {} from {} to {} ({})",
            kind,
            caller.address.short(),
            group.short(),
            effect.type_name()
        );
        Ok(())
    }

    /// Record accounts listed by the operation must be the derived ones
    fn check_record_accounts(
        &self,
        descriptor: &OperationDescriptor,
        snapshot: &Snapshot,
        instruction: &Instruction,
    ) -> Result<(), MultisigError> {
        let Some(group) = &snapshot.group else {
            return Ok(());
        };
        let check = |position: usize, index: u64| -> Result<(), MultisigError> {
            let expected = derive_action_address(&snapshot.address, index, &self.program_id);
            let actual = account(&descriptor.accounts, position)?.address;
            if actual != expected {
                return Err(MultisigError::AddressMismatch { expected, actual });
            }
            Ok(())
        };

        match instruction {
            // Racing proposals land here: only one of them names the next index
            Instruction::ProposeAction { .. } => check(2, group.action_count),
            Instruction::ApproveAction { action_index }
            | Instruction::RejectAction { action_index }
            | Instruction::ExecuteAction { action_index }
            | Instruction::CancelAction { action_index } => check(2, *action_index),
            Instruction::CloseGroup => {
                (0..group.action_count).try_for_each(|index| check(2 + index as usize, index))
            }
            _ => Ok(()),
        }
    }
}

impl<C: Clock> LedgerClient for LocalLedger<C> {
    fn fetch_account(&self, address: &Address) -> Result<Vec<u8>, LedgerError> {
        self.lock()
            .accounts
            .get(address)
            .cloned()
            .ok_or(LedgerError::NotFound(*address))
    }

    fn submit(&self, operation: &SignedOperation) -> Result<Signature, LedgerError> {
        let descriptor = &operation.descriptor;
        if descriptor.program_id != self.program_id {
            return Err(LedgerError::UnknownProgram(descriptor.program_id));
        }

        self.verify_signatures(operation)?;
        let instruction = Instruction::from_bytes(&descriptor.data)?;
        let fee_payer = descriptor
            .signers()
            .next()
            .and_then(|signer| operation.signature_for(signer))
            .copied()
            .ok_or(MultisigError::MissingAccount(0))?;

        let now = self.clock.now();
        let mut state = self.lock();
        if let Err(err) = self.execute(&mut state, descriptor, instruction, now) {
            log::warn!("Ledger rejected operation: {}", err);
            return Err(err.into());
        }

        Ok(fee_payer)
    }
}

fn account(accounts: &[AccountMeta], position: usize) -> Result<&AccountMeta, MultisigError> {
    accounts
        .get(position)
        .ok_or(MultisigError::MissingAccount(position))
}

mod hex_accounts {
    use crate::core::Address;
    use serde::{Deserialize, Deserializer, Serializer};
    use std::collections::BTreeMap;

    pub fn serialize<S: Serializer>(
        accounts: &BTreeMap<Address, Vec<u8>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.collect_map(
            accounts
                .iter()
                .map(|(address, bytes)| (address, hex::encode(bytes))),
        )
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<Address, Vec<u8>>, D::Error> {
        BTreeMap::<Address, String>::deserialize(deserializer)?
            .into_iter()
            .map(|(address, data)| {
                hex::decode(data)
                    .map(|bytes| (address, bytes))
                    .map_err(serde::de::Error::custom)
            })
            .collect()
    }
}
