//! Operation builders
//!
//! Pure functions that turn typed parameters into an
//! [`OperationDescriptor`]: the accounts an operation touches, with their
//! signer/writable flags, plus the encoded payload for the program.

use crate::core::{derive_action_address, derive_group_address, Address};
use crate::multisig::group::GroupConfig;
use crate::multisig::Instruction;
use bytes::BufMut;
use serde::{Deserialize, Serialize};

/// An account reference inside an operation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountMeta {
    pub address: Address,
    pub is_signer: bool,
    pub is_writable: bool,
}

impl AccountMeta {
    /// Signing account, optionally writable (when it pays or receives funds)
    pub fn signer(address: Address, is_writable: bool) -> Self {
        Self {
            address,
            is_signer: true,
            is_writable,
        }
    }

    pub fn writable(address: Address) -> Self {
        Self {
            address,
            is_signer: false,
            is_writable: true,
        }
    }

    pub fn readonly(address: Address) -> Self {
        Self {
            address,
            is_signer: false,
            is_writable: false,
        }
    }
}

/// Everything the ledger needs to run one operation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationDescriptor {
    pub program_id: Address,
    pub accounts: Vec<AccountMeta>,
    pub data: Vec<u8>,
}

impl OperationDescriptor {
    fn new(program_id: &Address, accounts: Vec<AccountMeta>, instruction: &Instruction) -> Self {
        Self {
            program_id: *program_id,
            accounts,
            data: instruction.to_bytes(),
        }
    }

    /// Accounts that must sign
    pub fn signers(&self) -> impl Iterator<Item = &Address> {
        self.accounts
            .iter()
            .filter(|meta| meta.is_signer)
            .map(|meta| &meta.address)
    }

    /// Canonical bytes covered by signatures
    ///
    /// program_id || account_count (u32) || (address || flags)* || data_len (u32) || data
    pub fn message(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(32 + 4 + self.accounts.len() * 33 + 4 + self.data.len());
        buf.put_slice(self.program_id.as_bytes());
        buf.put_u32_le(self.accounts.len() as u32);
        for meta in &self.accounts {
            buf.put_slice(meta.address.as_bytes());
            buf.put_u8(u8::from(meta.is_signer) | (u8::from(meta.is_writable) << 1));
        }
        buf.put_u32_le(self.data.len() as u32);
        buf.put_slice(&self.data);
        buf
    }
}

/// Establish a new group; only a validated configuration is accepted
pub fn create_group(
    program_id: &Address,
    creator: &Address,
    nonce: u64,
    config: &GroupConfig,
) -> OperationDescriptor {
    create_group_descriptor(program_id, creator, nonce, config.threshold(), config.owners())
}

fn create_group_descriptor(
    program_id: &Address,
    creator: &Address,
    nonce: u64,
    threshold: u8,
    owners: &[Address],
) -> OperationDescriptor {
    let group = derive_group_address(creator, nonce, program_id);
    OperationDescriptor::new(
        program_id,
        vec![AccountMeta::signer(*creator, true), AccountMeta::writable(group)],
        &Instruction::CreateGroup {
            nonce,
            threshold,
            owners: owners.to_vec(),
        },
    )
}

/// Add `owner`; the caller pays for the larger account
pub fn add_owner(
    program_id: &Address,
    caller: &Address,
    group: &Address,
    owner: &Address,
) -> OperationDescriptor {
    OperationDescriptor::new(
        program_id,
        vec![AccountMeta::signer(*caller, true), AccountMeta::writable(*group)],
        &Instruction::AddOwner { owner: *owner },
    )
}

pub fn remove_owner(
    program_id: &Address,
    caller: &Address,
    group: &Address,
    owner: &Address,
) -> OperationDescriptor {
    OperationDescriptor::new(
        program_id,
        vec![AccountMeta::signer(*caller, false), AccountMeta::writable(*group)],
        &Instruction::RemoveOwner { owner: *owner },
    )
}

pub fn change_threshold(
    program_id: &Address,
    caller: &Address,
    group: &Address,
    threshold: u8,
) -> OperationDescriptor {
    OperationDescriptor::new(
        program_id,
        vec![AccountMeta::signer(*caller, false), AccountMeta::writable(*group)],
        &Instruction::ChangeThreshold { threshold },
    )
}

/// Propose an action at `action_index`, which must be the group's current
/// `action_count`
pub fn propose_action(
    program_id: &Address,
    proposer: &Address,
    group: &Address,
    action_index: u64,
    payload: Vec<u8>,
    expires_at: Option<i64>,
) -> OperationDescriptor {
    let action = derive_action_address(group, action_index, program_id);
    OperationDescriptor::new(
        program_id,
        vec![
            AccountMeta::signer(*proposer, true),
            AccountMeta::writable(*group),
            AccountMeta::writable(action),
        ],
        &Instruction::ProposeAction {
            payload,
            expires_at,
        },
    )
}

/// Accounts shared by vote/execute: signer, group (read), record (write)
fn action_accounts(
    program_id: &Address,
    signer: &Address,
    signer_writable: bool,
    group: &Address,
    action_index: u64,
) -> Vec<AccountMeta> {
    vec![
        AccountMeta::signer(*signer, signer_writable),
        AccountMeta::readonly(*group),
        AccountMeta::writable(derive_action_address(group, action_index, program_id)),
    ]
}

pub fn approve_action(
    program_id: &Address,
    owner: &Address,
    group: &Address,
    action_index: u64,
) -> OperationDescriptor {
    OperationDescriptor::new(
        program_id,
        action_accounts(program_id, owner, false, group, action_index),
        &Instruction::ApproveAction { action_index },
    )
}

pub fn reject_action(
    program_id: &Address,
    owner: &Address,
    group: &Address,
    action_index: u64,
) -> OperationDescriptor {
    OperationDescriptor::new(
        program_id,
        action_accounts(program_id, owner, false, group, action_index),
        &Instruction::RejectAction { action_index },
    )
}

pub fn execute_action(
    program_id: &Address,
    executor: &Address,
    group: &Address,
    action_index: u64,
) -> OperationDescriptor {
    OperationDescriptor::new(
        program_id,
        action_accounts(program_id, executor, false, group, action_index),
        &Instruction::ExecuteAction { action_index },
    )
}

/// Cancel; the proposer receives the closed record's balance
pub fn cancel_action(
    program_id: &Address,
    proposer: &Address,
    group: &Address,
    action_index: u64,
) -> OperationDescriptor {
    OperationDescriptor::new(
        program_id,
        action_accounts(program_id, proposer, true, group, action_index),
        &Instruction::CancelAction { action_index },
    )
}

/// Close the group and every record under it
pub fn close_group(
    program_id: &Address,
    caller: &Address,
    group: &Address,
    action_count: u64,
) -> OperationDescriptor {
    let mut accounts = vec![AccountMeta::signer(*caller, true), AccountMeta::writable(*group)];
    accounts.extend(
        (0..action_count)
            .map(|index| AccountMeta::writable(derive_action_address(group, index, program_id))),
    );
    OperationDescriptor::new(program_id, accounts, &Instruction::CloseGroup)
}

/// Build the descriptor for any instruction
///
/// `action_count` is the group's counter as last observed; it addresses
/// the new record for proposals and the record list for closing.
pub fn build(
    program_id: &Address,
    caller: &Address,
    group: &Address,
    instruction: &Instruction,
    action_count: u64,
) -> OperationDescriptor {
    match instruction {
        Instruction::CreateGroup {
            nonce,
            threshold,
            owners,
        } => create_group_descriptor(program_id, caller, *nonce, *threshold, owners),
        Instruction::AddOwner { owner } => add_owner(program_id, caller, group, owner),
        Instruction::RemoveOwner { owner } => remove_owner(program_id, caller, group, owner),
        Instruction::ChangeThreshold { threshold } => {
            change_threshold(program_id, caller, group, *threshold)
        }
        Instruction::ProposeAction {
            payload,
            expires_at,
        } => propose_action(
            program_id,
            caller,
            group,
            action_count,
            payload.clone(),
            *expires_at,
        ),
        Instruction::ApproveAction { action_index } => {
            approve_action(program_id, caller, group, *action_index)
        }
        Instruction::RejectAction { action_index } => {
            reject_action(program_id, caller, group, *action_index)
        }
        Instruction::ExecuteAction { action_index } => {
            execute_action(program_id, caller, group, *action_index)
        }
        Instruction::CancelAction { action_index } => {
            cancel_action(program_id, caller, group, *action_index)
        }
        Instruction::CloseGroup => close_group(program_id, caller, group, action_count),
    }
}
