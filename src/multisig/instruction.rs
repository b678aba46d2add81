//! Operations understood by the authorization program
//!
//! Each variant is one operation kind with its own typed fields. Bytes only
//! appear at the codec boundary (see `codec::instruction`).

use crate::core::Address;
use serde::{Deserialize, Serialize};

/// Discriminator values, fixed for wire compatibility
pub mod discriminator {
    pub const CREATE_GROUP: u64 = 0;
    pub const ADD_OWNER: u64 = 1;
    pub const REMOVE_OWNER: u64 = 2;
    pub const CHANGE_THRESHOLD: u64 = 3;
    pub const PROPOSE_ACTION: u64 = 4;
    pub const APPROVE_ACTION: u64 = 5;
    pub const REJECT_ACTION: u64 = 6;
    pub const EXECUTE_ACTION: u64 = 7;
    pub const CANCEL_ACTION: u64 = 8;
    pub const CLOSE_GROUP: u64 = 9;
}

/// A single authorization operation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Instruction {
    /// Establish a group at the address derived from (creator, nonce)
    CreateGroup {
        nonce: u64,
        threshold: u8,
        owners: Vec<Address>,
    },
    /// Add an owner to the group
    AddOwner { owner: Address },
    /// Remove an owner from the group
    RemoveOwner { owner: Address },
    /// Replace the approval threshold
    ChangeThreshold { threshold: u8 },
    /// Record a new action at index `action_count`
    ProposeAction {
        payload: Vec<u8>,
        expires_at: Option<i64>,
    },
    /// Vote for an action
    ApproveAction { action_index: u64 },
    /// Vote against an action
    RejectAction { action_index: u64 },
    /// Dispatch an approved action
    ExecuteAction { action_index: u64 },
    /// Withdraw an action (proposer only)
    CancelAction { action_index: u64 },
    /// Remove the group once nothing is left open
    CloseGroup,
}

impl Instruction {
    /// Wire discriminator for this operation kind
    pub fn discriminator(&self) -> u64 {
        use discriminator::*;
        match self {
            Instruction::CreateGroup { .. } => CREATE_GROUP,
            Instruction::AddOwner { .. } => ADD_OWNER,
            Instruction::RemoveOwner { .. } => REMOVE_OWNER,
            Instruction::ChangeThreshold { .. } => CHANGE_THRESHOLD,
            Instruction::ProposeAction { .. } => PROPOSE_ACTION,
            Instruction::ApproveAction { .. } => APPROVE_ACTION,
            Instruction::RejectAction { .. } => REJECT_ACTION,
            Instruction::ExecuteAction { .. } => EXECUTE_ACTION,
            Instruction::CancelAction { .. } => CANCEL_ACTION,
            Instruction::CloseGroup => CLOSE_GROUP,
        }
    }

    /// The existing action this operation targets, if any
    pub fn action_index(&self) -> Option<u64> {
        match self {
            Instruction::ApproveAction { action_index }
            | Instruction::RejectAction { action_index }
            | Instruction::ExecuteAction { action_index }
            | Instruction::CancelAction { action_index } => Some(*action_index),
            _ => None,
        }
    }

    /// Get operation name for logging
    pub fn type_name(&self) -> &'static str {
        match self {
            Instruction::CreateGroup { .. } => "CreateGroup",
            Instruction::AddOwner { .. } => "AddOwner",
            Instruction::RemoveOwner { .. } => "RemoveOwner",
            Instruction::ChangeThreshold { .. } => "ChangeThreshold",
            Instruction::ProposeAction { .. } => "ProposeAction",
            Instruction::ApproveAction { .. } => "ApproveAction",
            Instruction::RejectAction { .. } => "RejectAction",
            Instruction::ExecuteAction { .. } => "ExecuteAction",
            Instruction::CancelAction { .. } => "CancelAction",
            Instruction::CloseGroup => "CloseGroup",
        }
    }
}
