//! Backing-store seam
//!
//! Both stores load a [`Snapshot`](crate::multisig::machine::Snapshot), run
//! [`machine::apply`](crate::multisig::machine::apply) and persist the
//! [`Effect`]. Where the state lives is their only difference.

use crate::core::Address;
use crate::crypto::{Signature, Signer};
use crate::multisig::action::ActionRecord;
use crate::multisig::error::MultisigError;
use crate::multisig::group::Group;
use crate::multisig::machine::Effect;
use crate::multisig::Instruction;
use serde::{Deserialize, Serialize};

/// Outcome of one processed instruction
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Receipt {
    /// Writes the transition produced
    pub effect: Effect,
    /// Ledger signature, when the store submits operations
    pub signature: Option<Signature>,
}

/// A payload handed off after its action executed
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchedAction {
    pub group: Address,
    pub index: u64,
    #[serde(with = "crate::multisig::action::hex_bytes")]
    pub payload: Vec<u8>,
    pub executed_at: i64,
}

/// Where groups and action records live
pub trait AuthorizationStore {
    /// Program that owns the derived addresses
    fn program_id(&self) -> Address;

    /// Read a group, `None` if the account does not exist
    fn group(&self, address: &Address) -> Result<Option<Group>, MultisigError>;

    /// Read the record at `index`, `None` if never proposed or cancelled
    fn action(&self, group: &Address, index: u64) -> Result<Option<ActionRecord>, MultisigError>;

    /// Run one instruction on behalf of `signer` as a single atomic step
    fn process(
        &self,
        signer: &dyn Signer,
        group: &Address,
        instruction: Instruction,
        now: i64,
    ) -> Result<Receipt, MultisigError>;

    /// Read a group that must exist
    fn load_group(&self, address: &Address) -> Result<Group, MultisigError> {
        self.group(address)?
            .ok_or(MultisigError::NotFound(*address))
    }
}

impl<S: AuthorizationStore + ?Sized> AuthorizationStore for &S {
    fn program_id(&self) -> Address {
        (**self).program_id()
    }

    fn group(&self, address: &Address) -> Result<Option<Group>, MultisigError> {
        (**self).group(address)
    }

    fn action(&self, group: &Address, index: u64) -> Result<Option<ActionRecord>, MultisigError> {
        (**self).action(group, index)
    }

    fn process(
        &self,
        signer: &dyn Signer,
        group: &Address,
        instruction: Instruction,
        now: i64,
    ) -> Result<Receipt, MultisigError> {
        (**self).process(signer, group, instruction, now)
    }
}
