//! Authorization store backed by a ledger
//!
//! Reads decode raw account bytes fetched through a [`LedgerClient`].
//! Writes run the state machine locally as a preflight, build the
//! operation, sign it and submit it; the ledger program re-runs the same
//! machine against its own state and has the final word.

use crate::codec::CodecError;
use crate::core::{derive_action_address, Address};
use crate::crypto::Signer;
use crate::ledger::{LedgerClient, LedgerError, SignedOperation};
use crate::multisig::action::ActionRecord;
use crate::multisig::builders;
use crate::multisig::error::MultisigError;
use crate::multisig::group::Group;
use crate::multisig::machine::{self, Snapshot};
use crate::multisig::store::{AuthorizationStore, Receipt};
use crate::multisig::Instruction;

/// Store that keeps all state on a ledger
pub struct LedgerBackedStore<L> {
    program_id: Address,
    ledger: L,
}

impl<L: LedgerClient> LedgerBackedStore<L> {
    pub fn new(program_id: Address, ledger: L) -> Self {
        Self { program_id, ledger }
    }

    /// The underlying ledger client
    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    fn fetch<T>(
        &self,
        address: &Address,
        decode: impl FnOnce(&[u8]) -> Result<T, CodecError>,
    ) -> Result<Option<T>, MultisigError> {
        match self.ledger.fetch_account(address) {
            Ok(bytes) => Ok(Some(decode(&bytes)?)),
            Err(LedgerError::NotFound(_)) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}

impl<L: LedgerClient> AuthorizationStore for LedgerBackedStore<L> {
    fn program_id(&self) -> Address {
        self.program_id
    }

    fn group(&self, address: &Address) -> Result<Option<Group>, MultisigError> {
        self.fetch(address, Group::from_bytes)
    }

    fn action(&self, group: &Address, index: u64) -> Result<Option<ActionRecord>, MultisigError> {
        let address = derive_action_address(group, index, &self.program_id);
        self.fetch(&address, ActionRecord::from_bytes)
    }

    fn process(
        &self,
        signer: &dyn Signer,
        group: &Address,
        instruction: Instruction,
        now: i64,
    ) -> Result<Receipt, MultisigError> {
        let caller = signer.identity();
        let snapshot = Snapshot::load(
            *group,
            &instruction,
            now,
            || self.group(group),
            |index| self.action(group, index),
        )?;
        let action_count = snapshot.group.as_ref().map_or(0, |g| g.action_count);

        // Refuse locally whatever the program would refuse
        let effect = machine::apply(snapshot, &self.program_id, &caller, instruction.clone(), now)?;

        let descriptor = builders::build(&self.program_id, &caller, group, &instruction, action_count);
        let operation = SignedOperation::sign(descriptor, &[signer])?;
        let signature = self.ledger.submit(&operation)?;

        log::info!(
            "Submitted {} for group {} by {} (sig {})",
            instruction.type_name(),
            group.short(),
            caller.short(),
            signature.to_string().chars().take(16).collect::<String>()
        );

        Ok(Receipt {
            effect,
            signature: Some(signature),
        })
    }
}
