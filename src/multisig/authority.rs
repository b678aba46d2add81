//! Client facade over an authorization store
//!
//! Every call names its signer explicitly; there is no ambient "current
//! owner". Group configurations are validated locally before anything is
//! built or submitted.

use crate::core::{derive_action_address, derive_group_address, Address, Clock, SystemClock};
use crate::crypto::Signer;
use crate::multisig::action::{ActionRecord, ActionRef, ActionSlot, ActionStatus};
use crate::multisig::error::MultisigError;
use crate::multisig::group::{Group, GroupConfig};
use crate::multisig::machine::Effect;
use crate::multisig::store::AuthorizationStore;
use crate::multisig::Instruction;

/// Drives groups and actions through a backing store
pub struct Authority<S, C = SystemClock> {
    store: S,
    clock: C,
    /// Applied to proposals made without an explicit expiry
    default_ttl: Option<i64>,
}

impl<S: AuthorizationStore, C: Clock> Authority<S, C> {
    /// Create a new authority over `store`
    pub fn new(store: S, clock: C) -> Self {
        Self {
            store,
            clock,
            default_ttl: None,
        }
    }

    /// Give proposals without an expiry a lifetime of `seconds`
    pub fn with_default_ttl(mut self, seconds: i64) -> Self {
        self.default_ttl = Some(seconds);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn program_id(&self) -> Address {
        self.store.program_id()
    }

    pub fn now(&self) -> i64 {
        self.clock.now()
    }

    /// Derived address for a group made by `creator` with `nonce`
    pub fn group_address(&self, creator: &Address, nonce: u64) -> Address {
        derive_group_address(creator, nonce, &self.program_id())
    }

    /// Reference to the record at `index` under `group`
    pub fn action_ref(&self, group: &Address, index: u64) -> ActionRef {
        ActionRef::new(*group, index, &self.program_id())
    }

    // =========================================================================
    // Group lifecycle
    // =========================================================================

    /// Create a new group owned by `owners`, returning its address
    ///
    /// # Errors
    /// `Validation` listing every broken rule; nothing is submitted
    pub fn create_group(
        &self,
        signer: &dyn Signer,
        nonce: u64,
        owners: Vec<Address>,
        threshold: u8,
    ) -> Result<Address, MultisigError> {
        let config = GroupConfig::new(owners, threshold)?;
        let creator = signer.identity();
        let address = self.group_address(&creator, nonce);
        let description = config.description();

        let (owners, threshold) = config.into_parts();
        self.store.process(
            signer,
            &address,
            Instruction::CreateGroup {
                nonce,
                threshold,
                owners,
            },
            self.now(),
        )?;

        log::info!(
            "Created {} group {} (creator {}, nonce {})",
            description,
            address,
            creator.short(),
            nonce
        );
        Ok(address)
    }

    pub fn add_owner(
        &self,
        signer: &dyn Signer,
        group: &Address,
        owner: Address,
    ) -> Result<Group, MultisigError> {
        self.reconfigure(signer, group, Instruction::AddOwner { owner })
    }

    pub fn remove_owner(
        &self,
        signer: &dyn Signer,
        group: &Address,
        owner: Address,
    ) -> Result<Group, MultisigError> {
        self.reconfigure(signer, group, Instruction::RemoveOwner { owner })
    }

    /// Replace the threshold; pending actions are judged by the new value
    pub fn change_threshold(
        &self,
        signer: &dyn Signer,
        group: &Address,
        threshold: u8,
    ) -> Result<Group, MultisigError> {
        self.reconfigure(signer, group, Instruction::ChangeThreshold { threshold })
    }

    fn reconfigure(
        &self,
        signer: &dyn Signer,
        group: &Address,
        instruction: Instruction,
    ) -> Result<Group, MultisigError> {
        self.store.process(signer, group, instruction, self.now())?;
        let updated = self.store.load_group(group)?;
        log::info!("Group {} is now {}", group.short(), updated.description());
        Ok(updated)
    }

    /// Remove the group and its records; refused while any action is open
    pub fn close_group(&self, signer: &dyn Signer, group: &Address) -> Result<(), MultisigError> {
        self.store
            .process(signer, group, Instruction::CloseGroup, self.now())?;
        log::info!("Closed group {}", group);
        Ok(())
    }

    // =========================================================================
    // Actions
    // =========================================================================

    /// Propose `payload` for approval
    ///
    /// Without `expires_at` the default TTL applies, if one is set.
    pub fn propose(
        &self,
        signer: &dyn Signer,
        group: &Address,
        payload: Vec<u8>,
        expires_at: Option<i64>,
    ) -> Result<ActionRef, MultisigError> {
        let now = self.now();
        let expires_at = expires_at.or_else(|| self.default_ttl.map(|ttl| now + ttl));

        let receipt = self.store.process(
            signer,
            group,
            Instruction::ProposeAction {
                payload,
                expires_at,
            },
            now,
        )?;
        let index = receipt
            .effect
            .action_index()
            .ok_or(MultisigError::NotFound(*group))?;

        Ok(self.action_ref(group, index))
    }

    /// Approve; returns the status afterwards
    pub fn approve(
        &self,
        signer: &dyn Signer,
        group: &Address,
        index: u64,
    ) -> Result<ActionStatus, MultisigError> {
        self.vote(signer, group, Instruction::ApproveAction { action_index: index })
    }

    /// Reject; returns the status afterwards
    pub fn reject(
        &self,
        signer: &dyn Signer,
        group: &Address,
        index: u64,
    ) -> Result<ActionStatus, MultisigError> {
        self.vote(signer, group, Instruction::RejectAction { action_index: index })
    }

    fn vote(
        &self,
        signer: &dyn Signer,
        group: &Address,
        instruction: Instruction,
    ) -> Result<ActionStatus, MultisigError> {
        let index = instruction.action_index().unwrap_or_default();
        self.store.process(signer, group, instruction, self.now())?;
        self.status(group, index)
    }

    /// Execute an approved action, returning the dispatched payload
    pub fn execute(
        &self,
        signer: &dyn Signer,
        group: &Address,
        index: u64,
    ) -> Result<Vec<u8>, MultisigError> {
        let receipt = self.store.process(
            signer,
            group,
            Instruction::ExecuteAction {
                action_index: index,
            },
            self.now(),
        )?;

        let payload = match receipt.effect {
            Effect::ActionExecuted { record, .. } => record.payload,
            _ => Vec::new(),
        };
        log::info!(
            "Executed action {} of group {} ({} byte payload)",
            index,
            group.short(),
            payload.len()
        );
        Ok(payload)
    }

    /// Withdraw an action; only its proposer may
    pub fn cancel(&self, signer: &dyn Signer, group: &Address, index: u64) -> Result<(), MultisigError> {
        self.store.process(
            signer,
            group,
            Instruction::CancelAction {
                action_index: index,
            },
            self.now(),
        )?;
        log::info!("Cancelled action {} of group {}", index, group.short());
        Ok(())
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn group(&self, address: &Address) -> Result<Group, MultisigError> {
        self.store.load_group(address)
    }

    /// Live record at `index`
    pub fn action(&self, group: &Address, index: u64) -> Result<ActionRecord, MultisigError> {
        self.store
            .action(group, index)?
            .ok_or_else(|| MultisigError::NotFound(derive_action_address(group, index, &self.program_id())))
    }

    /// Status under the group's current owners and threshold
    pub fn status(&self, group: &Address, index: u64) -> Result<ActionStatus, MultisigError> {
        let current = self.store.load_group(group)?;
        match ActionSlot::resolve(&current, index, self.store.action(group, index)?) {
            ActionSlot::Open(record) => Ok(record.status(&current, self.now())),
            ActionSlot::Cancelled => Ok(ActionStatus::Cancelled),
            ActionSlot::Unknown => Err(MultisigError::NotFound(derive_action_address(
                group,
                index,
                &self.program_id(),
            ))),
        }
    }

    /// Every stored record, by index
    pub fn actions(&self, group: &Address) -> Result<Vec<(u64, ActionRecord)>, MultisigError> {
        let current = self.store.load_group(group)?;
        let mut records = Vec::new();
        for index in 0..current.action_count {
            if let Some(record) = self.store.action(group, index)? {
                records.push((index, record));
            }
        }
        Ok(records)
    }

    /// Records still open for votes or execution
    pub fn pending(&self, group: &Address) -> Result<Vec<(u64, ActionRecord)>, MultisigError> {
        let now = self.now();
        Ok(self
            .actions(group)?
            .into_iter()
            .filter(|(_, record)| record.is_open(now))
            .collect())
    }
}
