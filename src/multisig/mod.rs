//! Multi-party (m-of-n) authorization
//!
//! A group names N owners and a threshold M. Any owner may propose an
//! action; it executes once M current owners have approved it.
//!
//! # Example
//!
//! ```ignore
//! use quorum_auth::multisig::{Authority, InMemoryStore};
//!
//! let authority = Authority::new(InMemoryStore::new(program_id), SystemClock);
//!
//! // 2-of-3 group created by alice
//! let group = authority.create_group(&alice, 0, vec![a, b, c], 2)?;
//!
//! // Propose, collect approvals, execute
//! let action = authority.propose(&alice, &group, payload, None)?;
//! authority.approve(&alice, &group, action.index)?;
//! authority.approve(&bob, &group, action.index)?;
//! let payload = authority.execute(&carol, &group, action.index)?;
//! ```

pub mod action;
pub mod authority;
pub mod builders;
pub mod error;
pub mod group;
pub mod instruction;
pub mod ledger_store;
pub mod machine;
pub mod memory;
pub mod store;
pub mod validator;

pub use action::{ActionRecord, ActionRef, ActionSlot, ActionStatus};
pub use authority::Authority;
pub use builders::{AccountMeta, OperationDescriptor};
pub use error::MultisigError;
pub use group::{Group, GroupConfig};
pub use instruction::Instruction;
pub use ledger_store::LedgerBackedStore;
pub use machine::{Effect, Snapshot};
pub use memory::InMemoryStore;
pub use store::{AuthorizationStore, DispatchedAction, Receipt};
pub use validator::{ValidationErrors, Violation, MAX_OWNERS, MIN_OWNERS};
