//! Quorum-Auth: m-of-n authorization groups for ledger actions
//!
//! This crate provides:
//! - Deterministic group and action addresses derived from a program id
//! - Fixed binary layouts for group and action accounts
//! - A pure approval state machine shared by every backend
//! - An in-memory store and a ledger-backed store behind one trait
//! - A local ledger that verifies signatures and runs the program itself
//! - JSON persistence for ledger snapshots and named owner keys
//!
//! # Example
//!
//! ```rust
//! use quorum_auth::core::{Address, SystemClock};
//! use quorum_auth::crypto::KeyPair;
//! use quorum_auth::multisig::{ActionStatus, Authority, InMemoryStore};
//!
//! let alice = KeyPair::generate();
//! let bob = KeyPair::generate();
//! let carol = KeyPair::generate();
//!
//! let authority = Authority::new(InMemoryStore::new(Address::new([1; 32])), SystemClock);
//!
//! // 2-of-3 group created by alice
//! let owners = vec![alice.address(), bob.address(), carol.address()];
//! let group = authority.create_group(&alice, 0, owners, 2).unwrap();
//!
//! // Propose, collect approvals, execute
//! let action = authority.propose(&bob, &group, vec![0xDE, 0xAD], None).unwrap();
//! authority.approve(&alice, &group, action.index).unwrap();
//! let status = authority.approve(&carol, &group, action.index).unwrap();
//! assert_eq!(status, ActionStatus::Ready);
//!
//! let payload = authority.execute(&bob, &group, action.index).unwrap();
//! assert_eq!(payload, vec![0xDE, 0xAD]);
//! ```

pub mod cli;
pub mod codec;
pub mod config;
pub mod core;
pub mod crypto;
pub mod ledger;
pub mod multisig;
pub mod storage;

// Re-export commonly used types
pub use config::ClientConfig;
pub use core::{derive_action_address, derive_group_address, Address, Clock, SystemClock};
pub use crypto::{KeyPair, Signer};
pub use ledger::{LedgerClient, LedgerError, LocalLedger};
pub use multisig::{
    ActionRecord, ActionStatus, Authority, AuthorizationStore, Group, InMemoryStore,
    LedgerBackedStore, MultisigError,
};
pub use storage::{Keystore, LedgerStorage};
