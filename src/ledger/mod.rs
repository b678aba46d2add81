//! Ledger collaborator interface
//!
//! The authorization layer never talks to a network directly. It fetches
//! raw account bytes and submits signed operations through [`LedgerClient`].
//! [`LocalLedger`] implements the interface in-process and runs the
//! authorization program itself.

pub mod local;

pub use local::{LedgerState, LocalLedger};

use crate::codec::CodecError;
use crate::core::Address;
use crate::crypto::{KeyError, Signature, Signer};
use crate::multisig::{MultisigError, OperationDescriptor};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Errors reported by a ledger
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Account not found: {0}")]
    NotFound(Address),
    #[error("Missing signature for signer {0}")]
    MissingSignature(Address),
    #[error("Invalid signature for signer {0}")]
    InvalidSignature(Address),
    #[error("Unknown program: {0}")]
    UnknownProgram(Address),
    #[error("Malformed operation: {0}")]
    MalformedOperation(#[from] CodecError),
    #[error("Program rejected operation: {0}")]
    Rejected(Box<MultisigError>),
    #[error("Key error: {0}")]
    Key(#[from] KeyError),
}

impl From<MultisigError> for LedgerError {
    fn from(err: MultisigError) -> Self {
        LedgerError::Rejected(Box::new(err))
    }
}

/// An operation descriptor with signatures from its signer accounts
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedOperation {
    pub descriptor: OperationDescriptor,
    pub signatures: Vec<(Address, Signature)>,
}

impl SignedOperation {
    /// Sign the descriptor's message with every given signer
    pub fn sign(descriptor: OperationDescriptor, signers: &[&dyn Signer]) -> Result<Self, KeyError> {
        let message = descriptor.message();
        let signatures = signers
            .iter()
            .map(|signer| Ok((signer.identity(), signer.sign(&message)?)))
            .collect::<Result<Vec<_>, KeyError>>()?;

        Ok(Self {
            descriptor,
            signatures,
        })
    }

    /// Signature supplied for `address`, if any
    pub fn signature_for(&self, address: &Address) -> Option<&Signature> {
        self.signatures
            .iter()
            .find(|(signer, _)| signer == address)
            .map(|(_, signature)| signature)
    }
}

/// Access to account state and operation submission
pub trait LedgerClient {
    /// Raw bytes of an account; [`LedgerError::NotFound`] when absent
    fn fetch_account(&self, address: &Address) -> Result<Vec<u8>, LedgerError>;

    /// Submit a signed operation, returning the transaction signature
    fn submit(&self, operation: &SignedOperation) -> Result<Signature, LedgerError>;
}

impl<L: LedgerClient + ?Sized> LedgerClient for &L {
    fn fetch_account(&self, address: &Address) -> Result<Vec<u8>, LedgerError> {
        (**self).fetch_account(address)
    }

    fn submit(&self, operation: &SignedOperation) -> Result<Signature, LedgerError> {
        (**self).submit(operation)
    }
}

impl<L: LedgerClient + ?Sized> LedgerClient for Arc<L> {
    fn fetch_account(&self, address: &Address) -> Result<Vec<u8>, LedgerError> {
        (**self).fetch_account(address)
    }

    fn submit(&self, operation: &SignedOperation) -> Result<Signature, LedgerError> {
        (**self).submit(operation)
    }
}
