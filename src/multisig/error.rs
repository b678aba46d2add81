//! Errors raised by the authorization layer

use crate::codec::CodecError;
use crate::core::Address;
use crate::crypto::KeyError;
use crate::ledger::LedgerError;
use crate::multisig::validator::ValidationErrors;
use thiserror::Error;

/// Errors related to multisig operations
#[derive(Error, Debug)]
pub enum MultisigError {
    #[error("Invalid group configuration: {0}")]
    Validation(#[from] ValidationErrors),
    #[error("Not authorized: {0} is not permitted to perform this operation")]
    NotAuthorized(Address),
    #[error("Already voted on this action: {0}")]
    AlreadyVoted(Address),
    #[error("Action already finalized")]
    AlreadyFinalized,
    #[error("Insufficient approvals: have {have}, need {need}")]
    InsufficientApprovals { have: usize, need: u8 },
    #[error("Action expired at {expires_at}")]
    Expired { expires_at: i64 },
    #[error("Only the proposer may cancel, not {0}")]
    NotProposer(Address),
    #[error("Malformed record: {0}")]
    MalformedRecord(#[from] CodecError),
    #[error("Account not found: {0}")]
    NotFound(Address),
    #[error("Group already exists: {0}")]
    GroupExists(Address),
    #[error("Owner not found: {0}")]
    OwnerNotFound(Address),
    #[error("Group still has {count} open action(s)")]
    OpenActions { count: u64 },
    #[error("Address mismatch: expected {expected}, got {actual}")]
    AddressMismatch { expected: Address, actual: Address },
    #[error("Operation is missing account #{0}")]
    MissingAccount(usize),
    #[error("Ledger error: {0}")]
    Ledger(LedgerError),
    #[error("Key error: {0}")]
    Key(#[from] KeyError),
}

impl MultisigError {
    /// Approvals still missing, for `InsufficientApprovals`
    pub fn deficit(&self) -> Option<usize> {
        match self {
            MultisigError::InsufficientApprovals { have, need } => {
                Some((*need as usize).saturating_sub(*have))
            }
            _ => None,
        }
    }
}

impl From<LedgerError> for MultisigError {
    /// Program rejections carry the machine's own error; hand it back as-is
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Rejected(inner) => *inner,
            LedgerError::NotFound(address) => MultisigError::NotFound(address),
            other => MultisigError::Ledger(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deficit() {
        let err = MultisigError::InsufficientApprovals { have: 1, need: 3 };
        assert_eq!(err.deficit(), Some(2));
        assert_eq!(MultisigError::AlreadyFinalized.deficit(), None);
    }

    #[test]
    fn test_rejection_unwrapped() {
        let proposer = Address::new([4; 32]);
        let ledger_err = LedgerError::Rejected(Box::new(MultisigError::NotProposer(proposer)));

        let err: MultisigError = ledger_err.into();
        assert!(matches!(err, MultisigError::NotProposer(p) if p == proposer));
    }

    #[test]
    fn test_missing_account_maps_to_not_found() {
        let address = Address::new([5; 32]);
        let err: MultisigError = LedgerError::NotFound(address).into();
        assert!(matches!(err, MultisigError::NotFound(a) if a == address));
    }
}
