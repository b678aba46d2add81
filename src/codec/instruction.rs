//! Operation payload encoding
//!
//! `discriminator (u64 LE) || fields`. Owner lists carry a u32 element
//! count; the action payload carries a u32 byte length.

use super::reader::{put_addresses, put_option_i64, put_prefixed_bytes, CodecError, Reader};
use crate::multisig::instruction::discriminator::*;
use crate::multisig::validator::MAX_OWNERS;
use crate::multisig::Instruction;
use bytes::BufMut;

impl Instruction {
    /// Serialize for submission to the ledger program
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.put_u64_le(self.discriminator());

        match self {
            Instruction::CreateGroup {
                nonce,
                threshold,
                owners,
            } => {
                buf.put_u64_le(*nonce);
                buf.put_u8(*threshold);
                buf.put_u32_le(owners.len() as u32);
                put_addresses(&mut buf, owners);
            }
            Instruction::AddOwner { owner } | Instruction::RemoveOwner { owner } => {
                buf.put_slice(owner.as_bytes());
            }
            Instruction::ChangeThreshold { threshold } => buf.put_u8(*threshold),
            Instruction::ProposeAction {
                payload,
                expires_at,
            } => {
                put_prefixed_bytes(&mut buf, payload);
                put_option_i64(&mut buf, *expires_at);
            }
            Instruction::ApproveAction { action_index }
            | Instruction::RejectAction { action_index }
            | Instruction::ExecuteAction { action_index }
            | Instruction::CancelAction { action_index } => buf.put_u64_le(*action_index),
            Instruction::CloseGroup => {}
        }

        buf
    }

    /// Parse an operation payload; the whole buffer must be consumed
    pub fn from_bytes(data: &[u8]) -> Result<Self, CodecError> {
        let mut reader = Reader::new(data);

        let instruction = match reader.read_u64("discriminator")? {
            CREATE_GROUP => {
                let nonce = reader.read_u64("nonce")?;
                let threshold = reader.read_u8("threshold")?;
                let count = reader.read_u32("owner_count")? as usize;
                let owners = reader.read_addresses("owners", count, MAX_OWNERS)?;
                Instruction::CreateGroup {
                    nonce,
                    threshold,
                    owners,
                }
            }
            ADD_OWNER => Instruction::AddOwner {
                owner: reader.read_address("owner")?,
            },
            REMOVE_OWNER => Instruction::RemoveOwner {
                owner: reader.read_address("owner")?,
            },
            CHANGE_THRESHOLD => Instruction::ChangeThreshold {
                threshold: reader.read_u8("threshold")?,
            },
            PROPOSE_ACTION => {
                let payload = reader.read_prefixed_bytes("payload")?;
                let expires_at = reader.read_option_i64("expires_at")?;
                Instruction::ProposeAction {
                    payload,
                    expires_at,
                }
            }
            APPROVE_ACTION => Instruction::ApproveAction {
                action_index: reader.read_u64("action_index")?,
            },
            REJECT_ACTION => Instruction::RejectAction {
                action_index: reader.read_u64("action_index")?,
            },
            EXECUTE_ACTION => Instruction::ExecuteAction {
                action_index: reader.read_u64("action_index")?,
            },
            CANCEL_ACTION => Instruction::CancelAction {
                action_index: reader.read_u64("action_index")?,
            },
            CLOSE_GROUP => Instruction::CloseGroup,
            other => return Err(CodecError::UnknownDiscriminator(other)),
        };

        reader.finish()?;
        Ok(instruction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Address;

    #[test]
    fn test_discriminator_prefix() {
        let bytes = Instruction::RejectAction { action_index: 3 }.to_bytes();
        assert_eq!(&bytes[..8], &6u64.to_le_bytes());
        assert_eq!(&bytes[8..], &3u64.to_le_bytes());

        assert_eq!(Instruction::CloseGroup.to_bytes(), 9u64.to_le_bytes().to_vec());
    }

    #[test]
    fn test_create_group_layout() {
        let owners = vec![Address::new([1; 32]), Address::new([2; 32])];
        let bytes = Instruction::CreateGroup {
            nonce: 7,
            threshold: 2,
            owners: owners.clone(),
        }
        .to_bytes();

        assert_eq!(&bytes[0..8], &0u64.to_le_bytes());
        assert_eq!(&bytes[8..16], &7u64.to_le_bytes());
        assert_eq!(bytes[16], 2);
        assert_eq!(&bytes[17..21], &2u32.to_le_bytes());
        assert_eq!(bytes.len(), 21 + 64);

        let decoded = Instruction::from_bytes(&bytes).unwrap();
        assert_eq!(
            decoded,
            Instruction::CreateGroup {
                nonce: 7,
                threshold: 2,
                owners
            }
        );
    }

    #[test]
    fn test_propose_layout() {
        let ix = Instruction::ProposeAction {
            payload: vec![0xDE, 0xAD, 0xBE, 0xEF],
            expires_at: Some(500),
        };
        let bytes = ix.to_bytes();

        assert_eq!(&bytes[8..12], &4u32.to_le_bytes());
        assert_eq!(&bytes[12..16], &[0xDE, 0xAD, 0xBE, 0xEF]);
        assert_eq!(bytes[16], 1);
        assert_eq!(&bytes[17..25], &500i64.to_le_bytes());
        assert_eq!(Instruction::from_bytes(&bytes).unwrap(), ix);
    }

    #[test]
    fn test_every_kind_decodes() {
        let kinds = vec![
            Instruction::AddOwner {
                owner: Address::new([4; 32]),
            },
            Instruction::RemoveOwner {
                owner: Address::new([5; 32]),
            },
            Instruction::ChangeThreshold { threshold: 3 },
            Instruction::ProposeAction {
                payload: vec![],
                expires_at: None,
            },
            Instruction::ApproveAction { action_index: 1 },
            Instruction::ExecuteAction { action_index: 2 },
            Instruction::CancelAction { action_index: u64::MAX },
            Instruction::CloseGroup,
        ];

        for ix in kinds {
            assert_eq!(Instruction::from_bytes(&ix.to_bytes()).unwrap(), ix);
        }
    }

    #[test]
    fn test_unknown_discriminator() {
        let bytes = 10u64.to_le_bytes();
        assert_eq!(
            Instruction::from_bytes(&bytes),
            Err(CodecError::UnknownDiscriminator(10))
        );
    }

    #[test]
    fn test_trailing_and_truncated() {
        let mut bytes = Instruction::ApproveAction { action_index: 1 }.to_bytes();
        bytes.push(0);
        assert_eq!(
            Instruction::from_bytes(&bytes),
            Err(CodecError::TrailingBytes(1))
        );

        let bytes = Instruction::ApproveAction { action_index: 1 }.to_bytes();
        assert!(matches!(
            Instruction::from_bytes(&bytes[..12]),
            Err(CodecError::Truncated { field: "action_index", .. })
        ));
    }

    #[test]
    fn test_create_group_owner_count_capped() {
        let mut bytes = Vec::new();
        bytes.put_u64_le(CREATE_GROUP);
        bytes.put_u64_le(0);
        bytes.put_u8(1);
        bytes.put_u32_le(u32::MAX);

        assert!(matches!(
            Instruction::from_bytes(&bytes),
            Err(CodecError::TooManyEntries { field: "owners", .. })
        ));
    }
}
