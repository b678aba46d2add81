//! On-ledger account layouts
//!
//! Group account (little-endian):
//! ```text
//! 0   creator            32
//! 32  threshold           1
//! 33  nonce               8  u64
//! 41  action_count        8  u64
//! 49  created_at          8  i64
//! 57  owner_count         1
//! 58  owners             32 * owner_count
//! ```
//!
//! Action record account:
//! ```text
//! 0   authorization      32
//! 32  proposer           32
//! 64  executed            1
//! 65  created_at          8  i64
//! 73  has_expiry          1
//! 74  expires_at          8  i64, only when has_expiry
//! ..  payload_len         4  u32
//! ..  payload
//! ..  approval_count      1  + 32 each
//! ..  rejection_count     1  + 32 each
//! ```
//!
//! Ledger accounts are allocated up front, so decoders ignore bytes past
//! the end of the record.

use super::reader::{put_addresses, put_bool, put_option_i64, put_prefixed_bytes, CodecError, Reader};
use crate::core::ADDRESS_LEN;
use crate::multisig::validator::MAX_OWNERS;
use crate::multisig::{ActionRecord, Group};
use bytes::BufMut;

/// Bytes before the owner list in a group account
pub const GROUP_HEADER_LEN: usize = 58;

/// Largest possible group account
pub const GROUP_MAX_LEN: usize = GROUP_HEADER_LEN + MAX_OWNERS * ADDRESS_LEN;

/// Fixed part of an action record without expiry, payload or votes
pub const ACTION_BASE_LEN: usize = 32 + 32 + 1 + 8 + 1 + 4 + 1 + 1;

impl Group {
    /// Encoded size for the current owner count
    pub fn encoded_len(&self) -> usize {
        GROUP_HEADER_LEN + self.owners.len() * ADDRESS_LEN
    }

    /// Serialize to the group account layout
    ///
    /// An owner list longer than the layout allows is refused, never
    /// truncated.
    pub fn to_bytes(&self) -> Result<Vec<u8>, CodecError> {
        let owner_count = count_byte("owners", self.owners.len())?;

        let mut buf = Vec::with_capacity(self.encoded_len());
        buf.put_slice(self.creator.as_bytes());
        buf.put_u8(self.threshold);
        buf.put_u64_le(self.nonce);
        buf.put_u64_le(self.action_count);
        buf.put_i64_le(self.created_at);
        buf.put_u8(owner_count);
        put_addresses(&mut buf, &self.owners);
        Ok(buf)
    }

    /// Deserialize from the group account layout
    pub fn from_bytes(data: &[u8]) -> Result<Self, CodecError> {
        let mut reader = Reader::new(data);

        let creator = reader.read_address("creator")?;
        let threshold = reader.read_u8("threshold")?;
        let nonce = reader.read_u64("nonce")?;
        let action_count = reader.read_u64("action_count")?;
        let created_at = reader.read_i64("created_at")?;
        let owner_count = reader.read_u8("owner_count")? as usize;
        let owners = reader.read_addresses("owners", owner_count, MAX_OWNERS)?;

        Ok(Self {
            creator,
            threshold,
            nonce,
            action_count,
            created_at,
            owners,
        })
    }
}

impl ActionRecord {
    /// Encoded size of this record
    pub fn encoded_len(&self) -> usize {
        ACTION_BASE_LEN
            + if self.expires_at.is_some() { 8 } else { 0 }
            + self.payload.len()
            + (self.approvals.len() + self.rejections.len()) * ADDRESS_LEN
    }

    /// Serialize to the action record layout
    pub fn to_bytes(&self) -> Result<Vec<u8>, CodecError> {
        let approval_count = count_byte("approvals", self.approvals.len())?;
        let rejection_count = count_byte("rejections", self.rejections.len())?;

        let mut buf = Vec::with_capacity(self.encoded_len());
        buf.put_slice(self.authorization.as_bytes());
        buf.put_slice(self.proposer.as_bytes());
        put_bool(&mut buf, self.executed);
        buf.put_i64_le(self.created_at);
        put_option_i64(&mut buf, self.expires_at);
        put_prefixed_bytes(&mut buf, &self.payload);
        buf.put_u8(approval_count);
        put_addresses(&mut buf, &self.approvals);
        buf.put_u8(rejection_count);
        put_addresses(&mut buf, &self.rejections);
        Ok(buf)
    }

    /// Deserialize from the action record layout
    pub fn from_bytes(data: &[u8]) -> Result<Self, CodecError> {
        let mut reader = Reader::new(data);

        let authorization = reader.read_address("authorization")?;
        let proposer = reader.read_address("proposer")?;
        let executed = reader.read_bool("executed")?;
        let created_at = reader.read_i64("created_at")?;
        let expires_at = reader.read_option_i64("expires_at")?;
        let payload = reader.read_prefixed_bytes("payload")?;
        let approval_count = reader.read_u8("approval_count")? as usize;
        let approvals = reader.read_addresses("approvals", approval_count, MAX_OWNERS)?;
        let rejection_count = reader.read_u8("rejection_count")? as usize;
        let rejections = reader.read_addresses("rejections", rejection_count, MAX_OWNERS)?;

        Ok(Self {
            authorization,
            proposer,
            executed,
            created_at,
            expires_at,
            payload,
            approvals,
            rejections,
        })
    }
}

/// One-byte entry count, capped at [`MAX_OWNERS`] like the decoder
fn count_byte(field: &'static str, count: usize) -> Result<u8, CodecError> {
    if count > MAX_OWNERS {
        return Err(CodecError::TooManyEntries {
            field,
            count,
            max: MAX_OWNERS,
        });
    }
    Ok(count as u8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Address;

    fn addr(b: u8) -> Address {
        Address::new([b; 32])
    }

    fn sample_group(owner_count: u8) -> Group {
        Group {
            creator: addr(0xC0),
            threshold: 2,
            nonce: 7,
            action_count: 3,
            created_at: 1_700_000_000,
            owners: (1..=owner_count).map(addr).collect(),
        }
    }

    #[test]
    fn test_group_layout_offsets() {
        let group = sample_group(2);
        let bytes = group.to_bytes().unwrap();

        assert_eq!(bytes.len(), 58 + 64);
        assert_eq!(&bytes[0..32], &[0xC0; 32]);
        assert_eq!(bytes[32], 2);
        assert_eq!(&bytes[33..41], &7u64.to_le_bytes());
        assert_eq!(&bytes[41..49], &3u64.to_le_bytes());
        assert_eq!(&bytes[49..57], &1_700_000_000i64.to_le_bytes());
        assert_eq!(bytes[57], 2);
        assert_eq!(&bytes[58..90], &[1; 32]);
        assert_eq!(&bytes[90..122], &[2; 32]);
    }

    #[test]
    fn test_group_roundtrip() {
        for n in [2u8, 5, 11] {
            let group = sample_group(n);
            assert_eq!(Group::from_bytes(&group.to_bytes().unwrap()).unwrap(), group);
        }
        assert_eq!(sample_group(11).encoded_len(), GROUP_MAX_LEN);
    }

    #[test]
    fn test_group_ignores_account_padding() {
        let group = sample_group(3);
        let mut bytes = group.to_bytes().unwrap();
        bytes.resize(GROUP_MAX_LEN, 0);
        assert_eq!(Group::from_bytes(&bytes).unwrap(), group);
    }

    #[test]
    fn test_group_truncated_owner_list() {
        let bytes = sample_group(3).to_bytes().unwrap();
        let err = Group::from_bytes(&bytes[..bytes.len() - 1]).unwrap_err();
        assert!(matches!(err, CodecError::Truncated { field: "owners", .. }));

        assert!(Group::from_bytes(&bytes[..10]).is_err());
        assert!(Group::from_bytes(&[]).is_err());
    }

    #[test]
    fn test_group_owner_count_above_max() {
        let mut bytes = sample_group(2).to_bytes().unwrap();
        bytes[57] = 12;
        bytes.resize(GROUP_HEADER_LEN + 12 * 32, 0);

        assert_eq!(
            Group::from_bytes(&bytes),
            Err(CodecError::TooManyEntries {
                field: "owners",
                count: 12,
                max: MAX_OWNERS
            })
        );
    }

    fn sample_action(expires_at: Option<i64>) -> ActionRecord {
        ActionRecord {
            authorization: addr(0xAA),
            proposer: addr(1),
            executed: false,
            created_at: 1_700_000_100,
            expires_at,
            payload: vec![0xDE, 0xAD, 0xBE, 0xEF],
            approvals: vec![addr(1), addr(2)],
            rejections: vec![addr(3)],
        }
    }

    #[test]
    fn test_action_layout_offsets() {
        let record = sample_action(Some(1_700_003_600));
        let bytes = record.to_bytes().unwrap();

        assert_eq!(&bytes[0..32], &[0xAA; 32]);
        assert_eq!(&bytes[32..64], &[1; 32]);
        assert_eq!(bytes[64], 0);
        assert_eq!(&bytes[65..73], &1_700_000_100i64.to_le_bytes());
        assert_eq!(bytes[73], 1);
        assert_eq!(&bytes[74..82], &1_700_003_600i64.to_le_bytes());
        assert_eq!(&bytes[82..86], &4u32.to_le_bytes());
        assert_eq!(&bytes[86..90], &[0xDE, 0xAD, 0xBE, 0xEF]);
        assert_eq!(bytes[90], 2);
        assert_eq!(bytes[155], 1);
        assert_eq!(bytes.len(), record.encoded_len());
    }

    #[test]
    fn test_action_without_expiry_shifts_payload() {
        let bytes = sample_action(None).to_bytes().unwrap();
        assert_eq!(bytes[73], 0);
        assert_eq!(&bytes[74..78], &4u32.to_le_bytes());
    }

    #[test]
    fn test_action_roundtrip() {
        let mut executed = sample_action(None);
        executed.executed = true;
        executed.payload.clear();

        let mut full = sample_action(Some(-5));
        full.approvals = (1..=11).map(addr).collect();
        full.rejections.clear();

        for record in [sample_action(Some(42)), executed, full] {
            assert_eq!(ActionRecord::from_bytes(&record.to_bytes().unwrap()).unwrap(), record);
        }
    }

    #[test]
    fn test_action_payload_length_overflow() {
        let mut bytes = sample_action(None).to_bytes().unwrap();
        // payload_len at offset 74 when there is no expiry
        bytes[74..78].copy_from_slice(&u32::MAX.to_le_bytes());

        let err = ActionRecord::from_bytes(&bytes).unwrap_err();
        assert!(matches!(err, CodecError::Truncated { field: "payload", .. }));
    }

    #[test]
    fn test_action_bad_flags() {
        let mut bytes = sample_action(None).to_bytes().unwrap();
        bytes[64] = 7;
        assert!(matches!(
            ActionRecord::from_bytes(&bytes),
            Err(CodecError::InvalidFlag { field: "executed", value: 7 })
        ));

        let mut bytes = sample_action(None).to_bytes().unwrap();
        bytes[73] = 9;
        assert!(matches!(
            ActionRecord::from_bytes(&bytes),
            Err(CodecError::InvalidFlag { field: "expires_at", value: 9 })
        ));
    }

    #[test]
    fn test_action_vote_count_above_max() {
        let mut bytes = sample_action(None).to_bytes().unwrap();
        // approval_count follows the 4-byte payload
        let approval_offset = 74 + 4 + 4;
        bytes[approval_offset] = 200;

        assert!(matches!(
            ActionRecord::from_bytes(&bytes),
            Err(CodecError::TooManyEntries { field: "approvals", count: 200, .. })
        ));
    }

    #[test]
    fn test_encode_refuses_oversized_lists() {
        let mut record = sample_action(None);
        record.approvals = (1..=12).map(addr).collect();
        assert_eq!(
            record.to_bytes(),
            Err(CodecError::TooManyEntries {
                field: "approvals",
                count: 12,
                max: MAX_OWNERS
            })
        );

        let group = sample_group(12);
        assert!(matches!(
            group.to_bytes(),
            Err(CodecError::TooManyEntries { field: "owners", count: 12, .. })
        ));
    }
}
