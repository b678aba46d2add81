//! Bounds-checked reading and writing of little-endian fields
//!
//! Every read checks the remaining length first, so malformed input turns
//! into a [`CodecError`] instead of a panic inside `bytes::Buf`.

use crate::core::{Address, ADDRESS_LEN};
use bytes::{Buf, BufMut};
use thiserror::Error;

/// Structural decode failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("Truncated {field}: need {needed} bytes, {remaining} remaining")]
    Truncated {
        field: &'static str,
        needed: usize,
        remaining: usize,
    },
    #[error("Too many {field}: {count} exceeds maximum {max}")]
    TooManyEntries {
        field: &'static str,
        count: usize,
        max: usize,
    },
    #[error("Invalid {field} flag: {value}")]
    InvalidFlag { field: &'static str, value: u8 },
    #[error("Unknown operation discriminator: {0}")]
    UnknownDiscriminator(u64),
    #[error("{0} trailing bytes after operation")]
    TrailingBytes(usize),
}

/// Cursor over an encoded buffer
pub struct Reader<'a> {
    buf: &'a [u8],
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    fn ensure(&self, field: &'static str, needed: usize) -> Result<(), CodecError> {
        if self.buf.remaining() < needed {
            return Err(CodecError::Truncated {
                field,
                needed,
                remaining: self.buf.remaining(),
            });
        }
        Ok(())
    }

    pub fn read_u8(&mut self, field: &'static str) -> Result<u8, CodecError> {
        self.ensure(field, 1)?;
        Ok(self.buf.get_u8())
    }

    pub fn read_u32(&mut self, field: &'static str) -> Result<u32, CodecError> {
        self.ensure(field, 4)?;
        Ok(self.buf.get_u32_le())
    }

    pub fn read_u64(&mut self, field: &'static str) -> Result<u64, CodecError> {
        self.ensure(field, 8)?;
        Ok(self.buf.get_u64_le())
    }

    pub fn read_i64(&mut self, field: &'static str) -> Result<i64, CodecError> {
        self.ensure(field, 8)?;
        Ok(self.buf.get_i64_le())
    }

    /// A byte that must be 0 or 1
    pub fn read_bool(&mut self, field: &'static str) -> Result<bool, CodecError> {
        match self.read_u8(field)? {
            0 => Ok(false),
            1 => Ok(true),
            value => Err(CodecError::InvalidFlag { field, value }),
        }
    }

    /// Presence flag followed by the value when set
    pub fn read_option_i64(&mut self, field: &'static str) -> Result<Option<i64>, CodecError> {
        if self.read_bool(field)? {
            Ok(Some(self.read_i64(field)?))
        } else {
            Ok(None)
        }
    }

    pub fn read_address(&mut self, field: &'static str) -> Result<Address, CodecError> {
        self.ensure(field, ADDRESS_LEN)?;
        let mut bytes = [0u8; ADDRESS_LEN];
        self.buf.copy_to_slice(&mut bytes);
        Ok(Address::new(bytes))
    }

    /// `count` consecutive addresses, refusing counts above `max`
    pub fn read_addresses(
        &mut self,
        field: &'static str,
        count: usize,
        max: usize,
    ) -> Result<Vec<Address>, CodecError> {
        if count > max {
            return Err(CodecError::TooManyEntries { field, count, max });
        }
        self.ensure(field, count * ADDRESS_LEN)?;

        let mut addresses = Vec::with_capacity(count);
        for _ in 0..count {
            addresses.push(self.read_address(field)?);
        }
        Ok(addresses)
    }

    /// 4-byte length prefix followed by raw bytes
    pub fn read_prefixed_bytes(&mut self, field: &'static str) -> Result<Vec<u8>, CodecError> {
        let len = self.read_u32(field)? as usize;
        self.ensure(field, len)?;
        let bytes = self.buf[..len].to_vec();
        self.buf.advance(len);
        Ok(bytes)
    }

    /// Fail if anything is left
    pub fn finish(self) -> Result<(), CodecError> {
        match self.buf.remaining() {
            0 => Ok(()),
            extra => Err(CodecError::TrailingBytes(extra)),
        }
    }
}

pub fn put_bool(buf: &mut Vec<u8>, value: bool) {
    buf.put_u8(u8::from(value));
}

pub fn put_option_i64(buf: &mut Vec<u8>, value: Option<i64>) {
    match value {
        Some(v) => {
            buf.put_u8(1);
            buf.put_i64_le(v);
        }
        None => buf.put_u8(0),
    }
}

pub fn put_addresses(buf: &mut Vec<u8>, addresses: &[Address]) {
    for address in addresses {
        buf.put_slice(address.as_bytes());
    }
}

pub fn put_prefixed_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    buf.put_u32_le(bytes.len() as u32);
    buf.put_slice(bytes);
}
