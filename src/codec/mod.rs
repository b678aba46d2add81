//! Binary encoding for ledger accounts and operation payloads
//!
//! Layouts are fixed byte-for-byte so that any compatible reader can
//! interpret deployed state. Decoding never panics on short or hostile
//! input; every structural problem is a [`CodecError`].

pub mod account;
pub mod instruction;
pub mod reader;

pub use account::{ACTION_BASE_LEN, GROUP_HEADER_LEN, GROUP_MAX_LEN};
pub use reader::{CodecError, Reader};
