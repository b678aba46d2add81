//! Core primitives shared by every layer
//!
//! - Addresses and deterministic address derivation
//! - Clock abstraction for lazy expiry

pub mod address;
pub mod clock;

pub use address::{
    derive_action_address, derive_address, derive_group_address, Address, AddressError,
    ACTION_SEED, ADDRESS_LEN, GROUP_SEED,
};
pub use clock::{format_timestamp, Clock, FixedClock, SystemClock};
