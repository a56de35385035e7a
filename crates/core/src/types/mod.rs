//! Core types for the marketplace client.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod money;
pub mod phone;
pub mod status;
pub mod tx_ref;

pub use id::*;
pub use money::{Money, format_tzs};
pub use phone::{Phone, PhoneError};
pub use status::*;
pub use tx_ref::TxRef;
