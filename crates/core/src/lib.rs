//! TZ Materials Core - Shared types library.
//!
//! This crate provides the types shared by the marketplace client components:
//! - `client` - REST client, session/token lifecycle, cart and checkout workflow
//! - `cli` - Command-line front end over the client library
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients, no storage.
//! Every record here mirrors a JSON shape of the marketplace REST API, so the
//! same types are used for decoding responses and for local persistence.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, money, phone numbers, emails, statuses
//!   and payment references
//! - [`models`] - API records (users, sellers, products, orders, payments, tokens)

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod models;
pub mod types;

pub use models::*;
pub use types::*;
